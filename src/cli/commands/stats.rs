//! Stats command - dashboard counters

use super::print_json;
use crate::cli::args::{FormatArgs, OutputFormat};
use crate::dashboard::Dashboard;
use crate::error::PlaceboardResult;
use crate::ui::{self, UiContext};

pub async fn execute(args: FormatArgs, dashboard: &Dashboard) -> PlaceboardResult<()> {
    let stats = dashboard.stats().await?;

    match args.format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Plain => {
            println!("places {}", stats.places);
            println!("users {}", stats.users);
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, "Dashboard");
            ui::key_value(&ctx, "Places", &stats.places.to_string());
            ui::key_value(&ctx, "Users", &stats.users.to_string());
        }
    }
    Ok(())
}
