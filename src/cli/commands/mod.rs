//! CLI command implementations

pub mod auth;
pub mod completions;
pub mod config;
pub mod places;
pub mod stats;
pub mod users;

pub use auth::{login, logout, register, whoami};
pub use completions::execute as completions;
pub use config::execute as config;
pub use places::execute as places;
pub use stats::execute as stats;
pub use users::execute as users;

use crate::error::PlaceboardResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> PlaceboardResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Cut `text` to `width` characters for table cells
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
