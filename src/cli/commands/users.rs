//! Users commands - list, show

use super::{format_time, print_json, truncate};
use crate::api::User;
use crate::cli::args::{OutputFormat, UsersAction, UsersArgs};
use crate::dashboard::Dashboard;
use crate::error::PlaceboardResult;
use crate::ui::{self, UiContext};
use console::style;

pub async fn execute(args: UsersArgs, dashboard: &Dashboard) -> PlaceboardResult<()> {
    match args.action {
        UsersAction::List(output) => list(dashboard, output.format).await,
        UsersAction::Show { id, output } => show(dashboard, &id, output.format).await,
    }
}

async fn list(dashboard: &Dashboard, format: OutputFormat) -> PlaceboardResult<()> {
    let users = dashboard.users().await?;

    match format {
        OutputFormat::Json => print_json(&users)?,
        OutputFormat::Plain => {
            for user in &users {
                println!("{}", user.email);
            }
        }
        OutputFormat::Table if users.is_empty() => {
            ui::step_info(&UiContext::detect(), "No users");
        }
        OutputFormat::Table => print_table(&users),
    }
    Ok(())
}

fn print_table(users: &[User]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Users");

    println!(
        "{:<26} {:<24} {:<32} {:<6}",
        style("ID").bold(),
        style("NAME").bold(),
        style("EMAIL").bold(),
        style("ROLE").bold()
    );
    println!("{}", "-".repeat(91));

    for user in users {
        let role = match user.role {
            crate::api::UserRole::Admin => style(user.role.to_string()).cyan(),
            crate::api::UserRole::User => style(user.role.to_string()).dim(),
        };
        println!(
            "{:<26} {:<24} {:<32} {:<6}",
            truncate(&user.id, 26),
            truncate(&user.name, 24),
            truncate(&user.email, 32),
            role
        );
    }

    println!();
    println!("{} user(s)", users.len());
}

async fn show(dashboard: &Dashboard, id: &str, format: OutputFormat) -> PlaceboardResult<()> {
    let user = dashboard.user(id).await?;

    match format {
        OutputFormat::Json => print_json(&user)?,
        OutputFormat::Plain => println!("{}", user.email),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &user.name);
            ui::key_value(&ctx, "ID", &user.id);
            ui::key_value(&ctx, "Email", &user.email);
            ui::key_value(&ctx, "Role", &user.role.to_string());
            if !user.avatar.is_empty() {
                ui::key_value(&ctx, "Avatar", &user.avatar);
            }
            ui::key_value(&ctx, "Joined", &format_time(&user.created_at));
        }
    }
    Ok(())
}
