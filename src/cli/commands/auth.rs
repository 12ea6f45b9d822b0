//! Session commands - login, register, logout, whoami

use super::print_json;
use crate::cli::args::{FormatArgs, LoginArgs, OutputFormat, RegisterArgs};
use crate::dashboard::Dashboard;
use crate::error::PlaceboardResult;
use crate::forms::{LoginForm, RegisterForm};
use crate::ui::{self, TaskSpinner, UiContext};

async fn password_or_prompt(ctx: &UiContext, given: Option<String>) -> PlaceboardResult<String> {
    match given {
        Some(password) => Ok(password),
        None => ui::password(ctx, "Password", "--password").await,
    }
}

pub async fn login(args: LoginArgs, dashboard: &Dashboard) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let password = password_or_prompt(&ctx, args.password).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Logging in...");
    let form = LoginForm {
        email: args.email,
        password,
    };
    match dashboard.login(form).await {
        Ok(user) => {
            spinner.stop(&format!("Logged in as {} <{}>", user.name, user.email));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Login failed");
            Err(e)
        }
    }
}

pub async fn register(args: RegisterArgs, dashboard: &Dashboard) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let password = password_or_prompt(&ctx, args.password).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Creating account...");
    let form = RegisterForm {
        name: args.name,
        email: args.email,
        password,
    };
    match dashboard.register(form).await {
        Ok(user) => {
            spinner.stop(&format!("Registered and logged in as {}", user.email));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Registration failed");
            Err(e)
        }
    }
}

pub async fn logout(dashboard: &Dashboard) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    if dashboard.logout().await? {
        ui::step_ok(&ctx, "Logged out");
    } else {
        ui::step_info(&ctx, "No stored session");
    }
    Ok(())
}

pub async fn whoami(args: FormatArgs, dashboard: &Dashboard) -> PlaceboardResult<()> {
    let user = dashboard.current_user().await?;

    match args.format {
        OutputFormat::Json => print_json(&user)?,
        OutputFormat::Plain => println!("{}", user.email),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &user.name);
            ui::key_value(&ctx, "ID", &user.id);
            ui::key_value(&ctx, "Email", &user.email);
            ui::key_value(&ctx, "Role", &user.role.to_string());
            ui::key_value(&ctx, "Member since", &super::format_time(&user.created_at));
        }
    }
    Ok(())
}
