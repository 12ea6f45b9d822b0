//! Placeboard - admin client for the places directory
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use placeboard::cli::{commands, Cli, Commands};
use placeboard::config::ConfigManager;
use placeboard::dashboard::Dashboard;
use placeboard::error::PlaceboardResult;
use placeboard::ui;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PlaceboardResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let loaded = manager.load().await;

    // 0 = warn, 1 = info, 2+ = debug; general.verbose counts as one -v
    let (verbose, json_logs) = match &loaded {
        Ok(config) => (
            cli.verbose.max(u8::from(config.general.verbose)),
            config.general.log_format == "json",
        ),
        Err(_) => (cli.verbose, false),
    };
    init_logging(verbose, json_logs);
    ui::init_theme();

    match cli.command {
        // Both work with a broken or missing config file
        Commands::Completions(args) => {
            commands::completions(args);
            Ok(())
        }
        Commands::Config(args) => commands::config(args, &manager).await,
        command => {
            let mut config = loaded?;
            if let Some(url) = cli.api_url {
                debug!("API base URL overridden: {}", url);
                config.api.base_url = url;
            }
            ConfigManager::ensure_state_dir().await?;

            let mut dashboard = Dashboard::connect(config).await?;
            dispatch(command, &mut dashboard).await
        }
    }
}

async fn dispatch(command: Commands, dashboard: &mut Dashboard) -> PlaceboardResult<()> {
    match command {
        Commands::Login(args) => commands::login(args, dashboard).await,
        Commands::Register(args) => commands::register(args, dashboard).await,
        Commands::Logout => commands::logout(dashboard).await,
        Commands::Whoami(args) => commands::whoami(args, dashboard).await,
        Commands::Places(args) => commands::places(args, dashboard).await,
        Commands::Users(args) => commands::users(args, dashboard).await,
        Commands::Stats(args) => commands::stats(args, dashboard).await,
        Commands::Config(_) | Commands::Completions(_) => unreachable!("handled before connecting"),
    }
}

fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("placeboard=warn"),
        1 => EnvFilter::new("placeboard=info"),
        _ => EnvFilter::new("placeboard=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
