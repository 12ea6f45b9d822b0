//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{PlaceboardError, PlaceboardResult};
use crate::ui::{self, UiContext};
use toml_edit::{DocumentMut, Item};

/// Settable keys and the TOML type each one holds
const KEYS: [(&str, ValueKind); 12] = [
    ("general.verbose", ValueKind::Bool),
    ("general.log_format", ValueKind::LogFormat),
    ("general.audit_log", ValueKind::Bool),
    ("api.base_url", ValueKind::Text),
    ("api.timeout_secs", ValueKind::Integer),
    ("cache.places_stale_secs", ValueKind::Integer),
    ("cache.users_stale_secs", ValueKind::Integer),
    ("cache.stats_stale_secs", ValueKind::Integer),
    ("upload.endpoint", ValueKind::Text),
    ("upload.max_images", ValueKind::Integer),
    ("upload.max_image_bytes", ValueKind::Integer),
    ("upload.timeout_secs", ValueKind::Integer),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Bool,
    Integer,
    Text,
    LogFormat,
}

pub async fn execute(args: ConfigArgs, manager: &ConfigManager) -> PlaceboardResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(manager).await,
        Some(ConfigAction::Path) => {
            println!("{}", manager.path().display());
            Ok(())
        }
        Some(ConfigAction::Init { force }) => init_config(manager, force).await,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await,
    }
}

async fn show_config(manager: &ConfigManager) -> PlaceboardResult<()> {
    let config = manager.load().await?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Set one key, keeping the rest of the file as written
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let Some(kind) = key_kind(key) else {
        ui::step_error_detail(&ctx, "Unknown config key", key);
        eprintln!("Valid keys:");
        for (valid, _) in KEYS {
            eprintln!("  {}", valid);
        }
        return Err(PlaceboardError::User(format!("Unknown config key: {}", key)));
    };

    let raw = manager.read_raw().await?;
    let mut doc: DocumentMut = raw.parse().map_err(|e: toml_edit::TomlError| {
        PlaceboardError::ConfigInvalid {
            path: manager.path().to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    set_item(&mut doc, key, parse_value(kind, value)?)?;

    let rendered = doc.to_string();
    toml::from_str::<Config>(&rendered)?;
    manager.write(&rendered).await?;

    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    Ok(())
}

fn key_kind(key: &str) -> Option<ValueKind> {
    KEYS.iter()
        .find(|(known, _)| *known == key)
        .map(|(_, kind)| *kind)
}

fn parse_value(kind: ValueKind, value: &str) -> PlaceboardResult<Item> {
    match kind {
        ValueKind::Bool => parse_bool(value).map(toml_edit::value),
        ValueKind::Integer => parse_u32(value).map(|n| toml_edit::value(i64::from(n))),
        ValueKind::Text => Ok(toml_edit::value(value)),
        ValueKind::LogFormat => match value {
            "text" | "json" => Ok(toml_edit::value(value)),
            _ => Err(PlaceboardError::User(format!(
                "Invalid log format: {}. Use text or json",
                value
            ))),
        },
    }
}

/// Write `item` at a dotted `section.leaf` key, creating the section
fn set_item(doc: &mut DocumentMut, key: &str, item: Item) -> PlaceboardResult<()> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| PlaceboardError::User(format!("Unknown config key: {}", key)))?;

    let table = doc
        .entry(section)
        .or_insert(toml_edit::table())
        .as_table_like_mut()
        .ok_or_else(|| PlaceboardError::User(format!("[{}] is not a table", section)))?;
    table.insert(leaf, item);
    Ok(())
}

fn parse_bool(value: &str) -> PlaceboardResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PlaceboardError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u32(value: &str) -> PlaceboardResult<u32> {
    value
        .parse()
        .map_err(|_| PlaceboardError::User(format!("Invalid number: {}", value)))
}
