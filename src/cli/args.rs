//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Placeboard - admin client for the places directory
///
/// Lists, creates, edits and deletes places, with image uploads and an
/// optimistic local cache.
#[derive(Parser, Debug)]
#[command(name = "placeboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PLACEBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override api.base_url for this invocation
    #[arg(long, global = true, env = "PLACEBOARD_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session token
    Login(LoginArgs),

    /// Create an account and log in
    Register(RegisterArgs),

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami(FormatArgs),

    /// List and manage places
    Places(PlacesArgs),

    /// List users
    Users(UsersArgs),

    /// Show dashboard counters
    Stats(FormatArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(short, long, env = "PLACEBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// Display name
    #[arg(short, long)]
    pub name: String,

    #[arg(short, long)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(short, long, env = "PLACEBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Output selection shared by read commands
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct PlacesArgs {
    #[command(subcommand)]
    pub action: PlacesAction,
}

#[derive(Subcommand, Debug)]
pub enum PlacesAction {
    /// List every place
    List(FormatArgs),

    /// Show one place with its author
    Show {
        id: String,

        #[command(flatten)]
        output: FormatArgs,
    },

    /// Create a place, uploading its images first
    Create(CreatePlaceArgs),

    /// Change fields or images of a place
    Edit(EditPlaceArgs),

    /// Delete a place
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
pub struct CreatePlaceArgs {
    #[arg(short, long)]
    pub name: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Province code, 1-58
    #[arg(short, long)]
    pub wilaya: i64,

    /// Image file to upload (repeatable)
    #[arg(short, long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct EditPlaceArgs {
    pub id: String,

    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Province code, 1-58
    #[arg(short, long)]
    pub wilaya: Option<i64>,

    /// New image file to upload (repeatable)
    #[arg(short, long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,

    /// URL of a current image to remove (repeatable)
    #[arg(long = "drop-image", value_name = "URL")]
    pub drop_images: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersAction,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// List every user
    List(FormatArgs),

    /// Show one user
    Show {
        id: String,

        #[command(flatten)]
        output: FormatArgs,
    },
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.base_url)
        key: String,
        /// Value to set
        value: String,
    },
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one id per line)
    Plain,
}
