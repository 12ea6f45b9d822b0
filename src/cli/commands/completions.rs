//! Completions command - print a shell completion script

use crate::cli::args::{Cli, CompletionsArgs};
use clap::CommandFactory;

pub fn execute(args: CompletionsArgs) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
}
