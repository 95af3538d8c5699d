use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ConfigCommands;
use crate::generate::GenerateArgs;

#[derive(Parser)]
#[command(
    name = "nightly-status",
    version,
    about,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate the snapshot status page
    Generate(GenerateArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}
