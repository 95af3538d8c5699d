mod artifacts;
mod cli;
mod config;
mod fogbugz;
mod generate;
mod issues;
mod page;
mod release;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Generate(args) => generate::run(&args)?,
        Commands::Config(cmd) => cmd.run()?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "nightly-status", &mut std::io::stdout());
        }
    }

    Ok(())
}
