use std::io;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aw_cli::commands::{compute, import, report, status};
use aw_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs on stderr, command output on stdout
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Import(args)) => {
            import::run(io::stdin().lock(), &mut stdout, args, &config)?;
        }
        Some(Commands::Compute(args)) => {
            let summary = compute::run(&mut stdout, args, &config)?;
            if summary.failed > 0 {
                bail!("{} participant(s) failed", summary.failed);
            }
        }
        Some(Commands::Report(args)) => {
            report::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Status) => {
            status::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
