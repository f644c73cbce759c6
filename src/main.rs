//! Main entry point for the crossbuild assessor CLI.

use clap::{command, Args, Parser, Subcommand};
use crossbuild_assessor::{common, db, prioritize};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Liftover quality assessment and clinical prioritization of hg19/hg38 VEP discordances"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Database-related commands.
    Db(Db),
    /// Score and rank discordant variants.
    Prioritize(prioritize::Args),
}

/// Parsing of "db *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Db {
    /// The sub command to run
    #[command(subcommand)]
    command: DbCommands,
}

/// Enum supporting the parsing of "db *" sub commands.
#[derive(Debug, Subcommand)]
enum DbCommands {
    Create(db::create::Args),
    Check(db::check::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        tracing::info!("Crossbuild assessor startup -- comparing builds ...");

        match &cli.command {
            Commands::Db(db) => match &db.command {
                DbCommands::Create(args) => db::create::run(&cli.common, args)?,
                DbCommands::Check(args) => db::check::run(&cli.common, args)?,
            },
            Commands::Prioritize(args) => prioritize::run(&cli.common, args)?,
        }

        tracing::info!("All done. Have a nice day!");

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
