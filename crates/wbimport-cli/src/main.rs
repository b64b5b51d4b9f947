//! wbimport CLI
//!
//! Imports entities from a source Wikibase (by default Wikidata) into a
//! local store, together with everything their statements depend on, and
//! keeps a persistent remote -> local id mapping so reruns are idempotent.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod api;
mod ids;
mod import;
mod mapping;
mod settings;

use import::{cmd_import, ImportArgs};
use mapping::{cmd_mapping, MappingCommands};
use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "wbimport")]
#[command(author, version, about = "Import Wikibase entities into a local graph")]
struct Cli {
    /// JSON settings file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the mapping log and local entities.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import entities, their dependencies and (by default) their statements.
    Import(ImportArgs),

    /// Inspect the remote -> local id mapping.
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(cli.config.as_deref())?;
    let global = Overrides {
        store_dir: cli.store_dir,
        ..Overrides::default()
    };

    match cli.command {
        Commands::Import(args) => {
            let settings = args.overrides().apply(global.apply(settings));
            cmd_import(args, settings)
        }
        Commands::Mapping { command } => {
            let settings = global.apply(settings);
            cmd_mapping(command, &settings.store_dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
