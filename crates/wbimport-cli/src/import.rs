//! `wbimport import`

use crate::api::{request_batch_size, WikibaseApiFetcher};
use crate::ids::{expand_range, read_id_file};
use crate::settings::{Overrides, Settings};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use wbimport_core::{
    CancellationToken, EntityFetcher, EntityImporter, ImportReport, ImportServices, MemoryMappings,
};
use wbimport_storage::{open_local_stores, MemoryEntityStore, StaticFetcher};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Remote ids to import (e.g. Q42 P31).
    pub ids: Vec<String>,

    /// Read ids from a file, one per line (`#` comments allowed).
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Import an id range, bounds included (repeatable), e.g. `Q1:Q20`.
    #[arg(long)]
    pub range: Vec<String>,

    /// Only create entities and back-references; leave statements out.
    #[arg(long)]
    pub no_statements: bool,

    /// Source Wikibase `api.php` endpoint.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Read remote entities from a directory of Wikibase JSON files instead
    /// of the API.
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Entity URI prefix of the local graph, used for rewritten units.
    #[arg(long)]
    pub concept_base_uri: Option<String>,

    /// Also remap entity-valued data and snak properties to local ids.
    #[arg(long)]
    pub rewrite_entity_values: bool,

    /// Import into memory only; nothing is written to the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            store_dir: None,
            batch_size: self.batch_size,
            concept_base_uri: self.concept_base_uri.clone(),
            rewrite_entity_values: self.rewrite_entity_values,
        }
    }

    fn requested_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.ids.clone();
        if let Some(file) = &self.file {
            ids.extend(read_id_file(file)?);
        }
        for range in &self.range {
            ids.extend(expand_range(range)?);
        }
        if ids.is_empty() {
            bail!("nothing to import: pass ids, --file or --range");
        }
        Ok(ids)
    }
}

pub fn cmd_import(args: ImportArgs, mut settings: Settings) -> Result<ExitCode> {
    let ids = args.requested_ids()?;

    let fetcher: Arc<dyn EntityFetcher> = match &args.source_dir {
        Some(dir) => Arc::new(
            StaticFetcher::from_dir(dir)
                .with_context(|| format!("failed to load source entities from {}", dir.display()))?,
        ),
        None => {
            let batch_size = request_batch_size(settings.import.batch_size);
            if batch_size != settings.import.batch_size {
                warn!(
                    requested = settings.import.batch_size,
                    batch_size, "batch size clamped to the API request limit"
                );
                settings.import = settings.import.with_batch_size(batch_size);
            }
            Arc::new(WikibaseApiFetcher::new(&settings)?)
        }
    };

    let services = if args.dry_run {
        info!("dry run, nothing will be persisted");
        ImportServices::with_local_store(
            fetcher,
            Arc::new(MemoryMappings::new()),
            Arc::new(MemoryEntityStore::new()),
        )
    } else {
        let stores = open_local_stores(&settings.store_dir)
            .with_context(|| format!("failed to open store {}", settings.store_dir.display()))?;
        ImportServices::with_local_store(fetcher, stores.mappings, stores.entities)
    };

    let importer = EntityImporter::new(services, settings.import.clone())?;
    install_interrupt_handler(&importer.cancellation_token())?;

    let report = importer.import_entities(&ids, !args.no_statements);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(ExitCode::from(exit_status(&report)))
}

/// First Ctrl-C requests cancellation; a second one exits immediately.
fn install_interrupt_handler(token: &CancellationToken) -> Result<()> {
    use signal_hook::consts::SIGINT;

    let flag = token.flag();
    signal_hook::flag::register_conditional_shutdown(SIGINT, 130, flag.clone())
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(SIGINT, flag).context("failed to register SIGINT handler")?;
    Ok(())
}

/// 130 when interrupted, 2 when some ids could not be imported.
fn exit_status(report: &ImportReport) -> u8 {
    if report.cancelled {
        130
    } else if !report.failed.is_empty() || report.fetch_failures > 0 {
        2
    } else {
        0
    }
}

fn print_summary(report: &ImportReport) {
    let heading = if report.cancelled {
        "Import cancelled".yellow().bold()
    } else {
        "Import finished".green().bold()
    };
    println!("{heading}");

    println!("  {:<26} {}", "batches fetched", report.batches);
    println!("  {:<26} {}", "created", report.created.len().to_string().green());
    println!("  {:<26} {}", "already mapped", report.already_mapped);
    println!("  {:<26} {}", "statements reconciled", report.reconciled);
    println!("  {:<26} {}", "statements attached", report.statements_attached);
    println!("  {:<26} {}", "skipped (had statements)", report.skipped_with_statements);
    if report.redirects_mapped > 0 {
        println!("  {:<26} {}", "redirects mapped", report.redirects_mapped);
    }

    let warn_count = |label: &str, n: usize| {
        if n > 0 {
            println!("  {:<26} {}", label, n.to_string().yellow());
        }
    };
    warn_count("unresolved values", report.unresolved_values);
    warn_count("unreconciled", report.unreconciled);
    warn_count("cycle skips", report.cycle_skips);
    warn_count("failed fetches", report.fetch_failures);

    if !report.invalid_ids.is_empty() {
        println!(
            "  {:<26} {}",
            "invalid ids",
            report.invalid_ids.join(", ").red()
        );
    }
    if !report.failed.is_empty() {
        println!("  {:<26} {}", "failed", report.failed.join(", ").red());
    }

    for created in &report.created {
        println!("  {} {} {}", created.remote, "->".dimmed(), created.local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ids: &[&str]) -> ImportArgs {
        ImportArgs {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            file: None,
            range: Vec::new(),
            no_statements: false,
            api_url: None,
            source_dir: None,
            batch_size: None,
            concept_base_uri: None,
            rewrite_entity_values: false,
            dry_run: true,
            json: false,
        }
    }

    #[test]
    fn ids_come_from_arguments_files_and_ranges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"Q5\n# skip\nP31\n").unwrap();

        let mut import = args(&["Q42"]);
        import.file = Some(file.path().to_path_buf());
        import.range = vec!["Q1:Q2".to_string()];

        assert_eq!(import.requested_ids().unwrap(), vec!["Q42", "Q5", "P31", "Q1", "Q2"]);
    }

    #[test]
    fn empty_request_is_an_error() {
        assert!(args(&[]).requested_ids().is_err());
    }

    #[test]
    fn exit_status_reflects_failures() {
        let mut report = ImportReport::default();
        assert_eq!(exit_status(&report), 0);
        report.failed.push("Q1".to_string());
        assert_eq!(exit_status(&report), 2);
        report.cancelled = true;
        assert_eq!(exit_status(&report), 130);
    }
}
