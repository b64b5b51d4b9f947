//! `wbimport mapping`: inspect the remote -> local id log.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;
use wbimport_core::MappingStore;
use wbimport_model::EntityId;
use wbimport_storage::{JsonlMappingStore, MAPPINGS_FILE};

#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// Print the local id a remote id was imported as.
    Get {
        remote_id: String,
    },
    /// Print every mapping, ordered by remote id.
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_mapping(command: MappingCommands, store_dir: &Path) -> Result<()> {
    let path = store_dir.join(MAPPINGS_FILE);
    if !path.exists() {
        bail!("no mapping log at {}", path.display());
    }
    let store = JsonlMappingStore::open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    match command {
        MappingCommands::Get { remote_id } => {
            let remote = EntityId::parse(remote_id.trim())
                .with_context(|| format!("invalid id {remote_id:?}"))?;
            match store.local_id(&remote)? {
                Some(local) => println!("{local}"),
                None => bail!("{remote} has not been imported"),
            }
        }
        MappingCommands::List { json } => {
            let records = store.records();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!(
                        "{} {} {}  {}",
                        record.remote,
                        "->".dimmed(),
                        record.local,
                        record.recorded_at.to_rfc3339().dimmed()
                    );
                }
                println!("{} mappings", records.len().to_string().bold());
            }
        }
    }
    Ok(())
}
