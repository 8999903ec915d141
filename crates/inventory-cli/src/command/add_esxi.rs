use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use models::Registry;
use settings::FilesConfig;
use tracing::{info, warn};

use crate::prelude::{prompt_esxi_entry, InventoryError, Prompter};

/// Record one ESXi host placement in the rack registry
///
/// Process
/// - Loads the registry (an absent or unreadable file starts an empty one)
/// - Prompts for rack id, ESXi IP, rack units and iLO address
/// - Upserts the host under its rack
/// - Writes the whole registry to a new timestamped snapshot
///
/// The source registry file is never modified.
///
/// # Errors
///
/// Returns an error if reading input fails or the snapshot cannot be
/// written.
pub fn add_esxi_entry<Tz>(
    prompter: &mut dyn Prompter,
    files: &FilesConfig,
    now: &DateTime<Tz>,
) -> Result<PathBuf, InventoryError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut registry = load_or_empty(&files.registry);

    let entry = prompt_esxi_entry(prompter)?;
    registry.upsert_esxi(&entry);

    let path = registry.save_snapshot(&files.snapshot_dir, now)?;
    info!(
        "Saved ESXi {} in rack {} ({} racks, {} hosts)",
        entry.esxi_ip,
        entry.rack_id,
        registry.racks.len(),
        registry.esxi_count()
    );
    println!("Data saved to {}", path.display());

    Ok(path)
}

fn load_or_empty(path: &Path) -> Registry {
    match Registry::load(path) {
        Ok(registry) => registry,
        Err(e) if e.is_not_found() => {
            info!("File not found. Starting with an empty list.");
            Registry::default()
        }
        Err(e) => {
            warn!("{e}. Starting with an empty list.");
            Registry::default()
        }
    }
}
