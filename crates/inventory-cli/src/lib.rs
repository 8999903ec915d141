mod command;
mod error;
pub mod prelude;
mod prompts;

use crate::prelude::{add_esxi_entry, collect_inventory, InquirePrompter, InventoryError};

use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use settings::Settings;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum InventoryCommand {
    /// Add or update an ESXi host in the rack registry and save a new
    /// timestamped snapshot
    AddEsxi,
    /// Fetch the VM inventory from vCenter and merge it into the rack registry
    Inventory,
}

/// Runs `command` with prompts on the terminal.
pub async fn run(command: InventoryCommand, settings: &Settings) -> Result<(), InventoryError> {
    let mut prompter = InquirePrompter;
    match command {
        InventoryCommand::AddEsxi => {
            add_esxi_entry(&mut prompter, &settings.files, &Local::now())?;
        }
        InventoryCommand::Inventory => {
            collect_inventory(&mut prompter, settings).await?;
        }
    }
    Ok(())
}

pub fn match_and_print(result: Result<(), InventoryError>) {
    match result {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            eprintln!(
                "{}{}",
                "Error encountered: ".red().bold(),
                e.to_string().red()
            );
            std::process::exit(1);
        }
    }
}
