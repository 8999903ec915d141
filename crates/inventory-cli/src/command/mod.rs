mod add_esxi;
mod collect;

pub use add_esxi::add_esxi_entry;
pub use collect::{collect_inventory, run_inventory, CollectSummary};
