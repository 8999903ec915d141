pub use crate::command::{add_esxi_entry, collect_inventory, run_inventory, CollectSummary};
pub use crate::error::InventoryError;
pub use crate::prompts::{
    prompt_credentials, prompt_esxi_entry, Credentials, InquirePrompter, Prompter,
};
