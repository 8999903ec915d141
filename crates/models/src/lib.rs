//! Data model shared by the rack registry editor and the inventory
//! orchestrator.
//!
//! A [`Registry`] is the manually maintained list of [`RackRecord`]s, each
//! holding the ESXi hosts mounted in it. [`VmRecord`]s come from vCenter and
//! are attached to those hosts by [`merge_vms`].

mod error;
mod json;
mod merge;
mod rack;
mod registry;
mod vm;

pub use error::ModelError;
pub use json::{to_pretty_json, write_encoded, write_pretty_json};
pub use merge::{attach_vm, merge_vms, vms_with_empty_custom_attributes, MergeOutcome, UnmatchedVm};
pub use rack::{normalize_rack_units, EsxiEntry, EsxiRecord, RackRecord};
pub use registry::{snapshot_file_name, Registry};
pub use vm::{HardDisk, VmRecord};
