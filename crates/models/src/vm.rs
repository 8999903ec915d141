use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Normalized description of one virtual machine as reported by vCenter.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct VmRecord {
    /// Name of the ESXi host running the VM, matched against registry keys
    pub host: String,
    pub name: String,
    pub cpu_cores: i32,
    pub memory_gb: f64,
    #[serde(default)]
    pub harddisk_info: Vec<HardDisk>,
    /// Custom attribute field name -> value
    #[serde(default)]
    pub custom_attributes: IndexMap<String, String>,
    /// Network name -> `address/prefix` strings
    #[serde(default)]
    pub ip_info: IndexMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct HardDisk {
    pub label: String,
    pub capacity_gb: f64,
    pub datastore: String,
}

impl VmRecord {
    pub fn has_custom_attributes(&self) -> bool {
        !self.custom_attributes.is_empty()
    }
}
