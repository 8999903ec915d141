use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::VmRecord;

/// A physical rack and the ESXi hosts mounted in it, keyed by host IP.
///
/// Keys that this tool does not know about are kept as-is so that
/// hand-edited registries survive a load/save cycle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct RackRecord {
    #[serde(rename = "Rack ID")]
    pub rack_id: String,

    #[serde(rename = "ESXIs", default)]
    pub esxis: IndexMap<String, EsxiRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct EsxiRecord {
    #[serde(rename = "Rack Unit", default)]
    pub rack_units: Vec<String>,

    #[serde(rename = "ILO", default)]
    pub ilo_address: String,

    /// Only populated by the inventory merge
    #[serde(rename = "VMs", default, skip_serializing_if = "Vec::is_empty")]
    pub vms: Vec<VmRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RackRecord {
    pub fn new(rack_id: impl Into<String>) -> Self {
        Self {
            rack_id: rack_id.into(),
            ..Default::default()
        }
    }
}

/// One ESXi host placement as captured from the operator, already
/// normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EsxiEntry {
    pub rack_id: String,
    pub esxi_ip: String,
    pub rack_units: Vec<String>,
    pub ilo_address: String,
}

impl EsxiEntry {
    /// Normalizes raw operator input: every field is upper-cased and the
    /// rack unit list is split on commas.
    pub fn from_input(rack_id: &str, esxi_ip: &str, rack_units: &str, ilo_address: &str) -> Self {
        Self {
            rack_id: rack_id.trim().to_uppercase(),
            esxi_ip: esxi_ip.trim().to_uppercase(),
            rack_units: normalize_rack_units(rack_units),
            ilo_address: ilo_address.trim().to_uppercase(),
        }
    }

    pub fn to_record(&self) -> EsxiRecord {
        EsxiRecord {
            rack_units: self.rack_units.clone(),
            ilo_address: self.ilo_address.clone(),
            ..Default::default()
        }
    }
}

/// `"u1, u 2"` -> `["U1", "U2"]`. Empty segments are kept.
pub fn normalize_rack_units(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|unit| {
            unit.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_uppercase()
        })
        .collect()
}
