//! Shared test support: an in-memory [`vsphere::InventoryService`], VM
//! property fixtures shaped like real VI/JSON answers, and proptest
//! strategies for registry input.

mod memory;

pub use memory::MemoryInventory;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// A managed object reference as it appears on the wire.
pub fn moref(kind: &str, value: &str) -> Value {
    json!({ "_typeName": "ManagedObjectReference", "type": kind, "value": value })
}

/// Wraps `items` in the envelope the server uses for `any`-typed arrays.
pub fn any_array(type_name: &str, items: Vec<Value>) -> Value {
    json!({ "_typeName": type_name, "_value": items })
}

/// Builder for the property bag of one virtual machine, keyed by the same
/// property paths the fetcher asks for.
#[derive(Clone, Debug)]
pub struct VmFixture {
    props: Map<String, Value>,
    devices: Vec<Value>,
    nics: Vec<Value>,
    custom_values: Vec<Value>,
}

impl VmFixture {
    /// A 2 vCPU / 4 GB VM running on `host_id` with no disks, NICs or
    /// custom attributes.
    pub fn new(name: &str, host_id: &str) -> Self {
        let mut props = Map::new();
        props.insert("name".into(), json!(name));
        props.insert("config.hardware.numCPU".into(), json!(2));
        props.insert("config.hardware.memoryMB".into(), json!(4096));
        props.insert("runtime.host".into(), moref("HostSystem", host_id));
        Self {
            props,
            devices: Vec::new(),
            nics: Vec::new(),
            custom_values: Vec::new(),
        }
    }

    pub fn cpu(mut self, cores: i32) -> Self {
        self.props.insert("config.hardware.numCPU".into(), json!(cores));
        self
    }

    pub fn memory_mb(mut self, mb: i64) -> Self {
        self.props.insert("config.hardware.memoryMB".into(), json!(mb));
        self
    }

    pub fn guest_ip(mut self, ip: &str) -> Self {
        self.props.insert("guest.ipAddress".into(), json!(ip));
        self
    }

    pub fn disk(mut self, label: &str, capacity_kb: i64, datastore_id: &str) -> Self {
        self.devices.push(json!({
            "_typeName": "VirtualDisk",
            "key": 2000 + self.devices.len(),
            "deviceInfo": { "_typeName": "Description", "label": label, "summary": "" },
            "capacityInKB": capacity_kb,
            "backing": {
                "_typeName": "VirtualDiskFlatVer2BackingInfo",
                "fileName": format!("[{datastore_id}] {label}.vmdk"),
                "datastore": moref("Datastore", datastore_id),
            },
        }));
        self
    }

    /// Adds a device that is not a disk, such as a NIC or a CD-ROM drive.
    pub fn device(mut self, type_name: &str, label: &str) -> Self {
        self.devices.push(json!({
            "_typeName": type_name,
            "key": 4000 + self.devices.len(),
            "deviceInfo": { "_typeName": "Description", "label": label, "summary": "" },
        }));
        self
    }

    /// Adds a guest NIC. `addresses` are `(ip, prefix)` pairs; an empty
    /// slice yields a NIC without IP configuration.
    pub fn nic(mut self, network: Option<&str>, addresses: &[(&str, i32)]) -> Self {
        let mut nic = Map::new();
        nic.insert("_typeName".into(), json!("GuestNicInfo"));
        nic.insert("connected".into(), json!(true));
        if let Some(network) = network {
            nic.insert("network".into(), json!(network));
        }
        if !addresses.is_empty() {
            let ips: Vec<Value> = addresses
                .iter()
                .map(|(ip, prefix)| {
                    json!({ "_typeName": "NetIpConfigInfoIpAddress", "ipAddress": ip, "prefixLength": prefix })
                })
                .collect();
            nic.insert(
                "ipConfig".into(),
                json!({ "_typeName": "NetIpConfigInfo", "ipAddress": ips }),
            );
        }
        self.nics.push(Value::Object(nic));
        self
    }

    pub fn custom_value(mut self, key: i32, value: &str) -> Self {
        self.custom_values.push(
            json!({ "_typeName": "CustomFieldStringValue", "key": key, "value": value }),
        );
        self
    }

    /// Drops a property path, as the server does for unset properties.
    pub fn without(mut self, path: &str) -> Self {
        self.props.remove(path);
        self
    }

    pub fn into_props(self) -> Map<String, Value> {
        let mut props = self.props;
        props
            .entry("config.hardware.device")
            .or_insert_with(|| any_array("ArrayOfVirtualDevice", self.devices));
        props
            .entry("guest.net")
            .or_insert_with(|| any_array("ArrayOfGuestNicInfo", self.nics));
        props
            .entry("summary.customValue")
            .or_insert_with(|| any_array("ArrayOfCustomFieldValue", self.custom_values));
        props
    }
}

/// Generates the four raw answers of an ESXi entry prompt: rack id, ESXi
/// IP, comma-separated rack units (with stray spaces) and iLO address.
pub fn esxi_input_strategy() -> impl Strategy<Value = (String, String, String, String)> {
    let ipv4 = (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"));
    let units = proptest::collection::vec((1u8..=48, " ?", " ?"), 1..4).prop_map(|units| {
        units
            .into_iter()
            .map(|(u, pre, post)| format!("{pre}u{u}{post}"))
            .collect::<Vec<_>>()
            .join(",")
    });
    ("[A-Za-z][A-Za-z0-9-]{0,8}", ipv4.clone(), units, ipv4)
}
