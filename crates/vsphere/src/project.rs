//! Projection of raw VM property bags onto [`VmRecord`].
//!
//! The bag is untyped on the wire; [`VmProperties::from_bag`] checks it
//! against the schema below and reports absent or mistyped properties as
//! [`ProjectionError`]s instead of failing somewhere in the middle of the
//! transform.

use indexmap::IndexMap;
use models::{HardDisk, VmRecord};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    AttributeCatalog, CustomFieldValue, ManagedObjectReference, ProjectionError, PropertyBag,
    ReferenceNames, VmInventory,
};

const VIRTUAL_DISK: &str = "VirtualDisk";
const KB_PER_GB: f64 = 1024.0 * 1024.0;
const MB_PER_GB: f64 = 1024.0;

/// Key used for guest NICs that report no network name.
pub const UNNAMED_NETWORK: &str = "null";

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct VirtualDevice {
    #[serde(rename = "_typeName", default)]
    pub type_name: String,
    #[serde(rename = "deviceInfo", default)]
    pub device_info: Option<DeviceDescription>,
    #[serde(rename = "capacityInKB", default)]
    pub capacity_in_kb: Option<i64>,
    #[serde(rename = "capacityInBytes", default)]
    pub capacity_in_bytes: Option<i64>,
    #[serde(default)]
    pub backing: Option<DeviceBacking>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DeviceDescription {
    pub label: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DeviceBacking {
    #[serde(default)]
    pub datastore: Option<ManagedObjectReference>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct GuestNicInfo {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(rename = "ipConfig", default)]
    pub ip_config: Option<IpConfig>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct IpConfig {
    #[serde(rename = "ipAddress", default)]
    pub ip_address: Vec<IpAddress>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct IpAddress {
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(rename = "prefixLength")]
    pub prefix_length: i32,
}

/// The validated subset of a VM property bag.
#[derive(Clone, Debug, PartialEq)]
pub struct VmProperties {
    pub id: String,
    pub name: String,
    pub num_cpu: i32,
    pub memory_mb: i64,
    pub host: ManagedObjectReference,
    pub devices: Vec<VirtualDevice>,
    pub nics: Vec<GuestNicInfo>,
    pub guest_ip: Option<String>,
    pub custom_values: Vec<CustomFieldValue>,
}

impl VmProperties {
    pub fn from_bag(id: &str, bag: &PropertyBag) -> Result<Self, ProjectionError> {
        Ok(Self {
            id: id.to_owned(),
            name: required(id, bag, "name")?,
            num_cpu: required(id, bag, "config.hardware.numCPU")?,
            memory_mb: required(id, bag, "config.hardware.memoryMB")?,
            host: required(id, bag, "runtime.host")?,
            devices: optional(id, bag, "config.hardware.device")?.unwrap_or_default(),
            nics: optional(id, bag, "guest.net")?.unwrap_or_default(),
            guest_ip: optional(id, bag, "guest.ipAddress")?,
            custom_values: optional(id, bag, "summary.customValue")?.unwrap_or_default(),
        })
    }

    fn harddisk_info(&self, references: &ReferenceNames) -> Result<Vec<HardDisk>, ProjectionError> {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, device)| device.type_name == VIRTUAL_DISK)
            .map(|(idx, disk)| {
                let path = |field: &str| format!("config.hardware.device[{idx}].{field}");
                let missing = |field: &str| ProjectionError::MissingProperty {
                    object: self.id.clone(),
                    path: path(field),
                };

                let label = disk
                    .device_info
                    .as_ref()
                    .map(|info| info.label.clone())
                    .ok_or_else(|| missing("deviceInfo.label"))?;

                let capacity_kb = match (disk.capacity_in_kb, disk.capacity_in_bytes) {
                    (Some(kb), _) => kb as f64,
                    (None, Some(bytes)) => bytes as f64 / 1024.0,
                    (None, None) => return Err(missing("capacityInKB")),
                };

                let datastore = disk
                    .backing
                    .as_ref()
                    .and_then(|backing| backing.datastore.as_ref())
                    .map(|moref| references.name_of(moref))
                    .ok_or_else(|| missing("backing.datastore"))?;

                Ok(HardDisk {
                    label,
                    capacity_gb: round2(capacity_kb / KB_PER_GB),
                    datastore,
                })
            })
            .collect()
    }

    /// Network name -> `address/prefix` for every NIC reporting addresses.
    /// A later NIC on the same network replaces an earlier one.
    fn ip_info(&self) -> IndexMap<String, Vec<String>> {
        self.nics
            .iter()
            .filter_map(|nic| {
                let config = nic.ip_config.as_ref().filter(|c| !c.ip_address.is_empty())?;
                let network = nic
                    .network
                    .clone()
                    .unwrap_or_else(|| UNNAMED_NETWORK.to_owned());
                let addresses = config
                    .ip_address
                    .iter()
                    .map(|ip| format!("{}/{}", ip.ip_address, ip.prefix_length))
                    .collect();
                Some((network, addresses))
            })
            .collect()
    }
}

fn required<T: DeserializeOwned>(
    id: &str,
    bag: &PropertyBag,
    path: &str,
) -> Result<T, ProjectionError> {
    optional(id, bag, path)?.ok_or_else(|| ProjectionError::MissingProperty {
        object: id.to_owned(),
        path: path.to_owned(),
    })
}

fn optional<T: DeserializeOwned>(
    id: &str,
    bag: &PropertyBag,
    path: &str,
) -> Result<Option<T>, ProjectionError> {
    match bag.get(path) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| ProjectionError::InvalidProperty {
                object: id.to_owned(),
                path: path.to_owned(),
                source,
            }),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Maps one VM property bag onto a [`VmRecord`], resolving custom attribute
/// keys through `catalog` and host/datastore references through
/// `references`.
pub fn project_vm(
    id: &str,
    bag: &PropertyBag,
    catalog: &AttributeCatalog,
    references: &ReferenceNames,
) -> Result<VmRecord, ProjectionError> {
    let props = VmProperties::from_bag(id, bag)?;

    Ok(VmRecord {
        host: references.name_of(&props.host),
        name: props.name.clone(),
        cpu_cores: props.num_cpu,
        memory_gb: props.memory_mb as f64 / MB_PER_GB,
        harddisk_info: props.harddisk_info(references)?,
        custom_attributes: catalog.resolve(&props.custom_values),
        ip_info: props.ip_info(),
    })
}

/// Projects every VM of the inventory. The first malformed VM aborts the
/// whole pass.
pub fn project_inventory(inventory: &VmInventory) -> Result<Vec<VmRecord>, ProjectionError> {
    inventory
        .vms
        .iter()
        .map(|(id, bag)| project_vm(id, bag, &inventory.catalog, &inventory.references))
        .collect()
}
