use std::{collections::HashMap, time::Instant};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    AttributeCatalog, InventoryService, ManagedObjectReference, ObjectContent,
    PropertyFilterSpec, VsphereError,
};

pub const VIRTUAL_MACHINE: &str = "VirtualMachine";
pub const HOST_SYSTEM: &str = "HostSystem";
pub const DATASTORE: &str = "Datastore";

/// Property paths collected for every virtual machine.
pub const VM_PROPERTIES: &[&str] = &[
    "name",
    "config.hardware.numCPU",
    "config.hardware.memoryMB",
    "guest.net",
    "guest.ipAddress",
    "config.hardware.device",
    "summary.customValue",
    "runtime.host",
];

/// Property path -> value for one managed object.
pub type PropertyBag = IndexMap<String, Value>;

/// Managed object id -> its properties, in server order.
pub type ObjectProperties = IndexMap<String, PropertyBag>;

/// Strips the `{"_typeName": ..., "_value": ...}` envelope the VI/JSON
/// encoding puts around values of `any`-typed properties.
pub fn unwrap_any(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_value") => {
            map.remove("_value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn collect_objects(into: &mut ObjectProperties, objects: Vec<ObjectContent>) {
    for object in objects {
        let bag = object
            .prop_set
            .into_iter()
            .map(|prop| (prop.name, unwrap_any(prop.val)))
            .collect();
        into.insert(object.obj.value, bag);
    }
}

/// Fetches `paths` for every object of `kind` in one collector query over a
/// recursive container view of the inventory root. The view is destroyed
/// afterwards whether or not the query succeeded.
pub async fn batch_fetch_properties<S>(
    service: &S,
    kind: &str,
    paths: &[&str],
) -> Result<ObjectProperties, VsphereError>
where
    S: InventoryService + ?Sized,
{
    let view = service.create_container_view(kind).await?;
    let spec = PropertyFilterSpec::for_container_view(&view, kind, paths);

    let result = retrieve_all(service, &spec).await;

    if let Err(e) = service.destroy_view(&view).await {
        warn!("Failed to destroy container view {view}: {e}");
    }

    result
}

async fn retrieve_all<S>(
    service: &S,
    spec: &PropertyFilterSpec,
) -> Result<ObjectProperties, VsphereError>
where
    S: InventoryService + ?Sized,
{
    let mut objects = ObjectProperties::new();
    let mut page = service.retrieve_properties(spec).await?;

    while let Some(result) = page {
        collect_objects(&mut objects, result.objects);
        page = match result.token {
            Some(token) => {
                debug!("continuing property retrieval, {} objects so far", objects.len());
                service.continue_retrieve_properties(&token).await?
            }
            None => None,
        };
    }

    Ok(objects)
}

/// Display names of the hosts and datastores VMs refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceNames {
    hosts: HashMap<String, String>,
    datastores: HashMap<String, String>,
}

impl ReferenceNames {
    pub fn new(hosts: HashMap<String, String>, datastores: HashMap<String, String>) -> Self {
        Self { hosts, datastores }
    }

    pub async fn fetch<S>(service: &S) -> Result<Self, VsphereError>
    where
        S: InventoryService + ?Sized,
    {
        let hosts = names_of(batch_fetch_properties(service, HOST_SYSTEM, &["name"]).await?);
        let datastores = names_of(batch_fetch_properties(service, DATASTORE, &["name"]).await?);
        Ok(Self { hosts, datastores })
    }

    /// Name of the referenced host or datastore; unknown references fall
    /// back to the object id.
    pub fn name_of(&self, moref: &ManagedObjectReference) -> String {
        let table = match moref.kind.as_str() {
            HOST_SYSTEM => &self.hosts,
            DATASTORE => &self.datastores,
            _ => {
                warn!("Unexpected reference {moref}, using its id as name");
                return moref.value.clone();
            }
        };

        match table.get(&moref.value) {
            Some(name) => name.clone(),
            None => {
                warn!("Could not resolve name of {moref}, using its id");
                moref.value.clone()
            }
        }
    }
}

fn names_of(objects: ObjectProperties) -> HashMap<String, String> {
    objects
        .into_iter()
        .filter_map(|(id, mut bag)| match bag.swap_remove("name") {
            Some(Value::String(name)) => Some((id, name)),
            _ => None,
        })
        .collect()
}

/// Everything fetched from vCenter for one inventory pass.
#[derive(Debug, Clone, Default)]
pub struct VmInventory {
    pub vms: ObjectProperties,
    pub references: ReferenceNames,
    pub catalog: AttributeCatalog,
}

/// Collects VM properties, the names of the hosts and datastores they
/// reference and, if `fetch_custom_attributes` is set, the custom attribute
/// catalog.
pub async fn fetch_vm_inventory<S>(
    service: &S,
    fetch_custom_attributes: bool,
) -> Result<VmInventory, VsphereError>
where
    S: InventoryService + ?Sized,
{
    info!("Fetching VM inventory");
    let start = Instant::now();

    let vms = batch_fetch_properties(service, VIRTUAL_MACHINE, VM_PROPERTIES).await?;
    let references = ReferenceNames::fetch(service).await?;
    let catalog = if fetch_custom_attributes {
        AttributeCatalog::fetch(service, VIRTUAL_MACHINE).await?
    } else {
        AttributeCatalog::default()
    };

    info!(
        "Fetched VM inventory in {:?} ({} VMs, {} custom attribute fields)",
        start.elapsed(),
        vms.len(),
        catalog.len()
    );

    Ok(VmInventory {
        vms,
        references,
        catalog,
    })
}
