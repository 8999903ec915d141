use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use vsphere::{
    CustomFieldDef, DynamicProperty, InventoryService, ManagedObjectReference, ObjectContent,
    PropertyFilterSpec, RetrieveResult, VsphereError, DATASTORE, HOST_SYSTEM, VIRTUAL_MACHINE,
};

use crate::VmFixture;

#[derive(Default, Debug)]
struct State {
    next_view: usize,
    open_views: Vec<ManagedObjectReference>,
    destroyed_views: Vec<ManagedObjectReference>,
    pending_pages: HashMap<String, Vec<ObjectContent>>,
    next_token: usize,
    calls: Vec<String>,
}

/// An [`InventoryService`] backed by a fixed set of objects. It answers
/// collector queries like a server would, only returning the requested
/// paths and splitting large answers into token-linked pages, and records
/// every call for inspection.
#[derive(Default, Debug)]
pub struct MemoryInventory {
    objects: Vec<(ManagedObjectReference, Map<String, Value>)>,
    field_defs: Vec<CustomFieldDef>,
    page_size: Option<usize>,
    fail_retrieve: bool,
    fail_destroy: bool,
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, kind: &str, id: &str, props: Map<String, Value>) -> Self {
        self.objects
            .push((ManagedObjectReference::new(kind, id), props));
        self
    }

    pub fn with_vm(self, id: &str, vm: VmFixture) -> Self {
        self.with_object(VIRTUAL_MACHINE, id, vm.into_props())
    }

    pub fn with_host(self, id: &str, name: &str) -> Self {
        self.with_object(HOST_SYSTEM, id, name_props(name))
    }

    pub fn with_datastore(self, id: &str, name: &str) -> Self {
        self.with_object(DATASTORE, id, name_props(name))
    }

    /// Registers a custom attribute field; `kind` of `None` makes it global.
    pub fn with_field(mut self, key: i32, name: &str, kind: Option<&str>) -> Self {
        self.field_defs.push(CustomFieldDef {
            key,
            name: name.to_owned(),
            managed_object_type: kind.map(str::to_owned),
        });
        self
    }

    /// Answers collector queries in pages of at most `size` objects.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Makes every property retrieval fail with a server fault.
    pub fn failing_retrieval(mut self) -> Self {
        self.fail_retrieve = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Views created and not destroyed yet.
    pub fn open_views(&self) -> Vec<ManagedObjectReference> {
        self.state.lock().open_views.clone()
    }

    pub fn destroyed_views(&self) -> Vec<ManagedObjectReference> {
        self.state.lock().destroyed_views.clone()
    }

    /// Names of the remote methods invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, method: &str) {
        self.state.lock().calls.push(method.to_owned());
    }

    fn page(&self, mut objects: Vec<ObjectContent>) -> Option<RetrieveResult> {
        if objects.is_empty() {
            return None;
        }

        let rest = match self.page_size {
            Some(size) if objects.len() > size => objects.split_off(size),
            _ => Vec::new(),
        };

        let token = if rest.is_empty() {
            None
        } else {
            let mut state = self.state.lock();
            state.next_token += 1;
            let token = format!("token-{}", state.next_token);
            state.pending_pages.insert(token.clone(), rest);
            Some(token)
        };

        Some(RetrieveResult { objects, token })
    }
}

fn name_props(name: &str) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("name".into(), Value::String(name.to_owned()));
    props
}

fn fault(method: &str, fault: &str, message: impl Into<String>) -> VsphereError {
    VsphereError::Fault {
        method: method.to_owned(),
        fault: fault.to_owned(),
        message: message.into(),
    }
}

#[async_trait]
impl InventoryService for MemoryInventory {
    async fn create_container_view(
        &self,
        kind: &str,
    ) -> Result<ManagedObjectReference, VsphereError> {
        let mut state = self.state.lock();
        state.calls.push(format!("CreateContainerView({kind})"));
        state.next_view += 1;
        let view = ManagedObjectReference::new("ContainerView", format!("session[test]{}", state.next_view));
        state.open_views.push(view.clone());
        Ok(view)
    }

    async fn retrieve_properties(
        &self,
        spec: &PropertyFilterSpec,
    ) -> Result<Option<RetrieveResult>, VsphereError> {
        self.record("RetrievePropertiesEx");
        if self.fail_retrieve {
            return Err(fault("RetrievePropertiesEx", "SystemError", "collector unavailable"));
        }

        let kind = spec.kind().unwrap_or_default();
        let paths = spec.paths();
        let objects = self
            .objects
            .iter()
            .filter(|(obj, _)| obj.kind == kind)
            .map(|(obj, props)| ObjectContent {
                obj: obj.clone(),
                prop_set: props
                    .iter()
                    .filter(|(name, _)| paths.iter().any(|p| p == *name))
                    .map(|(name, val)| DynamicProperty {
                        name: name.clone(),
                        val: val.clone(),
                    })
                    .collect(),
            })
            .collect();

        Ok(self.page(objects))
    }

    async fn continue_retrieve_properties(
        &self,
        token: &str,
    ) -> Result<Option<RetrieveResult>, VsphereError> {
        self.record("ContinueRetrievePropertiesEx");
        let pending = self.state.lock().pending_pages.remove(token);
        match pending {
            Some(objects) => Ok(self.page(objects)),
            None => Err(fault(
                "ContinueRetrievePropertiesEx",
                "InvalidArgument",
                format!("unknown token {token}"),
            )),
        }
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VsphereError> {
        let mut state = self.state.lock();
        state.calls.push("DestroyView".to_owned());
        if self.fail_destroy {
            return Err(fault("DestroyView", "SystemError", "view is busy"));
        }

        let idx = state
            .open_views
            .iter()
            .position(|open| open == view)
            .ok_or_else(|| fault("DestroyView", "ManagedObjectNotFound", view.to_string()))?;
        let view = state.open_views.remove(idx);
        state.destroyed_views.push(view);
        Ok(())
    }

    async fn custom_field_definitions(&self) -> Result<Vec<CustomFieldDef>, VsphereError> {
        self.record("CustomFieldsManager.field");
        Ok(self.field_defs.clone())
    }
}
