//! Wire types of the vSphere VI/JSON API and the [`InventoryService`]
//! trait the fetcher is written against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::VsphereError;

const MOREF_TYPE_NAME: &str = "ManagedObjectReference";

/// Reference to a server-side managed object, e.g. `HostSystem:host-10`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ManagedObjectReference {
    #[serde(rename = "_typeName", default = "moref_type_name")]
    type_name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub value: String,
}

fn moref_type_name() -> String {
    MOREF_TYPE_NAME.to_owned()
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: moref_type_name(),
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Collector query: every object of `kind` reachable from a container view,
/// with the requested property paths.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterSpec {
    #[serde(rename = "_typeName")]
    type_name: &'static str,
    pub prop_set: Vec<PropertySpec>,
    pub object_set: Vec<ObjectSpec>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(rename = "_typeName")]
    type_name: &'static str,
    #[serde(rename = "type")]
    pub kind: String,
    pub path_set: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    #[serde(rename = "_typeName")]
    type_name: &'static str,
    pub obj: ManagedObjectReference,
    pub skip: bool,
    pub select_set: Vec<TraversalSpec>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TraversalSpec {
    #[serde(rename = "_typeName")]
    type_name: &'static str,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub skip: bool,
}

impl PropertyFilterSpec {
    /// Spec walking the `view` property of a container view. The view itself
    /// is skipped so only the contained objects are reported.
    pub fn for_container_view(view: &ManagedObjectReference, kind: &str, paths: &[&str]) -> Self {
        Self {
            type_name: "PropertyFilterSpec",
            prop_set: vec![PropertySpec {
                type_name: "PropertySpec",
                kind: kind.to_owned(),
                path_set: paths.iter().map(|p| (*p).to_owned()).collect(),
            }],
            object_set: vec![ObjectSpec {
                type_name: "ObjectSpec",
                obj: view.clone(),
                skip: true,
                select_set: vec![TraversalSpec {
                    type_name: "TraversalSpec",
                    name: "traverseEntities".to_owned(),
                    kind: view.kind.clone(),
                    path: "view".to_owned(),
                    skip: false,
                }],
            }],
        }
    }

    /// The managed object type this spec collects.
    pub fn kind(&self) -> Option<&str> {
        self.prop_set.first().map(|p| p.kind.as_str())
    }

    pub fn paths(&self) -> &[String] {
        self.prop_set
            .first()
            .map(|p| p.path_set.as_slice())
            .unwrap_or_default()
    }
}

/// One page of a `RetrievePropertiesEx` answer. A `token` means more pages
/// are waiting on the server.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RetrieveResult {
    #[serde(default)]
    pub objects: Vec<ObjectContent>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    #[serde(rename = "propSet", default)]
    pub prop_set: Vec<DynamicProperty>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DynamicProperty {
    pub name: String,
    pub val: Value,
}

/// Definition of a custom attribute field.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct CustomFieldDef {
    pub key: i32,
    pub name: String,
    /// `None` for global fields
    #[serde(rename = "managedObjectType", default)]
    pub managed_object_type: Option<String>,
}

/// The remote operations the inventory pass needs. [`crate::Session`] talks
/// to a live vCenter; tests substitute an in-memory implementation.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Creates a recursive view of every `kind` object under the root folder.
    async fn create_container_view(&self, kind: &str)
        -> Result<ManagedObjectReference, VsphereError>;

    async fn retrieve_properties(
        &self,
        spec: &PropertyFilterSpec,
    ) -> Result<Option<RetrieveResult>, VsphereError>;

    async fn continue_retrieve_properties(
        &self,
        token: &str,
    ) -> Result<Option<RetrieveResult>, VsphereError>;

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VsphereError>;

    async fn custom_field_definitions(&self) -> Result<Vec<CustomFieldDef>, VsphereError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_filter_spec_wire_shape() {
        let view = ManagedObjectReference::new("ContainerView", "session[5201]52a9");
        let spec = PropertyFilterSpec::for_container_view(&view, "VirtualMachine", &["name"]);

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "_typeName": "PropertyFilterSpec",
                "propSet": [{
                    "_typeName": "PropertySpec",
                    "type": "VirtualMachine",
                    "pathSet": ["name"]
                }],
                "objectSet": [{
                    "_typeName": "ObjectSpec",
                    "obj": {
                        "_typeName": "ManagedObjectReference",
                        "type": "ContainerView",
                        "value": "session[5201]52a9"
                    },
                    "skip": true,
                    "selectSet": [{
                        "_typeName": "TraversalSpec",
                        "name": "traverseEntities",
                        "type": "ContainerView",
                        "path": "view",
                        "skip": false
                    }]
                }]
            })
        );
        assert_eq!(spec.kind(), Some("VirtualMachine"));
    }

    #[test]
    fn test_moref_without_type_name_parses() {
        let moref: ManagedObjectReference =
            serde_json::from_value(json!({ "type": "HostSystem", "value": "host-10" })).unwrap();
        assert_eq!(moref, ManagedObjectReference::new("HostSystem", "host-10"));
        assert_eq!(moref.to_string(), "HostSystem:host-10");
    }
}
