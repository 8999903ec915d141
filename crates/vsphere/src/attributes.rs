use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{CustomFieldDef, InventoryService, VsphereError};

/// A raw `summary.customValue` entry: an opaque field key and its value.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CustomFieldValue {
    pub key: i32,
    /// Only string values carry data; other value kinds resolve to `""`
    #[serde(default)]
    pub value: String,
}

/// Field key -> field name lookup for custom attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeCatalog {
    names: HashMap<i32, String>,
}

impl AttributeCatalog {
    /// Keeps the fields that apply to `kind` plus the global ones.
    pub fn from_definitions(defs: impl IntoIterator<Item = CustomFieldDef>, kind: &str) -> Self {
        let names = defs
            .into_iter()
            .filter(|def| {
                def.managed_object_type
                    .as_deref()
                    .map_or(true, |t| t == kind)
            })
            .map(|def| (def.key, def.name))
            .collect();
        Self { names }
    }

    pub async fn fetch<S>(service: &S, kind: &str) -> Result<Self, VsphereError>
    where
        S: InventoryService + ?Sized,
    {
        let defs = service.custom_field_definitions().await?;
        Ok(Self::from_definitions(defs, kind))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The field name for `key`, or the key itself when it is not in the
    /// catalog.
    pub fn name_for(&self, key: i32) -> String {
        self.names
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn resolve(&self, values: &[CustomFieldValue]) -> IndexMap<String, String> {
        values
            .iter()
            .map(|cv| (self.name_for(cv.key), cv.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn def(key: i32, name: &str, kind: Option<&str>) -> CustomFieldDef {
        CustomFieldDef {
            key,
            name: name.to_owned(),
            managed_object_type: kind.map(str::to_owned),
        }
    }

    fn value(key: i32, value: &str) -> CustomFieldValue {
        CustomFieldValue {
            key,
            value: value.to_owned(),
        }
    }

    #[test]
    fn test_resolve_falls_back_to_key() {
        let catalog = AttributeCatalog::from_definitions([def(7, "Owner", None)], "VirtualMachine");
        let resolved = catalog.resolve(&[value(7, "Alice"), value(9, "X")]);

        let expected: IndexMap<String, String> = [
            ("Owner".to_owned(), "Alice".to_owned()),
            ("9".to_owned(), "X".to_owned()),
        ]
        .into_iter()
        .collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_other_object_kinds_are_ignored() {
        let catalog = AttributeCatalog::from_definitions(
            [
                def(1, "Owner", Some("VirtualMachine")),
                def(2, "Rack", Some("HostSystem")),
                def(3, "CostCenter", None),
            ],
            "VirtualMachine",
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name_for(1), "Owner");
        assert_eq!(catalog.name_for(2), "2");
        assert_eq!(catalog.name_for(3), "CostCenter");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let catalog = AttributeCatalog::from_definitions([def(7, "Owner", None)], "VirtualMachine");
        let values = [value(7, "Alice")];
        assert_eq!(catalog.resolve(&values), catalog.resolve(&values));
    }

    #[test]
    fn test_empty_catalog_keeps_raw_keys() {
        let resolved = AttributeCatalog::default().resolve(&[value(42, "v")]);
        assert_eq!(resolved.get("42").map(String::as_str), Some("v"));
    }
}
