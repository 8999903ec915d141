//! # Overview
//!
//! Client side of the VM inventory pass against a vCenter server.
//!
//! - [`connect`] opens a [`Session`] on the VI/JSON endpoint and classifies
//!   any failure as a [`ConnectError`].
//! - [`batch_fetch_properties`] collects properties of every object of one
//!   type with a single property collector query, and
//!   [`fetch_vm_inventory`] uses it to gather everything a pass needs.
//! - [`AttributeCatalog`] resolves custom attribute keys to field names.
//! - [`project_vm`] / [`project_inventory`] turn the raw property bags into
//!   [`models::VmRecord`]s.
//!
//! The fetcher only depends on the [`InventoryService`] trait, which
//! [`Session`] implements for a live server.

mod attributes;
mod error;
mod fetch;
mod project;
mod service;
mod session;

pub use attributes::{AttributeCatalog, CustomFieldValue};
pub use error::{ConnectError, ProjectionError, VsphereError};
pub use fetch::{
    batch_fetch_properties, fetch_vm_inventory, unwrap_any, ObjectProperties, PropertyBag,
    ReferenceNames, VmInventory, DATASTORE, HOST_SYSTEM, VIRTUAL_MACHINE, VM_PROPERTIES,
};
pub use project::{project_inventory, project_vm, VmProperties, UNNAMED_NETWORK};
pub use service::{
    CustomFieldDef, DynamicProperty, InventoryService, ManagedObjectReference, ObjectContent,
    PropertyFilterSpec, RetrieveResult,
};
pub use session::{connect, ConnectOptions, ServiceContent, Session, SESSION_HEADER};
