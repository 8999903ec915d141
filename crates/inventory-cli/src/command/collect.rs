use std::{path::Path, time::Duration};

use models::{
    merge_vms, to_pretty_json, vms_with_empty_custom_attributes, write_encoded, MergeOutcome,
    ModelError, Registry,
};
use settings::{FilesConfig, Settings};
use tracing::{error, info};
use vsphere::{
    connect, fetch_vm_inventory, project_inventory, ConnectOptions, InventoryService,
};

use crate::prelude::{prompt_credentials, InventoryError, Prompter};

/// What one inventory pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    pub vms: usize,
    pub merge: MergeOutcome,
    pub empty_attributes: usize,
}

/// Pull the VM inventory from vCenter and merge it into the rack registry
///
/// Process
/// - Prompts for the vCenter login (host and username may come from config)
/// - Opens a session; any connection failure aborts the run
/// - Runs [`run_inventory`] against the session
/// - Logs out
pub async fn collect_inventory(
    prompter: &mut dyn Prompter,
    settings: &Settings,
) -> Result<CollectSummary, InventoryError> {
    let creds = prompt_credentials(prompter, &settings.vcenter)?;
    let options = ConnectOptions {
        host: creds.host,
        username: creds.username,
        password: creds.password,
        ignore_ssl: settings.vcenter.ignore_ssl,
        api_release: settings.vcenter.api_release.clone(),
        timeout: Duration::from_secs(settings.vcenter.timeout_secs),
    };

    let session = match connect(&options).await {
        Ok(session) => session,
        Err(e) => {
            error!("{e}");
            error!("Unable to connect to VMware vCenter.");
            return Err(InventoryError::NotConnected(e));
        }
    };

    let result = run_inventory(
        &session,
        &settings.files,
        settings.inventory.fetch_custom_attributes,
    )
    .await;
    session.logout().await;

    result
}

/// Fetches, projects and merges the inventory, then writes the merged
/// registry and the report of VMs without custom attributes. Nothing is
/// written unless every VM projects cleanly.
pub async fn run_inventory<S>(
    service: &S,
    files: &FilesConfig,
    fetch_custom_attributes: bool,
) -> Result<CollectSummary, InventoryError>
where
    S: InventoryService + ?Sized,
{
    let inventory = fetch_vm_inventory(service, fetch_custom_attributes).await?;
    let vms = project_inventory(&inventory)?;

    let mut registry = load_rack_data(&files.registry);
    let merge = merge_vms(&mut registry, &vms);
    let empty = vms_with_empty_custom_attributes(&vms);

    // both outputs are encoded before either file is touched
    let merged_json = to_pretty_json(&registry).map_err(ModelError::from)?;
    let report_json = to_pretty_json(&empty).map_err(ModelError::from)?;
    write_encoded(&files.merged_output, &merged_json)?;
    write_encoded(&files.empty_attributes_report, &report_json)?;

    info!(
        "Merged {} of {} VMs, {} without custom attributes",
        merge.attached,
        vms.len(),
        empty.len()
    );
    info!("VMware inventory processing completed.");

    Ok(CollectSummary {
        vms: vms.len(),
        empty_attributes: empty.len(),
        merge,
    })
}

fn load_rack_data(path: &Path) -> Registry {
    match Registry::load(path) {
        Ok(registry) => registry,
        Err(e) if e.is_not_found() => {
            error!("File not found: {}", path.display());
            Registry::default()
        }
        Err(e) if e.is_malformed() => {
            error!("Error decoding JSON from file: {}", path.display());
            Registry::default()
        }
        Err(e) => {
            error!("{e}");
            Registry::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::ScriptedPrompter;
    use models::{write_pretty_json, EsxiEntry, UnmatchedVm};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::fs;
    use testing_utils::{MemoryInventory, VmFixture};
    use vsphere::ConnectError;

    fn files_in(dir: &Path) -> FilesConfig {
        FilesConfig {
            registry: dir.join("datacenter.json"),
            snapshot_dir: dir.to_path_buf(),
            merged_output: dir.join("final_data.json"),
            empty_attributes_report: dir.join("vms_with_empty_custom_attributes.json"),
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn registry_with(hosts: &[(&str, &str)]) -> Registry {
        let mut registry = Registry::default();
        for (rack, ip) in hosts {
            registry.upsert_esxi(&EsxiEntry::from_input(rack, ip, "u1", "ilo"));
        }
        registry
    }

    fn lab() -> MemoryInventory {
        MemoryInventory::new()
            .with_host("host-1", "10.0.0.1")
            .with_host("host-2", "10.0.0.2")
            .with_datastore("datastore-1", "ds01")
            .with_field(5, "Owner", Some("VirtualMachine"))
            .with_vm(
                "vm-1",
                VmFixture::new("web01", "host-1")
                    .disk("Hard disk 1", 20_971_520, "datastore-1")
                    .custom_value(5, "alice"),
            )
            .with_vm("vm-2", VmFixture::new("tmp01", "host-1"))
            .with_vm("vm-3", VmFixture::new("stray01", "host-2"))
    }

    #[tokio::test]
    async fn test_vms_attach_to_their_host() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        write_pretty_json(&files.registry, &registry_with(&[("R1", "10.0.0.1")])).unwrap();

        let summary = run_inventory(&lab(), &files, true).await.unwrap();

        assert_eq!(summary.vms, 3);
        assert_eq!(summary.merge.attached, 2);
        assert_eq!(
            summary.merge.unmatched,
            vec![UnmatchedVm {
                name: "stray01".to_owned(),
                host: "10.0.0.2".to_owned(),
            }]
        );

        let merged = Registry::load(&files.merged_output).unwrap();
        let vms = &merged.racks[0].esxis["10.0.0.1"].vms;
        assert_eq!(vms.iter().map(|vm| vm.name.as_str()).collect::<Vec<_>>(), vec!["web01", "tmp01"]);
        assert_eq!(vms[0].harddisk_info[0].capacity_gb, 20.0);
        assert_eq!(vms[0].harddisk_info[0].datastore, "ds01");
    }

    #[tokio::test]
    async fn test_first_matching_rack_wins() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        let registry = registry_with(&[("R1", "10.0.0.1"), ("R2", "10.0.0.1")]);
        write_pretty_json(&files.registry, &registry).unwrap();

        run_inventory(&lab(), &files, true).await.unwrap();

        let merged = Registry::load(&files.merged_output).unwrap();
        assert_eq!(merged.racks[0].esxis["10.0.0.1"].vms.len(), 2);
        assert!(merged.racks[1].esxis["10.0.0.1"].vms.is_empty());
    }

    #[tokio::test]
    async fn test_empty_attribute_report() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        write_pretty_json(&files.registry, &registry_with(&[("R1", "10.0.0.1")])).unwrap();

        let summary = run_inventory(&lab(), &files, true).await.unwrap();

        assert_eq!(summary.empty_attributes, 2);
        let report = read_json(&files.empty_attributes_report);
        let names: Vec<&str> = report
            .as_array()
            .unwrap()
            .iter()
            .map(|vm| vm["name"].as_str().unwrap())
            .collect();
        // tmp01 merged, stray01 did not; web01 carries an attribute
        assert_eq!(names, vec!["tmp01", "stray01"]);
    }

    #[tokio::test]
    async fn test_missing_registry_still_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());

        let summary = run_inventory(&lab(), &files, true).await.unwrap();

        assert_eq!(summary.merge.attached, 0);
        assert_eq!(read_json(&files.merged_output), json!([]));
        assert_eq!(read_json(&files.empty_attributes_report).as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_registry_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        fs::write(&files.registry, "[{").unwrap();

        let summary = run_inventory(&lab(), &files, true).await.unwrap();

        assert_eq!(summary.merge.unmatched.len(), 3);
        assert_eq!(read_json(&files.merged_output), json!([]));
    }

    #[tokio::test]
    async fn test_projection_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        let service = lab().with_vm("vm-4", VmFixture::new("broken", "host-1").without("name"));

        let result = run_inventory(&service, &files, true).await;

        assert!(matches!(result, Err(InventoryError::Projection(_))));
        assert!(!files.merged_output.exists());
        assert!(!files.empty_attributes_report.exists());
    }

    #[tokio::test]
    async fn test_fetch_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());

        let result = run_inventory(&lab().failing_retrieval(), &files, true).await;

        assert!(matches!(result, Err(InventoryError::Vsphere(_))));
        assert!(!files.merged_output.exists());
    }

    #[tokio::test]
    async fn test_failed_merged_write_leaves_report_alone() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        fs::create_dir(&files.merged_output).unwrap();
        fs::write(&files.empty_attributes_report, "previous run").unwrap();

        let result = run_inventory(&lab(), &files, true).await;

        assert!(matches!(result, Err(InventoryError::Model(ModelError::Write { .. }))));
        assert_eq!(
            fs::read_to_string(&files.empty_attributes_report).unwrap(),
            "previous run"
        );
    }

    #[tokio::test]
    async fn test_outputs_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        fs::write(&files.merged_output, "stale").unwrap();

        run_inventory(&lab(), &files, true).await.unwrap();

        assert_eq!(read_json(&files.merged_output), json!([]));
    }

    #[tokio::test]
    async fn test_unreachable_vcenter_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.files = files_in(dir.path());
        settings.vcenter.host = Some("127.0.0.1:1".to_owned());
        settings.vcenter.timeout_secs = 5;
        let mut prompter = ScriptedPrompter::new(["root", "secret"]);

        let result = collect_inventory(&mut prompter, &settings).await;

        assert!(matches!(
            result,
            Err(InventoryError::NotConnected(ConnectError::Transport(_)))
        ));
        assert!(!settings.files.merged_output.exists());
    }
}
