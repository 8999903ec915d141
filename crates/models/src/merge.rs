use tracing::info;

use crate::{Registry, VmRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedVm {
    pub name: String,
    pub host: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub attached: usize,
    pub unmatched: Vec<UnmatchedVm>,
}

/// Attaches `vm` to the first ESXi entry, scanning racks in order, whose key
/// equals the VM's host. Returns `false` when no rack knows that host.
pub fn attach_vm(registry: &mut Registry, vm: &VmRecord) -> bool {
    for rack in registry.racks.iter_mut() {
        if let Some(esxi) = rack.esxis.get_mut(&vm.host) {
            esxi.vms.push(vm.clone());
            return true;
        }
    }
    false
}

/// Joins VM records onto the registry. VMs whose host is not in the
/// registry are logged and left out.
pub fn merge_vms(registry: &mut Registry, vms: &[VmRecord]) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for vm in vms {
        if attach_vm(registry, vm) {
            outcome.attached += 1;
        } else {
            info!(
                "No matching ESXi found for VM '{}' on host '{}'",
                vm.name, vm.host
            );
            outcome.unmatched.push(UnmatchedVm {
                name: vm.name.clone(),
                host: vm.host.clone(),
            });
        }
    }

    outcome
}

/// VMs carrying no custom attributes at all, whether or not they merged.
pub fn vms_with_empty_custom_attributes(vms: &[VmRecord]) -> Vec<&VmRecord> {
    vms.iter().filter(|vm| !vm.has_custom_attributes()).collect()
}
