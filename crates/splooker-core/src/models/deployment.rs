use std::fmt;

use super::registry::InstanceRecord;

/// Phases of a deployment, in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Start,
    PortAllocated,
    ProxyStaged,
    ProxyValidated,
    InstanceLaunched,
    Probed,
    ProxyActivated,
    OldInstanceRetired,
    RegistryCommitted,
    Done,
}

impl DeployPhase {
    pub const ALL: [DeployPhase; 10] = [
        DeployPhase::Start,
        DeployPhase::PortAllocated,
        DeployPhase::ProxyStaged,
        DeployPhase::ProxyValidated,
        DeployPhase::InstanceLaunched,
        DeployPhase::Probed,
        DeployPhase::ProxyActivated,
        DeployPhase::OldInstanceRetired,
        DeployPhase::RegistryCommitted,
        DeployPhase::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeployPhase::Start => "start",
            DeployPhase::PortAllocated => "port_allocated",
            DeployPhase::ProxyStaged => "proxy_staged",
            DeployPhase::ProxyValidated => "proxy_validated",
            DeployPhase::InstanceLaunched => "instance_launched",
            DeployPhase::Probed => "probed",
            DeployPhase::ProxyActivated => "proxy_activated",
            DeployPhase::OldInstanceRetired => "old_instance_retired",
            DeployPhase::RegistryCommitted => "registry_committed",
            DeployPhase::Done => "done",
        }
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed deployment.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub service: String,
    pub instance_id: String,
    pub port: u16,
    /// Record that was replaced, if the service had been deployed before.
    pub previous: Option<InstanceRecord>,
    /// Whether the readiness probe reached the new instance.
    pub ready: bool,
    /// The previous instance could not be removed and may still be running.
    pub retire_failed: bool,
    pub phases: Vec<DeployPhase>,
}

/// Outcome of a provisional journal sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Uncommitted instances that were removed.
    pub retired: Vec<String>,
    /// Entries whose instance had been committed after all.
    pub cleared: Vec<String>,
    /// Instances that could not be removed and remain journaled.
    pub failed: Vec<String>,
}
