pub mod deployment;
pub mod journal;
pub mod registry;
pub mod service;
pub mod settings;

pub use deployment::{DeployPhase, DeploymentReport, SweepReport};
pub use journal::ProvisionalLaunch;
pub use registry::{InstanceRecord, Registry};
pub use service::ServiceDefinition;
pub use settings::{ProbeSettings, ProxySettings, RuntimeSettings, Settings};
