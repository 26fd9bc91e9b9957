pub mod atomic;
pub mod deployer;
pub mod docker;
pub mod journal;
pub mod lock;
pub mod nginx;
pub mod ports;
pub mod probe;
pub mod registry_store;
pub mod service_loader;
pub mod settings_loader;

pub use deployer::{initialize, Deployer};
pub use docker::{ContainerRuntime, DockerCli};
pub use nginx::{Nginx, ReverseProxy};
