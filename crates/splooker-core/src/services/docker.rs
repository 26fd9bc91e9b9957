use std::process::Output;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::{DeployError, Result};
use crate::models::{RuntimeSettings, ServiceDefinition};

/// Launches and removes service instances.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a detached instance bound to `port`, returning its id.
    async fn launch(
        &self,
        service: &str,
        port: u16,
        definition: &ServiceDefinition,
    ) -> Result<String>;

    /// Force-remove an instance. An instance that is already gone is
    /// reported as [`DeployError::InstanceNotFound`].
    async fn retire(&self, instance_id: &str) -> Result<()>;
}

/// Drives the `docker` command line.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self::new(settings.binary.clone())
    }

    async fn run_docker(&self, args: &[String]) -> std::io::Result<Output> {
        tracing::debug!(binary = %self.binary, args = ?args, "running container runtime");
        Command::new(&self.binary).args(args).output().await
    }
}

static MISSING_INSTANCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)no such container").unwrap());

/// Whether `docker rm` failed because the instance does not exist.
pub fn is_missing_instance(stderr: &str) -> bool {
    MISSING_INSTANCE_RE.is_match(stderr)
}

/// `<service>-<8 hex chars>`, unique enough to sit beside retained old instances.
pub fn instance_name(service: &str) -> String {
    let uid = uuid::Uuid::new_v4().simple().to_string();
    format!("{service}-{}", &uid[..8])
}

/// Arguments after the binary for `docker run`.
pub fn build_run_args(name: &str, port: u16, definition: &ServiceDefinition) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    args.extend(definition.resolved_docker_args(port));
    args.extend(["-d".to_string(), "--name".to_string(), name.to_string()]);
    args.push(definition.image.clone());
    args.extend(definition.command.iter().cloned());
    args
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn launch(
        &self,
        service: &str,
        port: u16,
        definition: &ServiceDefinition,
    ) -> Result<String> {
        let name = instance_name(service);
        let args = build_run_args(&name, port, definition);
        let output = self.run_docker(&args).await.map_err(|e| DeployError::Launch {
            stderr: format!("failed to run {}: {e}", self.binary),
        })?;

        if !output.status.success() {
            return Err(DeployError::Launch {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let instance_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if instance_id.is_empty() {
            return Err(DeployError::Launch {
                stderr: format!("{} run printed no instance id", self.binary),
            });
        }
        tracing::info!(%service, %name, %instance_id, port, "instance launched");
        Ok(instance_id)
    }

    async fn retire(&self, instance_id: &str) -> Result<()> {
        let args = vec!["rm".to_string(), "--force".to_string(), instance_id.to_string()];
        let output = self.run_docker(&args).await.map_err(|e| DeployError::Retire {
            instance_id: instance_id.to_string(),
            reason: format!("failed to run {}: {e}", self.binary),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_instance(&stderr) {
                return Err(DeployError::InstanceNotFound(instance_id.to_string()));
            }
            return Err(DeployError::Retire {
                instance_id: instance_id.to_string(),
                reason: format!(
                    "exit {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }
        Ok(())
    }
}
