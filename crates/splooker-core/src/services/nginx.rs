use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::error::{DeployError, Result};
use crate::models::Settings;

/// Two-phase routing control for the reverse proxy in front of the services.
#[async_trait]
pub trait ReverseProxy: Send + Sync {
    /// Prepare routing of `service` to `localhost:port`.
    async fn stage(&self, service: &str, port: u16) -> Result<()>;

    /// Put staged routing in place and syntax-check the full configuration.
    async fn validate(&self) -> Result<()>;

    /// Make the proxy pick up the validated configuration.
    async fn activate(&self) -> Result<()>;
}

pub fn render_upstream(service: &str, port: u16) -> String {
    format!("upstream {service} {{ server localhost:{port}; }}")
}

/// A fragment moved into the live directory, with what it replaced.
struct Promotion {
    live_path: PathBuf,
    previous: Option<Vec<u8>>,
}

/// nginx with one upstream fragment per service in its sites directory.
///
/// Fragments are written to a staging directory first and only copied into
/// the sites directory by [`ReverseProxy::validate`], which restores the
/// previous fragments if `nginx -t` rejects the result.
pub struct Nginx {
    binary: String,
    sites_dir: PathBuf,
    staging_dir: PathBuf,
    staged: Mutex<Vec<String>>,
}

impl Nginx {
    pub fn new(binary: impl Into<String>, sites_dir: &Path, staging_dir: &Path) -> Self {
        Self {
            binary: binary.into(),
            sites_dir: sites_dir.to_path_buf(),
            staging_dir: staging_dir.to_path_buf(),
            staged: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.proxy.binary.clone(),
            &settings.proxy.sites_dir,
            &settings.staging_dir(),
        )
    }

    fn fragment_name(service: &str) -> String {
        format!("{service}.conf")
    }

    async fn run_nginx(&self, args: &[&str]) -> std::io::Result<Output> {
        tracing::debug!(binary = %self.binary, args = ?args, "running proxy command");
        Command::new(&self.binary).args(args).output().await
    }

    async fn promote(&self, service: &str) -> std::io::Result<Promotion> {
        let staged_path = self.staging_dir.join(Self::fragment_name(service));
        let live_path = self.sites_dir.join(Self::fragment_name(service));

        let previous = match tokio::fs::read(&live_path).await {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        let fragment = tokio::fs::read(&staged_path).await?;
        tokio::fs::create_dir_all(&self.sites_dir).await?;
        tokio::fs::write(&live_path, fragment).await?;
        tokio::fs::remove_file(&staged_path).await?;

        Ok(Promotion {
            live_path,
            previous,
        })
    }

    async fn roll_back(&self, promoted: &[Promotion]) {
        for promotion in promoted.iter().rev() {
            let result = match &promotion.previous {
                Some(contents) => tokio::fs::write(&promotion.live_path, contents).await,
                None => tokio::fs::remove_file(&promotion.live_path).await,
            };
            match result {
                Ok(()) => tracing::info!(path = %promotion.live_path.display(), "restored proxy fragment"),
                Err(e) => tracing::error!(
                    path = %promotion.live_path.display(),
                    error = %e,
                    "failed to restore proxy fragment"
                ),
            }
        }
    }
}

#[async_trait]
impl ReverseProxy for Nginx {
    async fn stage(&self, service: &str, port: u16) -> Result<()> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let path = self.staging_dir.join(Self::fragment_name(service));
        tokio::fs::write(&path, render_upstream(service, port)).await?;

        let mut staged = self.staged.lock().await;
        if !staged.iter().any(|s| s == service) {
            staged.push(service.to_string());
        }
        tracing::debug!(%service, port, path = %path.display(), "staged proxy fragment");
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        let staged = std::mem::take(&mut *self.staged.lock().await);

        let mut promoted = Vec::with_capacity(staged.len());
        for service in &staged {
            match self.promote(service).await {
                Ok(promotion) => promoted.push(promotion),
                Err(e) => {
                    self.roll_back(&promoted).await;
                    return Err(DeployError::Validation(format!(
                        "failed to install fragment for '{service}': {e}"
                    )));
                }
            }
        }

        let failure = match self.run_nginx(&["-t"]).await {
            Ok(output) if output.status.success() => None,
            Ok(output) => Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            Err(e) => Some(format!("failed to run {}: {e}", self.binary)),
        };
        match failure {
            None => Ok(()),
            Some(diagnostic) => {
                self.roll_back(&promoted).await;
                Err(DeployError::Validation(diagnostic))
            }
        }
    }

    async fn activate(&self) -> Result<()> {
        let output = self
            .run_nginx(&["-s", "reload"])
            .await
            .map_err(|e| DeployError::Reload(format!("failed to run {}: {e}", self.binary)))?;
        if !output.status.success() {
            return Err(DeployError::Reload(format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
