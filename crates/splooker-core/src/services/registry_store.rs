use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::models::Registry;

use super::atomic::write_atomic;

pub struct RegistryStore {
    registry_path: PathBuf,
}

impl RegistryStore {
    pub fn new(registry_path: &Path) -> Self {
        Self {
            registry_path: registry_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.registry_path
    }

    pub fn exists(&self) -> bool {
        self.registry_path.exists()
    }

    pub async fn load(&self) -> Result<Registry> {
        if !self.registry_path.exists() {
            return Err(DeployError::RegistryNotFound(self.registry_path.clone()));
        }
        let json = tokio::fs::read_to_string(&self.registry_path)
            .await
            .map_err(|e| DeployError::State(format!("failed to read registry: {e}")))?;
        let registry: Registry = serde_json::from_str(&json).map_err(|e| self.corrupt(e))?;
        registry.check_invariants().map_err(|e| self.corrupt(e))?;
        Ok(registry)
    }

    /// Overwrite the whole document. Callers must load, mutate and save
    /// against the latest state while holding the deployment lock.
    pub async fn save(&self, registry: &Registry) -> Result<()> {
        let json = serde_json::to_string_pretty(registry)?;
        write_atomic(&self.registry_path, json.as_bytes())
            .await
            .map_err(|e| DeployError::State(format!("failed to write registry: {e}")))?;
        Ok(())
    }

    fn corrupt(&self, reason: impl ToString) -> DeployError {
        DeployError::RegistryCorrupt {
            path: self.registry_path.clone(),
            reason: reason.to_string(),
        }
    }
}
