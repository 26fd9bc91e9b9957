use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::models::ProvisionalLaunch;

use super::atomic::write_atomic;

/// Instances launched by a deployment that has not committed yet.
pub struct ProvisionalJournal {
    journal_path: PathBuf,
}

impl ProvisionalJournal {
    pub fn new(journal_path: &Path) -> Self {
        Self {
            journal_path: journal_path.to_path_buf(),
        }
    }

    pub async fn load(&self) -> Result<Vec<ProvisionalLaunch>> {
        if !self.journal_path.exists() {
            return Ok(Vec::new());
        }
        let json = tokio::fs::read_to_string(&self.journal_path)
            .await
            .map_err(|e| DeployError::State(format!("failed to read journal: {e}")))?;
        let entries: Vec<ProvisionalLaunch> = serde_json::from_str(&json)?;
        Ok(entries)
    }

    pub async fn record(&self, entry: ProvisionalLaunch) -> Result<()> {
        let mut entries = self.load().await?;
        entries.retain(|e| e.instance_id != entry.instance_id);
        entries.push(entry);
        self.save(&entries).await
    }

    pub async fn clear(&self, service: &str, instance_id: &str) -> Result<()> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| !(e.service == service && e.instance_id == instance_id));
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries).await
    }

    async fn save(&self, entries: &[ProvisionalLaunch]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&self.journal_path, json.as_bytes())
            .await
            .map_err(|e| DeployError::State(format!("failed to write journal: {e}")))?;
        Ok(())
    }
}
