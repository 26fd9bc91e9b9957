use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{DeployError, Result};

/// Exclusive advisory lock serializing deployments against one base directory.
/// Released when dropped.
#[derive(Debug)]
pub struct DeployLock {
    file: File,
    path: PathBuf,
}

impl DeployLock {
    /// Take the lock, waiting for the current holder if there is one.
    pub async fn acquire(lock_path: &Path) -> Result<DeployLock> {
        let file = open_lock_file(lock_path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                let holder = std::fs::read_to_string(lock_path).unwrap_or_default();
                tracing::info!(
                    path = %lock_path.display(),
                    holder = holder.trim(),
                    "another deployment holds the lock, waiting"
                );
                let file = tokio::task::spawn_blocking(move || {
                    FileExt::lock_exclusive(&file).map(|()| file)
                })
                .await
                .map_err(|e| DeployError::Lock(format!("lock task failed: {e}")))?
                .map_err(|e| DeployError::Lock(format!("{}: {e}", lock_path.display())))?;
                return Self::held(file, lock_path);
            }
            Err(e) => {
                return Err(DeployError::Lock(format!("{}: {e}", lock_path.display())));
            }
        }
        Self::held(file, lock_path)
    }

    /// Take the lock only if nobody holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<DeployLock>> {
        let file = open_lock_file(lock_path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self::held(file, lock_path)?)),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(DeployError::Lock(format!("{}: {e}", lock_path.display()))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn held(mut file: File, lock_path: &Path) -> Result<DeployLock> {
        // PID is informational only.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        tracing::debug!(path = %lock_path.display(), "acquired deployment lock");
        Ok(DeployLock {
            file,
            path: lock_path.to_path_buf(),
        })
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DeployError::Lock(format!("failed to create lock dir: {e}")))?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| DeployError::Lock(format!("failed to open {}: {e}", lock_path.display())))
}
