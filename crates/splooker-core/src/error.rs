use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("registry not found at {0}")]
    RegistryNotFound(PathBuf),

    #[error("registry at {path} is corrupt: {reason}")]
    RegistryCorrupt { path: PathBuf, reason: String },

    #[error("registry already exists at {0} (use --force to overwrite)")]
    RegistryExists(PathBuf),

    #[error("service definition not found at {0}")]
    ServiceNotFound(PathBuf),

    #[error("service definition at {path} is invalid: {reason}")]
    ServiceCorrupt { path: PathBuf, reason: String },

    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("no more ports available in a pool of {pool_size}; consider increasing max_ports")]
    PoolExhausted { pool_size: u16 },

    #[error("proxy configuration failed validation: {0}")]
    Validation(String),

    #[error("container launch failed: {stderr}")]
    Launch { stderr: String },

    #[error("proxy reload failed: {0}")]
    Reload(String),

    #[error("failed to retire instance '{instance_id}': {reason}")]
    Retire { instance_id: String, reason: String },

    #[error("instance '{0}' no longer exists")]
    InstanceNotFound(String),

    #[error("deployment lock failed: {0}")]
    Lock(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("state persistence failed: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
