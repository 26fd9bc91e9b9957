use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An instance that was launched but is not yet in the committed registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionalLaunch {
    pub service: String,
    pub instance_id: String,
    pub port: u16,
    pub launched_at: DateTime<Utc>,
}

impl ProvisionalLaunch {
    pub fn new(service: &str, instance_id: &str, port: u16) -> Self {
        Self {
            service: service.to_string(),
            instance_id: instance_id.to_string(),
            port,
            launched_at: Utc::now(),
        }
    }
}
