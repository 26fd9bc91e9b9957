use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DeployError, Result};
use crate::models::ServiceDefinition;

// Names become file names and nginx upstream identifiers.
static SERVICE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

pub fn validate_service_name(name: &str) -> Result<()> {
    if SERVICE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(DeployError::InvalidServiceName(name.to_string()))
    }
}

/// Load `<services_dir>/<name>.json`.
pub async fn load(services_dir: &Path, name: &str) -> Result<ServiceDefinition> {
    validate_service_name(name)?;
    let path = services_dir.join(format!("{name}.json"));
    if !path.exists() {
        return Err(DeployError::ServiceNotFound(path));
    }
    let contents = tokio::fs::read_to_string(&path).await?;
    let definition: ServiceDefinition =
        serde_json::from_str(&contents).map_err(|e| DeployError::ServiceCorrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    if definition.image.trim().is_empty() {
        return Err(DeployError::ServiceCorrupt {
            path,
            reason: "image field is required".into(),
        });
    }
    Ok(definition)
}
