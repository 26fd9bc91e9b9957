use std::path::Path;

use crate::error::{DeployError, Result};
use crate::models::settings::SettingsFile;
use crate::models::Settings;

const SETTINGS_FILENAME: &str = "settings.yaml";

/// Build the settings for `base_path`, applying `settings.yaml` from that
/// directory when it exists.
pub fn load(base_path: &Path) -> Result<Settings> {
    let mut settings = Settings::with_base_path(base_path);
    let overlay_path = base_path.join(SETTINGS_FILENAME);
    if !overlay_path.exists() {
        return Ok(settings);
    }

    let contents = std::fs::read_to_string(&overlay_path)?;
    let overlay: SettingsFile = if contents.trim().is_empty() {
        SettingsFile::default()
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| DeployError::InvalidSettings(format!("{}: {e}", overlay_path.display())))?
    };

    if overlay.runtime.binary.is_empty() {
        return Err(DeployError::InvalidSettings(
            "runtime.binary must not be empty".into(),
        ));
    }
    if overlay.proxy.binary.is_empty() {
        return Err(DeployError::InvalidSettings(
            "proxy.binary must not be empty".into(),
        ));
    }
    if overlay.probe.max_attempts == 0 {
        return Err(DeployError::InvalidSettings(
            "probe.max_attempts must be at least 1".into(),
        ));
    }

    settings.runtime = overlay.runtime;
    settings.proxy = overlay.proxy;
    settings.probe = overlay.probe;
    Ok(settings)
}
