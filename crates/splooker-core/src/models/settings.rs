use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_BASE_PATH: &str = "/etc/splooker";

const REGISTRY_FILENAME: &str = "splooker.json";
const JOURNAL_FILENAME: &str = "provisional.json";
const LOCK_FILENAME: &str = "splooker.lock";
const SERVICES_DIRNAME: &str = "services";
const STAGING_DIRNAME: &str = "staging";

/// Immutable runtime configuration, built once at startup and handed to every
/// component that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_path: PathBuf,
    pub runtime: RuntimeSettings,
    pub proxy: ProxySettings,
    pub probe: ProbeSettings,
}

impl Settings {
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            runtime: RuntimeSettings::default(),
            proxy: ProxySettings::default(),
            probe: ProbeSettings::default(),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.base_path.join(REGISTRY_FILENAME)
    }

    pub fn services_dir(&self) -> PathBuf {
        self.base_path.join(SERVICES_DIRNAME)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.base_path.join(STAGING_DIRNAME)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.base_path.join(JOURNAL_FILENAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_path.join(LOCK_FILENAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    pub binary: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: "docker".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxySettings {
    pub binary: String,
    pub sites_dir: PathBuf,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            binary: "nginx".into(),
            sites_dir: PathBuf::from("/etc/nginx/sites-enabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    pub host: String,
    pub max_attempts: u32,
    pub connect_timeout_ms: u64,
    pub retry_interval_ms: u64,
}

impl ProbeSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            max_attempts: 15,
            connect_timeout_ms: 1000,
            retry_interval_ms: 1000,
        }
    }
}

/// Shape of the optional `settings.yaml` overlay. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub runtime: RuntimeSettings,
    pub proxy: ProxySettings,
    pub probe: ProbeSettings,
}
