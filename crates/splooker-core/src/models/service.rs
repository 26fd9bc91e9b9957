use serde::Deserialize;

/// Token in `docker_args` replaced with the allocated port.
pub const PORT_PLACEHOLDER: &str = "$port";

/// Static per-service launch recipe, read from `services/<name>.json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub docker_args: Vec<String>,
}

impl ServiceDefinition {
    /// `docker_args` with every `$port` replaced by `port`.
    pub fn resolved_docker_args(&self, port: u16) -> Vec<String> {
        let port = port.to_string();
        self.docker_args
            .iter()
            .map(|arg| arg.replace(PORT_PLACEHOLDER, &port))
            .collect()
    }
}
