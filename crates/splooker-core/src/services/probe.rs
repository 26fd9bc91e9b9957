use std::time::Duration;

use tokio::net::TcpStream;

use crate::models::ProbeSettings;

/// Bounded-retry TCP reachability check.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    connect_timeout: Duration,
    retry_interval: Duration,
}

impl ReadinessProbe {
    pub fn new(connect_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            connect_timeout,
            retry_interval,
        }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(settings.connect_timeout(), settings.retry_interval())
    }

    /// Returns whether a connection to `host:port` succeeded within
    /// `max_attempts` tries. Exhaustion is reported, never raised.
    pub async fn wait_ready(&self, host: &str, port: u16, max_attempts: u32) -> bool {
        for attempt in 1..=max_attempts {
            tracing::info!(
                "checking if a server is listening on {port} {attempt}/{max_attempts}"
            );
            match tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
                .await
            {
                Ok(Ok(_stream)) => {
                    tracing::info!(port, "server is listening");
                    return true;
                }
                Ok(Err(e)) => tracing::debug!(port, error = %e, "connection failed"),
                Err(_) => tracing::debug!(port, "connection timed out"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }
        false
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::from_settings(&ProbeSettings::default())
    }
}
