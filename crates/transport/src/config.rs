//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::BuildError;

/// Timeouts and identity of the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpTransportConfig {
    /// Deadline for a whole request, from connect to the last body byte.
    pub timeout_ms: u64,

    /// Deadline for establishing the connection.
    pub connect_timeout_ms: u64,

    /// Value of the `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl HttpTransportConfig {
    /// Whole-request deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Connection deadline as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Checks the configuration for values the client cannot run with.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.timeout_ms == 0 {
            return Err(BuildError::ZeroTimeout {
                field: "timeout_ms",
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(BuildError::ZeroTimeout {
                field: "connect_timeout_ms",
            });
        }
        if reqwest::header::HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(BuildError::InvalidUserAgent {
                user_agent: self.user_agent.clone(),
            });
        }
        Ok(())
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            user_agent: concat!("restbus/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
