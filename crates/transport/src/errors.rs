//! Error types for the transport adapter.
//!
//! Per-request failures are reported as [`dispatch::TransportError`] so the
//! dispatcher can carry them in its envelopes. The errors here only occur
//! while constructing an [`crate::HttpTransport`].

use thiserror::Error;

/// An [`crate::HttpTransport`] could not be constructed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A timeout was configured as zero.
    #[error("Configuration field '{field}' must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// The configured user agent is not a valid header value.
    #[error("Invalid user agent '{user_agent}'")]
    InvalidUserAgent {
        /// The rejected value.
        user_agent: String,
    },

    /// The underlying HTTP client failed to initialise (TLS backend, etc.).
    #[error("HTTP client initialisation failed: {0}")]
    Client(#[from] reqwest::Error),
}
