//! Error types for the dispatcher.
//!
//! [`ApiError`] is the failure cause carried by a
//! [`crate::ResponseEnvelope`]. It is cloneable because one envelope is shared
//! by every listener coalesced onto the same call.
//!
//! A protocol-level failure (a response arrived but the verb's success
//! predicate rejected it) is *not* an [`ApiError`]: it reaches the failure
//! callback with the decoded body attached and no cause.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Transport boundary errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::Transport`] implementation.
///
/// Infrastructure adapters convert their own error types into this one at
/// the port boundary; the dispatcher never sees adapter-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The call did not complete within the transport's deadline.
    #[error("Request timed out: {message}")]
    Timeout {
        /// Human-readable description from the transport.
        message: String,
    },

    /// No connection could be established with the remote endpoint.
    #[error("Connection failed: {message}")]
    Connect {
        /// Human-readable description from the transport.
        message: String,
    },

    /// The request could not be built (bad URL, invalid header, …).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable description from the transport.
        message: String,
    },

    /// Any other I/O failure while sending the request or reading the body.
    #[error("Transport I/O failure: {message}")]
    Io {
        /// Human-readable description from the transport.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Per-call failure causes
// ---------------------------------------------------------------------------

/// Why a dispatched call produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network or I/O failure during the HTTP call (timeouts included).
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Parameters, body or headers could not be encoded.
    ///
    /// The Transport is never invoked for a call that fails to encode.
    #[error("Encoding failure: {message}")]
    Encoding {
        /// Description of the encoding problem.
        message: String,
    },

    /// A response arrived but its body could not be decoded.
    #[error("Decode failure for status {status}: {message}")]
    Decode {
        /// Status code of the undecodable response.
        status: u16,
        /// Description of the decoding problem.
        message: String,
    },

    /// The worker task was dropped before it completed (runtime shutdown or
    /// a panic inside the task).
    #[error("Call abandoned before completion")]
    Abandoned,

    /// The listener expects a different response type than the call that
    /// completed. Only possible when a descriptor overrides
    /// [`crate::Api::fingerprint`] without scoping it to its own type.
    #[error("Listener expects response type {expected}")]
    ResponseType {
        /// Response type the listener was registered for.
        expected: String,
    },

    /// A response transformer rejected the decoded payload.
    #[error("Response transform failed: {message}")]
    Transform {
        /// Description supplied by the transformer.
        message: String,
    },
}

impl ApiError {
    /// Creates an [`ApiError::Encoding`] from any displayable error.
    pub fn encoding(err: impl std::fmt::Display) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }

    /// Creates an [`ApiError::Decode`] from any displayable error.
    pub fn decode(status: u16, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            status,
            message: err.to_string(),
        }
    }

    /// Creates an [`ApiError::Transform`] from any displayable error.
    pub fn transform(err: impl std::fmt::Display) -> Self {
        Self::Transform {
            message: err.to_string(),
        }
    }

    /// Returns `true` if no response was received for the call.
    pub fn is_no_response(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Encoding { .. } | Self::Abandoned
        )
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Invalid dispatcher configuration. Produced at construction time; a
/// dispatcher never starts with an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A fixed worker pool was requested with zero workers.
    #[error("max_in_flight must be at least 1 when set")]
    ZeroWorkers,

    /// The bus needs at least one lock stripe.
    #[error("bus_stripes must be at least 1")]
    ZeroStripes,

    /// No tokio runtime was supplied and none is current on this thread.
    #[error("No tokio runtime available: {message}")]
    NoRuntime {
        /// Description from tokio.
        message: String,
    },
}
