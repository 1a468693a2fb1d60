//! Transport port.
//!
//! The dispatcher performs no network I/O itself. It hands a fully resolved
//! [`HttpRequest`] to a [`Transport`] implementation (see the `transport`
//! crate for the `reqwest` adapter) and receives the raw status and body.
//! TLS, redirects, connection pooling and timeouts all belong to the
//! implementation.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::types::{Headers, Verb};

/// A resolved request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Absolute URL, query string included.
    pub url: String,
    /// Header set (descriptor defaults overlaid by caller headers).
    pub headers: Headers,
    /// Encoded body for `PUT`/`POST`; `None` otherwise.
    pub body: Option<Vec<u8>>,
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Performs one HTTP call.
///
/// Any status code is a successful exchange at this level; judging the
/// status is the descriptor's job. Only failures to obtain a response at
/// all are reported as [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response status and body.
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}
