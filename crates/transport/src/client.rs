//! [`dispatch::Transport`] over a pooled `reqwest::Client`.

use std::error::Error as _;

use async_trait::async_trait;
use dispatch::{Headers, HttpRequest, RawResponse, Transport, TransportError, Verb};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use tracing::{debug, trace};

use crate::config::HttpTransportConfig;
use crate::errors::BuildError;

/// HTTP transport backed by `reqwest`.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with its own connection pool.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, BuildError> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            BuildError::InvalidUserAgent {
                user_agent: config.user_agent.clone(),
            }
        })?;
        default_headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .default_headers(default_headers)
            .build()?;

        debug!(
            timeout_ms = config.timeout_ms,
            connect_timeout_ms = config.connect_timeout_ms,
            "HTTP transport created"
        );
        Ok(Self { client })
    }

    /// Wraps an existing client, e.g. one shared with other parts of the
    /// application.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let headers = header_map(&request.headers, request.body.is_some())?;
        let mut builder = self
            .client
            .request(method(request.verb), &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;

        trace!(status, bytes = body.len(), "Response received");
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn method(verb: Verb) -> Method {
    match verb {
        Verb::Get => Method::GET,
        Verb::Put => Method::PUT,
        Verb::Post => Method::POST,
        Verb::Delete => Method::DELETE,
    }
}

/// Converts request headers, defaulting the content type of a body to JSON.
fn header_map(headers: &Headers, has_body: bool) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            TransportError::InvalidRequest {
                message: format!("header name '{name}': {e}"),
            }
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::InvalidRequest {
            message: format!("header '{name}': {e}"),
        })?;
        map.insert(name, value);
    }

    if has_body && !map.contains_key(CONTENT_TYPE) {
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    Ok(map)
}

/// Classifies a `reqwest` failure for the dispatcher.
fn transport_error(err: reqwest::Error) -> TransportError {
    let message = describe(&err);
    if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connect { message }
    } else if err.is_builder() {
        TransportError::InvalidRequest { message }
    } else {
        TransportError::Io { message }
    }
}

/// The error and its whole source chain, `: `-separated.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
