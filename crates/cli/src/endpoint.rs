//! Descriptor for an arbitrary URL given on the command line.

use dispatch::{decode_utf8, verb, Api, ApiError, Supports};

/// Any endpoint, decoded as UTF-8 text. Every verb is allowed and every 2xx
/// status counts as success.
#[derive(Debug, Clone)]
pub struct RawEndpoint {
    url: String,
}

impl RawEndpoint {
    /// Descriptor for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Api for RawEndpoint {
    type Response = String;

    fn endpoint_url(&self) -> &str {
        &self.url
    }

    fn decode(&self, status: u16, body: &[u8]) -> Result<String, ApiError> {
        decode_utf8(status, body)
    }
}

impl Supports<verb::Get> for RawEndpoint {}
impl Supports<verb::Put> for RawEndpoint {}
impl Supports<verb::Post> for RawEndpoint {}
impl Supports<verb::Delete> for RawEndpoint {}
