//! Request descriptors.
//!
//! An [`Api`] describes one endpoint: where it lives, how parameters are
//! encoded, which headers it always sends and how a response body is
//! decoded. Which verbs an endpoint accepts is expressed with the
//! [`Supports`] capability trait, one impl per verb marker in [`verb`]:
//!
//! ```ignore
//! impl Supports<verb::Get> for UsersApi {}
//! impl Supports<verb::Delete> for UsersApi {
//!     fn is_success(&self, status: u16, _: &String) -> bool {
//!         status == 204
//!     }
//! }
//! ```
//!
//! The dispatcher only accepts `get` calls for descriptors implementing
//! `Supports<verb::Get>`, so an unsupported verb is a compile error rather
//! than a runtime check.

use serde::de::DeserializeOwned;

use crate::errors::ApiError;
use crate::identifiers::Fingerprint;
use crate::types::{form_encode, is_2xx, Headers, Params, Verb};

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Describes one REST endpoint.
pub trait Api: Send + Sync + 'static {
    /// Decoded response payload handed to callbacks.
    type Response: Send + Sync + 'static;

    /// Absolute URL of the endpoint, without a query string.
    fn endpoint_url(&self) -> &str;

    /// Builds the full request URL for verbs that carry parameters in the
    /// query string.
    fn encode_query(&self, params: &Params) -> Result<String, ApiError> {
        let url = self.endpoint_url();
        if params.is_empty() {
            return Ok(url.to_string());
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{url}{separator}{}", form_encode(params)))
    }

    /// Encodes the request body for verbs that carry parameters in the body.
    ///
    /// Defaults to a flat JSON object of the parameters.
    fn encode_body(&self, params: &Params) -> Result<Vec<u8>, ApiError> {
        serde_json::to_vec(params).map_err(ApiError::encoding)
    }

    /// Headers sent with every request to this endpoint. Caller-supplied
    /// headers with the same name take precedence.
    fn default_headers(&self) -> Headers {
        Headers::new()
    }

    /// Decodes a response body. Called for every response, successful or not.
    fn decode(&self, status: u16, body: &[u8]) -> Result<Self::Response, ApiError>;

    /// Computes the coalescing key for a request to this endpoint.
    ///
    /// Scoped by the descriptor's type, so two descriptors for the same URL
    /// (with different response types or success predicates) never share a
    /// call. Overrides must keep that property.
    fn fingerprint(&self, verb: Verb, params: &Params) -> Fingerprint {
        Fingerprint::compute(verb, self.endpoint_url(), params)
            .scoped(std::any::type_name::<Self>())
    }
}

// ---------------------------------------------------------------------------
// Verb capabilities
// ---------------------------------------------------------------------------

/// Compile-time verb markers used with [`Supports`].
pub mod verb {
    use crate::types::Verb;

    /// A verb marker type.
    pub trait VerbKind: Send + Sync + 'static {
        /// The runtime verb this marker stands for.
        const VERB: Verb;
    }

    /// Marker for `GET`.
    #[derive(Debug, Clone, Copy)]
    pub struct Get;

    /// Marker for `PUT`.
    #[derive(Debug, Clone, Copy)]
    pub struct Put;

    /// Marker for `POST`.
    #[derive(Debug, Clone, Copy)]
    pub struct Post;

    /// Marker for `DELETE`.
    #[derive(Debug, Clone, Copy)]
    pub struct Delete;

    impl VerbKind for Get {
        const VERB: Verb = Verb::Get;
    }

    impl VerbKind for Put {
        const VERB: Verb = Verb::Put;
    }

    impl VerbKind for Post {
        const VERB: Verb = Verb::Post;
    }

    impl VerbKind for Delete {
        const VERB: Verb = Verb::Delete;
    }
}

/// Declares that an endpoint accepts verb `V`, and how to judge success.
pub trait Supports<V: verb::VerbKind>: Api {
    /// Returns `true` if a decoded response counts as success for this verb.
    ///
    /// A response judged unsuccessful is delivered to the failure callback
    /// with its decoded body attached. Defaults to any 2xx status.
    fn is_success(&self, status: u16, response: &Self::Response) -> bool {
        let _ = response;
        is_2xx(status)
    }
}

// ---------------------------------------------------------------------------
// Decoding helpers
// ---------------------------------------------------------------------------

/// Decodes a body as UTF-8 text.
pub fn decode_utf8(status: u16, body: &[u8]) -> Result<String, ApiError> {
    String::from_utf8(body.to_vec()).map_err(|e| ApiError::decode(status, e))
}

/// Decodes a body as JSON into `T`.
pub fn decode_json<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::decode(status, e))
}
