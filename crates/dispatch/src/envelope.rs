//! The outcome of one dispatched call.

use crate::errors::ApiError;
use crate::identifiers::CallId;
use crate::types::Timestamp;

/// Status, decoded body and failure cause of one completed call.
///
/// Built once per call by the worker task and shared read-only by every
/// listener coalesced onto that call.
///
/// | Outcome | `status` | `body` | `cause` |
/// |---------|----------|--------|---------|
/// | Success | response status | `Some` | `None` |
/// | Protocol failure | response status | `Some` | `None` |
/// | Undecodable body | response status | `None` | `Decode` |
/// | No response | `0` | `None` | `Transport` / `Encoding` / `Abandoned` |
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T> {
    call_id: CallId,
    status: u16,
    body: Option<T>,
    cause: Option<ApiError>,
    completed_at: Timestamp,
}

impl<T> ResponseEnvelope<T> {
    /// Envelope for a call that received and decoded a response.
    pub fn response(call_id: CallId, status: u16, body: T) -> Self {
        Self {
            call_id,
            status,
            body: Some(body),
            cause: None,
            completed_at: Timestamp::now(),
        }
    }

    /// Envelope for a call that failed with `cause`.
    pub fn failure(call_id: CallId, status: u16, cause: ApiError) -> Self {
        Self {
            call_id,
            status,
            body: None,
            cause: Some(cause),
            completed_at: Timestamp::now(),
        }
    }

    /// Identifier of the call that produced this envelope.
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// HTTP status code, or [`crate::NO_RESPONSE`] if none was received.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Decoded response body, if any.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Failure cause, if the call did not yield a decoded response.
    pub fn cause(&self) -> Option<&ApiError> {
        self.cause.as_ref()
    }

    /// When the call completed.
    pub fn completed_at(&self) -> Timestamp {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_RESPONSE;

    #[test]
    fn test_response_carries_body_without_cause() {
        let call_id = CallId::new_random();
        let envelope = ResponseEnvelope::response(call_id, 404, "not here".to_string());

        assert_eq!(envelope.call_id(), call_id);
        assert_eq!(envelope.status(), 404);
        assert_eq!(envelope.body().map(String::as_str), Some("not here"));
        assert!(envelope.cause().is_none());
        assert!(envelope.completed_at() <= Timestamp::now());
    }

    #[test]
    fn test_failure_carries_cause_without_body() {
        let envelope =
            ResponseEnvelope::<String>::failure(CallId::new_random(), NO_RESPONSE, ApiError::Abandoned);

        assert_eq!(envelope.status(), NO_RESPONSE);
        assert!(envelope.body().is_none());
        assert_eq!(envelope.cause(), Some(&ApiError::Abandoned));
    }
}
