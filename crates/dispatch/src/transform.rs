//! Callback adapter that reshapes decoded payloads.
//!
//! Lets one descriptor decode to a general type (text, a JSON value) while
//! individual callers receive exactly the type they need.

use std::marker::PhantomData;

use crate::callback::ApiCallback;
use crate::errors::ApiError;

/// Wraps a callback for `U`, presenting it as a callback for `T`.
///
/// - On success, the payload is transformed; if the transform fails the
///   target receives `on_failure(status, None, Some(transform error))`.
/// - On failure, an attached payload is transformed as well. If that fails
///   the original cause is kept when there is one, otherwise the transform
///   error is reported.
pub struct Transformer<T, U, F> {
    target: Box<dyn ApiCallback<U>>,
    transform: F,
    _input: PhantomData<fn(&T)>,
}

impl<T, U, F> Transformer<T, U, F>
where
    F: Fn(&T) -> Result<U, ApiError> + Send + Sync,
{
    /// Transforms payloads with `transform` before handing them to `target`.
    pub fn new(target: impl ApiCallback<U> + 'static, transform: F) -> Self {
        Self {
            target: Box::new(target),
            transform,
            _input: PhantomData,
        }
    }
}

impl<T, U, F> ApiCallback<T> for Transformer<T, U, F>
where
    U: 'static,
    F: Fn(&T) -> Result<U, ApiError> + Send + Sync,
{
    fn on_success(&self, status: u16, response: &T) {
        match (self.transform)(response) {
            Ok(mapped) => self.target.on_success(status, &mapped),
            Err(err) => self.target.on_failure(status, None, Some(&err)),
        }
    }

    fn on_failure(&self, status: u16, response: Option<&T>, cause: Option<&ApiError>) {
        match response.map(&self.transform) {
            None => self.target.on_failure(status, None, cause),
            Some(Ok(mapped)) => self.target.on_failure(status, Some(&mapped), cause),
            Some(Err(err)) => self.target.on_failure(status, None, cause.or(Some(&err))),
        }
    }
}
