//! Caller callbacks and the references the bus holds to them.
//!
//! Ownership model:
//!
//! - A [`CallbackHandle`] is the strong owner of a callback. Callers keep it
//!   (or hand it to a [`crate::CallbackGroup`]) for as long as they want
//!   results delivered.
//! - A [`ListenerRef`] is a weak reference derived from a handle. It is what
//!   the dispatcher registers on the bus. Once every strong owner is gone the
//!   listener is expired: it is skipped at delivery and pruned from the bus.
//!
//! Dropping the handle is therefore the way to withdraw interest in a
//! result; there is no separate unregister call.

use std::any::Any;
use std::sync::{Arc, Weak};

use crate::envelope::ResponseEnvelope;
use crate::errors::ApiError;
use crate::types::NO_RESPONSE;

// ---------------------------------------------------------------------------
// Caller-facing trait
// ---------------------------------------------------------------------------

/// Receives the outcome of a dispatched call.
///
/// Exactly one of the two methods is invoked, once, on the dispatcher's
/// delivery context.
pub trait ApiCallback<T>: Send + Sync {
    /// The call got a response, it decoded, and the verb's success predicate
    /// accepted it.
    fn on_success(&self, status: u16, response: &T);

    /// Anything else.
    ///
    /// `response` is present when a response was received and decoded but
    /// judged unsuccessful; `cause` is present when no usable response
    /// exists. `status` is `0` when no response was received at all.
    fn on_failure(&self, status: u16, response: Option<&T>, cause: Option<&ApiError>);
}

/// An [`ApiCallback`] built from two closures.
pub struct FnCallback<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> FnCallback<S, F> {
    /// Wraps a success closure and a failure closure.
    pub fn new(on_success: S, on_failure: F) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }
}

impl<T, S, F> ApiCallback<T> for FnCallback<S, F>
where
    S: Fn(u16, &T) + Send + Sync,
    F: Fn(u16, Option<&T>, Option<&ApiError>) + Send + Sync,
{
    fn on_success(&self, status: u16, response: &T) {
        (self.on_success)(status, response)
    }

    fn on_failure(&self, status: u16, response: Option<&T>, cause: Option<&ApiError>) {
        (self.on_failure)(status, response, cause)
    }
}

// ---------------------------------------------------------------------------
// Type-erased delivery
// ---------------------------------------------------------------------------

/// A finished call, as handed to every listener of its fingerprint.
pub(crate) struct Outcome<T> {
    pub(crate) envelope: ResponseEnvelope<T>,
    pub(crate) success: bool,
}

impl<T> Outcome<T> {
    fn dispatch(&self, callback: &dyn ApiCallback<T>) {
        let envelope = &self.envelope;
        match (self.success, envelope.body()) {
            (true, Some(body)) => callback.on_success(envelope.status(), body),
            _ => callback.on_failure(envelope.status(), envelope.body(), envelope.cause()),
        }
    }
}

/// What the bus stores: listeners of any response type behind one trait.
pub(crate) trait Deliver: Send + Sync {
    /// Delivers `outcome` if it is an `Outcome` of this listener's response
    /// type. On a type mismatch the listener receives an
    /// [`ApiError::ResponseType`] failure instead and `false` is returned.
    fn deliver(&self, outcome: &(dyn Any + Send + Sync)) -> bool;
}

/// Heap cell shared between a handle and the weak refs derived from it.
pub(crate) struct Callback<T> {
    inner: Box<dyn ApiCallback<T>>,
}

impl<T: Send + Sync + 'static> Deliver for Callback<T> {
    fn deliver(&self, outcome: &(dyn Any + Send + Sync)) -> bool {
        match outcome.downcast_ref::<Outcome<T>>() {
            Some(outcome) => {
                outcome.dispatch(self.inner.as_ref());
                true
            }
            None => {
                let cause = ApiError::ResponseType {
                    expected: std::any::type_name::<T>().to_string(),
                };
                self.inner.on_failure(NO_RESPONSE, None, Some(&cause));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Strong owner of a callback.
///
/// Cloning shares the same callback. The callback stays registered while at
/// least one clone (or a [`crate::CallbackGroup`] holding it) is alive.
pub struct CallbackHandle<T> {
    cell: Arc<Callback<T>>,
}

impl<T: Send + Sync + 'static> CallbackHandle<T> {
    /// Takes ownership of `callback`.
    pub fn new(callback: impl ApiCallback<T> + 'static) -> Self {
        Self {
            cell: Arc::new(Callback {
                inner: Box::new(callback),
            }),
        }
    }

    /// Builds a handle from a success closure and a failure closure.
    pub fn from_fns<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: Fn(u16, &T) + Send + Sync + 'static,
        F: Fn(u16, Option<&T>, Option<&ApiError>) + Send + Sync + 'static,
    {
        Self::new(FnCallback::new(on_success, on_failure))
    }

    /// Returns a weak reference suitable for registering with a dispatcher.
    pub fn listener(&self) -> ListenerRef<T> {
        ListenerRef {
            weak: Arc::downgrade(&self.cell),
        }
    }

    pub(crate) fn into_deliver(self) -> Arc<dyn Deliver> {
        self.cell
    }
}

impl<T> Clone for CallbackHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> std::fmt::Debug for CallbackHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("owners", &Arc::strong_count(&self.cell))
            .finish()
    }
}

/// Non-owning reference to a callback.
///
/// Never keeps the callback alive; see the module docs.
pub struct ListenerRef<T> {
    weak: Weak<Callback<T>>,
}

impl<T: Send + Sync + 'static> ListenerRef<T> {
    /// Returns `true` while some strong owner of the callback exists.
    pub fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }

    pub(crate) fn erase(&self) -> Weak<dyn Deliver> {
        let weak: Weak<dyn Deliver> = self.weak.clone();
        weak
    }
}

impl<T> Clone for ListenerRef<T> {
    fn clone(&self) -> Self {
        Self {
            weak: Weak::clone(&self.weak),
        }
    }
}

impl<T> std::fmt::Debug for ListenerRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRef")
            .field("alive", &(self.weak.strong_count() > 0))
            .finish()
    }
}

impl<T: Send + Sync + 'static> From<&CallbackHandle<T>> for ListenerRef<T> {
    fn from(handle: &CallbackHandle<T>) -> Self {
        handle.listener()
    }
}
