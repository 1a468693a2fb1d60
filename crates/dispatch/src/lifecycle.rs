//! Owner-scoped callback groups.
//!
//! A screen, session or any other short-lived owner creates a
//! [`CallbackGroup`], attaches the callbacks it submits requests with, and
//! releases them all at once when it ends. Because the bus only holds weak
//! references, releasing the group expires every attached listener: results
//! that arrive afterwards are dropped instead of reaching a dead owner.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::callback::{ApiCallback, CallbackHandle, Deliver, ListenerRef};

/// Owns a set of callbacks on behalf of one owner.
///
/// Dropping the group has the same effect as [`CallbackGroup::unregister_all`].
pub struct CallbackGroup {
    owner: String,
    callbacks: Mutex<Vec<Arc<dyn Deliver>>>,
}

impl CallbackGroup {
    /// Creates an empty group. `owner` labels log events.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Takes ownership of `callback` and returns a listener for it.
    ///
    /// The group is the callback's only strong owner, so the listener lives
    /// exactly as long as the group keeps it.
    pub fn attach<T, C>(&self, callback: C) -> ListenerRef<T>
    where
        T: Send + Sync + 'static,
        C: ApiCallback<T> + 'static,
    {
        self.adopt(CallbackHandle::new(callback))
    }

    /// Takes ownership of an existing handle and returns a listener for it.
    ///
    /// Other clones of `handle` still keep the callback alive after the
    /// group releases it.
    pub fn adopt<T: Send + Sync + 'static>(&self, handle: CallbackHandle<T>) -> ListenerRef<T> {
        let listener = handle.listener();
        self.callbacks.lock().push(handle.into_deliver());
        listener
    }

    /// Releases every callback. Returns how many were released.
    pub fn unregister_all(&self) -> usize {
        let released = std::mem::take(&mut *self.callbacks.lock());
        let count = released.len();
        drop(released);
        if count > 0 {
            debug!(owner = %self.owner, released = count, "Callback group released");
        }
        count
    }

    /// Number of callbacks currently held.
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Returns `true` if the group holds no callbacks.
    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Label given at construction.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for CallbackGroup {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

impl std::fmt::Debug for CallbackGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackGroup")
            .field("owner", &self.owner)
            .field("callbacks", &self.len())
            .finish()
    }
}
