//! The coalescing dispatcher.
//!
//! [`Dispatcher::submit`] computes the request's fingerprint and registers
//! the caller's listener on the bus *before* anything is scheduled. Only the
//! admitted registration spawns a worker task; every other caller simply
//! joins the in-flight call and returns.
//!
//! The worker task resolves the request, runs the Transport, builds one
//! [`ResponseEnvelope`], takes the bus entry and posts the fan-out to the
//! delivery context. Every failure along the way ends up in the envelope; no
//! error escapes to the worker pool.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::api::verb::{self, VerbKind};
use crate::api::{Api, Supports};
use crate::bus::{Admission, CallbackBus};
use crate::callback::{Deliver, ListenerRef, Outcome};
use crate::config::DispatcherConfig;
use crate::delivery::DeliveryContext;
use crate::envelope::ResponseEnvelope;
use crate::errors::{ApiError, ConfigError};
use crate::identifiers::{CallId, Fingerprint, Ticket};
use crate::transport::{HttpRequest, Transport};
use crate::types::{Headers, Params, Verb, NO_RESPONSE};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`Dispatcher`].
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    runtime: Option<Handle>,
}

impl DispatcherBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Limits concurrent Transport calls to `workers`.
    pub fn max_in_flight(mut self, workers: usize) -> Self {
        self.config.max_in_flight = Some(workers);
        self
    }

    /// Sets the number of bus lock stripes.
    pub fn bus_stripes(mut self, stripes: usize) -> Self {
        self.config.bus_stripes = stripes;
        self
    }

    /// Runs worker tasks on `runtime` instead of the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the dispatcher.
    ///
    /// Fails if the configuration is invalid, or if no runtime was given and
    /// the calling thread is not inside one.
    pub fn build(
        self,
        transport: impl Transport + 'static,
        context: impl DeliveryContext + 'static,
    ) -> Result<Dispatcher, ConfigError> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| ConfigError::NoRuntime {
                message: e.to_string(),
            })?,
        };

        debug!(
            max_in_flight = ?self.config.max_in_flight,
            bus_stripes = self.config.bus_stripes,
            "Dispatcher created"
        );

        Ok(Dispatcher {
            bus: Arc::new(CallbackBus::with_stripes(self.config.bus_stripes)),
            transport: Arc::new(transport),
            context: Arc::new(context),
            runtime,
            permits: self
                .config
                .max_in_flight
                .map(|workers| Arc::new(Semaphore::new(workers))),
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs REST calls on a worker pool, coalescing identical in-flight requests
/// and delivering results on a [`DeliveryContext`].
///
/// Cloning is cheap and shares the bus, pool and context.
#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<CallbackBus<dyn Deliver>>,
    transport: Arc<dyn Transport>,
    context: Arc<dyn DeliveryContext>,
    runtime: Handle,
    permits: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Starts building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Builds a dispatcher with the default configuration on the current
    /// tokio runtime.
    pub fn new(
        transport: impl Transport + 'static,
        context: impl DeliveryContext + 'static,
    ) -> Result<Self, ConfigError> {
        Self::builder().build(transport, context)
    }

    /// Issues a `GET`.
    pub fn get<A, L>(&self, api: &A, headers: Headers, params: Params, listener: L)
    where
        A: Supports<verb::Get> + Clone,
        L: Into<ListenerRef<A::Response>>,
    {
        self.submit::<verb::Get, A, L>(api, headers, params, listener)
    }

    /// Issues a `PUT`.
    pub fn put<A, L>(&self, api: &A, headers: Headers, params: Params, listener: L)
    where
        A: Supports<verb::Put> + Clone,
        L: Into<ListenerRef<A::Response>>,
    {
        self.submit::<verb::Put, A, L>(api, headers, params, listener)
    }

    /// Issues a `POST`.
    pub fn post<A, L>(&self, api: &A, headers: Headers, params: Params, listener: L)
    where
        A: Supports<verb::Post> + Clone,
        L: Into<ListenerRef<A::Response>>,
    {
        self.submit::<verb::Post, A, L>(api, headers, params, listener)
    }

    /// Issues a `DELETE`.
    pub fn delete<A, L>(&self, api: &A, headers: Headers, params: Params, listener: L)
    where
        A: Supports<verb::Delete> + Clone,
        L: Into<ListenerRef<A::Response>>,
    {
        self.submit::<verb::Delete, A, L>(api, headers, params, listener)
    }

    /// Issues a request with verb `V`.
    ///
    /// Returns immediately. If an identical request is already in flight the
    /// listener joins it; otherwise one worker task is spawned. The outcome
    /// reaches the listener only through its callback, on the delivery
    /// context.
    pub fn submit<V, A, L>(&self, api: &A, headers: Headers, params: Params, listener: L)
    where
        V: VerbKind,
        A: Supports<V> + Clone,
        L: Into<ListenerRef<A::Response>>,
    {
        let listener = listener.into();
        let fingerprint = api.fingerprint(V::VERB, &params);

        match self.bus.register(&fingerprint, listener.erase()) {
            Admission::Coalesced => {
                debug!(%fingerprint, "Joined in-flight call");
            }
            Admission::Admitted(ticket) => {
                let call = Call {
                    api: api.clone(),
                    verb: V::VERB,
                    headers,
                    params,
                    is_success: <A as Supports<V>>::is_success,
                };
                self.spawn(call, fingerprint, ticket);
            }
        }
    }

    fn spawn<A: Api>(&self, call: Call<A>, fingerprint: Fingerprint, ticket: Ticket) {
        let call_id = CallId::new_random();
        let span = info_span!("api_call", %call_id, %fingerprint);
        debug!(parent: &span, "Admitted new call");

        let guard = CompletionGuard::<A::Response> {
            bus: Arc::clone(&self.bus),
            context: Arc::clone(&self.context),
            fingerprint,
            ticket,
            call_id,
            completed: false,
            _response: PhantomData,
        };
        let transport = Arc::clone(&self.transport);
        let permits = self.permits.clone();

        self.runtime.spawn(
            async move {
                let _permit = match permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                let (envelope, success) = call.execute(transport.as_ref(), call_id).await;
                guard.complete(envelope, success);
            }
            .instrument(span),
        );
    }

    /// Number of fingerprints with a call in flight.
    pub fn pending_calls(&self) -> usize {
        self.bus.pending()
    }

    /// Returns `true` if a call is in flight for `fingerprint`.
    pub fn is_pending(&self, fingerprint: &Fingerprint) -> bool {
        self.bus.is_pending(fingerprint)
    }

    /// Number of live listeners waiting on `fingerprint`.
    pub fn listener_count(&self, fingerprint: &Fingerprint) -> usize {
        self.bus.listener_count(fingerprint)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending_calls", &self.bus.pending())
            .field(
                "available_workers",
                &self.permits.as_ref().map(|p| p.available_permits()),
            )
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// One admitted call
// ---------------------------------------------------------------------------

type SuccessPredicate<A> = fn(&A, u16, &<A as Api>::Response) -> bool;

struct Call<A: Api> {
    api: A,
    verb: Verb,
    headers: Headers,
    params: Params,
    is_success: SuccessPredicate<A>,
}

impl<A: Api> Call<A> {
    /// Builds the wire request: URL and body per verb, descriptor headers
    /// overlaid by caller headers.
    fn resolve(&self) -> Result<HttpRequest, ApiError> {
        let mut headers = self.api.default_headers();
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let (url, body) = if self.verb.carries_body() {
            let body = self.api.encode_body(&self.params)?;
            (self.api.endpoint_url().to_string(), Some(body))
        } else {
            (self.api.encode_query(&self.params)?, None)
        };

        Ok(HttpRequest {
            verb: self.verb,
            url,
            headers,
            body,
        })
    }

    async fn execute(
        self,
        transport: &dyn Transport,
        call_id: CallId,
    ) -> (ResponseEnvelope<A::Response>, bool) {
        let request = match self.resolve() {
            Ok(request) => request,
            Err(cause) => {
                warn!(error = %cause, "Request could not be encoded");
                return (ResponseEnvelope::failure(call_id, NO_RESPONSE, cause), false);
            }
        };

        let raw = match transport.execute(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Transport call failed");
                return (
                    ResponseEnvelope::failure(call_id, NO_RESPONSE, ApiError::Transport(err)),
                    false,
                );
            }
        };

        match self.api.decode(raw.status, &raw.body) {
            Ok(decoded) => {
                let success = (self.is_success)(&self.api, raw.status, &decoded);
                (
                    ResponseEnvelope::response(call_id, raw.status, decoded),
                    success,
                )
            }
            Err(cause) => {
                warn!(status = raw.status, error = %cause, "Response could not be decoded");
                (ResponseEnvelope::failure(call_id, raw.status, cause), false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Settles a call's bus entry exactly once.
///
/// Owned by the worker task. If the task is dropped before it completes
/// (runtime shut down, panic in the transport) the guard publishes an
/// [`ApiError::Abandoned`] failure so the entry never stays pending.
struct CompletionGuard<T: Send + Sync + 'static> {
    bus: Arc<CallbackBus<dyn Deliver>>,
    context: Arc<dyn DeliveryContext>,
    fingerprint: Fingerprint,
    ticket: Ticket,
    call_id: CallId,
    completed: bool,
    _response: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> CompletionGuard<T> {
    fn complete(mut self, envelope: ResponseEnvelope<T>, success: bool) {
        self.completed = true;
        self.publish(envelope, success);
    }

    fn publish(&self, envelope: ResponseEnvelope<T>, success: bool) {
        let Some(entry) = self.bus.take(&self.fingerprint, self.ticket) else {
            debug!(call_id = %self.call_id, "No listeners left for completed call");
            return;
        };

        info!(
            call_id = %self.call_id,
            fingerprint = %self.fingerprint,
            status = envelope.status(),
            success,
            listeners = entry.len(),
            "Call completed"
        );

        let call_id = self.call_id;
        let outcome = Outcome { envelope, success };
        self.context.post(Box::new(move || {
            let notified = entry.notify_each(|listener| {
                if !listener.deliver(&outcome) {
                    warn!(%call_id, "Listener expects a different response type; delivered as failure");
                }
            });
            trace!(%call_id, notified, "Delivered");
        }));
    }
}

impl<T: Send + Sync + 'static> Drop for CompletionGuard<T> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        warn!(
            call_id = %self.call_id,
            fingerprint = %self.fingerprint,
            "Call abandoned before completion"
        );
        let envelope = ResponseEnvelope::failure(self.call_id, NO_RESPONSE, ApiError::Abandoned);
        self.publish(envelope, false);
    }
}
