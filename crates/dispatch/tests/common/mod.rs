//! Shared fixtures for dispatcher integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dispatch::{
    decode_json, decode_utf8, verb, Api, ApiError, CallbackHandle, EventLoop, HttpRequest, RawResponse,
    Supports, Transport, TransportError,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dispatch=debug")
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// `GET/POST https://api.test/users`, JSON responses.
#[derive(Clone)]
pub struct GetUsers;

impl Api for GetUsers {
    type Response = Value;

    fn endpoint_url(&self) -> &str {
        "https://api.test/users"
    }

    fn decode(&self, status: u16, body: &[u8]) -> Result<Value, ApiError> {
        decode_json(status, body)
    }
}

impl Supports<verb::Get> for GetUsers {}
impl Supports<verb::Post> for GetUsers {}

/// Same endpoint as [`GetUsers`], decoded as plain text.
#[derive(Clone)]
pub struct GetUsersText;

impl Api for GetUsersText {
    type Response = String;

    fn endpoint_url(&self) -> &str {
        "https://api.test/users"
    }

    fn decode(&self, status: u16, body: &[u8]) -> Result<String, ApiError> {
        decode_utf8(status, body)
    }
}

impl Supports<verb::Get> for GetUsersText {}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Transport that holds every call until the test opens the gate, then
/// answers with a fixed reply.
pub struct GatedTransport {
    reply: Result<RawResponse, TransportError>,
    gate: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

/// Test-side view of a [`GatedTransport`].
#[derive(Clone)]
pub struct GateControl {
    gate: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl GatedTransport {
    pub fn replying(reply: Result<RawResponse, TransportError>) -> (Self, GateControl) {
        let transport = Self {
            reply,
            gate: Arc::new(Semaphore::new(0)),
            calls: Arc::default(),
            active: Arc::default(),
            max_active: Arc::default(),
            requests: Arc::default(),
        };
        let gate = GateControl {
            gate: transport.gate.clone(),
            calls: transport.calls.clone(),
            max_active: transport.max_active.clone(),
            requests: transport.requests.clone(),
        };
        (transport, gate)
    }

    pub fn json(status: u16, body: &str) -> (Self, GateControl) {
        Self::replying(Ok(RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        }))
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

impl GateControl {
    /// Lets `n` held calls complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// Recording callbacks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Success(u16, Value),
    Failure(u16, Option<Value>, Option<ApiError>),
}

/// Collects every delivery, tagged with the listener's name.
#[derive(Clone, Default)]
pub struct Recorder {
    deliveries: Arc<Mutex<Vec<(String, Delivery)>>>,
}

impl Recorder {
    pub fn handle(&self, name: &str) -> CallbackHandle<Value> {
        let successes = self.deliveries.clone();
        let failures = self.deliveries.clone();
        let (success_name, failure_name) = (name.to_string(), name.to_string());
        CallbackHandle::from_fns(
            move |status, body: &Value| {
                successes
                    .lock()
                    .push((success_name.clone(), Delivery::Success(status, body.clone())))
            },
            move |status, body, cause| {
                failures.lock().push((
                    failure_name.clone(),
                    Delivery::Failure(status, body.cloned(), cause.cloned()),
                ))
            },
        )
    }

    /// Like [`Recorder::handle`], for text responses; bodies are recorded as
    /// JSON strings.
    pub fn text_handle(&self, name: &str) -> CallbackHandle<String> {
        let successes = self.deliveries.clone();
        let failures = self.deliveries.clone();
        let (success_name, failure_name) = (name.to_string(), name.to_string());
        CallbackHandle::from_fns(
            move |status, body: &String| {
                successes.lock().push((
                    success_name.clone(),
                    Delivery::Success(status, Value::String(body.clone())),
                ))
            },
            move |status, body, cause| {
                failures.lock().push((
                    failure_name.clone(),
                    Delivery::Failure(
                        status,
                        body.map(|b: &String| Value::String(b.clone())),
                        cause.cloned(),
                    ),
                ))
            },
        )
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn deliveries(&self) -> Vec<(String, Delivery)> {
        self.deliveries.lock().clone()
    }

    pub fn for_listener(&self, name: &str) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
            .collect()
    }
}

/// Drives `event_loop` until `recorder` has seen `expected` deliveries.
pub async fn drive_until(event_loop: &mut EventLoop, recorder: &Recorder, expected: usize) {
    while recorder.len() < expected {
        let progressed = tokio::time::timeout(DELIVERY_TIMEOUT, event_loop.next())
            .await
            .expect("timed out waiting for delivery");
        assert!(progressed, "event loop closed before delivery");
    }
}
