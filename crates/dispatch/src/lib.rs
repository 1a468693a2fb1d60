//! Coalescing REST dispatcher.
//!
//! Callers describe endpoints with [`Api`] descriptors and submit requests
//! through a [`Dispatcher`]. Identical requests issued while one is already
//! in flight share that single HTTP call; every caller receives the same
//! outcome, on the [`DeliveryContext`] the dispatcher was built with.
//!
//! ```text
//!  caller ──submit──▶ Dispatcher ──register──▶ CallbackBus
//!                         │ admitted?                 ▲
//!                         ▼                           │ take
//!                    worker task ──execute──▶ Transport
//!                         │
//!                         └──post──▶ DeliveryContext ──▶ callbacks
//! ```
//!
//! ## Architectural Layer
//!
//! **Domain + ports.** This crate performs no network I/O. The HTTP call is
//! behind the [`Transport`] trait (implemented over `reqwest` by the
//! `transport` crate); where callbacks run is behind [`DeliveryContext`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`api`] | Endpoint descriptors, verb capabilities, decode helpers |
//! | [`bus`] | Fingerprint → pending listeners registry |
//! | [`callback`] | Callback trait, strong handles, weak listener refs |
//! | [`config`] | Worker pool and bus configuration |
//! | [`delivery`] | Delivery contexts (event loop, inline) |
//! | [`dispatcher`] | The coalescing dispatcher |
//! | [`envelope`] | Outcome of one call |
//! | [`errors`] | Failure causes and configuration errors |
//! | [`identifiers`] | Fingerprints, tickets, call ids |
//! | [`lifecycle`] | Owner-scoped callback groups |
//! | [`transform`] | Payload-reshaping callback adapter |
//! | [`transport`] | HTTP transport port |
//! | [`types`] | Params, headers, verbs, timestamps |

pub mod api;
pub mod bus;
pub mod callback;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod transform;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use api::{decode_json, decode_utf8, verb, Api, Supports};
pub use bus::{Admission, CallbackBus, PendingEntry, DEFAULT_BUS_STRIPES};
pub use callback::{ApiCallback, CallbackHandle, FnCallback, ListenerRef};
pub use config::DispatcherConfig;
pub use delivery::{event_loop, DeliveryContext, DeliveryTask, EventLoop, Inline, LoopHandle};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use envelope::ResponseEnvelope;
pub use errors::{ApiError, ConfigError, TransportError};
pub use identifiers::{CallId, Fingerprint, Ticket};
pub use lifecycle::CallbackGroup;
pub use transform::Transformer;
pub use transport::{HttpRequest, RawResponse, Transport};
pub use types::{form_encode, is_2xx, params_from_pairs, Headers, Params, Timestamp, Verb, NO_RESPONSE};
