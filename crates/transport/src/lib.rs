//! HTTP transport infrastructure adapter.
//!
//! Implements the [`dispatch::Transport`] trait over `reqwest`. Other
//! transports (a recording proxy, an in-process test double) implement the
//! same trait without any change to the `dispatch` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS, timeouts, header encoding and
//! the mapping from `reqwest` failures onto [`dispatch::TransportError`] live
//! here. The `dispatch` crate sees only [`dispatch::Transport`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | [`HttpTransport`] |
//! | [`config`] | [`HttpTransportConfig`] |
//! | [`errors`] | Adapter construction errors |

pub mod client;
pub mod config;
pub mod errors;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::HttpTransport;
pub use config::HttpTransportConfig;
pub use errors::BuildError;
