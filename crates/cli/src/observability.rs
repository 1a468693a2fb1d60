//! Tracing subscriber wiring.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the log format. `json` switches to JSON
/// lines; anything else keeps the human-readable format.
pub const LOG_FORMAT_ENV: &str = "RESTBUS_LOG_FORMAT";

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Logs go to stderr
/// so stdout carries only response output.
pub fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    let subscriber = Registry::default().with(env_filter);

    let installed = if json_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref()) {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))
    };
    installed.context("a global tracing subscriber is already installed")
}

fn json_requested(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("json"))
}
