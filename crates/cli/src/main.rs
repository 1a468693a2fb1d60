//! restbus CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: command-line flags, optionally layered over a
//!    JSON file with `dispatcher` and `transport` sections.
//! 2. **Wire observability**: install a `tracing-subscriber` with an
//!    `EnvFilter` and, when `RESTBUS_LOG_FORMAT=json`, a JSON layer.
//! 3. **Construct infrastructure**: build the `reqwest`-backed
//!    [`transport::HttpTransport`] and inject it into a
//!    [`dispatch::Dispatcher`] delivering on an event loop owned by `main`.
//! 4. **Run**: submit `--repeat` identical requests at once, then drive the
//!    event loop until every caller has received its outcome. Identical
//!    in-flight requests share one HTTP call.
//!
//! Exits non-zero if any caller received a failure.

mod args;
mod endpoint;
mod observability;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dispatch::{event_loop, CallbackGroup, CallbackHandle, Dispatcher, Verb};
use tracing::info;
use transport::HttpTransport;

use crate::args::Args;
use crate::endpoint::RawEndpoint;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    observability::init_tracing()?;

    let config = args.app_config()?;
    let transport =
        HttpTransport::new(&config.transport).context("failed to build HTTP transport")?;
    let (loop_handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::builder()
        .config(config.dispatcher)
        .build(transport, loop_handle)
        .context("failed to build dispatcher")?;

    let endpoint = RawEndpoint::new(&args.url);
    let callers = CallbackGroup::new("restbus-cli");
    let delivered = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    for caller in 0..args.repeat {
        let listener = callers.adopt(reporter(caller, &delivered, &failed));
        let (headers, params) = (args.headers(), args.params());
        match args.verb {
            Verb::Get => dispatcher.get(&endpoint, headers, params, listener),
            Verb::Put => dispatcher.put(&endpoint, headers, params, listener),
            Verb::Post => dispatcher.post(&endpoint, headers, params, listener),
            Verb::Delete => dispatcher.delete(&endpoint, headers, params, listener),
        }
    }
    info!(
        callers = args.repeat,
        in_flight = dispatcher.pending_calls(),
        "Requests submitted"
    );

    let expected = args.repeat as usize;
    while delivered.load(Ordering::SeqCst) < expected {
        if !event_loop.next().await {
            bail!("delivery loop closed before every caller was answered");
        }
    }
    callers.unregister_all();

    let failures = failed.load(Ordering::SeqCst);
    if failures > 0 {
        bail!("{failures} of {expected} callers received a failure");
    }
    Ok(())
}

/// Callback printing one caller's outcome and counting it.
fn reporter(
    caller: u32,
    delivered: &Arc<AtomicUsize>,
    failed: &Arc<AtomicUsize>,
) -> CallbackHandle<String> {
    let (on_ok, on_err) = (Arc::clone(delivered), Arc::clone(delivered));
    let failed = Arc::clone(failed);
    CallbackHandle::from_fns(
        move |status, body: &String| {
            println!("[caller {caller}] {status}\n{body}");
            on_ok.fetch_add(1, Ordering::SeqCst);
        },
        move |status, body, cause| {
            match (body, cause) {
                (_, Some(cause)) => eprintln!("[caller {caller}] failed ({status}): {cause}"),
                (Some(body), None) => eprintln!("[caller {caller}] {status}\n{body}"),
                (None, None) => eprintln!("[caller {caller}] failed ({status})"),
            }
            failed.fetch_add(1, Ordering::SeqCst);
            on_err.fetch_add(1, Ordering::SeqCst);
        },
    )
}
