//! Delivery contexts: where completion callbacks run.
//!
//! Worker tasks never invoke caller callbacks directly. They post a task to
//! the dispatcher's [`DeliveryContext`], which runs it wherever the owner of
//! the callbacks lives.
//!
//! Two implementations are provided:
//!
//! - [`event_loop`] returns a [`LoopHandle`] / [`EventLoop`] pair. The handle
//!   is given to the dispatcher; the loop is drained by the owning thread
//!   (once per frame with [`EventLoop::run_pending`], or until shutdown with
//!   [`EventLoop::run`]). Tasks run in the order they were posted.
//! - [`Inline`] runs tasks immediately on the worker that posted them.
//!
//! ## Dropped deliveries
//!
//! Once the [`EventLoop`] has been dropped, tasks posted to its handles are
//! discarded without error. An owner that has gone away has nobody left to
//! notify, so this is not treated as a failure.

use tokio::sync::mpsc;
use tracing::debug;

/// A unit of work posted to a delivery context.
pub type DeliveryTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs posted tasks on the context that owns the callbacks.
pub trait DeliveryContext: Send + Sync {
    /// Schedules `task`. Tasks posted to the same context run in FIFO order.
    fn post(&self, task: DeliveryTask);
}

// ---------------------------------------------------------------------------
// Inline
// ---------------------------------------------------------------------------

/// Runs every task immediately on the posting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl DeliveryContext for Inline {
    fn post(&self, task: DeliveryTask) {
        task();
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Creates a connected [`LoopHandle`] / [`EventLoop`] pair.
pub fn event_loop() -> (LoopHandle, EventLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LoopHandle { tx }, EventLoop { rx })
}

/// Posting side of an [`EventLoop`]. Cheap to clone.
#[derive(Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<DeliveryTask>,
}

impl LoopHandle {
    /// Returns `true` once the [`EventLoop`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl DeliveryContext for LoopHandle {
    fn post(&self, task: DeliveryTask) {
        if self.tx.send(task).is_err() {
            debug!("Delivery dropped: event loop is gone");
        }
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving side: owned by the thread that should run callbacks.
pub struct EventLoop {
    rx: mpsc::UnboundedReceiver<DeliveryTask>,
}

impl EventLoop {
    /// Runs every task already queued, without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks until every [`LoopHandle`] is dropped. Returns how many ran.
    ///
    /// Blocks the current thread; must not be called from inside an async
    /// runtime (use [`EventLoop::run_async`] there).
    pub fn run(mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.rx.blocking_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits for the next task and runs it. Returns `false` once every
    /// [`LoopHandle`] is dropped and the queue is empty.
    pub async fn next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Async counterpart of [`EventLoop::run`].
    pub async fn run_async(&mut self) -> usize {
        let mut ran = 0;
        while self.next().await {
            ran += 1;
        }
        ran
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop").finish_non_exhaustive()
    }
}
