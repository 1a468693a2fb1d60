//! Callback registry: coalesces listeners of identical in-flight requests.
//!
//! ## Contract
//!
//! - [`CallbackBus::register`] either admits a fingerprint (the caller must
//!   start exactly one call for it) or appends the listener to the entry of
//!   the call already in flight.
//! - The completing call removes its entry atomically ([`CallbackBus::take`]
//!   or [`CallbackBus::notify`]); registrations arriving afterwards start a
//!   fresh call. Results are never cached.
//! - Listeners are held weakly. Expired ones are pruned lazily: the entry a
//!   registration touches is pruned inline, and every [`SWEEP_INTERVAL`]
//!   registrations a stripe drops all of its entries left with no live
//!   listener.
//!
//! ## Locking
//!
//! Fingerprints hash onto independently locked stripes, so registrations for
//! different fingerprints rarely contend. Locks cover map operations only;
//! listener code always runs after the lock is released, which makes it safe
//! for a callback to submit new requests.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::identifiers::{Fingerprint, Ticket};

/// Default number of lock stripes.
pub const DEFAULT_BUS_STRIPES: usize = 16;

/// Registrations per stripe between two sweeps of expired entries.
pub const SWEEP_INTERVAL: usize = 64;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Result of [`CallbackBus::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No call was in flight for the fingerprint. The caller owns the new
    /// entry and must start the call, completing it with this ticket.
    Admitted(Ticket),
    /// A call is already in flight; the listener was queued on it.
    Coalesced,
}

impl Admission {
    /// Returns `true` if the caller must start a call.
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    /// The ticket of an admitted registration.
    pub fn ticket(self) -> Option<Ticket> {
        match self {
            Admission::Admitted(ticket) => Some(ticket),
            Admission::Coalesced => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending entry
// ---------------------------------------------------------------------------

/// Listeners waiting on one in-flight call.
pub struct PendingEntry<L: ?Sized> {
    fingerprint: Fingerprint,
    ticket: Ticket,
    listeners: Vec<Weak<L>>,
}

impl<L: ?Sized> PendingEntry<L> {
    /// Fingerprint the entry is keyed by.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Ticket of the call that owns the entry.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Number of registered references, expired ones included.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if no reference is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of listeners that are still alive.
    pub fn live_count(&self) -> usize {
        self.listeners.iter().filter(|l| l.strong_count() > 0).count()
    }

    /// Drops expired references, returning how many were removed.
    fn prune(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.strong_count() > 0);
        before - self.listeners.len()
    }

    /// Invokes `f` on every live listener in registration order, skipping
    /// expired ones. Returns the number of listeners invoked.
    pub fn notify_each<F>(self, mut f: F) -> usize
    where
        F: FnMut(&L),
    {
        let mut notified = 0;
        for weak in self.listeners {
            if let Some(listener) = weak.upgrade() {
                f(&*listener);
                notified += 1;
            }
        }
        notified
    }
}

impl<L: ?Sized> std::fmt::Debug for PendingEntry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEntry")
            .field("fingerprint", &self.fingerprint)
            .field("ticket", &self.ticket)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// One independently locked shard of the bus.
struct Stripe<L: ?Sized> {
    entries: HashMap<Fingerprint, PendingEntry<L>>,
    registrations: usize,
}

impl<L: ?Sized> Stripe<L> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            registrations: 0,
        }
    }

    /// Removes expired listeners and any entry left without live listeners.
    fn sweep(&mut self) {
        let mut pruned = 0;
        self.entries.retain(|fingerprint, entry| {
            pruned += entry.prune();
            if entry.is_empty() {
                debug!(%fingerprint, "Dropping bus entry with no live listeners");
                false
            } else {
                true
            }
        });
        if pruned > 0 {
            trace!(pruned, "Pruned expired listeners");
        }
    }
}

/// Maps fingerprints to the listeners waiting on their in-flight call.
///
/// Generic over the listener type so it can hold any (possibly unsized)
/// callback object. Each [`crate::Dispatcher`] owns its own bus.
pub struct CallbackBus<L: ?Sized> {
    stripes: Box<[Mutex<Stripe<L>>]>,
    next_ticket: AtomicU64,
}

impl<L: ?Sized> CallbackBus<L> {
    /// Creates a bus with [`DEFAULT_BUS_STRIPES`] lock stripes.
    pub fn new() -> Self {
        Self::with_stripes(DEFAULT_BUS_STRIPES)
    }

    /// Creates a bus with `stripes` lock stripes (at least one). A single
    /// stripe is one global lock.
    pub fn with_stripes(stripes: usize) -> Self {
        let stripes: Box<[Mutex<Stripe<L>>]> = (0..stripes.max(1))
            .map(|_| Mutex::new(Stripe::new()))
            .collect();
        Self {
            stripes,
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Number of lock stripes.
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    fn stripe(&self, fingerprint: &Fingerprint) -> &Mutex<Stripe<L>> {
        let mut hasher = DefaultHasher::new();
        fingerprint.hash(&mut hasher);
        let index = (hasher.finish() % self.stripes.len() as u64) as usize;
        &self.stripes[index]
    }

    /// Registers `listener` for `fingerprint`.
    ///
    /// Returns [`Admission::Admitted`] if no call with a live listener is in
    /// flight (the caller must start one) and [`Admission::Coalesced`]
    /// otherwise. An entry whose listeners have all expired is replaced by a
    /// fresh one with a new ticket.
    pub fn register(&self, fingerprint: &Fingerprint, listener: Weak<L>) -> Admission {
        let mut stripe = self.stripe(fingerprint).lock();

        stripe.registrations += 1;
        if stripe.registrations >= SWEEP_INTERVAL {
            stripe.registrations = 0;
            stripe.sweep();
        }

        if let Some(entry) = stripe.entries.get_mut(fingerprint) {
            entry.prune();
            if !entry.is_empty() {
                entry.listeners.push(listener);
                return Admission::Coalesced;
            }
            debug!(%fingerprint, "Replacing bus entry with no live listeners");
        }

        let ticket = Ticket::new(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        stripe.entries.insert(
            fingerprint.clone(),
            PendingEntry {
                fingerprint: fingerprint.clone(),
                ticket,
                listeners: vec![listener],
            },
        );
        Admission::Admitted(ticket)
    }

    /// Removes the entry for `fingerprint` if it is still owned by the call
    /// holding `ticket`.
    ///
    /// Returns `None` if the entry is gone, or was pruned and re-created by a
    /// newer call.
    pub fn take(&self, fingerprint: &Fingerprint, ticket: Ticket) -> Option<PendingEntry<L>> {
        let mut stripe = self.stripe(fingerprint).lock();
        match stripe.entries.get(fingerprint) {
            Some(entry) if entry.ticket == ticket => stripe.entries.remove(fingerprint),
            _ => None,
        }
    }

    /// Removes the entry for `fingerprint` and invokes `f` on each live
    /// listener, outside the lock. A missing entry is a no-op.
    ///
    /// Returns the number of listeners notified.
    pub fn notify<F>(&self, fingerprint: &Fingerprint, f: F) -> usize
    where
        F: FnMut(&L),
    {
        let entry = self.stripe(fingerprint).lock().entries.remove(fingerprint);
        match entry {
            Some(entry) => entry.notify_each(f),
            None => 0,
        }
    }

    /// Returns `true` if a call is in flight for `fingerprint`.
    pub fn is_pending(&self, fingerprint: &Fingerprint) -> bool {
        self.stripe(fingerprint).lock().entries.contains_key(fingerprint)
    }

    /// Number of live listeners waiting on `fingerprint`.
    pub fn listener_count(&self, fingerprint: &Fingerprint) -> usize {
        self.stripe(fingerprint)
            .lock()
            .entries
            .get(fingerprint)
            .map_or(0, PendingEntry::live_count)
    }

    /// Number of fingerprints with a call in flight.
    pub fn pending(&self) -> usize {
        self.stripes.iter().map(|stripe| stripe.lock().entries.len()).sum()
    }
}

impl<L: ?Sized> Default for CallbackBus<L> {
    fn default() -> Self {
        Self::new()
    }
}
