//! Unread counters shared across screens
//!
//! One synchronizer per signed-in session holds the unread message and
//! notification counts. Reading an item decrements its counter immediately;
//! only the next authoritative fetch corrects it. A failed "mark read" call
//! does not restore the count.
//!
//! Consumers subscribe through a [`tokio::sync::watch`] channel and re-render
//! from the latest [`CounterState`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::progress::UnreadCounts;

/// Which unread badge a counter backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Messages,
    Notifications,
}

impl CounterKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Notifications => "notifications",
        }
    }

    /// Both kinds
    pub fn all() -> &'static [CounterKind] {
        &[Self::Messages, Self::Notifications]
    }
}

/// A remote total plus local decrements not yet confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounter {
    /// Last value confirmed by the server
    pub authoritative: u32,
    /// Decrements applied since that value arrived
    pub pending_decrements: u32,
}

impl UnreadCounter {
    /// Count to display, never below zero
    pub fn effective(&self) -> u32 {
        self.authoritative.saturating_sub(self.pending_decrements)
    }
}

/// Both counters of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    pub messages: UnreadCounter,
    pub notifications: UnreadCounter,
}

impl CounterState {
    /// Counter of one kind
    pub fn counter(&self, kind: CounterKind) -> &UnreadCounter {
        match kind {
            CounterKind::Messages => &self.messages,
            CounterKind::Notifications => &self.notifications,
        }
    }

    fn counter_mut(&mut self, kind: CounterKind) -> &mut UnreadCounter {
        match kind {
            CounterKind::Messages => &mut self.messages,
            CounterKind::Notifications => &mut self.notifications,
        }
    }

    /// Effective value of one kind
    pub fn effective(&self, kind: CounterKind) -> u32 {
        self.counter(kind).effective()
    }
}

/// Session-wide unread counter service
#[derive(Debug)]
pub struct CounterSynchronizer {
    state: watch::Sender<CounterState>,
}

impl Default for CounterSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSynchronizer {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CounterState::default());
        Self { state }
    }

    /// Accept a server total, discarding pending decrements
    pub fn set_authoritative(&self, kind: CounterKind, value: u32) {
        self.state.send_if_modified(|state| {
            let counter = state.counter_mut(kind);
            let next = UnreadCounter { authoritative: value, pending_decrements: 0 };
            let changed = *counter != next;
            *counter = next;
            changed
        });
        tracing::debug!(kind = kind.as_str(), value, "authoritative unread count accepted");
    }

    /// Accept both server totals at once
    pub fn set_all_authoritative(&self, counts: UnreadCounts) {
        self.set_authoritative(CounterKind::Messages, counts.messages);
        self.set_authoritative(CounterKind::Notifications, counts.notifications);
    }

    /// Subtract locally ahead of server confirmation
    ///
    /// Not idempotent: each call counts. Callers must invoke it once per
    /// read event.
    pub fn optimistic_decrement(&self, kind: CounterKind, amount: u32) {
        self.state.send_if_modified(|state| {
            if amount == 0 {
                return false;
            }
            let counter = state.counter_mut(kind);
            let before = counter.effective();
            counter.pending_decrements = counter.pending_decrements.saturating_add(amount);
            counter.effective() != before
        });
    }

    /// Count to display for one kind
    pub fn effective_value(&self, kind: CounterKind) -> u32 {
        self.state.borrow().effective(kind)
    }

    /// Full state of both counters
    pub fn snapshot(&self) -> CounterState {
        *self.state.borrow()
    }

    /// Receive every change from now on
    pub fn subscribe(&self) -> watch::Receiver<CounterState> {
        self.state.subscribe()
    }

    /// Zero both counters (logout)
    pub fn reset(&self) {
        self.state.send_replace(CounterState::default());
    }
}
