//! Change notification for view bindings.
//!
//! A rendering layer subscribes to a [`crate::RowStore`] and re-reads the
//! state it cares about whenever an event arrives. Listeners run
//! synchronously, after the change has been applied.

use crate::{Paginator, RecordKey, RowMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier returned by `subscribe`.
pub type SubscriptionId = u64;

/// A state change in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    /// The collection was mutated
    RecordsChanged { len: usize },
    /// A row entered a mode (`Idle` when it left one)
    ModeChanged { key: RecordKey, mode: RowMode },
    /// The set of expanded rows changed
    ExpansionChanged { keys: Vec<RecordKey> },
    /// The busy flag flipped
    LoadingChanged { loading: bool },
    /// Page or page size changed
    PaginatorChanged { paginator: Paginator },
    /// The viewport anchor moved
    ScrollChanged { index: usize },
}

type Listener = Box<dyn FnMut(&StoreEvent) + Send>;

/// Registered listeners, in subscription order.
#[derive(Default)]
pub struct Listeners {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Listener)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + Send + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push((id, Box::new(listener)));
        tracing::debug!(subscription = id, "listener subscribed");
        id
    }

    /// Remove a listener. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }

    /// Deliver `event` to every listener.
    pub fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
