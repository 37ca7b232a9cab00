//! RowStore - the in-memory state container behind an editable table.
//!
//! The store owns the ordered collection and the interaction state layered
//! over it: per-row modes, the pending add session, expanded rows, the busy
//! flag, pagination and the scroll anchor. Every mutation goes through the
//! store and is announced to subscribers. Persistence is the caller's job.

use crate::{
    error::Result,
    mode::{RowModes, Slot},
    observe::{Listeners, StoreEvent, SubscriptionId},
    snapshot::{AddingRow, ViewSnapshot},
    record::assign_order_numbers,
    EngineConfig, Error, Keyed, OrderNumbered, Paginator, RecordKey, Row, RowMode,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// A removed record kept so it can be restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone<T> {
    /// Position the record had when it was removed
    pub index: usize,
    /// The removed record
    pub record: T,
}

/// What [`RowStore::restore`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RestoreOutcome<T> {
    /// A removed record was put back at this position
    Reinstated { index: usize },
    /// A visible record left the view (trash listings)
    Released(T),
}

/// Stateful controller over an ordered collection of keyed records.
pub struct RowStore<T: Row> {
    /// Collection in display order
    records: Vec<T>,
    /// Per-row interaction modes
    modes: RowModes,
    /// Draft of the pending add session
    adding: Option<AddingRow<T::Patch>>,
    /// Expanded rows, most recent first
    expanding_keys: Vec<RecordKey>,
    /// Advisory busy flag
    loading: bool,
    paginator: Paginator,
    scroll_index: usize,
    /// Removed records, oldest first
    tombstones: VecDeque<Tombstone<T>>,
    tombstone_limit: usize,
    listeners: Listeners,
}

impl<T: Row> RowStore<T> {
    /// Create a store seeded from the record source's initial snapshot.
    ///
    /// Fails with [`Error::RecordAlreadyExists`] if two records share a key.
    pub fn new(records: Vec<T>, config: &EngineConfig) -> Result<Self> {
        ensure_unique(&records)?;
        tracing::debug!(records = records.len(), "row store created");

        Ok(Self {
            records,
            modes: RowModes::new(),
            adding: None,
            expanding_keys: Vec::new(),
            loading: false,
            paginator: Paginator::new(config.page_size),
            scroll_index: 0,
            tombstones: VecDeque::new(),
            tombstone_limit: config.tombstone_limit,
            listeners: Listeners::new(),
        })
    }

    /// Create an empty store.
    pub fn empty(config: &EngineConfig) -> Self {
        Self {
            records: Vec::new(),
            modes: RowModes::new(),
            adding: None,
            expanding_keys: Vec::new(),
            loading: false,
            paginator: Paginator::new(config.page_size),
            scroll_index: 0,
            tombstones: VecDeque::new(),
            tombstone_limit: config.tombstone_limit,
            listeners: Listeners::new(),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All records in display order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Get a record by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.records.iter().find(|r| r.key() == key)
    }

    /// Zero-based position of a key in the collection.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current mode of a row.
    pub fn mode(&self, key: &str) -> RowMode {
        self.modes.mode(key)
    }

    pub fn is_adding(&self, key: &str) -> bool {
        self.mode(key) == RowMode::Adding
    }

    pub fn is_editing(&self, key: &str) -> bool {
        self.mode(key) == RowMode::Editing
    }

    /// True while the row holds the confirmation slot, for either a delete
    /// or a restore.
    pub fn is_deleting(&self, key: &str) -> bool {
        self.modes.mode(key).slot() == Some(Slot::Confirm)
    }

    pub fn is_restoring(&self, key: &str) -> bool {
        self.mode(key) == RowMode::Restoring
    }

    /// The row being edited.
    pub fn editing_key(&self) -> Option<&str> {
        self.modes.holder(Slot::Editing)
    }

    /// The row awaiting delete or restore confirmation.
    pub fn deleting_key(&self) -> Option<&str> {
        self.modes.holder(Slot::Confirm)
    }

    /// The pending add session.
    pub fn adding(&self) -> Option<&AddingRow<T::Patch>> {
        self.adding.as_ref()
    }

    /// Expanded rows, most recently expanded first.
    pub fn expanding_keys(&self) -> &[RecordKey] {
        &self.expanding_keys
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanding_keys.iter().any(|k| k == key)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    /// Records on the current page.
    pub fn visible_records(&self) -> &[T] {
        self.paginator.window(&self.records)
    }

    pub fn page_count(&self) -> usize {
        self.paginator.page_count(self.records.len())
    }

    pub fn scroll_index(&self) -> usize {
        self.scroll_index
    }

    /// Removed records that can be restored, oldest first.
    pub fn tombstones(&self) -> impl Iterator<Item = &Tombstone<T>> {
        self.tombstones.iter()
    }

    /// Copy of the full view state.
    pub fn snapshot(&self) -> ViewSnapshot<T, T::Patch> {
        ViewSnapshot {
            records: self.records.clone(),
            visible_keys: self
                .visible_records()
                .iter()
                .map(|r| r.key().to_string())
                .collect(),
            modes: self.modes.to_sorted(),
            adding: self.adding.clone(),
            expanding_keys: self.expanding_keys.clone(),
            loading: self.loading,
            paginator: self.paginator,
            scroll_index: self.scroll_index,
            tombstone_keys: self
                .tombstones
                .iter()
                .map(|t| t.record.key().to_string())
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Remove a change listener. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn emit(&mut self, event: StoreEvent) {
        self.listeners.emit(&event);
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    fn enter_mode(&mut self, key: &str, mode: RowMode) {
        for evicted in self.modes.enter(key, mode) {
            if self.adding.as_ref().is_some_and(|a| a.key == evicted) {
                self.adding = None;
            }
            self.emit(StoreEvent::ModeChanged {
                key: evicted,
                mode: RowMode::Idle,
            });
        }
        if mode != RowMode::Adding && self.adding.as_ref().is_some_and(|a| a.key == key) {
            self.adding = None;
        }
        tracing::debug!(key, ?mode, "row mode changed");
        self.emit(StoreEvent::ModeChanged {
            key: key.to_string(),
            mode,
        });
    }

    fn clear_slot(&mut self, slot: Slot) {
        if slot == Slot::Adding {
            self.adding = None;
        }
        if let Some(key) = self.modes.clear_slot(slot) {
            tracing::debug!(key = %key, ?slot, "row mode cleared");
            self.emit(StoreEvent::ModeChanged {
                key,
                mode: RowMode::Idle,
            });
        }
    }

    fn clear_key(&mut self, key: &str) {
        let previous = self.modes.clear_key(key);
        if previous == RowMode::Adding {
            self.adding = None;
        }
        if previous != RowMode::Idle {
            self.emit(StoreEvent::ModeChanged {
                key: key.to_string(),
                mode: RowMode::Idle,
            });
        }
    }

    /// Open an add session for a row that is not yet in the collection,
    /// replacing any previous session.
    ///
    /// Returns false, changing nothing, if the key is already in the
    /// collection.
    pub fn start_adding(&mut self, key: &str, draft: Option<T::Patch>) -> bool {
        if self.contains(key) {
            tracing::debug!(key, "add session ignored, key already present");
            return false;
        }
        self.enter_mode(key, RowMode::Adding);
        self.adding = Some(AddingRow {
            key: key.to_string(),
            draft,
        });
        true
    }

    pub fn start_editing(&mut self, key: &str) {
        self.enter_mode(key, RowMode::Editing);
    }

    pub fn start_deleting(&mut self, key: &str) {
        self.enter_mode(key, RowMode::Deleting);
    }

    pub fn start_restore(&mut self, key: &str) {
        self.enter_mode(key, RowMode::Restoring);
    }

    pub fn cancel_adding(&mut self) {
        self.clear_slot(Slot::Adding);
    }

    pub fn cancel_editing(&mut self) {
        self.clear_slot(Slot::Editing);
    }

    /// Clears the confirmation slot, whether it holds a delete or a restore.
    pub fn cancel_deleting(&mut self) {
        self.clear_slot(Slot::Confirm);
    }

    /// Clears the confirmation slot, whether it holds a delete or a restore.
    pub fn cancel_restore(&mut self) {
        self.clear_slot(Slot::Confirm);
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    /// Expand or collapse a row.
    ///
    /// Expanding puts the key at the front exactly once; collapsing removes
    /// it. Collapsing a row that is not expanded does nothing.
    pub fn start_expanding(&mut self, expanded: bool, key: &str) {
        let existing = self.expanding_keys.iter().position(|k| k == key);
        match (expanded, existing) {
            (true, Some(0)) | (false, None) => return,
            (true, Some(index)) => {
                let key = self.expanding_keys.remove(index);
                self.expanding_keys.insert(0, key);
            }
            (true, None) => self.expanding_keys.insert(0, key.to_string()),
            (false, Some(index)) => {
                self.expanding_keys.remove(index);
            }
        }
        tracing::debug!(key, expanded, "row expansion changed");
        self.emit(StoreEvent::ExpansionChanged {
            keys: self.expanding_keys.clone(),
        });
    }

    /// Collapse every row.
    pub fn close_expanding(&mut self) {
        if self.expanding_keys.is_empty() {
            return;
        }
        self.expanding_keys.clear();
        self.emit(StoreEvent::ExpansionChanged { keys: Vec::new() });
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    /// Set the advisory busy flag. Mutations are not blocked while it is set.
    pub fn set_loading(&mut self, loading: bool) {
        if self.loading == loading {
            return;
        }
        self.loading = loading;
        self.emit(StoreEvent::LoadingChanged { loading });
    }

    pub fn set_page(&mut self, page: usize) {
        let before = self.paginator;
        self.paginator.set_page(page);
        self.paginator_changed(before);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let before = self.paginator;
        self.paginator.set_page_size(page_size);
        self.paginator_changed(before);
    }

    fn paginator_changed(&mut self, before: Paginator) {
        if self.paginator != before {
            self.emit(StoreEvent::PaginatorChanged {
                paginator: self.paginator,
            });
        }
    }

    pub fn set_scroll_index(&mut self, index: usize) {
        if self.scroll_index == index {
            return;
        }
        self.scroll_index = index;
        self.emit(StoreEvent::ScrollChanged { index });
    }

    /// Announce a collection change and pull the page back in range.
    fn records_changed(&mut self) {
        self.emit(StoreEvent::RecordsChanged {
            len: self.records.len(),
        });
        let last_page = self.page_count();
        if self.paginator.page > last_page {
            self.set_page(last_page);
        }
    }

    // ------------------------------------------------------------------
    // Collection mutations
    // ------------------------------------------------------------------

    /// Merge `patch` into the record with `key`, or append a new record built
    /// from the patch when the key is absent.
    ///
    /// The busy flag is raised for the duration of the mutation. The busy
    /// flag and the editing slot are reset on every exit path; merge errors
    /// are returned afterwards and leave the record unchanged.
    pub fn update(&mut self, key: &str, patch: T::Patch) -> Result<&T> {
        self.set_loading(true);
        let result = self.merge_or_append(key, patch);
        self.set_loading(false);
        self.clear_slot(Slot::Editing);

        match result {
            Ok(index) => {
                if self.is_adding(key) {
                    self.clear_slot(Slot::Adding);
                }
                self.records_changed();
                Ok(&self.records[index])
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "update failed");
                Err(err)
            }
        }
    }

    fn merge_or_append(&mut self, key: &str, patch: T::Patch) -> Result<usize> {
        match self.position(key) {
            Some(index) => {
                let mut merged = self.records[index].clone();
                merged.merge(patch)?;
                if merged.key() != key {
                    return Err(Error::MergeFailed(format!(
                        "merge changed key '{}' to '{}'",
                        key,
                        merged.key()
                    )));
                }
                self.records[index] = merged;
                tracing::debug!(key, index, "record merged");
                Ok(index)
            }
            None => {
                let record = T::from_patch(key, patch)?;
                if record.key() != key {
                    return Err(Error::MergeFailed(format!(
                        "record built for '{}' has key '{}'",
                        key,
                        record.key()
                    )));
                }
                self.records.push(record);
                tracing::debug!(key, "record appended");
                Ok(self.records.len() - 1)
            }
        }
    }

    /// Insert a new record at the front of the collection.
    ///
    /// Commits a matching add session. Fails with
    /// [`Error::RecordAlreadyExists`] if the key is already present.
    pub fn add_new(&mut self, record: T) -> Result<()> {
        let key = record.key().to_string();
        if self.contains(&key) {
            tracing::warn!(key = %key, "add rejected, key already present");
            return Err(Error::RecordAlreadyExists(key));
        }

        self.records.insert(0, record);
        self.tombstones.retain(|t| t.record.key() != key);
        if self.is_adding(&key) {
            self.clear_slot(Slot::Adding);
        }
        tracing::debug!(key = %key, "record added");
        self.records_changed();
        Ok(())
    }

    /// Remove the record with `key` from the collection.
    ///
    /// The removed record is kept as a tombstone so [`RowStore::restore`] can
    /// put it back. Returns `None` if the key is absent.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        self.set_loading(true);
        let removed = self.position(key).map(|index| {
            let record = self.records.remove(index);
            self.push_tombstone(index, record.clone());
            record
        });
        self.set_loading(false);

        if removed.is_some() {
            self.clear_key(key);
            tracing::debug!(key, "record removed");
            self.records_changed();
        }
        removed
    }

    fn push_tombstone(&mut self, index: usize, record: T) {
        if self.tombstone_limit == 0 {
            return;
        }
        self.tombstones.retain(|t| t.record.key() != record.key());
        self.tombstones.push_back(Tombstone { index, record });
        while self.tombstones.len() > self.tombstone_limit {
            self.tombstones.pop_front();
        }
    }

    /// Restore the record with `key`.
    ///
    /// A record still visible leaves the view, as in trash listings where
    /// every row is already soft-deleted. Otherwise a tombstoned record is
    /// put back at its former position (clamped to the end). Returns `None`
    /// when there is nothing to restore.
    pub fn restore(&mut self, key: &str) -> Option<RestoreOutcome<T>> {
        self.set_loading(true);
        let outcome = match self.position(key) {
            Some(index) => {
                self.tombstones.retain(|t| t.record.key() != key);
                Some(RestoreOutcome::Released(self.records.remove(index)))
            }
            None => self
                .tombstones
                .iter()
                .position(|t| t.record.key() == key)
                .and_then(|at| self.tombstones.remove(at))
                .map(|tombstone| {
                    let index = tombstone.index.min(self.records.len());
                    self.records.insert(index, tombstone.record);
                    RestoreOutcome::Reinstated { index }
                }),
        };
        self.set_loading(false);

        if outcome.is_some() {
            self.clear_key(key);
            tracing::debug!(key, "record restored");
            self.records_changed();
        }
        outcome
    }

    /// Move the record `active_key` to the position of `over_key`, shifting
    /// the records in between by one.
    ///
    /// Returns false, leaving the collection untouched, when the keys are
    /// equal or either key is absent.
    pub fn reorder(&mut self, active_key: &str, over_key: &str) -> bool {
        self.reorder_with(active_key, over_key, |_| {})
    }

    /// Like [`RowStore::reorder`], then hand the new order to `on_finish`.
    ///
    /// `on_finish` is where callers recompute and persist order numbers; it
    /// is not invoked when nothing moved.
    pub fn reorder_with<F>(&mut self, active_key: &str, over_key: &str, on_finish: F) -> bool
    where
        F: FnOnce(&[T]),
    {
        if active_key == over_key {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(active_key), self.position(over_key)) else {
            tracing::debug!(active_key, over_key, "reorder ignored, key not found");
            return false;
        };

        let record = self.records.remove(from);
        self.records.insert(to, record);
        tracing::debug!(active_key, from, to, "record moved");

        self.emit(StoreEvent::RecordsChanged {
            len: self.records.len(),
        });
        on_finish(&self.records);
        true
    }

    /// Replace the collection with a fresh snapshot from the record source.
    ///
    /// Tombstones are dropped. Modes and expansion of keys that no longer
    /// exist are cleared. A pending add session survives unless the new
    /// snapshot already contains its key.
    pub fn reload(&mut self, records: Vec<T>) -> Result<()> {
        ensure_unique(&records)?;
        self.records = records;
        self.tombstones.clear();

        let present: HashSet<RecordKey> =
            self.records.iter().map(|r| r.key().to_string()).collect();

        let mut dropped = Vec::new();
        self.modes.retain(|key, mode| {
            // An add session ends once its key shows up in the collection
            let keep = if mode == RowMode::Adding {
                !present.contains(key)
            } else {
                present.contains(key)
            };
            if !keep {
                dropped.push(key.to_string());
            }
            keep
        });
        if self
            .adding
            .as_ref()
            .is_some_and(|a| present.contains(&a.key))
        {
            self.adding = None;
        }
        for key in dropped {
            self.emit(StoreEvent::ModeChanged {
                key,
                mode: RowMode::Idle,
            });
        }

        let expanded_before = self.expanding_keys.len();
        self.expanding_keys.retain(|k| present.contains(k));
        if self.expanding_keys.len() != expanded_before {
            self.emit(StoreEvent::ExpansionChanged {
                keys: self.expanding_keys.clone(),
            });
        }

        tracing::debug!(records = self.records.len(), "row store reloaded");
        self.records_changed();
        Ok(())
    }
}

impl<T: Row + OrderNumbered> RowStore<T> {
    /// Rewrite order numbers to match the current display order.
    ///
    /// Returns the keys whose order number changed; those are the records a
    /// caller has to persist after a reorder.
    pub fn renumber(&mut self) -> Vec<RecordKey> {
        let changed = assign_order_numbers(&mut self.records);
        if !changed.is_empty() {
            tracing::debug!(changed = changed.len(), "order numbers reassigned");
            self.emit(StoreEvent::RecordsChanged {
                len: self.records.len(),
            });
        }
        changed
    }
}

fn ensure_unique<T: Keyed>(records: &[T]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.key()) {
            return Err(Error::RecordAlreadyExists(record.key().to_string()));
        }
    }
    Ok(())
}

impl<T: Row + fmt::Debug> fmt::Debug for RowStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStore")
            .field("records", &self.records)
            .field("modes", &self.modes)
            .field("expanding_keys", &self.expanding_keys)
            .field("loading", &self.loading)
            .field("paginator", &self.paginator)
            .field("scroll_index", &self.scroll_index)
            .field("tombstones", &self.tombstones.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}
