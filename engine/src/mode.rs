//! Per-row interaction modes.
//!
//! Each row is in exactly one [`RowMode`]. Modes are grouped into single-slot
//! [`Slot`]s: at most one row can occupy a slot at a time. Deleting and
//! Restoring share the confirmation slot.

use crate::RecordKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Interaction state of a single row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowMode {
    /// No workflow active
    #[default]
    Idle,
    /// Pending new row, not yet in the collection
    Adding,
    /// Row is being edited
    Editing,
    /// Row awaits delete confirmation
    Deleting,
    /// Row awaits restore confirmation
    Restoring,
}

/// A single-occupancy group of modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Adding,
    Editing,
    /// Shared by [`RowMode::Deleting`] and [`RowMode::Restoring`]
    Confirm,
}

impl RowMode {
    /// The slot this mode occupies, `None` for [`RowMode::Idle`].
    pub fn slot(self) -> Option<Slot> {
        match self {
            RowMode::Idle => None,
            RowMode::Adding => Some(Slot::Adding),
            RowMode::Editing => Some(Slot::Editing),
            RowMode::Deleting | RowMode::Restoring => Some(Slot::Confirm),
        }
    }
}

/// Modes of all non-idle rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowModes {
    modes: HashMap<RecordKey, RowMode>,
}

impl RowModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode of `key`.
    pub fn mode(&self, key: &str) -> RowMode {
        self.modes.get(key).copied().unwrap_or_default()
    }

    /// The key currently occupying `slot`.
    pub fn holder(&self, slot: Slot) -> Option<&str> {
        self.modes
            .iter()
            .find(|(_, mode)| mode.slot() == Some(slot))
            .map(|(key, _)| key.as_str())
    }

    /// Put `key` into `mode`.
    ///
    /// Any other key holding the same slot is evicted back to idle, and the
    /// key's own previous mode is replaced. Returns the evicted keys.
    pub fn enter(&mut self, key: &str, mode: RowMode) -> Vec<RecordKey> {
        let Some(slot) = mode.slot() else {
            self.clear_key(key);
            return Vec::new();
        };

        let evicted: Vec<RecordKey> = self
            .modes
            .iter()
            .filter(|(k, m)| m.slot() == Some(slot) && k.as_str() != key)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &evicted {
            self.modes.remove(k);
        }

        self.modes.insert(key.to_string(), mode);
        evicted
    }

    /// Return whoever holds `slot` to idle.
    pub fn clear_slot(&mut self, slot: Slot) -> Option<RecordKey> {
        let key = self.holder(slot)?.to_string();
        self.modes.remove(&key);
        Some(key)
    }

    /// Return `key` to idle, yielding its previous mode.
    pub fn clear_key(&mut self, key: &str) -> RowMode {
        self.modes.remove(key).unwrap_or_default()
    }

    /// Drop modes of keys for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, RowMode) -> bool) {
        self.modes.retain(|key, mode| keep(key, *mode));
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Deterministically ordered copy, used by snapshots.
    pub fn to_sorted(&self) -> BTreeMap<RecordKey, RowMode> {
        self.modes
            .iter()
            .map(|(key, mode)| (key.clone(), *mode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_idle() {
        let modes = RowModes::new();
        assert_eq!(modes.mode("cut-1"), RowMode::Idle);
        assert!(modes.holder(Slot::Editing).is_none());
    }

    #[test]
    fn entering_evicts_previous_holder() {
        let mut modes = RowModes::new();
        assert!(modes.enter("a", RowMode::Editing).is_empty());

        let evicted = modes.enter("b", RowMode::Editing);
        assert_eq!(evicted, vec!["a".to_string()]);
        assert_eq!(modes.mode("a"), RowMode::Idle);
        assert_eq!(modes.mode("b"), RowMode::Editing);
    }

    #[test]
    fn slots_are_independent() {
        let mut modes = RowModes::new();
        modes.enter("a", RowMode::Editing);
        modes.enter("b", RowMode::Deleting);
        modes.enter("new", RowMode::Adding);

        assert_eq!(modes.holder(Slot::Editing), Some("a"));
        assert_eq!(modes.holder(Slot::Confirm), Some("b"));
        assert_eq!(modes.holder(Slot::Adding), Some("new"));
    }

    #[test]
    fn deleting_and_restoring_share_a_slot() {
        let mut modes = RowModes::new();
        modes.enter("a", RowMode::Deleting);
        let evicted = modes.enter("b", RowMode::Restoring);

        assert_eq!(evicted, vec!["a".to_string()]);
        assert_eq!(modes.holder(Slot::Confirm), Some("b"));
    }

    #[test]
    fn a_key_holds_one_mode() {
        let mut modes = RowModes::new();
        modes.enter("a", RowMode::Editing);
        modes.enter("a", RowMode::Deleting);

        assert_eq!(modes.mode("a"), RowMode::Deleting);
        assert!(modes.holder(Slot::Editing).is_none());
    }

    #[test]
    fn clear_slot_and_key() {
        let mut modes = RowModes::new();
        modes.enter("a", RowMode::Restoring);
        assert_eq!(modes.clear_slot(Slot::Confirm), Some("a".to_string()));
        assert_eq!(modes.clear_slot(Slot::Confirm), None);

        modes.enter("b", RowMode::Editing);
        assert_eq!(modes.clear_key("b"), RowMode::Editing);
        assert_eq!(modes.clear_key("b"), RowMode::Idle);
        assert!(modes.is_empty());
    }

    #[test]
    fn entering_idle_clears() {
        let mut modes = RowModes::new();
        modes.enter("a", RowMode::Editing);
        modes.enter("a", RowMode::Idle);
        assert!(modes.is_empty());
    }

    #[test]
    fn serialization_format() {
        let json = serde_json::to_string(&RowMode::Restoring).unwrap();
        assert_eq!(json, "\"restoring\"");
    }
}
