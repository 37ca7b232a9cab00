//! Read snapshots of a store's view state.
//!
//! Callers never get mutable access to the collection; they read a snapshot
//! and route every mutation through the store.

use crate::{Paginator, RecordKey, RowMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pending add session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddingRow<P> {
    /// Key the new row will get
    pub key: RecordKey,
    /// Draft payload, if any
    pub draft: Option<P>,
}

/// A point-in-time copy of everything a table view renders.
///
/// Uses BTreeMap for modes so serialization order is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot<T, P> {
    /// Full collection in display order
    pub records: Vec<T>,
    /// Rows on the current page
    pub visible_keys: Vec<RecordKey>,
    /// Modes of non-idle rows
    pub modes: BTreeMap<RecordKey, RowMode>,
    /// Pending add session
    pub adding: Option<AddingRow<P>>,
    /// Expanded rows, most recent first
    pub expanding_keys: Vec<RecordKey>,
    /// Busy flag
    pub loading: bool,
    /// Current page
    pub paginator: Paginator,
    /// Viewport anchor
    pub scroll_index: usize,
    /// Keys that can currently be restored
    pub tombstone_keys: Vec<RecordKey>,
}

impl<T, P> ViewSnapshot<T, P> {
    /// The key currently holding `mode`, if any.
    pub fn key_in(&self, mode: RowMode) -> Option<&str> {
        self.modes
            .iter()
            .find(|(_, m)| **m == mode)
            .map(|(key, _)| key.as_str())
    }

    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> ViewSnapshot<Value, Value> {
        let mut modes = BTreeMap::new();
        modes.insert("cut-2".to_string(), RowMode::Editing);

        ViewSnapshot {
            records: vec![json!({"key": "cut-1"}), json!({"key": "cut-2"})],
            visible_keys: vec!["cut-1".into(), "cut-2".into()],
            modes,
            adding: Some(AddingRow {
                key: "cut-3".into(),
                draft: None,
            }),
            expanding_keys: vec!["cut-1".into()],
            loading: false,
            paginator: Paginator::default(),
            scroll_index: 0,
            tombstone_keys: Vec::new(),
        }
    }

    #[test]
    fn key_in_finds_mode_holder() {
        let snapshot = sample();
        assert_eq!(snapshot.key_in(RowMode::Editing), Some("cut-2"));
        assert_eq!(snapshot.key_in(RowMode::Deleting), None);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn serialization_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["modes"], json!({"cut-2": "editing"}));
        assert_eq!(json["adding"], json!({"key": "cut-3", "draft": null}));
        assert_eq!(json["paginator"], json!({"page": 1, "pageSize": 10}));
        assert_eq!(json["expandingKeys"], json!(["cut-1"]));
    }
}
