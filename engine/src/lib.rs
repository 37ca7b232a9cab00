//! # Row-State Engine
//!
//! The state controller behind every editable table of a production
//! dashboard (cutting, sewing, printing, completion, delivery).
//!
//! The engine keeps an ordered collection of keyed records and the
//! interaction state layered over it. It runs synchronously, does no IO, and
//! leaves persistence to the caller.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! The engine is generic over the record type:
//! - [`Keyed`] - a unique key that is stable across reorders
//! - [`Row`] - a patch type and a shallow merge, for editing
//! - [`OrderNumbered`] - a persisted position, for drag reordering
//!
//! [`JsonRow`] implements all three for JSON payloads.
//!
//! ### Row modes
//!
//! Each row is in one [`RowMode`]: idle, adding, editing, deleting or
//! restoring. At most one row is editing, at most one row is adding, and at
//! most one row awaits a delete or restore confirmation. Entering a mode
//! evicts the previous holder, so a row can never be editing and deleting at
//! once.
//!
//! ### Tombstones
//!
//! [`RowStore::remove`] keeps the removed record as a [`Tombstone`] so that
//! [`RowStore::restore`] can put it back where it was.
//!
//! ### Progress
//!
//! The [`progress`] module compares cumulative production quantities
//! against order targets.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowstate_engine::{EngineConfig, JsonRow, RowStore};
//! use serde_json::json;
//!
//! // 1. Seed a store from the record source
//! let rows = vec![
//!     JsonRow::new("cut-1").with_field("fabric", "denim"),
//!     JsonRow::new("cut-2").with_field("fabric", "twill"),
//! ];
//! let mut store = RowStore::new(rows, &EngineConfig::default()).unwrap();
//!
//! // 2. Edit a row
//! store.start_editing("cut-2");
//! store.update("cut-2", json!({"layers": 40})).unwrap();
//! assert!(store.editing_key().is_none());
//!
//! // 3. Drag the second row to the top
//! store.reorder_with("cut-2", "cut-1", |rows| {
//!     assert_eq!(rows[0].key, "cut-2");
//! });
//!
//! // 4. Remove and restore
//! store.remove("cut-1");
//! store.restore("cut-1");
//! assert_eq!(store.len(), 2);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes a [`RowStore<JsonRow>`] through C-compatible
//! functions. All data is exchanged as JSON strings.

pub mod config;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod mode;
pub mod observe;
pub mod paginator;
pub mod progress;
pub mod record;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use config::{ConfigError, EngineConfig};
pub use error::Error;
pub use mode::{RowMode, RowModes, Slot};
pub use observe::{StoreEvent, SubscriptionId};
pub use paginator::Paginator;
pub use progress::{
    has_reached_target, is_within_valid_range, sum_by_product, sum_by_product_between,
    ProductionEntry, ProductionRecord, ProgressReport, QuantityField,
};
pub use record::{assign_order_numbers, JsonRow, Keyed, OrderNumbered, Row};
pub use snapshot::{AddingRow, ViewSnapshot};
pub use store::{RestoreOutcome, RowStore, Tombstone};

/// Type aliases for clarity
pub type RecordKey = String;
pub type OrderNumber = i64;
pub type ProductId = i64;
pub type Quantity = i64;
