//! FFI layer for host UI integration.
//!
//! This module provides C-compatible functions over a [`RowStore<JsonRow>`].
//! All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `rowstate_*` functions are allocated by Rust
//! - Caller must free them with `rowstate_string_free`
//! - Store pointers must be freed with `rowstate_store_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! The host re-reads `rowstate_store_snapshot` after each call; change
//! listeners are only available to Rust callers.

use crate::{progress::ProgressReport, EngineConfig, Error, JsonRow, RowStore};
use serde_json::Value;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// The store type handed across the boundary.
pub type JsonStore = RowStore<JsonRow>;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `rowstate_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => c"{\"error\":\"string contained null bytes\"}".to_owned().into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn respond<T: serde::Serialize>(result: Result<T, String>) -> *mut c_char {
    match result {
        Ok(value) => to_c_string(FfiResult::ok(value).to_json()),
        Err(message) => to_c_string(FfiResult::<()>::err(message).to_json()),
    }
}

unsafe fn store_mut<'a>(store: *mut JsonStore) -> Result<&'a mut JsonStore, String> {
    store.as_mut().ok_or_else(|| "null store pointer".to_string())
}

unsafe fn read_arg(ptr: *const c_char, name: &str) -> Result<String, String> {
    from_c_string(ptr).ok_or_else(|| format!("invalid {}", name))
}

unsafe fn parse_arg<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    name: &str,
) -> Result<T, String> {
    let raw = read_arg(ptr, name)?;
    serde_json::from_str(&raw).map_err(|e| Error::InvalidPayload(e.to_string()).to_string())
}

/// Narrow a host-supplied count, rejecting values this target cannot index.
fn to_usize(value: u64, name: &str) -> Result<usize, String> {
    usize::try_from(value).map_err(|_| format!("{} out of range: {}", name, value))
}

/// Run `f` against the store and the string argument `key`.
unsafe fn with_key<T, F>(store: *mut JsonStore, key: *const c_char, f: F) -> *mut c_char
where
    T: serde::Serialize,
    F: FnOnce(&mut JsonStore, &str) -> Result<T, String>,
{
    respond(store_mut(store).and_then(|s| {
        let key = read_arg(key, "key")?;
        f(s, &key)
    }))
}

// ============================================================================
// Store Lifecycle
// ============================================================================

/// Create a new store.
///
/// # Arguments
/// - `records_json`: JSON array of rows, each with a `key`
/// - `config_json`: JSON `EngineConfig`, or null for defaults
///
/// # Returns
/// Pointer to the store, or null on failure (invalid JSON, duplicate keys,
/// invalid config).
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string or null
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `rowstate_store_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_new(
    records_json: *const c_char,
    config_json: *const c_char,
) -> *mut JsonStore {
    let records: Vec<JsonRow> = match parse_arg(records_json, "records JSON") {
        Ok(r) => r,
        Err(_) => return ptr::null_mut(),
    };

    let config: EngineConfig = if config_json.is_null() {
        EngineConfig::default()
    } else {
        match parse_arg(config_json, "config JSON") {
            Ok(c) => c,
            Err(_) => return ptr::null_mut(),
        }
    };
    if config.validate().is_err() {
        return ptr::null_mut();
    }

    match RowStore::new(records, &config) {
        Ok(store) => Box::into_raw(Box::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "store creation failed");
            ptr::null_mut()
        }
    }
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_free(store: *mut JsonStore) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `rowstate_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rowstate_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Replace the collection with a fresh snapshot from the record source.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `records_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_reload(
    store: *mut JsonStore,
    records_json: *const c_char,
) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        let records: Vec<JsonRow> = parse_arg(records_json, "records JSON")?;
        s.reload(records).map_err(|e| e.to_string())
    }))
}

// ============================================================================
// Reads
// ============================================================================

/// Get the full view state.
///
/// # Returns
/// JSON string: `{"ok": ViewSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_snapshot(store: *const JsonStore) -> *mut c_char {
    match store.as_ref() {
        Some(s) => to_c_string(FfiResult::ok(s.snapshot()).to_json()),
        None => to_c_string(FfiResult::<()>::err("null store pointer").to_json()),
    }
}

/// Get the mode of a row.
///
/// # Returns
/// JSON string: `{"ok": "idle" | "adding" | "editing" | "deleting" | "restoring"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_mode(
    store: *const JsonStore,
    key: *const c_char,
) -> *mut c_char {
    let store = match store.as_ref() {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("null store pointer").to_json()),
    };
    respond(read_arg(key, "key").map(|key| store.mode(&key)))
}

/// Get the record count, or -1 for a null store.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_len(store: *const JsonStore) -> i64 {
    match store.as_ref() {
        Some(s) => s.len() as i64,
        None => -1,
    }
}

// ============================================================================
// Row Modes
// ============================================================================

/// Open an add session.
///
/// # Arguments
/// - `draft_json`: JSON draft payload, or null for none
///
/// # Returns
/// JSON string: `{"ok": true}`, `{"ok": false}` when the key is already in
/// the collection, or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - `draft_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_start_adding(
    store: *mut JsonStore,
    key: *const c_char,
    draft_json: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        let draft: Option<Value> = if draft_json.is_null() {
            None
        } else {
            Some(parse_arg(draft_json, "draft JSON")?)
        };
        Ok(s.start_adding(key, draft))
    })
}

/// Put a row into editing mode.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_start_editing(
    store: *mut JsonStore,
    key: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        s.start_editing(key);
        Ok(())
    })
}

/// Ask for delete confirmation on a row.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_start_deleting(
    store: *mut JsonStore,
    key: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        s.start_deleting(key);
        Ok(())
    })
}

/// Ask for restore confirmation on a row.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_start_restore(
    store: *mut JsonStore,
    key: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        s.start_restore(key);
        Ok(())
    })
}

/// Cancel a workflow.
///
/// # Arguments
/// - `mode`: 1 adding, 2 editing, 3 deleting, 4 restoring. Deleting and
///   restoring clear the same confirmation slot.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_cancel(store: *mut JsonStore, mode: i32) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        match mode {
            1 => s.cancel_adding(),
            2 => s.cancel_editing(),
            3 => s.cancel_deleting(),
            4 => s.cancel_restore(),
            other => return Err(format!("unknown mode: {}", other)),
        }
        Ok(())
    }))
}

// ============================================================================
// Expansion
// ============================================================================

/// Expand (non-zero) or collapse (0) a row.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_start_expanding(
    store: *mut JsonStore,
    key: *const c_char,
    expanded: i32,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        s.start_expanding(expanded != 0, key);
        Ok(s.expanding_keys().to_vec())
    })
}

/// Collapse every row.
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_close_expanding(store: *mut JsonStore) -> *mut c_char {
    respond(store_mut(store).map(|s| s.close_expanding()))
}

// ============================================================================
// Collection Mutations
// ============================================================================

/// Merge a patch into a row, or append it when the key is absent.
///
/// # Returns
/// JSON string: `{"ok": JsonRow}` (the merged row) or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` and `patch_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_update(
    store: *mut JsonStore,
    key: *const c_char,
    patch_json: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| {
        let patch: Value = parse_arg(patch_json, "patch JSON")?;
        s.update(key, patch).cloned().map_err(|e| e.to_string())
    })
}

/// Insert a new row at the front.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `record_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_add_new(
    store: *mut JsonStore,
    record_json: *const c_char,
) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        let record: JsonRow = parse_arg(record_json, "record JSON")?;
        s.add_new(record).map_err(|e| e.to_string())
    }))
}

/// Remove a row.
///
/// # Returns
/// JSON string: `{"ok": JsonRow}`, `{"ok": null}` when the key is absent, or
/// `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_remove(
    store: *mut JsonStore,
    key: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| Ok(s.remove(key)))
}

/// Restore a row.
///
/// # Returns
/// JSON string: `{"ok": {"reinstated": {"index": n}}}`,
/// `{"ok": {"released": JsonRow}}`, `{"ok": null}`, or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `key` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_restore(
    store: *mut JsonStore,
    key: *const c_char,
) -> *mut c_char {
    with_key(store, key, |s, key| Ok(s.restore(key)))
}

/// Move `active_key` to the position of `over_key`.
///
/// # Returns
/// JSON string: `{"ok": ["key", ...]}` with the new order when something
/// moved, `{"ok": null}` otherwise, or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - `active_key` and `over_key` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_reorder(
    store: *mut JsonStore,
    active_key: *const c_char,
    over_key: *const c_char,
) -> *mut c_char {
    with_key(store, active_key, |s, active| {
        let over = read_arg(over_key, "over key")?;
        let mut order = None;
        s.reorder_with(active, &over, |rows| {
            order = Some(rows.iter().map(|r| r.key.clone()).collect::<Vec<_>>());
        });
        Ok(order)
    })
}

/// Rewrite order numbers to match the display order.
///
/// # Returns
/// JSON string: `{"ok": ["key", ...]}` listing rows whose order number
/// changed, or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_renumber(store: *mut JsonStore) -> *mut c_char {
    respond(store_mut(store).map(|s| s.renumber()))
}

// ============================================================================
// View State
// ============================================================================

/// Set the advisory busy flag (non-zero for busy).
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_set_loading(
    store: *mut JsonStore,
    loading: i32,
) -> *mut c_char {
    respond(store_mut(store).map(|s| s.set_loading(loading != 0)))
}

/// Go to a page (1-based).
///
/// # Returns
/// JSON string: `{"ok": Paginator}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_set_page(store: *mut JsonStore, page: u64) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        s.set_page(to_usize(page, "page")?);
        Ok(s.paginator())
    }))
}

/// Change the page size and go back to the first page.
///
/// # Returns
/// JSON string: `{"ok": Paginator}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_set_page_size(
    store: *mut JsonStore,
    page_size: u64,
) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        s.set_page_size(to_usize(page_size, "page size")?);
        Ok(s.paginator())
    }))
}

/// Move the viewport anchor.
///
/// # Returns
/// JSON string: `{"ok": null}`, or `{"error": "message"}` when `index` does
/// not fit the target's `usize`
///
/// # Safety
/// - `store` must be a valid pointer from `rowstate_store_new` or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_store_set_scroll_index(
    store: *mut JsonStore,
    index: u64,
) -> *mut c_char {
    respond(store_mut(store).and_then(|s| {
        s.set_scroll_index(to_usize(index, "scroll index")?);
        Ok(())
    }))
}

// ============================================================================
// Progress
// ============================================================================

/// Build a progress report for one product.
///
/// # Arguments
/// - `records_json`: JSON array of delivery/completion records
/// - `product_id`: product to report on
/// - `target`: order target; negative means no target
///
/// # Returns
/// JSON string: `{"ok": ProgressReport}` or `{"error": "message"}`
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowstate_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowstate_progress_report(
    records_json: *const c_char,
    product_id: i64,
    target: i64,
) -> *mut c_char {
    respond(
        parse_arg::<Vec<Value>>(records_json, "records JSON").map(|records| {
            let target = (target >= 0).then_some(target);
            ProgressReport::build(product_id, target, &records)
        }),
    )
}

// ============================================================================
// Utility
// ============================================================================

/// Install a stderr tracing subscriber.
///
/// # Arguments
/// - `filter`: default filter directive (e.g. `rowstate_engine=debug`), or
///   null for the built-in default. `RUST_LOG` takes precedence.
///
/// # Returns
/// 1 if installed, 0 if a subscriber was already installed.
///
/// # Safety
/// - `filter` must be a valid null-terminated C string or null
#[no_mangle]
pub unsafe extern "C" fn rowstate_init_logging(filter: *const c_char) -> i32 {
    let filter = from_c_string(filter).unwrap_or_else(|| crate::logging::DEFAULT_FILTER.into());
    crate::logging::init(&filter) as i32
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn rowstate_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
