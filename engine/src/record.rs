//! Record capabilities and the JSON-backed row type.
//!
//! The engine is generic over the record type. A record only has to expose a
//! stable key ([`Keyed`]); editable tables additionally need a patch type and
//! a shallow merge ([`Row`]).

use crate::{error::Result, Error, OrderNumber, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record identified by a unique key that is stable across reorders.
pub trait Keyed {
    /// The record's unique key.
    fn key(&self) -> &str;
}

/// A record that can be edited in place by merging a patch.
pub trait Row: Keyed + Clone {
    /// Partial update applied by [`Row::merge`].
    type Patch: Clone;

    /// Shallow-merge `patch` into this record.
    ///
    /// Implementations must validate the patch before writing, so that a
    /// failed merge leaves the record unchanged.
    fn merge(&mut self, patch: Self::Patch) -> Result<()>;

    /// Build a fresh record under `key` from a patch.
    fn from_patch(key: &str, patch: Self::Patch) -> Result<Self>;
}

/// A record that carries a persisted position.
pub trait OrderNumbered: Keyed {
    fn order_number(&self) -> Option<OrderNumber>;

    fn set_order_number(&mut self, order_number: OrderNumber);
}

/// Write 1-based positions as order numbers.
///
/// This is the recomputation a reorder callback performs before it persists
/// the new order. Returns the keys whose order number actually changed.
pub fn assign_order_numbers<T: OrderNumbered>(records: &mut [T]) -> Vec<RecordKey> {
    let mut changed = Vec::new();
    for (index, record) in records.iter_mut().enumerate() {
        let position = index as OrderNumber + 1;
        if record.order_number() != Some(position) {
            record.set_order_number(position);
            changed.push(record.key().to_string());
        }
    }
    changed
}

/// A table row backed by JSON.
///
/// Well-known fields are typed; everything else lives in `fields` and is
/// opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRow {
    /// Unique identifier for this row
    pub key: RecordKey,
    /// When the row was first created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the row was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Persisted position within the table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<OrderNumber>,
    /// Remaining payload
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl JsonRow {
    /// Create an empty row.
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            created_at: None,
            updated_at: None,
            order_number: None,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    ///
    /// `key`, `createdAt`, `updatedAt` and `orderNumber` go to the typed
    /// fields, so they never appear twice when serialized. A value that does
    /// not fit its typed field is dropped.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            "key" => match value {
                Value::String(key) => self.key = key,
                other => tracing::warn!(value = %other, "non-string key dropped"),
            },
            "createdAt" | "updatedAt" | "orderNumber" => {
                let mut patch = Map::new();
                patch.insert(name, value);
                let key = self.key.clone();
                match ParsedPatch::parse(&key, Value::Object(patch)) {
                    Ok(parsed) => parsed.apply(&mut self),
                    Err(e) => tracing::warn!(key = %key, error = %e, "typed field dropped"),
                }
            }
            _ => {
                self.fields.insert(name, value);
            }
        }
        self
    }

    /// Builder-style order number setter.
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = Some(order_number);
        self
    }

    /// Get a payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Keyed for JsonRow {
    fn key(&self) -> &str {
        &self.key
    }
}

impl OrderNumbered for JsonRow {
    fn order_number(&self) -> Option<OrderNumber> {
        self.order_number
    }

    fn set_order_number(&mut self, order_number: OrderNumber) {
        self.order_number = Some(order_number);
    }
}

/// A patch split into typed and opaque parts, fully validated.
#[derive(Default)]
struct ParsedPatch {
    created_at: Option<Option<DateTime<Utc>>>,
    updated_at: Option<Option<DateTime<Utc>>>,
    order_number: Option<Option<OrderNumber>>,
    fields: Map<String, Value>,
}

impl ParsedPatch {
    fn parse(key: &str, patch: Value) -> Result<Self> {
        let entries = match patch {
            Value::Object(entries) => entries,
            other => {
                return Err(Error::MergeFailed(format!(
                    "patch must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut parsed = ParsedPatch::default();
        for (name, value) in entries {
            match name.as_str() {
                "key" => {
                    if value.as_str() != Some(key) {
                        return Err(Error::MergeFailed(format!(
                            "patch cannot change key of '{}' to {}",
                            key, value
                        )));
                    }
                }
                "createdAt" => parsed.created_at = Some(parse_timestamp(&name, &value)?),
                "updatedAt" => parsed.updated_at = Some(parse_timestamp(&name, &value)?),
                "orderNumber" => {
                    parsed.order_number = Some(match &value {
                        Value::Null => None,
                        v => Some(v.as_i64().ok_or_else(|| {
                            Error::MergeFailed(format!("orderNumber must be an integer, got {}", v))
                        })?),
                    })
                }
                _ => {
                    parsed.fields.insert(name, value);
                }
            }
        }
        Ok(parsed)
    }

    fn apply(self, row: &mut JsonRow) {
        if let Some(created_at) = self.created_at {
            row.created_at = created_at;
        }
        if let Some(updated_at) = self.updated_at {
            row.updated_at = updated_at;
        }
        if let Some(order_number) = self.order_number {
            row.order_number = order_number;
        }
        row.fields.extend(self.fields);
    }
}

fn parse_timestamp(field: &str, value: &Value) -> Result<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::MergeFailed(format!("{} is not a valid timestamp: {}", field, e))),
        other => Err(Error::MergeFailed(format!(
            "{} must be a timestamp string, got {}",
            field,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Row for JsonRow {
    type Patch = Value;

    fn merge(&mut self, patch: Value) -> Result<()> {
        ParsedPatch::parse(&self.key, patch)?.apply(self);
        Ok(())
    }

    fn from_patch(key: &str, patch: Value) -> Result<Self> {
        let mut row = JsonRow::new(key);
        row.merge(patch)?;
        Ok(row)
    }
}
