//! Production progress against order targets.
//!
//! Stateless helpers over cumulative quantities reported by sewing, ironing,
//! checking and packaging. Absent quantities count as zero everywhere.

use crate::{JsonRow, ProductId, Quantity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cumulative quantity tracked per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuantityField {
    Sewed,
    Ironed,
    Checked,
    Packaged,
}

impl QuantityField {
    /// Every tracked field, in production order.
    pub const ALL: [QuantityField; 4] = [
        QuantityField::Sewed,
        QuantityField::Ironed,
        QuantityField::Checked,
        QuantityField::Packaged,
    ];

    /// Field name used by delivery and completion records.
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityField::Sewed => "quantitySewed",
            QuantityField::Ironed => "quantityIroned",
            QuantityField::Checked => "quantityChecked",
            QuantityField::Packaged => "quantityPackaged",
        }
    }
}

/// `actual >= target`, treating absent values as 0.
pub fn has_reached_target(target: Option<Quantity>, actual: Option<Quantity>) -> bool {
    actual.unwrap_or(0) >= target.unwrap_or(0)
}

/// `0 < actual < target`, treating absent values as 0.
pub fn is_within_valid_range(target: Option<Quantity>, actual: Option<Quantity>) -> bool {
    let actual = actual.unwrap_or(0);
    0 < actual && actual < target.unwrap_or(0)
}

/// A dated record reporting quantities for one product.
pub trait ProductionRecord {
    fn product_id(&self) -> Option<ProductId>;

    fn quantity(&self, field: QuantityField) -> Option<Quantity>;

    /// Day the quantities were reported, if the record carries one.
    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Sum `field` over the records of `product_id`.
///
/// The total saturates at the `Quantity` bounds instead of overflowing.
pub fn sum_by_product<'a, R, I>(product_id: ProductId, records: I, field: QuantityField) -> Quantity
where
    R: ProductionRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|r| r.product_id() == Some(product_id))
        .map(|r| r.quantity(field).unwrap_or(0))
        .fold(0, Quantity::saturating_add)
}

/// Like [`sum_by_product`], restricted to records dated within
/// `from..=to`. Undated records are skipped.
pub fn sum_by_product_between<'a, R, I>(
    product_id: ProductId,
    records: I,
    field: QuantityField,
    from: NaiveDate,
    to: NaiveDate,
) -> Quantity
where
    R: ProductionRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|r| r.date().is_some_and(|d| from <= d && d <= to))
        .filter(|r| r.product_id() == Some(product_id))
        .map(|r| r.quantity(field).unwrap_or(0))
        .fold(0, Quantity::saturating_add)
}

/// A typed delivery or completion entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEntry {
    #[serde(rename = "productID")]
    pub product_id: ProductId,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub quantity_sewed: Option<Quantity>,
    #[serde(default)]
    pub quantity_ironed: Option<Quantity>,
    #[serde(default)]
    pub quantity_checked: Option<Quantity>,
    #[serde(default)]
    pub quantity_packaged: Option<Quantity>,
}

impl ProductionEntry {
    /// An entry with no quantities reported yet.
    pub fn new(product_id: ProductId, date: Option<NaiveDate>) -> Self {
        Self {
            product_id,
            date,
            quantity_sewed: None,
            quantity_ironed: None,
            quantity_checked: None,
            quantity_packaged: None,
        }
    }

    /// Builder-style quantity setter.
    pub fn with(mut self, field: QuantityField, quantity: Quantity) -> Self {
        let slot = match field {
            QuantityField::Sewed => &mut self.quantity_sewed,
            QuantityField::Ironed => &mut self.quantity_ironed,
            QuantityField::Checked => &mut self.quantity_checked,
            QuantityField::Packaged => &mut self.quantity_packaged,
        };
        *slot = Some(quantity);
        self
    }
}

impl ProductionRecord for ProductionEntry {
    fn product_id(&self) -> Option<ProductId> {
        Some(self.product_id)
    }

    fn quantity(&self, field: QuantityField) -> Option<Quantity> {
        match field {
            QuantityField::Sewed => self.quantity_sewed,
            QuantityField::Ironed => self.quantity_ironed,
            QuantityField::Checked => self.quantity_checked,
            QuantityField::Packaged => self.quantity_packaged,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

/// Integers, and floats with no fractional part, count as quantities.
/// Values beyond the `Quantity` range clamp to its bounds.
fn json_quantity(value: &Value) -> Option<Quantity> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as Quantity)
    })
}

fn json_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?;
    // Accept plain dates as well as full timestamps
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

impl ProductionRecord for Value {
    fn product_id(&self) -> Option<ProductId> {
        self.get("productID").and_then(json_quantity)
    }

    fn quantity(&self, field: QuantityField) -> Option<Quantity> {
        self.get(field.as_str()).and_then(json_quantity)
    }

    fn date(&self) -> Option<NaiveDate> {
        self.get("date").and_then(json_date)
    }
}

impl ProductionRecord for JsonRow {
    fn product_id(&self) -> Option<ProductId> {
        self.field("productID").and_then(json_quantity)
    }

    fn quantity(&self, field: QuantityField) -> Option<Quantity> {
        self.field(field.as_str()).and_then(json_quantity)
    }

    fn date(&self) -> Option<NaiveDate> {
        self.field("date").and_then(json_date)
    }
}

/// Cumulative quantities of one product against its order target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    #[serde(rename = "productID")]
    pub product_id: ProductId,
    pub target: Option<Quantity>,
    pub sewed: Quantity,
    pub ironed: Quantity,
    pub checked: Quantity,
    pub packaged: Quantity,
}

impl ProgressReport {
    /// Sum every field for `product_id`.
    pub fn build<R: ProductionRecord>(
        product_id: ProductId,
        target: Option<Quantity>,
        records: &[R],
    ) -> Self {
        Self {
            product_id,
            target,
            sewed: sum_by_product(product_id, records, QuantityField::Sewed),
            ironed: sum_by_product(product_id, records, QuantityField::Ironed),
            checked: sum_by_product(product_id, records, QuantityField::Checked),
            packaged: sum_by_product(product_id, records, QuantityField::Packaged),
        }
    }

    pub fn total(&self, field: QuantityField) -> Quantity {
        match field {
            QuantityField::Sewed => self.sewed,
            QuantityField::Ironed => self.ironed,
            QuantityField::Checked => self.checked,
            QuantityField::Packaged => self.packaged,
        }
    }

    /// Whether `field` has met the target.
    pub fn reached(&self, field: QuantityField) -> bool {
        has_reached_target(self.target, Some(self.total(field)))
    }

    /// Whether `field` has started but not yet met the target.
    pub fn in_progress(&self, field: QuantityField) -> bool {
        is_within_valid_range(self.target, Some(self.total(field)))
    }

    /// Whether every field has met the target.
    pub fn is_complete(&self) -> bool {
        QuantityField::ALL.iter().all(|field| self.reached(*field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn reached_target() {
        assert!(has_reached_target(Some(100), Some(100)));
        assert!(has_reached_target(Some(100), Some(101)));
        assert!(!has_reached_target(Some(100), Some(99)));
        assert!(!has_reached_target(Some(100), None));
        assert!(has_reached_target(None, None));
    }

    #[test]
    fn valid_range() {
        assert!(is_within_valid_range(Some(100), Some(50)));
        assert!(!is_within_valid_range(Some(100), Some(0)));
        assert!(!is_within_valid_range(Some(100), None));
        assert!(!is_within_valid_range(Some(100), Some(100)));
        assert!(!is_within_valid_range(None, Some(5)));
    }

    #[test]
    fn sum_json_records() {
        let records = vec![
            json!({"productID": 7, "quantitySewed": 10}),
            json!({"productID": 8, "quantitySewed": 99}),
            json!({"productID": 7}),
            json!({"productID": 7, "quantitySewed": 5.0}),
            json!({"quantitySewed": 1000}),
        ];
        assert_eq!(sum_by_product(7, &records, QuantityField::Sewed), 15);
        assert_eq!(sum_by_product(7, &records, QuantityField::Packaged), 0);
        assert_eq!(sum_by_product(9, &records, QuantityField::Sewed), 0);
    }

    #[test]
    fn sums_saturate() {
        let records = vec![
            json!({"productID": 7, "quantitySewed": i64::MAX}),
            json!({"productID": 7, "quantitySewed": 1}),
            json!({"productID": 7, "quantityIroned": 1e300}),
            json!({"productID": 7, "quantityIroned": 5}),
            json!({"productID": 7, "quantityChecked": i64::MIN}),
            json!({"productID": 7, "quantityChecked": -1}),
        ];
        assert_eq!(sum_by_product(7, &records, QuantityField::Sewed), i64::MAX);
        assert_eq!(sum_by_product(7, &records, QuantityField::Ironed), i64::MAX);
        assert_eq!(sum_by_product(7, &records, QuantityField::Checked), i64::MIN);

        let entries = vec![
            ProductionEntry::new(7, Some(day(1))).with(QuantityField::Packaged, i64::MAX),
            ProductionEntry::new(7, Some(day(2))).with(QuantityField::Packaged, i64::MAX),
        ];
        assert_eq!(
            sum_by_product_between(7, &entries, QuantityField::Packaged, day(1), day(2)),
            i64::MAX
        );

        let report = ProgressReport::build(7, Some(100), &records);
        assert_eq!(report.sewed, i64::MAX);
        assert!(report.reached(QuantityField::Sewed));
    }

    #[test]
    fn sum_typed_entries_between_dates() {
        let entries = vec![
            ProductionEntry::new(7, Some(day(1))).with(QuantityField::Ironed, 4),
            ProductionEntry::new(7, Some(day(5))).with(QuantityField::Ironed, 6),
            ProductionEntry::new(7, Some(day(9))).with(QuantityField::Ironed, 8),
            ProductionEntry::new(7, None).with(QuantityField::Ironed, 100),
        ];

        assert_eq!(sum_by_product(7, &entries, QuantityField::Ironed), 118);
        assert_eq!(
            sum_by_product_between(7, &entries, QuantityField::Ironed, day(1), day(5)),
            10
        );
    }

    #[test]
    fn json_dates_accept_timestamps() {
        let records = vec![
            json!({"productID": 3, "date": "2024-03-02T10:00:00.000Z", "quantityChecked": 2}),
            json!({"productID": 3, "date": "2024-03-04", "quantityChecked": 3}),
            json!({"productID": 3, "date": "garbage", "quantityChecked": 50}),
        ];
        assert_eq!(
            sum_by_product_between(3, &records, QuantityField::Checked, day(1), day(3)),
            2
        );
    }

    #[test]
    fn json_rows_are_production_records() {
        let rows = vec![
            JsonRow::new("d-1")
                .with_field("productID", 7)
                .with_field("quantityPackaged", 12),
            JsonRow::new("d-2").with_field("productID", 7),
        ];
        assert_eq!(sum_by_product(7, &rows, QuantityField::Packaged), 12);
    }

    #[test]
    fn progress_report() {
        let entries = vec![
            ProductionEntry::new(1, Some(day(1)))
                .with(QuantityField::Sewed, 60)
                .with(QuantityField::Ironed, 40),
            ProductionEntry::new(1, Some(day(2)))
                .with(QuantityField::Sewed, 40)
                .with(QuantityField::Ironed, 10),
            ProductionEntry::new(2, Some(day(2))).with(QuantityField::Sewed, 500),
        ];

        let report = ProgressReport::build(1, Some(100), &entries);
        assert_eq!(report.sewed, 100);
        assert_eq!(report.ironed, 50);
        assert!(report.reached(QuantityField::Sewed));
        assert!(report.in_progress(QuantityField::Ironed));
        assert!(!report.in_progress(QuantityField::Checked));
        assert!(!report.is_complete());
    }

    #[test]
    fn entry_serialization_format() {
        let entry: ProductionEntry = serde_json::from_value(json!({
            "productID": 7,
            "date": "2024-03-01",
            "quantitySewed": 12,
        }))
        .unwrap();
        assert_eq!(entry.product_id, 7);
        assert_eq!(entry.date, Some(day(1)));
        assert_eq!(entry.quantity(QuantityField::Sewed), Some(12));
        assert_eq!(entry.quantity(QuantityField::Ironed), None);
    }
}
