use crate::schema::{CanonicalField, Domain};
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Untyped spreadsheet cell as handed over by the intake collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty cells, blank strings, zero and `false` carry no value.
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Bool(b) => !b,
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Date(_) => false,
            CellValue::Text(s) => s.is_empty(),
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Date(d) => Cow::Owned(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            CellValue::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

/// One worksheet row: observed header to cell, in the order the sheet had them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, header: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(header, value);
        self
    }

    /// Inserts a cell, replacing the value of an identical header.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<CellValue>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, value)| value)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v))
    }

    /// First cell, in header order, whose header resolves to `field`.
    pub fn resolve(&self, field: CanonicalField) -> Option<(&str, &CellValue)> {
        self.iter().find(|(header, _)| field.matches_header(header))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<H: Into<String>, V: Into<CellValue>> FromIterator<(H, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (header, value) in iter {
            row.insert(header, value);
        }
        row
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// Overdue-duration class derived from days overdue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema, Default,
)]
pub enum AgingBucket {
    #[default]
    NotDue,
    Range1_30,
    Range31_60,
    Range61_90,
    Range90Plus,
}

impl AgingBucket {
    /// Presentation order.
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::NotDue,
        AgingBucket::Range1_30,
        AgingBucket::Range31_60,
        AgingBucket::Range61_90,
        AgingBucket::Range90Plus,
    ];

    pub fn from_days_overdue(days: i64) -> Self {
        if days <= 0 {
            AgingBucket::NotDue
        } else if days <= 30 {
            AgingBucket::Range1_30
        } else if days <= 60 {
            AgingBucket::Range31_60
        } else if days <= 90 {
            AgingBucket::Range61_90
        } else {
            AgingBucket::Range90Plus
        }
    }

    pub fn index(self) -> usize {
        match self {
            AgingBucket::NotDue => 0,
            AgingBucket::Range1_30 => 1,
            AgingBucket::Range31_60 => 2,
            AgingBucket::Range61_90 => 3,
            AgingBucket::Range90Plus => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgingBucket::NotDue => "Por Vencer",
            AgingBucket::Range1_30 => "1-30",
            AgingBucket::Range31_60 => "31-60",
            AgingBucket::Range61_90 => "61-90",
            AgingBucket::Range90Plus => "+90",
        }
    }
}

/// Typed value of a canonical field after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(Option<NaiveDateTime>),
    /// Non-coerced field, stored as read.
    Raw(CellValue),
    /// Header absent from the row.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct NormalizedRecord {
    domain: Domain,
    #[serde(flatten)]
    fields: BTreeMap<CanonicalField, FieldValue>,
    days_overdue: i64,
    aging_bucket: AgingBucket,
}

impl NormalizedRecord {
    pub(crate) fn new(
        domain: Domain,
        fields: BTreeMap<CanonicalField, FieldValue>,
        days_overdue: i64,
    ) -> Self {
        Self {
            domain,
            fields,
            days_overdue,
            aging_bucket: AgingBucket::from_days_overdue(days_overdue),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn days_overdue(&self) -> i64 {
        self.days_overdue
    }

    pub fn aging_bucket(&self) -> AgingBucket {
        self.aging_bucket
    }

    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (CanonicalField, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Numeric value of `field`; 0 when the field is absent or not numeric.
    pub fn number(&self, field: CanonicalField) -> f64 {
        match self.fields.get(&field) {
            Some(FieldValue::Number(n)) => *n,
            Some(FieldValue::Raw(CellValue::Number(n))) => *n,
            _ => 0.0,
        }
    }

    pub fn date(&self, field: CanonicalField) -> Option<NaiveDateTime> {
        match self.fields.get(&field) {
            Some(FieldValue::Date(d)) => *d,
            Some(FieldValue::Raw(CellValue::Date(d))) => Some(*d),
            _ => None,
        }
    }

    /// Text form of `field`; `None` when the cell is absent, empty or blank text.
    pub fn text(&self, field: CanonicalField) -> Option<Cow<'_, str>> {
        match self.fields.get(&field)? {
            FieldValue::Raw(CellValue::Empty) => None,
            FieldValue::Raw(CellValue::Text(s)) if s.is_empty() => None,
            FieldValue::Raw(cell) => Some(cell.as_text()),
            FieldValue::Number(n) => Some(Cow::Owned(n.to_string())),
            FieldValue::Date(Some(d)) => Some(Cow::Owned(d.format("%Y-%m-%d").to_string())),
            FieldValue::Date(None) | FieldValue::Missing => None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.number(CanonicalField::Balance)
    }

    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.date(CanonicalField::DueDate)
    }

    pub fn issue_date(&self) -> Option<NaiveDateTime> {
        self.date(CanonicalField::IssueDate)
    }

    pub fn entity(&self) -> Option<Cow<'_, str>> {
        self.text(CanonicalField::Entity)
    }
}

/// Output of one full reprocess: every schema-enforced domain normalized,
/// passthrough domains carried as read.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct NormalizedDataset {
    pub processed_at: NaiveDateTime,
    pub receivables: Vec<NormalizedRecord>,
    pub payables: Vec<NormalizedRecord>,
    pub projects: Vec<NormalizedRecord>,
    #[schemars(with = "Option<Vec<BTreeMap<String, CellValue>>>")]
    pub balance: Option<Vec<RawRow>>,
    #[schemars(with = "Option<Vec<BTreeMap<String, CellValue>>>")]
    pub function_statement: Option<Vec<RawRow>>,
}

impl NormalizedDataset {
    /// Normalized records of a schema-enforced domain; empty for passthrough domains.
    pub fn records(&self, domain: Domain) -> &[NormalizedRecord] {
        match domain {
            Domain::Receivable => &self.receivables,
            Domain::Payable => &self.payables,
            Domain::Project => &self.projects,
            Domain::Balance | Domain::FunctionStatement => &[],
        }
    }

    pub fn passthrough(&self, domain: Domain) -> Option<&[RawRow]> {
        match domain {
            Domain::Balance => self.balance.as_deref(),
            Domain::FunctionStatement => self.function_statement.as_deref(),
            _ => None,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(NormalizedDataset)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aging_bucket_boundaries() {
        assert_eq!(AgingBucket::from_days_overdue(-400), AgingBucket::NotDue);
        assert_eq!(AgingBucket::from_days_overdue(0), AgingBucket::NotDue);
        assert_eq!(AgingBucket::from_days_overdue(1), AgingBucket::Range1_30);
        assert_eq!(AgingBucket::from_days_overdue(30), AgingBucket::Range1_30);
        assert_eq!(AgingBucket::from_days_overdue(31), AgingBucket::Range31_60);
        assert_eq!(AgingBucket::from_days_overdue(60), AgingBucket::Range31_60);
        assert_eq!(AgingBucket::from_days_overdue(61), AgingBucket::Range61_90);
        assert_eq!(AgingBucket::from_days_overdue(90), AgingBucket::Range61_90);
        assert_eq!(AgingBucket::from_days_overdue(91), AgingBucket::Range90Plus);
        assert_eq!(AgingBucket::from_days_overdue(i64::MAX), AgingBucket::Range90Plus);
    }

    #[test]
    fn test_bucket_index_matches_presentation_order() {
        for (i, bucket) in AgingBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }

    #[test]
    fn test_raw_row_keeps_header_order_and_replaces_duplicates() {
        let row = RawRow::new()
            .with("Saldo", "10")
            .with("Cliente", "ACME")
            .with("Saldo", "20");

        assert_eq!(row.headers().collect::<Vec<_>>(), vec!["Saldo", "Cliente"]);
        assert_eq!(row.get("Saldo"), Some(&CellValue::text("20")));
        assert_eq!(row.get("saldo"), None);
    }

    #[test]
    fn test_raw_row_resolves_first_matching_header() {
        let row = RawRow::new()
            .with("Proveedor", "Beta")
            .with("ENTIDAD", "Alpha");

        let (header, value) = row.resolve(CanonicalField::Entity).unwrap();
        assert_eq!(header, "Proveedor");
        assert_eq!(value, &CellValue::text("Beta"));
        assert!(row.resolve(CanonicalField::Balance).is_none());
    }

    #[test]
    fn test_raw_row_serializes_as_ordered_object() {
        let row = RawRow::new().with("b", 1.5).with("a", CellValue::Empty);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"b":1.5,"a":null}"#);
    }

    #[test]
    fn test_falsy_cells() {
        assert!(CellValue::Empty.is_falsy());
        assert!(CellValue::text("").is_falsy());
        assert!(CellValue::Number(0.0).is_falsy());
        assert!(CellValue::Bool(false).is_falsy());
        assert!(!CellValue::text("0").is_falsy());
        assert!(!CellValue::Number(45000.0).is_falsy());
    }

    #[test]
    fn test_dataset_schema_generation() {
        let schema_json = NormalizedDataset::schema_as_json().unwrap();
        assert!(schema_json.contains("receivables"));
        assert!(schema_json.contains("processed_at"));
        assert!(schema_json.contains("aging_bucket"));
    }
}
