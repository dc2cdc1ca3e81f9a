use crate::coercion::{coerce_date, coerce_number, try_coerce_date, try_coerce_number};
use crate::error::{DashboardError, Result};
use crate::record::{CellValue, FieldValue, NormalizedRecord, RawRow};
use crate::schema::{CanonicalField, Domain, FieldKind};
use crate::utils::days_overdue;
use chrono::{NaiveDateTime, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Maps raw rows onto canonical records as of a fixed instant.
///
/// `now` drives days-overdue and aging, so holding it fixed makes
/// normalization repeatable.
pub struct RowNormalizer {
    now: NaiveDateTime,
}

impl RowNormalizer {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn at_current_time() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Normalizes every row, in input order. Rows are not re-validated: a
    /// field whose header is absent reads as 0 (numeric), `None` (date) or
    /// [`FieldValue::Missing`]. Passthrough domains yield no records.
    pub fn normalize(&self, rows: &[RawRow], domain: Domain) -> Vec<NormalizedRecord> {
        if !domain.is_schema_enforced() {
            debug!("Skipping normalization for passthrough domain {}", domain);
            return Vec::new();
        }

        debug!("Normalizing {} rows for {}", rows.len(), domain);
        rows.iter()
            .map(|row| self.normalize_row(row, domain))
            .collect()
    }

    /// Like [`normalize`](Self::normalize) but fails on the first cell that
    /// would otherwise degrade to 0 or `None`.
    pub fn normalize_strict(
        &self,
        rows: &[RawRow],
        domain: Domain,
    ) -> Result<Vec<NormalizedRecord>> {
        if !domain.is_schema_enforced() {
            return Ok(Vec::new());
        }

        rows.iter()
            .enumerate()
            .map(|(idx, row)| self.normalize_row_strict(idx, row, domain))
            .collect()
    }

    pub fn normalize_row(&self, row: &RawRow, domain: Domain) -> NormalizedRecord {
        let fields = domain
            .required_fields()
            .iter()
            .map(|&field| {
                let cell = row.resolve(field).map(|(_, value)| value);
                (field, coerce_field(field, cell))
            })
            .collect();

        self.finish(domain, fields)
    }

    fn normalize_row_strict(
        &self,
        row_idx: usize,
        row: &RawRow,
        domain: Domain,
    ) -> Result<NormalizedRecord> {
        let mut fields = BTreeMap::new();

        for &field in domain.required_fields() {
            let cell = row.resolve(field).map(|(_, value)| value);
            let value = try_coerce_field(field, cell).map_err(|reason| {
                DashboardError::Coercion {
                    row: row_idx,
                    field,
                    value: cell.map(|c| c.as_text().into_owned()).unwrap_or_default(),
                    reason,
                }
            })?;
            fields.insert(field, value);
        }

        Ok(self.finish(domain, fields))
    }

    fn finish(
        &self,
        domain: Domain,
        fields: BTreeMap<CanonicalField, FieldValue>,
    ) -> NormalizedRecord {
        let overdue = match fields.get(&CanonicalField::DueDate) {
            Some(FieldValue::Date(Some(due))) => days_overdue(self.now, *due),
            _ => 0,
        };

        NormalizedRecord::new(domain, fields, overdue)
    }
}

/// Normalizes `rows` as of `now`. Shorthand for [`RowNormalizer::normalize`].
pub fn normalize(rows: &[RawRow], domain: Domain, now: NaiveDateTime) -> Vec<NormalizedRecord> {
    RowNormalizer::new(now).normalize(rows, domain)
}

fn coerce_field(field: CanonicalField, cell: Option<&CellValue>) -> FieldValue {
    let empty = CellValue::Empty;
    match (field.kind(), cell) {
        (FieldKind::Numeric, cell) => FieldValue::Number(coerce_number(cell.unwrap_or(&empty))),
        (FieldKind::Date, cell) => FieldValue::Date(coerce_date(cell.unwrap_or(&empty))),
        (FieldKind::Raw, Some(cell)) => FieldValue::Raw(cell.clone()),
        (FieldKind::Raw, None) => FieldValue::Missing,
    }
}

fn try_coerce_field(
    field: CanonicalField,
    cell: Option<&CellValue>,
) -> std::result::Result<FieldValue, String> {
    let empty = CellValue::Empty;
    match (field.kind(), cell) {
        (FieldKind::Numeric, cell) => {
            try_coerce_number(cell.unwrap_or(&empty)).map(FieldValue::Number)
        }
        (FieldKind::Date, cell) => try_coerce_date(cell.unwrap_or(&empty)).map(FieldValue::Date),
        (FieldKind::Raw, Some(cell)) => Ok(FieldValue::Raw(cell.clone())),
        (FieldKind::Raw, None) => Ok(FieldValue::Missing),
    }
}
