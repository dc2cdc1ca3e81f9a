//! Pure reductions over normalized record sets.

use crate::record::{AgingBucket, NormalizedRecord};
use crate::schema::CanonicalField;
use crate::utils::month_index_in_year;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::HashMap;

/// Twelve monthly sums, January first.
pub type MonthlySeries = [f64; 12];

pub const DEFAULT_TOP_N: usize = 5;

/// Balance totals per aging bucket, always all five buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, JsonSchema)]
pub struct AgingDistribution {
    pub totals: [f64; 5],
}

impl AgingDistribution {
    pub fn get(&self, bucket: AgingBucket) -> f64 {
        self.totals[bucket.index()]
    }

    /// Buckets in presentation order with their totals.
    pub fn iter(&self) -> impl Iterator<Item = (AgingBucket, f64)> + '_ {
        AgingBucket::ALL
            .iter()
            .map(move |bucket| (*bucket, self.get(*bucket)))
    }

    pub fn total(&self) -> f64 {
        self.totals.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct EntityTotal {
    pub entity: String,
    pub total: f64,
}

/// Sum of `field` over records matching `predicate`.
pub fn sum_where<F>(records: &[NormalizedRecord], field: CanonicalField, predicate: F) -> f64
where
    F: Fn(&NormalizedRecord) -> bool,
{
    records
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.number(field))
        .sum()
}

pub fn sum_field(records: &[NormalizedRecord], field: CanonicalField) -> f64 {
    sum_where(records, field, |_| true)
}

pub fn sum_balance_where<F>(records: &[NormalizedRecord], predicate: F) -> f64
where
    F: Fn(&NormalizedRecord) -> bool,
{
    sum_where(records, CanonicalField::Balance, predicate)
}

pub fn total_balance(records: &[NormalizedRecord]) -> f64 {
    sum_field(records, CanonicalField::Balance)
}

pub fn count_where<F>(records: &[NormalizedRecord], predicate: F) -> usize
where
    F: Fn(&NormalizedRecord) -> bool,
{
    records.iter().filter(|r| predicate(r)).count()
}

pub fn bucketed_sum(records: &[NormalizedRecord]) -> AgingDistribution {
    let mut distribution = AgingDistribution::default();
    for record in records {
        distribution.totals[record.aging_bucket().index()] += record.balance();
    }
    distribution
}

/// Balance summed by calendar month of `date_field`, for records dated in `year`.
pub fn monthly_series(
    records: &[NormalizedRecord],
    date_field: CanonicalField,
    year: i32,
) -> MonthlySeries {
    monthly_series_excluding(records, date_field, year, |_| false)
}

/// [`monthly_series`] skipping records for which `exclude` holds.
pub fn monthly_series_excluding<F>(
    records: &[NormalizedRecord],
    date_field: CanonicalField,
    year: i32,
    exclude: F,
) -> MonthlySeries
where
    F: Fn(&NormalizedRecord) -> bool,
{
    let mut series = [0.0; 12];
    for record in records.iter().filter(|r| !exclude(r)) {
        let month = record
            .date(date_field)
            .and_then(|date| month_index_in_year(date, year));
        if let Some(idx) = month {
            series[idx] += record.balance();
        }
    }
    series
}

/// Entities ranked by summed balance, highest first. Ties keep the order in
/// which the entities were first seen.
pub fn top_entities_by_balance(records: &[NormalizedRecord], n: usize) -> Vec<EntityTotal> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<EntityTotal> = Vec::new();

    for record in records {
        let entity = record.entity().unwrap_or_default().into_owned();
        match index.get(&entity) {
            Some(&i) => totals[i].total += record.balance(),
            None => {
                index.insert(entity.clone(), totals.len());
                totals.push(EntityTotal {
                    entity,
                    total: record.balance(),
                });
            }
        }
    }

    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals.truncate(n);
    totals
}

/// Mean of `field`; 0 for an empty set.
pub fn average(records: &[NormalizedRecord], field: CanonicalField) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    sum_field(records, field) / records.len() as f64
}

/// `numerator / denominator`, or 0 when the denominator is 0 or the
/// quotient is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
