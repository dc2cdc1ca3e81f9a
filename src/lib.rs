//! # FinCore Dashboard
//!
//! Normalization and metrics core of a financial dashboard fed by spreadsheet
//! exports (receivables, payables, project budgets, balance sheets).
//!
//! ## Core Concepts
//!
//! - **Raw rows**: header → cell mappings straight from a sheet, with
//!   arbitrary column names, serial or text dates and currency-formatted numbers
//! - **Canonical fields**: the internal names every sheet is mapped onto,
//!   directly or through an alias table (`Cliente` → `entidad`, `F_Venc` →
//!   `fecha_vencimiento`)
//! - **Normalized records**: typed values plus days overdue and an aging bucket
//! - **Passthrough domains**: balance sheet and income-by-function sheets are
//!   carried as read, without a schema
//! - **Lenient coercion**: malformed numbers read as 0 and malformed dates as
//!   empty unless strict coercion is enabled
//!
//! ## Example
//!
//! ```rust,ignore
//! use fincore_dashboard::*;
//! use chrono::NaiveDate;
//!
//! let mut session = DashboardSession::new(CsvTableParser::new(), DashboardConfig::default())?;
//! session.ingest_file(Domain::Receivable, "cxc.csv")?;
//! session.ingest_file(Domain::Payable, "cxp.csv")?;
//! session.ingest_file(Domain::Project, "proyectos.csv")?;
//!
//! let now = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let dataset = session.process(now)?;
//! let summary = session.summary().unwrap();
//! println!("Liquidity ratio: {:.2}", summary.liquidity_ratio);
//! ```

pub mod coercion;
pub mod config;
pub mod error;
pub mod indicators;
pub mod ingestion;
pub mod metrics;
pub mod normalizer;
pub mod record;
pub mod schema;
pub mod session;
pub mod utils;
pub mod validator;

pub use coercion::{coerce_date, coerce_number, try_coerce_date, try_coerce_number};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use indicators::*;
pub use ingestion::{CsvTableParser, JsonRowsParser, TabularParser};
pub use metrics::*;
pub use normalizer::{normalize, RowNormalizer};
pub use record::*;
pub use schema::*;
pub use session::DashboardSession;
pub use utils::*;
pub use validator::{validate, validate_headers, ValidationResult};

use chrono::NaiveDateTime;
use log::{debug, info};
use std::collections::BTreeMap;

pub struct DashboardProcessor;

impl DashboardProcessor {
    /// Normalizes every loaded source as of `now`.
    ///
    /// All schema-enforced domains must be present. Passthrough domains are
    /// optional and copied as read. Nothing is returned unless every domain
    /// normalized, so callers never see a partially updated dataset.
    pub fn process(
        sources: &BTreeMap<Domain, Vec<RawRow>>,
        config: &DashboardConfig,
        now: NaiveDateTime,
    ) -> Result<NormalizedDataset> {
        config.validate()?;

        let missing: Vec<Domain> = Domain::SCHEMA_ENFORCED
            .into_iter()
            .filter(|d| !sources.contains_key(d))
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::DomainsNotLoaded(missing));
        }

        info!("Computing dashboard indicators as of {}", now);
        debug!(
            "Sources: {}",
            sources
                .iter()
                .map(|(d, rows)| format!("{}={}", d, rows.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let normalizer = RowNormalizer::new(now);
        let normalize_domain = |domain: Domain| -> Result<Vec<NormalizedRecord>> {
            let rows = sources.get(&domain).map(Vec::as_slice).unwrap_or(&[]);
            if config.strict_coercion {
                normalizer.normalize_strict(rows, domain)
            } else {
                Ok(normalizer.normalize(rows, domain))
            }
        };

        Ok(NormalizedDataset {
            processed_at: now,
            receivables: normalize_domain(Domain::Receivable)?,
            payables: normalize_domain(Domain::Payable)?,
            projects: normalize_domain(Domain::Project)?,
            balance: sources.get(&Domain::Balance).cloned(),
            function_statement: sources.get(&Domain::FunctionStatement).cloned(),
        })
    }

    pub fn process_with_summary(
        sources: &BTreeMap<Domain, Vec<RawRow>>,
        config: &DashboardConfig,
        now: NaiveDateTime,
    ) -> Result<(NormalizedDataset, VisionSummary)> {
        let dataset = Self::process(sources, config, now)?;
        let summary = VisionSummary::compute(&dataset, config);
        Ok((dataset, summary))
    }
}

pub fn process_dashboard(
    sources: &BTreeMap<Domain, Vec<RawRow>>,
    config: &DashboardConfig,
    now: NaiveDateTime,
) -> Result<NormalizedDataset> {
    DashboardProcessor::process(sources, config, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sources() -> BTreeMap<Domain, Vec<RawRow>> {
        let mut sources = BTreeMap::new();
        sources.insert(
            Domain::Receivable,
            vec![RawRow::new()
                .with("Cliente", "ACME")
                .with("Saldo", "S/ 1,000")
                .with("F_Venc", "2025-06-20")
                .with("Fecha_Emision", "2025-05-20")
                .with("Tipo_Moneda", "Soles")],
        );
        sources.insert(
            Domain::Payable,
            vec![RawRow::new()
                .with("Proveedor", "Beta")
                .with("Saldo", 400.0)
                .with("Vcto", "2025-07-15")
                .with("Moneda", "Soles")],
        );
        sources.insert(
            Domain::Project,
            vec![RawRow::new()
                .with("Presupuesto_Neto", 5000.0)
                .with("Fecha", "2025-02-01")],
        );
        sources.insert(
            Domain::Balance,
            vec![RawRow::new()
                .with("efectivo_y_equivalente_de_efectivo", 300.0)
                .with("total_pasivo_corriente", 150.0)],
        );
        sources
    }

    #[test]
    fn test_end_to_end_processing() {
        let (dataset, summary) =
            DashboardProcessor::process_with_summary(&sources(), &DashboardConfig::default(), now())
                .unwrap();

        assert_eq!(dataset.receivables.len(), 1);
        assert_eq!(dataset.receivables[0].days_overdue(), 10);
        assert_eq!(dataset.payables[0].aging_bucket(), AgingBucket::NotDue);
        assert!(dataset.function_statement.is_none());
        assert_eq!(dataset.passthrough(Domain::Balance).map(|b| b.len()), Some(1));

        assert_eq!(summary.total_receivables, 1000.0);
        assert_eq!(summary.total_payables, 400.0);
        assert_eq!(summary.net_flow, 600.0);
        assert_eq!(summary.liquidity_ratio, 2.5);
        assert_eq!(summary.total_net_budget, 5000.0);
        assert_eq!(summary.acid_test, Some(2.0));
        assert_eq!(summary.receivables_by_issue_month.current_year, 2025);
        assert_eq!(summary.receivables_by_issue_month.current[4], 1000.0);
        assert_eq!(summary.collections_vs_payments.collections[5], 1000.0);
        assert_eq!(summary.collections_vs_payments.payments[6], 400.0);
        assert_eq!(summary.top_debtors[0].entity, "ACME");
        assert_eq!(
            summary.project_points,
            vec![ProjectPoint {
                month: 2,
                net_budget: 5000.0
            }]
        );
    }

    #[test]
    fn test_missing_domains_are_reported() {
        let mut partial = sources();
        partial.remove(&Domain::Project);
        partial.remove(&Domain::Payable);

        match process_dashboard(&partial, &DashboardConfig::default(), now()) {
            Err(DashboardError::DomainsNotLoaded(missing)) => {
                assert_eq!(missing, vec![Domain::Payable, Domain::Project]);
            }
            other => panic!("expected DomainsNotLoaded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_foreign_currency_left_out_of_cash_flow() {
        let mut sources = sources();
        sources.insert(
            Domain::Receivable,
            vec![
                RawRow::new()
                    .with("Saldo", 100.0)
                    .with("F_Venc", "2025-03-01")
                    .with("Tipo_Moneda", "Dolares"),
                RawRow::new()
                    .with("Saldo", 50.0)
                    .with("F_Venc", "2025-03-02")
                    .with("Tipo_Moneda", "Soles"),
            ],
        );

        let (_, summary) =
            DashboardProcessor::process_with_summary(&sources, &DashboardConfig::default(), now())
                .unwrap();
        assert_eq!(summary.collections_vs_payments.collections[2], 50.0);
        assert_eq!(summary.receivables_aging.total(), 150.0);
    }
}
