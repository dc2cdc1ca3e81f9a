use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::indicators::{PayablesView, ProjectPortfolio, VisionSummary};
use crate::ingestion::TabularParser;
use crate::record::{NormalizedDataset, RawRow};
use crate::schema::Domain;
use crate::validator::validate;
use crate::DashboardProcessor;
use chrono::{NaiveDateTime, Utc};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Upload state of one dashboard session.
///
/// Each domain holds the raw rows of its last accepted upload. Processing
/// builds a complete [`NormalizedDataset`] and swaps it in as a whole, so
/// readers of [`snapshot`](Self::snapshot) see either the previous dataset or
/// the new one.
pub struct DashboardSession<P: TabularParser> {
    parser: P,
    config: DashboardConfig,
    sources: BTreeMap<Domain, Vec<RawRow>>,
    snapshot: Option<Arc<NormalizedDataset>>,
}

impl<P: TabularParser> DashboardSession<P> {
    pub fn new(parser: P, config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser,
            config,
            sources: BTreeMap::new(),
            snapshot: None,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Parses and validates an upload for `domain`. On success the rows
    /// replace that domain's previous upload and the row count is returned.
    /// On failure the domain keeps whatever it held before.
    pub fn ingest(&mut self, domain: Domain, bytes: &[u8]) -> Result<usize> {
        let rows = self.parser.parse(bytes).map_err(|e| {
            warn!("Intake failed for {}: {}", domain, e);
            DashboardError::intake(domain, e)
        })?;
        self.ingest_rows(domain, rows)
    }

    pub fn ingest_file(&mut self, domain: Domain, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            warn!("Cannot read {} for {}: {}", path.display(), domain, e);
            DashboardError::intake(domain, e)
        })?;
        self.ingest(domain, &bytes)
    }

    /// Validates already-parsed rows and stores them for `domain`.
    pub fn ingest_rows(&mut self, domain: Domain, rows: Vec<RawRow>) -> Result<usize> {
        if let Err(e) = validate(&rows, domain).into_result(domain) {
            warn!("Rejected {} upload: {}", domain, e);
            return Err(e);
        }

        let count = rows.len();
        self.sources.insert(domain, rows);
        info!("Module {} synchronized with {} rows", domain, count);
        Ok(count)
    }

    pub fn is_loaded(&self, domain: Domain) -> bool {
        self.sources.contains_key(&domain)
    }

    /// Schema-enforced domains still waiting for an upload.
    pub fn missing_domains(&self) -> Vec<Domain> {
        Domain::SCHEMA_ENFORCED
            .into_iter()
            .filter(|d| !self.is_loaded(*d))
            .collect()
    }

    pub fn can_process(&self) -> bool {
        self.missing_domains().is_empty()
    }

    /// Drops the upload of `domain`. The current snapshot is untouched.
    pub fn clear(&mut self, domain: Domain) {
        self.sources.remove(&domain);
    }

    /// Recomputes every normalized record set as of `now`. On error the
    /// previous snapshot stays in place.
    pub fn process(&mut self, now: NaiveDateTime) -> Result<Arc<NormalizedDataset>> {
        let dataset = DashboardProcessor::process(&self.sources, &self.config, now)?;
        let dataset = Arc::new(dataset);
        self.snapshot = Some(Arc::clone(&dataset));
        info!("Dashboard updated as of {}", now);
        Ok(dataset)
    }

    pub fn process_now(&mut self) -> Result<Arc<NormalizedDataset>> {
        self.process(Utc::now().naive_utc())
    }

    pub fn snapshot(&self) -> Option<Arc<NormalizedDataset>> {
        self.snapshot.clone()
    }

    pub fn summary(&self) -> Option<VisionSummary> {
        self.snapshot
            .as_deref()
            .map(|dataset| VisionSummary::compute(dataset, &self.config))
    }

    pub fn payables_view(&self, category: Option<&str>) -> Option<PayablesView> {
        self.snapshot
            .as_deref()
            .map(|dataset| PayablesView::compute(&dataset.payables, category))
    }

    pub fn project_portfolio(&self, stage: Option<&str>) -> Option<ProjectPortfolio> {
        self.snapshot
            .as_deref()
            .map(|dataset| ProjectPortfolio::compute(&dataset.projects, stage, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellValue;
    use crate::schema::FieldKind;
    use chrono::NaiveDate;

    /// Hands back canned rows, or fails, regardless of input.
    struct StubParser {
        rows: Option<Vec<RawRow>>,
    }

    impl TabularParser for StubParser {
        fn parse(&self, _bytes: &[u8]) -> Result<Vec<RawRow>> {
            self.rows
                .clone()
                .ok_or_else(|| DashboardError::ParseError("corrupt workbook".to_string()))
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn full_row(domain: Domain) -> RawRow {
        domain
            .required_fields()
            .iter()
            .map(|f| {
                let value = match f.kind() {
                    FieldKind::Numeric => "1",
                    FieldKind::Date => "2025-01-01",
                    FieldKind::Raw => "x",
                };
                (f.name().to_string(), CellValue::text(value))
            })
            .collect()
    }

    fn loaded_session() -> DashboardSession<StubParser> {
        let mut session =
            DashboardSession::new(StubParser { rows: None }, DashboardConfig::default()).unwrap();
        for domain in Domain::SCHEMA_ENFORCED {
            session.ingest_rows(domain, vec![full_row(domain)]).unwrap();
        }
        session
    }

    #[test]
    fn test_intake_failure_leaves_domain_unset() {
        let mut session =
            DashboardSession::new(StubParser { rows: None }, DashboardConfig::default()).unwrap();

        let err = session.ingest(Domain::Receivable, b"garbage").unwrap_err();
        assert!(matches!(
            err,
            DashboardError::IntakeFailure {
                domain: Domain::Receivable,
                ..
            }
        ));
        assert!(!session.is_loaded(Domain::Receivable));
    }

    #[test]
    fn test_schema_failure_keeps_previous_upload() {
        let mut session = loaded_session();

        let err = session
            .ingest_rows(Domain::Payable, vec![RawRow::new().with("Proveedor", "X")])
            .unwrap_err();
        assert!(matches!(err, DashboardError::SchemaValidation { .. }));
        assert!(session.is_loaded(Domain::Payable));
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        let mut session = loaded_session();
        let err = session.ingest_rows(Domain::Balance, Vec::new()).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyUpload(Domain::Balance)));
        assert!(!session.is_loaded(Domain::Balance));
    }

    #[test]
    fn test_process_requires_schema_enforced_domains() {
        let mut session =
            DashboardSession::new(StubParser { rows: None }, DashboardConfig::default()).unwrap();
        session
            .ingest_rows(Domain::Receivable, vec![full_row(Domain::Receivable)])
            .unwrap();

        assert_eq!(
            session.missing_domains(),
            vec![Domain::Payable, Domain::Project]
        );
        let err = session.process(now()).unwrap_err();
        assert!(matches!(err, DashboardError::DomainsNotLoaded(_)));
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_process_swaps_snapshot() {
        let mut session = loaded_session();
        assert!(session.can_process());

        let first = session.process(now()).unwrap();
        assert_eq!(first.receivables.len(), 1);

        session
            .ingest_rows(
                Domain::Receivable,
                vec![full_row(Domain::Receivable), full_row(Domain::Receivable)],
            )
            .unwrap();
        assert_eq!(session.snapshot().unwrap().receivables.len(), 1);

        session.process(now()).unwrap();
        assert_eq!(session.snapshot().unwrap().receivables.len(), 2);
        assert_eq!(first.receivables.len(), 1);
    }

    #[test]
    fn test_process_now_stamps_wall_clock() {
        let mut session = loaded_session();
        let before = Utc::now().naive_utc();
        let dataset = session.process_now().unwrap();
        let after = Utc::now().naive_utc();

        assert!(before <= dataset.processed_at && dataset.processed_at <= after);
        assert_eq!(
            session.snapshot().map(|s| s.processed_at),
            Some(dataset.processed_at)
        );
    }

    #[test]
    fn test_strict_failure_keeps_previous_snapshot() {
        let config = DashboardConfig {
            strict_coercion: true,
            ..DashboardConfig::default()
        };
        let mut session = DashboardSession::new(StubParser { rows: None }, config).unwrap();
        for domain in Domain::SCHEMA_ENFORCED {
            session.ingest_rows(domain, vec![full_row(domain)]).unwrap();
        }
        session.process(now()).unwrap();

        let bad = full_row(Domain::Payable).with("saldo", "mucho");
        session.ingest_rows(Domain::Payable, vec![bad]).unwrap();

        assert!(matches!(
            session.process(now()),
            Err(DashboardError::Coercion { .. })
        ));
        assert_eq!(session.snapshot().unwrap().payables[0].balance(), 1.0);
    }

    #[test]
    fn test_parsed_upload_is_stored() {
        let rows = vec![full_row(Domain::Project), full_row(Domain::Project)];
        let mut session =
            DashboardSession::new(StubParser { rows: Some(rows) }, DashboardConfig::default())
                .unwrap();
        assert_eq!(session.ingest(Domain::Project, b"xlsx bytes").unwrap(), 2);
        assert!(session.is_loaded(Domain::Project));
    }
}
