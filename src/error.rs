use crate::schema::{CanonicalField, Domain};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Intake failed for {domain}: {details}")]
    IntakeFailure { domain: Domain, details: String },

    #[error("No rows found in {0} upload")]
    EmptyUpload(Domain),

    #[error("Schema error in {domain}: missing fields {}", format_fields(.missing))]
    SchemaValidation {
        domain: Domain,
        missing: Vec<CanonicalField>,
    },

    #[error("Cannot coerce value '{value}' of field {field} in row {row}: {reason}")]
    Coercion {
        row: usize,
        field: CanonicalField,
        value: String,
        reason: String,
    },

    #[error("Cannot process dashboard, domains not loaded: {}", format_domains(.0))]
    DomainsNotLoaded(Vec<Domain>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Table parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DashboardError {
    /// Wraps any collaborator failure into an intake rejection for `domain`.
    pub fn intake(domain: Domain, err: impl std::fmt::Display) -> Self {
        Self::IntakeFailure {
            domain,
            details: err.to_string(),
        }
    }
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_domains(domains: &[Domain]) -> String {
    domains
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, DashboardError>;
