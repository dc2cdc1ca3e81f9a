use crate::error::{DashboardError, Result};
use crate::record::RawRow;
use crate::schema::{CanonicalField, Domain};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Required fields with no matching header, in schema order.
    pub missing: Vec<CanonicalField>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            valid: true,
            missing: Vec::new(),
        }
    }

    pub fn failed(missing: Vec<CanonicalField>) -> Self {
        Self {
            valid: false,
            missing,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Turns a failed validation into the error the upload is rejected with.
    pub fn into_result(self, domain: Domain) -> Result<()> {
        if self.valid {
            Ok(())
        } else if self.missing.is_empty() {
            Err(DashboardError::EmptyUpload(domain))
        } else {
            Err(DashboardError::SchemaValidation {
                domain,
                missing: self.missing,
            })
        }
    }
}

/// Checks that every required field of `domain` resolves against the headers
/// of the first row.
///
/// Only the first row is inspected: a column absent from row 1 but present
/// later is never detected. An empty row set is invalid with nothing listed
/// as missing.
pub fn validate(rows: &[RawRow], domain: Domain) -> ValidationResult {
    let Some(first) = rows.first() else {
        return ValidationResult::failed(Vec::new());
    };

    if !domain.is_schema_enforced() {
        return ValidationResult::passed();
    }

    let headers: Vec<&str> = first.headers().collect();
    validate_headers(&headers, domain)
}

/// Header-level check behind [`validate`]. Matching is case-insensitive,
/// directly against the canonical name or through its aliases.
pub fn validate_headers(headers: &[&str], domain: Domain) -> ValidationResult {
    let missing = unresolved_fields(headers, domain.required_fields());
    if missing.is_empty() {
        ValidationResult::passed()
    } else {
        ValidationResult::failed(missing)
    }
}

pub fn unresolved_fields(headers: &[&str], required: &[CanonicalField]) -> Vec<CanonicalField> {
    required
        .iter()
        .copied()
        .filter(|field| !headers.iter().any(|h| field.matches_header(h)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellValue;

    fn receivable_headers() -> Vec<&'static str> {
        vec![
            "ID",
            "RUC",
            "Cliente",
            "Documento",
            "Fecha_Emision",
            "F_Venc",
            "Importe",
            "Tipo_Moneda",
            "Cuenta_Contable",
            "Saldo",
            "Categoria",
            "Cod_Proyecto",
        ]
    }

    fn row_with_headers(headers: &[&str]) -> RawRow {
        headers
            .iter()
            .map(|h| (h.to_string(), CellValue::text("x")))
            .collect()
    }

    #[test]
    fn test_aliases_resolve_required_fields() {
        let headers = ["Cliente", "Saldo", "F_Venc"];
        let required = [
            CanonicalField::Entity,
            CanonicalField::Balance,
            CanonicalField::DueDate,
        ];
        assert!(unresolved_fields(&headers, &required).is_empty());
    }

    #[test]
    fn test_missing_field_is_reported() {
        let headers = ["Cliente", "F_Venc"];
        let required = [
            CanonicalField::Entity,
            CanonicalField::Balance,
            CanonicalField::DueDate,
        ];
        assert_eq!(
            unresolved_fields(&headers, &required),
            vec![CanonicalField::Balance]
        );
    }

    #[test]
    fn test_full_receivable_sheet_validates() {
        let rows = vec![row_with_headers(&receivable_headers())];
        let result = validate(&rows, Domain::Receivable);
        assert!(result.is_valid(), "missing: {:?}", result.missing);
    }

    #[test]
    fn test_missing_fields_in_schema_order() {
        let headers: Vec<&str> = receivable_headers()
            .into_iter()
            .filter(|h| *h != "Saldo" && *h != "RUC")
            .collect();
        let rows = vec![row_with_headers(&headers)];
        let result = validate(&rows, Domain::Receivable);
        assert!(!result.is_valid());
        assert_eq!(
            result.missing,
            vec![CanonicalField::TaxId, CanonicalField::Balance]
        );
    }

    #[test]
    fn test_empty_rows_fail_without_missing_fields() {
        let result = validate(&[], Domain::Receivable);
        assert!(!result.is_valid());
        assert!(result.missing.is_empty());

        let result = validate(&[], Domain::Balance);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_passthrough_domains_always_validate() {
        let rows = vec![RawRow::new().with("anything", 1.0)];
        assert!(validate(&rows, Domain::Balance).is_valid());
        assert!(validate(&rows, Domain::FunctionStatement).is_valid());
    }

    #[test]
    fn test_only_first_row_headers_are_checked() {
        let rows = vec![
            row_with_headers(&["Cliente"]),
            row_with_headers(&receivable_headers()),
        ];
        assert!(!validate(&rows, Domain::Receivable).is_valid());

        let rows = vec![
            row_with_headers(&receivable_headers()),
            row_with_headers(&["Cliente"]),
        ];
        assert!(validate(&rows, Domain::Receivable).is_valid());
    }

    #[test]
    fn test_into_result_maps_failures() {
        let err = validate(&[], Domain::Payable)
            .into_result(Domain::Payable)
            .unwrap_err();
        assert!(matches!(err, DashboardError::EmptyUpload(Domain::Payable)));

        let err = ValidationResult::failed(vec![CanonicalField::Stage])
            .into_result(Domain::Project)
            .unwrap_err();
        assert_eq!(err.to_string(), "Schema error in proj: missing fields etapa");
    }
}
