use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record category an uploaded sheet belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum Domain {
    #[schemars(description = "Accounts receivable (cuentas por cobrar). Schema enforced.")]
    Receivable,

    #[schemars(description = "Accounts payable (cuentas por pagar). Schema enforced.")]
    Payable,

    #[schemars(description = "Project budgets and execution. Schema enforced.")]
    Project,

    #[schemars(description = "Balance sheet rows, kept as an opaque raw record set.")]
    Balance,

    #[schemars(description = "Income statement by function, kept as an opaque raw record set.")]
    FunctionStatement,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Receivable,
        Domain::Payable,
        Domain::Project,
        Domain::Balance,
        Domain::FunctionStatement,
    ];

    /// Domains that must be loaded before the dashboard can be processed.
    pub const SCHEMA_ENFORCED: [Domain; 3] = [Domain::Receivable, Domain::Payable, Domain::Project];

    pub fn is_schema_enforced(self) -> bool {
        Self::SCHEMA_ENFORCED.contains(&self)
    }

    /// Canonical fields every upload of this domain must be able to resolve.
    /// Passthrough domains have none.
    pub fn required_fields(self) -> &'static [CanonicalField] {
        match self {
            Domain::Receivable => RECEIVABLE_FIELDS,
            Domain::Payable => PAYABLE_FIELDS,
            Domain::Project => PROJECT_FIELDS,
            Domain::Balance | Domain::FunctionStatement => &[],
        }
    }

    /// Short key used by upload slots.
    pub fn key(self) -> &'static str {
        match self {
            Domain::Receivable => "cxc",
            Domain::Payable => "cxp",
            Domain::Project => "proj",
            Domain::Balance => "balance",
            Domain::FunctionStatement => "funcion",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How the normalizer coerces a field's raw cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Date,
    Raw,
}

/// Internal name of a data attribute, independent of the header text in the sheet.
///
/// Serialized names follow the sheet vocabulary (`saldo`, `fecha_vencimiento`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum CanonicalField {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "ruc")]
    TaxId,
    #[serde(rename = "entidad")]
    Entity,
    #[serde(rename = "documento")]
    Document,
    #[serde(rename = "fecha_emision")]
    IssueDate,
    #[serde(rename = "fecha_vencimiento")]
    DueDate,
    #[serde(rename = "monto")]
    Amount,
    #[serde(rename = "tipo_moneda")]
    CurrencyType,
    #[serde(rename = "moneda")]
    Currency,
    #[serde(rename = "cuenta_contable")]
    LedgerAccount,
    #[serde(rename = "saldo")]
    Balance,
    #[serde(rename = "categoria")]
    Category,
    #[serde(rename = "proyecto_id")]
    ProjectId,
    #[serde(rename = "proyecto")]
    Project,
    #[serde(rename = "fecha")]
    Date,
    #[serde(rename = "factura")]
    Invoice,
    #[serde(rename = "sub_total")]
    SubTotal,
    #[serde(rename = "igv")]
    Tax,
    #[serde(rename = "total")]
    Total,
    #[serde(rename = "detraccion")]
    Withholding,
    #[serde(rename = "presupuesto_neto")]
    NetBudget,
    #[serde(rename = "garantias")]
    Guarantees,
    #[serde(rename = "gastado")]
    Spent,
    #[serde(rename = "avance")]
    Progress,
    #[serde(rename = "estado")]
    Status,
    #[serde(rename = "etapa")]
    Stage,
}

use CanonicalField::*;

const RECEIVABLE_FIELDS: &[CanonicalField] = &[
    Id,
    TaxId,
    Entity,
    Document,
    IssueDate,
    DueDate,
    Amount,
    CurrencyType,
    LedgerAccount,
    Balance,
    Category,
    ProjectId,
];

const PAYABLE_FIELDS: &[CanonicalField] = &[
    Id, TaxId, Entity, Document, IssueDate, DueDate, Currency, Balance, Category, ProjectId,
];

const PROJECT_FIELDS: &[CanonicalField] = &[
    ProjectId,
    Entity,
    Project,
    Date,
    Invoice,
    SubTotal,
    Tax,
    Total,
    Withholding,
    NetBudget,
    Guarantees,
    Spent,
    Progress,
    Balance,
    Status,
    Stage,
];

const NUMERIC_FIELDS: &[CanonicalField] = &[
    Amount,
    Balance,
    Total,
    Spent,
    NetBudget,
    SubTotal,
    Tax,
    Withholding,
    Guarantees,
    Progress,
];

/// Any canonical name containing this marker holds a date.
const DATE_MARKER: &str = "fecha";

impl CanonicalField {
    pub const ALL: [CanonicalField; 26] = [
        Id,
        TaxId,
        Entity,
        Document,
        IssueDate,
        DueDate,
        Amount,
        CurrencyType,
        Currency,
        LedgerAccount,
        Balance,
        Category,
        ProjectId,
        Project,
        Date,
        Invoice,
        SubTotal,
        Tax,
        Total,
        Withholding,
        NetBudget,
        Guarantees,
        Spent,
        Progress,
        Status,
        Stage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Id => "id",
            TaxId => "ruc",
            Entity => "entidad",
            Document => "documento",
            IssueDate => "fecha_emision",
            DueDate => "fecha_vencimiento",
            Amount => "monto",
            CurrencyType => "tipo_moneda",
            Currency => "moneda",
            LedgerAccount => "cuenta_contable",
            Balance => "saldo",
            Category => "categoria",
            ProjectId => "proyecto_id",
            Project => "proyecto",
            Date => "fecha",
            Invoice => "factura",
            SubTotal => "sub_total",
            Tax => "igv",
            Total => "total",
            Withholding => "detraccion",
            NetBudget => "presupuesto_neto",
            Guarantees => "garantias",
            Spent => "gastado",
            Progress => "avance",
            Status => "estado",
            Stage => "etapa",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let folded = name.to_lowercase();
        Self::ALL.into_iter().find(|f| f.name() == folded)
    }

    /// Accepted alternate header spellings. Empty when only the canonical
    /// name itself is accepted.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Amount => &["monto", "total", "importe", "importe_mn"],
            Balance => &["saldo", "pendiente", "saldo_mn"],
            Entity => &["entidad", "cliente", "proveedor", "anexo", "razon_social"],
            DueDate => &["fecha_vencimiento", "vcto", "vencimiento", "f_venc"],
            ProjectId => &["proyecto_id", "cod_proyecto", "id_proyecto"],
            Date => &["fecha", "f_inicio", "fecha_inicio"],
            _ => &[],
        }
    }

    /// Case-insensitive match of an observed header against the canonical
    /// name or any alias.
    pub fn matches_header(self, header: &str) -> bool {
        let folded = header.to_lowercase();
        folded == self.name()
            || self
                .aliases()
                .iter()
                .any(|alias| alias.to_lowercase() == folded)
    }

    pub fn kind(self) -> FieldKind {
        if NUMERIC_FIELDS.contains(&self) {
            FieldKind::Numeric
        } else if self.name().contains(DATE_MARKER) {
            FieldKind::Date
        } else {
            FieldKind::Raw
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
