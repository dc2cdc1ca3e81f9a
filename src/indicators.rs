//! Composite views handed to the presentation layer: the strategic overview,
//! the payables drill-down and the project portfolio.

use crate::coercion::coerce_number;
use crate::config::DashboardConfig;
use crate::metrics::{
    average, bucketed_sum, count_where, monthly_series, monthly_series_excluding, ratio,
    sum_balance_where, sum_field, top_entities_by_balance, total_balance, AgingDistribution,
    EntityTotal, MonthlySeries,
};
use crate::record::{CellValue, NormalizedDataset, NormalizedRecord, RawRow};
use crate::schema::CanonicalField;
use crate::utils::is_foreign_currency;
use chrono::Datelike;
use schemars::JsonSchema;
use serde::Serialize;

const CASH_HEADER: &str = "efectivo_y_equivalente_de_efectivo";
const TRADE_RECEIVABLES_HEADER: &str = "cuentas_por_cobrar_comerciales";
const CURRENT_LIABILITIES_HEADER: &str = "total_pasivo_corriente";

pub const NO_STAGE_LABEL: &str = "Sin Etapa";

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct YearComparison {
    pub current_year: i32,
    pub prior_year: i32,
    pub current: MonthlySeries,
    pub prior: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CashFlowSeries {
    pub year: i32,
    /// Local-currency receivables by due month.
    pub collections: MonthlySeries,
    /// Local-currency payables by due month.
    pub payments: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ProjectPoint {
    /// Calendar month, 1-based.
    pub month: u32,
    pub net_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct VisionSummary {
    pub total_receivables: f64,
    pub total_payables: f64,
    pub net_flow: f64,
    /// Receivables over payables.
    pub liquidity_ratio: f64,
    pub total_net_budget: f64,
    pub acid_test: Option<f64>,
    pub receivables_by_issue_month: YearComparison,
    pub collections_vs_payments: CashFlowSeries,
    pub receivables_aging: AgingDistribution,
    pub payables_aging: AgingDistribution,
    pub top_debtors: Vec<EntityTotal>,
    pub project_points: Vec<ProjectPoint>,
}

impl VisionSummary {
    pub fn compute(dataset: &NormalizedDataset, config: &DashboardConfig) -> Self {
        let year = config
            .reporting_year
            .unwrap_or_else(|| dataset.processed_at.year());
        let receivables = &dataset.receivables;
        let payables = &dataset.payables;

        let total_receivables = total_balance(receivables);
        let total_payables = total_balance(payables);

        let markers = &config.foreign_currency_markers;
        let foreign = |field: CanonicalField| {
            move |r: &NormalizedRecord| {
                r.text(field)
                    .is_some_and(|currency| is_foreign_currency(&currency, markers))
            }
        };

        Self {
            total_receivables,
            total_payables,
            net_flow: total_receivables - total_payables,
            liquidity_ratio: ratio(total_receivables, total_payables),
            total_net_budget: sum_field(&dataset.projects, CanonicalField::NetBudget),
            acid_test: dataset.balance.as_deref().and_then(acid_test),
            receivables_by_issue_month: YearComparison {
                current_year: year,
                prior_year: year - 1,
                current: monthly_series(receivables, CanonicalField::IssueDate, year),
                prior: monthly_series(receivables, CanonicalField::IssueDate, year - 1),
            },
            collections_vs_payments: CashFlowSeries {
                year,
                collections: monthly_series_excluding(
                    receivables,
                    CanonicalField::DueDate,
                    year,
                    foreign(CanonicalField::CurrencyType),
                ),
                payments: monthly_series_excluding(
                    payables,
                    CanonicalField::DueDate,
                    year,
                    foreign(CanonicalField::Currency),
                ),
            },
            receivables_aging: bucketed_sum(receivables),
            payables_aging: bucketed_sum(payables),
            top_debtors: top_entities_by_balance(receivables, config.top_n),
            project_points: project_points(&dataset.projects),
        }
    }
}

/// Quick ratio from the first balance sheet row:
/// `(cash + trade receivables) / current liabilities`, with a zero liability
/// treated as 1. `None` without balance data.
pub fn acid_test(balance: &[RawRow]) -> Option<f64> {
    let first = balance.first()?;
    let empty = CellValue::Empty;
    let cell = |name: &str| {
        let value = first
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
            .unwrap_or(&empty);
        coerce_number(value)
    };

    let liabilities = match cell(CURRENT_LIABILITIES_HEADER) {
        l if l == 0.0 => 1.0,
        l => l,
    };
    let value = (cell(CASH_HEADER) + cell(TRADE_RECEIVABLES_HEADER)) / liabilities;
    value.is_finite().then_some(value)
}

/// (month, net budget) for every project with a start date.
pub fn project_points(projects: &[NormalizedRecord]) -> Vec<ProjectPoint> {
    projects
        .iter()
        .filter_map(|p| {
            p.date(CanonicalField::Date).map(|date| ProjectPoint {
                month: date.month(),
                net_budget: p.number(CanonicalField::NetBudget),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PayablesView {
    pub category: Option<String>,
    pub total_debt: f64,
    pub overdue: f64,
    pub not_due: f64,
    pub aging: AgingDistribution,
    pub records: Vec<NormalizedRecord>,
}

impl PayablesView {
    /// `category` filters by case-insensitive substring of the category cell;
    /// `None` keeps every record.
    pub fn compute(payables: &[NormalizedRecord], category: Option<&str>) -> Self {
        let records: Vec<NormalizedRecord> = match category {
            Some(filter) => {
                let filter = filter.to_uppercase();
                payables
                    .iter()
                    .filter(|r| {
                        r.text(CanonicalField::Category)
                            .is_some_and(|c| c.to_uppercase().contains(&filter))
                    })
                    .cloned()
                    .collect()
            }
            None => payables.to_vec(),
        };

        Self {
            category: category.map(str::to_string),
            total_debt: total_balance(&records),
            overdue: sum_balance_where(&records, |r| r.days_overdue() > 0),
            not_due: sum_balance_where(&records, |r| r.days_overdue() <= 0),
            aging: bucketed_sum(&records),
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BudgetExecution {
    pub executed: f64,
    /// Budget left, never negative.
    pub remaining: f64,
    /// Spent over budget as a percentage; 0 without a positive budget.
    pub percent: f64,
}

impl BudgetExecution {
    pub fn new(budget: f64, spent: f64) -> Self {
        Self {
            executed: spent,
            remaining: (budget - spent).max(0.0),
            percent: if budget > 0.0 {
                ratio(spent * 100.0, budget)
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct StageCount {
    pub stage: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ProjectPortfolio {
    pub stage: Option<String>,
    pub total_net_budget: f64,
    pub total_spent: f64,
    pub in_execution: usize,
    pub average_progress: f64,
    pub execution: BudgetExecution,
    pub projects_by_stage: Vec<StageCount>,
    pub records: Vec<NormalizedRecord>,
}

impl ProjectPortfolio {
    /// `stage` keeps only projects whose stage equals it exactly.
    pub fn compute(
        projects: &[NormalizedRecord],
        stage: Option<&str>,
        config: &DashboardConfig,
    ) -> Self {
        let records: Vec<NormalizedRecord> = match stage {
            Some(wanted) => projects
                .iter()
                .filter(|p| p.text(CanonicalField::Stage).as_deref() == Some(wanted))
                .cloned()
                .collect(),
            None => projects.to_vec(),
        };

        let marker = config.execution_status_marker.to_lowercase();
        let total_net_budget = sum_field(&records, CanonicalField::NetBudget);
        let total_spent = sum_field(&records, CanonicalField::Spent);

        Self {
            stage: stage.map(str::to_string),
            total_net_budget,
            total_spent,
            in_execution: count_where(&records, |p| {
                p.text(CanonicalField::Status)
                    .is_some_and(|s| s.to_lowercase().contains(&marker))
            }),
            average_progress: average(&records, CanonicalField::Progress),
            execution: BudgetExecution::new(total_net_budget, total_spent),
            projects_by_stage: count_by_stage(&records),
            records,
        }
    }
}

/// Distinct non-empty stages in the order they first appear.
pub fn stages(projects: &[NormalizedRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for stage in projects.iter().filter_map(|p| p.text(CanonicalField::Stage)) {
        if !seen.iter().any(|s| *s == *stage) {
            seen.push(stage.into_owned());
        }
    }
    seen
}

fn count_by_stage(projects: &[NormalizedRecord]) -> Vec<StageCount> {
    let mut counts: Vec<StageCount> = Vec::new();
    for project in projects {
        let stage = project
            .text(CanonicalField::Stage)
            .map(|s| s.into_owned())
            .unwrap_or_else(|| NO_STAGE_LABEL.to_string());
        match counts.iter_mut().find(|c| c.stage == stage) {
            Some(entry) => entry.count += 1,
            None => counts.push(StageCount { stage, count: 1 }),
        }
    }
    counts
}
