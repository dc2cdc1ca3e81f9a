use crate::error::{DashboardError, Result};
use crate::metrics::DEFAULT_TOP_N;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(
        description = "Year used for the monthly comparison charts. The prior year is compared against it. Defaults to the year of the processing time."
    )]
    pub reporting_year: Option<i32>,

    #[schemars(description = "How many entities the debtor ranking keeps.")]
    pub top_n: usize,

    #[schemars(
        description = "Case-insensitive substrings that mark a free-text currency cell as foreign. Foreign records are left out of local-currency aggregates."
    )]
    pub foreign_currency_markers: Vec<String>,

    #[schemars(
        description = "Lowercase substring of the project status that counts a project as in execution."
    )]
    pub execution_status_marker: String,

    #[schemars(
        description = "Fail processing on malformed numeric or date cells instead of degrading them to 0 / empty."
    )]
    pub strict_coercion: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            reporting_year: None,
            top_n: DEFAULT_TOP_N,
            foreign_currency_markers: vec!["USD".to_string(), "DOLAR".to_string(), "$".to_string()],
            execution_status_marker: "ejecucion".to_string(),
            strict_coercion: false,
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(DashboardError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }

        if let Some(year) = self.reporting_year {
            if !(1900..=9999).contains(&year) {
                return Err(DashboardError::InvalidConfig(format!(
                    "reporting_year {} must be between 1900 and 9999",
                    year
                )));
            }
        }

        if self.foreign_currency_markers.iter().all(|m| m.is_empty()) {
            return Err(DashboardError::InvalidConfig(
                "at least one non-empty foreign currency marker is required".to_string(),
            ));
        }

        Ok(())
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(DashboardConfig))
    }
}
