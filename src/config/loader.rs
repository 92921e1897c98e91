//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! configurations from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{PayrollError, PayrollResult};
use crate::models::{DeductionRule, TaxRule};

use super::types::{DeductionRulesConfig, PayrollConfig, PayrollPolicy, TaxRulesConfig};

/// Loads and provides access to payroll configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── policy.yaml           # Rounding, overtime, advance and settlement policy
/// ├── deduction_rules.yaml  # Deduction rules (optional)
/// └── tax_rules.yaml        # Tax rules (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Company: {}", loader.policy().company.name);
/// println!("Tax rules: {}", loader.tax_rules().len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: PayrollConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `policy.yaml` is missing, or if any present file
    /// contains invalid YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> PayrollResult<Self> {
        let path = path.as_ref();

        let policy = Self::load_yaml::<PayrollPolicy>(&path.join("policy.yaml"))?;

        let deduction_rules =
            Self::load_optional::<DeductionRulesConfig>(&path.join("deduction_rules.yaml"))?
                .unwrap_or_default()
                .rules;

        let tax_rules = Self::load_optional::<TaxRulesConfig>(&path.join("tax_rules.yaml"))?
            .unwrap_or_default()
            .rules;

        tracing::debug!(
            dir = %path.display(),
            deduction_rules = deduction_rules.len(),
            tax_rules = tax_rules.len(),
            "loaded payroll configuration"
        );

        Ok(Self {
            config: PayrollConfig::new(policy, deduction_rules, tax_rules),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> PayrollResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| PayrollError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| PayrollError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads a YAML file if it exists.
    fn load_optional<T: serde::de::DeserializeOwned>(path: &Path) -> PayrollResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_yaml(path).map(Some)
    }

    /// Returns the underlying payroll configuration.
    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> PayrollConfig {
        self.config
    }

    /// Returns the payroll policy.
    pub fn policy(&self) -> &PayrollPolicy {
        self.config.policy()
    }

    /// Returns the configured deduction rules.
    pub fn deduction_rules(&self) -> &[DeductionRule] {
        self.config.deduction_rules()
    }

    /// Returns the configured tax rules.
    pub fn tax_rules(&self) -> &[TaxRule] {
        self.config.tax_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeductionMethod, TaxMethod};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.policy().company.name, "Example Contracting Co.");
        assert_eq!(loader.policy().rounding.scale, 2);
    }

    #[test]
    fn test_policy_values_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let policy = loader.policy();

        assert_eq!(policy.overtime.default_multiplier, dec("1.5"));
        assert_eq!(policy.advances.max_advance_ratio, dec("0.5"));
        assert_eq!(policy.advances.max_debt_to_income, dec("0.4"));
        assert_eq!(policy.settlement.gratuity_days_per_year, dec("21"));
    }

    #[test]
    fn test_deduction_rules_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rules = loader.deduction_rules();

        assert_eq!(rules.len(), 2);
        let pension = rules.iter().find(|r| r.name == "Pension fund").unwrap();
        assert!(pension.is_pre_tax);
        assert_eq!(
            pension.method,
            DeductionMethod::Percentage {
                percentage: dec("5")
            }
        );
    }

    #[test]
    fn test_tax_rules_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rules = loader.tax_rules();

        assert_eq!(rules.len(), 1);
        match &rules[0].method {
            TaxMethod::Progressive { brackets } => assert_eq!(brackets.len(), 3),
            other => panic!("Expected progressive tax, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(PayrollError::ConfigNotFound { path }) => {
                assert!(path.contains("policy.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }
}
