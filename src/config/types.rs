//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Every policy section has
//! defaults, so a partial `policy.yaml` is valid.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{DeductionRule, TaxRule};

/// Metadata about the configured company.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyMetadata {
    /// The company name printed on reports.
    pub name: String,
    /// ISO currency code of all amounts.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "SAR".to_string()
}

impl Default for CompanyMetadata {
    fn default() -> Self {
        Self {
            name: "Unnamed Company".to_string(),
            currency: default_currency(),
        }
    }
}

/// Rounding applied to every money component.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundingPolicy {
    /// Decimal places kept on money amounts.
    pub scale: u32,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self { scale: 2 }
    }
}

/// Overtime settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OvertimePolicy {
    /// Multiplier on the hourly rate used when the employee has no own terms.
    pub default_multiplier: Decimal,
}

impl Default for OvertimePolicy {
    fn default() -> Self {
        Self {
            default_multiplier: Decimal::new(15, 1),
        }
    }
}

/// Eligibility limits for advances and loans.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvancePolicy {
    /// Outstanding plus requested advances may not exceed this share of
    /// basic salary.
    pub max_advance_ratio: Decimal,
    /// Monthly loan installments may not exceed this share of basic salary.
    pub max_debt_to_income: Decimal,
    /// Upper bound on the number of installments.
    pub max_installments: u32,
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            max_advance_ratio: Decimal::new(5, 1),
            max_debt_to_income: Decimal::new(4, 1),
            max_installments: 60,
        }
    }
}

/// End-of-service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettlementPolicy {
    /// Days of basic salary paid as gratuity per year of service.
    pub gratuity_days_per_year: Decimal,
    /// Service below this many years earns no gratuity.
    pub minimum_service_years: Decimal,
    /// Days a monthly salary is divided by to get a daily rate.
    pub days_per_month_basis: Decimal,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            gratuity_days_per_year: Decimal::new(21, 0),
            minimum_service_years: Decimal::ONE,
            days_per_month_basis: Decimal::new(30, 0),
        }
    }
}

/// The contents of `policy.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PayrollPolicy {
    /// Company metadata.
    pub company: CompanyMetadata,
    /// Money rounding.
    pub rounding: RoundingPolicy,
    /// Overtime settings.
    pub overtime: OvertimePolicy,
    /// Advance and loan limits.
    pub advances: AdvancePolicy,
    /// Final settlement settings.
    pub settlement: SettlementPolicy,
}

/// The contents of `deduction_rules.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeductionRulesConfig {
    /// The configured deduction rules.
    #[serde(default)]
    pub rules: Vec<DeductionRule>,
}

/// The contents of `tax_rules.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxRulesConfig {
    /// The configured tax rules.
    #[serde(default)]
    pub rules: Vec<TaxRule>,
}

/// The complete payroll configuration loaded from YAML files.
///
/// This struct aggregates all configuration loaded from the various
/// YAML files in a configuration directory.
#[derive(Debug, Clone, Default)]
pub struct PayrollConfig {
    policy: PayrollPolicy,
    deduction_rules: Vec<DeductionRule>,
    tax_rules: Vec<TaxRule>,
}

impl PayrollConfig {
    /// Creates a new PayrollConfig from its component parts.
    pub fn new(
        policy: PayrollPolicy,
        deduction_rules: Vec<DeductionRule>,
        tax_rules: Vec<TaxRule>,
    ) -> Self {
        Self {
            policy,
            deduction_rules,
            tax_rules,
        }
    }

    /// Returns the payroll policy.
    pub fn policy(&self) -> &PayrollPolicy {
        &self.policy
    }

    /// Returns the configured deduction rules.
    pub fn deduction_rules(&self) -> &[DeductionRule] {
        &self.deduction_rules
    }

    /// Returns the configured tax rules.
    pub fn tax_rules(&self) -> &[TaxRule] {
        &self.tax_rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_empty_policy_uses_defaults() {
        let policy: PayrollPolicy = serde_yaml::from_str("{}").unwrap();

        assert_eq!(policy.rounding.scale, 2);
        assert_eq!(policy.overtime.default_multiplier, dec("1.5"));
        assert_eq!(policy.advances.max_advance_ratio, dec("0.5"));
        assert_eq!(policy.advances.max_debt_to_income, dec("0.4"));
        assert_eq!(policy.settlement.gratuity_days_per_year, dec("21"));
        assert_eq!(policy.settlement.minimum_service_years, dec("1"));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let yaml = r#"
settlement:
  gratuity_days_per_year: "15"
"#;
        let policy: PayrollPolicy = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(policy.settlement.gratuity_days_per_year, dec("15"));
        assert_eq!(policy.settlement.days_per_month_basis, dec("30"));
    }
}
