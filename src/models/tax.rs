//! Tax rule and tax document models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Employee, PayrollMonth};

/// An income band of a progressive or threshold-based tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Inclusive lower bound of the band.
    pub min_income: Decimal,
    /// Upper bound of the band; open-ended when absent.
    #[serde(default)]
    pub max_income: Option<Decimal>,
    /// Rate in percent.
    pub rate: Decimal,
}

impl TaxBracket {
    /// Returns true if `income` falls inside the band.
    pub fn contains(&self, income: Decimal) -> bool {
        income >= self.min_income && self.max_income.is_none_or(|max| income <= max)
    }
}

/// How a tax rule computes its amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "calculation_method", rename_all = "snake_case")]
pub enum TaxMethod {
    /// A single rate on the whole income.
    FlatRate {
        /// Rate in percent.
        rate: Decimal,
    },
    /// Each bracket taxes the slice of income inside it.
    Progressive {
        /// The brackets, in any order.
        brackets: Vec<TaxBracket>,
    },
    /// The bracket containing the income sets the rate for all of it.
    ThresholdBased {
        /// The brackets, in any order.
        brackets: Vec<TaxBracket>,
    },
}

impl TaxMethod {
    /// Returns the snake_case name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxMethod::FlatRate { .. } => "flat_rate",
            TaxMethod::Progressive { .. } => "progressive",
            TaxMethod::ThresholdBased { .. } => "threshold_based",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_category() -> String {
    "all".to_string()
}

/// A configured tax rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    /// Unique identifier for the rule.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Employee category the rule applies to, or "all".
    #[serde(default = "default_category")]
    pub category: String,
    /// How the tax is calculated.
    #[serde(flatten)]
    pub method: TaxMethod,
    /// Inactive rules are never applied.
    #[serde(default = "default_true")]
    pub active: bool,
    /// First day the rule applies.
    pub effective_from: NaiveDate,
    /// Last day the rule applies; open-ended when absent.
    #[serde(default)]
    pub effective_until: Option<NaiveDate>,
}

impl TaxRule {
    /// Returns true if the rule is in force for `employee` on `as_of`.
    pub fn applies_to(&self, employee: &Employee, as_of: NaiveDate) -> bool {
        self.active
            && employee.matches_category(&self.category)
            && self.effective_from <= as_of
            && self.effective_until.is_none_or(|until| as_of <= until)
    }
}

/// One month's line in a tax document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTaxSummary {
    /// The payroll month.
    pub month: PayrollMonth,
    /// Gross income for the month.
    pub gross_income: Decimal,
    /// Tax calculated on the month's payroll.
    pub tax_withheld: Decimal,
    /// Net pay for the month.
    pub net_income: Decimal,
    /// Overtime income for the month.
    pub overtime: Decimal,
    /// Bonus income for the month.
    pub bonus: Decimal,
}

/// The yearly tax summary for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDocument {
    /// Unique identifier for the document.
    pub id: Uuid,
    /// Human-readable document number.
    pub document_number: String,
    /// The employee the document covers.
    pub employee_id: String,
    /// The calendar tax year.
    pub tax_year: i32,
    /// Total gross income.
    pub gross_income: Decimal,
    /// Total tax calculated on the year's payrolls.
    pub tax_withheld: Decimal,
    /// Total net pay.
    pub net_income: Decimal,
    /// Total deductions from gross.
    pub total_deductions: Decimal,
    /// Overtime part of gross income.
    pub overtime_income: Decimal,
    /// Bonus part of gross income.
    pub bonus_income: Decimal,
    /// Advance and loan repayments withheld.
    pub advance_deductions: Decimal,
    /// Tax withheld as a percentage of gross income.
    pub effective_tax_rate: Decimal,
    /// Payrolls summarised by the document.
    pub payroll_ids: Vec<Uuid>,
    /// Month-by-month breakdown.
    pub monthly_breakdown: Vec<MonthlyTaxSummary>,
    /// When the document was (re)generated.
    pub generated_at: DateTime<Utc>,
}

impl TaxDocument {
    /// Builds the document number for an employee and year.
    pub fn document_number_for(employee_id: &str, tax_year: i32) -> String {
        format!("TAX-{}-{}", tax_year, employee_id.to_uppercase())
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
    fn test_bracket_contains_is_inclusive() {
        let bracket = TaxBracket {
            min_income: dec("1000"),
            max_income: Some(dec("2000")),
            rate: dec("10"),
        };
        assert!(bracket.contains(dec("1000")));
        assert!(bracket.contains(dec("2000")));
        assert!(!bracket.contains(dec("999.99")));
        assert!(!bracket.contains(dec("2000.01")));
    }

    #[test]
    fn test_open_ended_bracket() {
        let bracket = TaxBracket {
            min_income: dec("5000"),
            max_income: None,
            rate: dec("20"),
        };
        assert!(bracket.contains(dec("1000000")));
    }

    #[test]
    fn test_deserialize_progressive_rule() {
        let yaml = r#"
name: Income tax
calculation_method: progressive
effective_from: 2026-01-01
brackets:
  - min_income: "0"
    max_income: "1000"
    rate: "0"
  - min_income: "1000"
    rate: "10"
"#;
        let rule: TaxRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.method.as_str(), "progressive");
        assert!(rule.active);
        assert!(rule.effective_until.is_none());
    }

    #[test]
    fn test_document_number_format() {
        assert_eq!(
            TaxDocument::document_number_for("emp_001", 2026),
            "TAX-2026-EMP_001"
        );
    }
}
