//! Tax rule evaluation.
//!
//! ## Methods
//!
//! - **flat_rate**: income × rate / 100.
//! - **progressive**: each bracket taxes `max(0, min(income, upper) − lower)`
//!   at its own rate; an open upper bound extends to the income.
//! - **threshold_based**: the single bracket containing the income sets the
//!   rate applied to the whole income.
//!
//! Negative taxable income is taxed as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PayrollError, PayrollResult};
use crate::models::{AuditStep, TaxBracket, TaxMethod, TaxRule};

use super::round_money;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// The result of applying one tax rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    /// The rule applied.
    pub rule_id: Uuid,
    /// The rule's name.
    pub rule_name: String,
    /// The calculation method name.
    pub method: String,
    /// The income taxed.
    pub taxable_income: Decimal,
    /// The rounded tax.
    pub tax: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

fn sorted_brackets(rule: &TaxRule, brackets: &[TaxBracket]) -> PayrollResult<Vec<TaxBracket>> {
    if brackets.is_empty() {
        return Err(PayrollError::InvalidRule {
            rule_id: rule.id,
            message: format!("{} tax rule has no brackets", rule.method.as_str()),
        });
    }
    let mut sorted = brackets.to_vec();
    sorted.sort_by(|a, b| a.min_income.cmp(&b.min_income));
    Ok(sorted)
}

/// Returns the unrounded progressive tax on `income`.
pub fn progressive_tax(brackets: &[TaxBracket], income: Decimal) -> Decimal {
    brackets
        .iter()
        .map(|bracket| {
            let upper = bracket.max_income.map_or(income, |max| max.min(income));
            let portion = (upper - bracket.min_income).max(Decimal::ZERO);
            portion * bracket.rate / HUNDRED
        })
        .sum()
}

/// Applies a tax rule to a taxable income.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_tax;
/// use payroll_engine::models::{TaxBracket, TaxMethod, TaxRule};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let rule = TaxRule {
///     id: Uuid::new_v4(),
///     name: "Income tax".to_string(),
///     category: "all".to_string(),
///     method: TaxMethod::Progressive {
///         brackets: vec![
///             TaxBracket { min_income: Decimal::ZERO, max_income: Some(Decimal::new(1000, 0)), rate: Decimal::ZERO },
///             TaxBracket { min_income: Decimal::new(1000, 0), max_income: None, rate: Decimal::new(10, 0) },
///         ],
///     },
///     active: true,
///     effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     effective_until: None,
/// };
///
/// let result = calculate_tax(&rule, Decimal::new(2500, 0), 2, 1).unwrap();
/// assert_eq!(result.tax, Decimal::new(150, 0));
/// ```
pub fn calculate_tax(
    rule: &TaxRule,
    taxable_income: Decimal,
    scale: u32,
    step_number: u32,
) -> PayrollResult<TaxResult> {
    let income = taxable_income.max(Decimal::ZERO);

    let (raw, detail) = match &rule.method {
        TaxMethod::FlatRate { rate } => (
            income * rate / HUNDRED,
            format!("{} × {}%", income, rate.normalize()),
        ),
        TaxMethod::Progressive { brackets } => {
            let sorted = sorted_brackets(rule, brackets)?;
            (
                progressive_tax(&sorted, income),
                format!("{} taxed across {} brackets", income, sorted.len()),
            )
        }
        TaxMethod::ThresholdBased { brackets } => {
            let sorted = sorted_brackets(rule, brackets)?;
            match sorted.iter().find(|b| b.contains(income)) {
                Some(bracket) => (
                    income * bracket.rate / HUNDRED,
                    format!(
                        "{} falls in bracket from {} at {}%",
                        income,
                        bracket.min_income,
                        bracket.rate.normalize()
                    ),
                ),
                None => (Decimal::ZERO, format!("no bracket contains {}", income)),
            }
        }
    };

    let tax = round_money(raw, scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: format!("tax:{}", rule.id),
        rule_name: rule.name.clone(),
        input: serde_json::json!({
            "calculation_method": rule.method.as_str(),
            "taxable_income": income.to_string()
        }),
        output: serde_json::json!({
            "tax": tax.to_string()
        }),
        reasoning: format!("{}: {} = {}", rule.name, detail, tax),
    };

    Ok(TaxResult {
        rule_id: rule.id,
        rule_name: rule.name.clone(),
        method: rule.method.as_str().to_string(),
        taxable_income: income,
        tax,
        audit_step,
    })
}
