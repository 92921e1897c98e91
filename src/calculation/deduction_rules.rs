//! Deduction rule evaluation.
//!
//! ## Methods
//!
//! - **fixed**: the rule's constant amount.
//! - **percentage**: base × percentage / 100.
//! - **tiered**: the first tier (by lower bound) containing the base pays its
//!   fixed amount, or base × its percentage.
//! - **conditional**: every condition that holds adds its amount, or gross ×
//!   its percentage.
//!
//! The base is the payroll's gross, pro-rated basic or net amount depending on
//! the rule.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    AuditStep, BaseAmount, Condition, ConditionField, ConditionOperator, DeductionMethod,
    DeductionRule, Employee, Payroll, Tier,
};

use super::round_money;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct DeductionContext<'a> {
    /// The employee the payroll belongs to.
    pub employee: &'a Employee,
    /// The payroll deducted from.
    pub payroll: &'a Payroll,
    /// The evaluation date, used for years of service.
    pub as_of: NaiveDate,
}

impl DeductionContext<'_> {
    fn base_amount(&self, base: BaseAmount) -> Decimal {
        match base {
            BaseAmount::Gross => self.payroll.gross_amount,
            BaseAmount::Basic => self.payroll.base_salary,
            BaseAmount::Net => self.payroll.final_amount,
        }
    }
}

/// The result of evaluating one deduction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionResult {
    /// The rule evaluated.
    pub rule_id: Uuid,
    /// The rule's name.
    pub name: String,
    /// The base amount the rule ran against.
    pub base_amount: Decimal,
    /// The rounded deduction amount.
    pub amount: Decimal,
    /// Whether the deduction reduces taxable income.
    pub is_pre_tax: bool,
    /// Whether the deduction needs approval once recorded.
    pub requires_approval: bool,
    /// The audit step recording this evaluation.
    pub audit_step: AuditStep,
}

/// Evaluates a deduction rule against a payroll.
///
/// Returns `InvalidRule` when a matching tier or condition carries neither an
/// amount nor a percentage, and `InvalidCondition` when a condition cannot be
/// compared.
pub fn evaluate_deduction_rule(
    rule: &DeductionRule,
    ctx: &DeductionContext<'_>,
    scale: u32,
    step_number: u32,
) -> PayrollResult<DeductionResult> {
    let base = ctx.base_amount(rule.base_amount);

    let (raw, detail) = match &rule.method {
        DeductionMethod::Fixed { amount } => (*amount, format!("fixed amount {}", amount)),
        DeductionMethod::Percentage { percentage } => (
            base * percentage / HUNDRED,
            format!("{} × {}%", base, percentage.normalize()),
        ),
        DeductionMethod::Tiered { tiers } => tiered_amount(rule.id, tiers, base)?,
        DeductionMethod::Conditional { conditions } => {
            conditional_amount(rule.id, conditions, ctx)?
        }
    };

    let amount = round_money(raw.max(Decimal::ZERO), scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: format!("deduction:{}", rule.id),
        rule_name: rule.name.clone(),
        input: serde_json::json!({
            "calculation_method": rule.method.as_str(),
            "base_amount_type": rule.base_amount,
            "base_amount": base.to_string()
        }),
        output: serde_json::json!({
            "amount": amount.to_string(),
            "is_pre_tax": rule.is_pre_tax
        }),
        reasoning: format!("{}: {} = {}", rule.name, detail, amount),
    };

    Ok(DeductionResult {
        rule_id: rule.id,
        name: rule.name.clone(),
        base_amount: base,
        amount,
        is_pre_tax: rule.is_pre_tax,
        requires_approval: rule.requires_approval,
        audit_step,
    })
}

fn tiered_amount(rule_id: Uuid, tiers: &[Tier], base: Decimal) -> PayrollResult<(Decimal, String)> {
    let mut sorted: Vec<&Tier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.amount_from.cmp(&b.amount_from));

    let Some(tier) = sorted
        .into_iter()
        .find(|t| base >= t.amount_from && t.amount_to.is_none_or(|to| base <= to))
    else {
        return Ok((Decimal::ZERO, format!("no tier contains {}", base)));
    };

    match (tier.fixed_amount, tier.percentage) {
        (Some(fixed), _) => Ok((
            fixed,
            format!("tier from {} pays fixed {}", tier.amount_from, fixed),
        )),
        (None, Some(percentage)) => Ok((
            base * percentage / HUNDRED,
            format!(
                "tier from {} pays {} × {}%",
                tier.amount_from,
                base,
                percentage.normalize()
            ),
        )),
        (None, None) => Err(PayrollError::InvalidRule {
            rule_id,
            message: format!(
                "tier from {} has neither fixed_amount nor percentage",
                tier.amount_from
            ),
        }),
    }
}

fn conditional_amount(
    rule_id: Uuid,
    conditions: &[Condition],
    ctx: &DeductionContext<'_>,
) -> PayrollResult<(Decimal, String)> {
    let mut total = Decimal::ZERO;
    let mut matched = Vec::new();

    for condition in conditions {
        if !evaluate_condition(condition, ctx)? {
            continue;
        }
        let contribution = match (condition.amount, condition.percentage) {
            (Some(amount), _) => amount,
            (None, Some(percentage)) => ctx.payroll.gross_amount * percentage / HUNDRED,
            (None, None) => {
                return Err(PayrollError::InvalidRule {
                    rule_id,
                    message: format!(
                        "condition on '{}' has neither amount nor percentage",
                        condition.field.as_str()
                    ),
                });
            }
        };
        total += contribution;
        matched.push(condition.field.as_str());
    }

    let detail = if matched.is_empty() {
        "no condition matched".to_string()
    } else {
        format!("matched conditions on {}", matched.join(", "))
    };
    Ok((total, detail))
}

enum FieldValue {
    Number(Decimal),
    Text(Option<String>),
}

fn field_value(field: ConditionField, ctx: &DeductionContext<'_>) -> FieldValue {
    match field {
        ConditionField::GrossAmount => FieldValue::Number(ctx.payroll.gross_amount),
        ConditionField::BasicSalary => FieldValue::Number(ctx.payroll.base_salary),
        ConditionField::YearsOfService => {
            FieldValue::Number(Decimal::from(ctx.employee.years_of_service(ctx.as_of)))
        }
        ConditionField::Department => FieldValue::Text(ctx.employee.department.clone()),
        ConditionField::Position => FieldValue::Text(ctx.employee.position.clone()),
        ConditionField::EmploymentType => {
            FieldValue::Text(Some(ctx.employee.employment_type.as_str().to_string()))
        }
    }
}

fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_list(condition: &Condition) -> PayrollResult<&Vec<serde_json::Value>> {
    condition
        .value
        .as_array()
        .ok_or_else(|| PayrollError::InvalidCondition {
            field: condition.field.as_str().to_string(),
            message: "'in' and 'not_in' need a list value".to_string(),
        })
}

/// Returns true if the condition holds for the payroll and employee.
pub fn evaluate_condition(condition: &Condition, ctx: &DeductionContext<'_>) -> PayrollResult<bool> {
    let field = condition.field.as_str();
    let invalid = |message: String| PayrollError::InvalidCondition {
        field: field.to_string(),
        message,
    };

    match field_value(condition.field, ctx) {
        FieldValue::Number(actual) => {
            if matches!(condition.operator, ConditionOperator::In | ConditionOperator::NotIn) {
                let list = json_list(condition)?;
                let found = list.iter().filter_map(json_decimal).any(|v| v == actual);
                return Ok(found == (condition.operator == ConditionOperator::In));
            }

            let expected = json_decimal(&condition.value)
                .ok_or_else(|| invalid(format!("expected a number, got {}", condition.value)))?;
            Ok(match condition.operator {
                ConditionOperator::Eq => actual == expected,
                ConditionOperator::Gt => actual > expected,
                ConditionOperator::Lt => actual < expected,
                ConditionOperator::Gte => actual >= expected,
                ConditionOperator::Lte => actual <= expected,
                ConditionOperator::In | ConditionOperator::NotIn => false,
            })
        }
        FieldValue::Text(actual) => match condition.operator {
            ConditionOperator::Eq => {
                let expected = json_text(&condition.value)
                    .ok_or_else(|| invalid(format!("expected text, got {}", condition.value)))?;
                Ok(actual.as_deref() == Some(expected.as_str()))
            }
            ConditionOperator::In | ConditionOperator::NotIn => {
                let list = json_list(condition)?;
                let found = actual
                    .as_deref()
                    .is_some_and(|a| list.iter().filter_map(json_text).any(|v| v == a));
                Ok(found == (condition.operator == ConditionOperator::In))
            }
            _ => Err(invalid("ordering operators only apply to numeric fields".to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Allowances, AuditTrace, EmployeeStatus, EmploymentType, OvertimeTerms, PayrollMonth,
        PayrollStatus,
    };
    use chrono::Utc;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_employee() -> Employee {
        Employee {
            id: "emp_001".to_string(),
            full_name: "Sara Malik".to_string(),
            status: EmployeeStatus::Active,
            category: "all".to_string(),
            department: Some("Fleet".to_string()),
            position: Some("Driver".to_string()),
            employment_type: EmploymentType::FullTime,
            joining_date: date(2019, 1, 1),
            basic_salary: dec("3000"),
            allowances: Allowances::default(),
            contract_days_per_month: 30,
            contract_hours_per_day: dec("8"),
            overtime: OvertimeTerms::default(),
        }
    }

    fn create_payroll(base: &str, gross: &str, net: &str) -> Payroll {
        Payroll {
            id: Uuid::new_v4(),
            employee_id: "emp_001".to_string(),
            month: PayrollMonth::new(2026, 2).unwrap(),
            base_salary: dec(base),
            allowances: Decimal::ZERO,
            overtime_hours: Decimal::ZERO,
            overtime_amount: Decimal::ZERO,
            bonus_amount: Decimal::ZERO,
            advance_deduction: Decimal::ZERO,
            deduction_amount: Decimal::ZERO,
            gross_amount: dec(gross),
            final_amount: dec(net),
            days_worked: 20,
            total_worked_hours: dec("160"),
            status: PayrollStatus::Pending,
            payroll_run_id: None,
            approved_by: None,
            approved_at: None,
            payment: None,
            created_at: Utc::now(),
            audit_trace: AuditTrace::default(),
        }
    }

    fn create_rule(method: DeductionMethod, base_amount: BaseAmount) -> DeductionRule {
        DeductionRule {
            id: Uuid::new_v4(),
            name: "Test rule".to_string(),
            category: "all".to_string(),
            method,
            base_amount,
            is_pre_tax: false,
            requires_approval: false,
            active: true,
            effective_from: date(2026, 1, 1),
            effective_until: None,
        }
    }

    fn condition(field: ConditionField, operator: ConditionOperator, value: serde_json::Value) -> Condition {
        Condition {
            field,
            operator,
            value,
            amount: Some(dec("50")),
            percentage: None,
        }
    }

    fn evaluate(rule: &DeductionRule, payroll: &Payroll) -> PayrollResult<DeductionResult> {
        let employee = create_employee();
        let ctx = DeductionContext {
            employee: &employee,
            payroll,
            as_of: date(2026, 2, 28),
        };
        evaluate_deduction_rule(rule, &ctx, 2, 1)
    }

    #[test]
    fn test_fixed_amount() {
        let rule = create_rule(DeductionMethod::Fixed { amount: dec("75") }, BaseAmount::Gross);
        let result = evaluate(&rule, &create_payroll("2000", "2787.50", "2387.50")).unwrap();
        assert_eq!(result.amount, dec("75"));
    }

    #[test]
    fn test_percentage_uses_selected_base() {
        let payroll = create_payroll("2000", "2787.50", "2387.50");
        let pct = DeductionMethod::Percentage { percentage: dec("10") };

        let gross = evaluate(&create_rule(pct.clone(), BaseAmount::Gross), &payroll).unwrap();
        let basic = evaluate(&create_rule(pct.clone(), BaseAmount::Basic), &payroll).unwrap();
        let net = evaluate(&create_rule(pct, BaseAmount::Net), &payroll).unwrap();

        assert_eq!(gross.amount, dec("278.75"));
        assert_eq!(basic.amount, dec("200"));
        assert_eq!(net.amount, dec("238.75"));
    }

    #[test]
    fn test_tiered_picks_single_matching_tier() {
        let tiers = vec![
            Tier {
                amount_from: dec("3000.01"),
                amount_to: None,
                fixed_amount: None,
                percentage: Some(dec("2")),
            },
            Tier {
                amount_from: dec("0"),
                amount_to: Some(dec("3000")),
                fixed_amount: Some(dec("50")),
                percentage: None,
            },
        ];
        let rule = create_rule(DeductionMethod::Tiered { tiers }, BaseAmount::Gross);

        let low = evaluate(&rule, &create_payroll("2000", "2787.50", "2787.50")).unwrap();
        let high = evaluate(&rule, &create_payroll("4000", "5000", "5000")).unwrap();

        assert_eq!(low.amount, dec("50"));
        assert_eq!(high.amount, dec("100"));
    }

    #[test]
    fn test_tiered_without_matching_tier_is_zero() {
        let tiers = vec![Tier {
            amount_from: dec("10000"),
            amount_to: None,
            fixed_amount: Some(dec("500")),
            percentage: None,
        }];
        let rule = create_rule(DeductionMethod::Tiered { tiers }, BaseAmount::Gross);

        let result = evaluate(&rule, &create_payroll("2000", "2787.50", "2787.50")).unwrap();
        assert_eq!(result.amount, Decimal::ZERO);
    }

    #[test]
    fn test_tier_without_amount_is_invalid() {
        let tiers = vec![Tier {
            amount_from: dec("0"),
            amount_to: None,
            fixed_amount: None,
            percentage: None,
        }];
        let rule = create_rule(DeductionMethod::Tiered { tiers }, BaseAmount::Gross);

        let result = evaluate(&rule, &create_payroll("2000", "2787.50", "2787.50"));
        assert!(matches!(result, Err(PayrollError::InvalidRule { .. })));
    }

    #[test]
    fn test_conditional_sums_matching_conditions() {
        let conditions = vec![
            condition(ConditionField::Department, ConditionOperator::Eq, json!("Fleet")),
            condition(ConditionField::YearsOfService, ConditionOperator::Gte, json!(5)),
            condition(ConditionField::GrossAmount, ConditionOperator::Gt, json!("10000")),
            Condition {
                field: ConditionField::EmploymentType,
                operator: ConditionOperator::In,
                value: json!(["full_time", "part_time"]),
                amount: None,
                percentage: Some(dec("1")),
            },
        ];
        let rule = create_rule(DeductionMethod::Conditional { conditions }, BaseAmount::Gross);

        // 50 (department) + 50 (7 years of service) + 1% of 3000 gross
        let result = evaluate(&rule, &create_payroll("2000", "3000", "3000")).unwrap();
        assert_eq!(result.amount, dec("130"));
    }

    #[test]
    fn test_not_in_with_missing_value_holds() {
        let employee = Employee {
            department: None,
            ..create_employee()
        };
        let payroll = create_payroll("2000", "3000", "3000");
        let ctx = DeductionContext {
            employee: &employee,
            payroll: &payroll,
            as_of: date(2026, 2, 28),
        };

        let not_in = condition(ConditionField::Department, ConditionOperator::NotIn, json!(["Fleet"]));
        let is_in = condition(ConditionField::Department, ConditionOperator::In, json!(["Fleet"]));

        assert!(evaluate_condition(&not_in, &ctx).unwrap());
        assert!(!evaluate_condition(&is_in, &ctx).unwrap());
    }

    #[test]
    fn test_ordering_on_text_field_is_invalid() {
        let employee = create_employee();
        let payroll = create_payroll("2000", "3000", "3000");
        let ctx = DeductionContext {
            employee: &employee,
            payroll: &payroll,
            as_of: date(2026, 2, 28),
        };

        let cond = condition(ConditionField::Position, ConditionOperator::Gt, json!("Driver"));
        assert!(matches!(
            evaluate_condition(&cond, &ctx),
            Err(PayrollError::InvalidCondition { .. })
        ));
    }

    #[test]
    fn test_non_numeric_value_on_numeric_field_is_invalid() {
        let employee = create_employee();
        let payroll = create_payroll("2000", "3000", "3000");
        let ctx = DeductionContext {
            employee: &employee,
            payroll: &payroll,
            as_of: date(2026, 2, 28),
        };

        let cond = condition(ConditionField::BasicSalary, ConditionOperator::Lt, json!("lots"));
        assert!(evaluate_condition(&cond, &ctx).is_err());
    }

    #[test]
    fn test_audit_step_identifies_rule() {
        let rule = create_rule(DeductionMethod::Fixed { amount: dec("75") }, BaseAmount::Net);
        let result = evaluate(&rule, &create_payroll("2000", "2787.50", "2387.50")).unwrap();

        assert_eq!(result.audit_step.rule_id, format!("deduction:{}", rule.id));
        assert_eq!(result.audit_step.input["base_amount_type"], "net");
        assert_eq!(result.audit_step.input["calculation_method"], "fixed");
    }
}
