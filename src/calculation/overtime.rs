//! Overtime pay calculation.
//!
//! ## Rate Selection
//!
//! 1. The employee's fixed overtime rate per hour, when set.
//! 2. Otherwise the hourly rate × the employee's multiplier.
//! 3. Otherwise the hourly rate × the configured default multiplier.
//!
//! The hourly rate is `basic_salary / (contract_days_per_month × contract_hours_per_day)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AuditStep, Employee};

use super::round_money;

/// Where the overtime rate per hour came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvertimeRateSource {
    /// The employee's fixed rate per hour.
    FixedRate,
    /// The employee's own multiplier.
    EmployeeMultiplier,
    /// The configured default multiplier.
    DefaultMultiplier,
}

/// The result of an overtime calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeResult {
    /// The overtime hours paid.
    pub hours: Decimal,
    /// The employee's ordinary hourly rate.
    pub hourly_rate: Decimal,
    /// The amount paid per overtime hour.
    pub rate_per_hour: Decimal,
    /// Where the rate per hour came from.
    pub source: OvertimeRateSource,
    /// The rounded overtime amount.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Returns the employee's ordinary hourly rate.
///
/// Returns zero when the contract hours are not configured.
pub fn hourly_rate(employee: &Employee) -> Decimal {
    let monthly_hours = Decimal::from(employee.contract_days_per_month) * employee.contract_hours_per_day;
    if monthly_hours <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    employee.basic_salary / monthly_hours
}

/// Calculates overtime pay for the given hours.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{calculate_overtime, OvertimeRateSource};
/// use payroll_engine::models::{Employee, EmployeeStatus, EmploymentType};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let employee = Employee {
///     id: "emp_001".to_string(),
///     full_name: "Sara Malik".to_string(),
///     status: EmployeeStatus::Active,
///     category: "all".to_string(),
///     department: None,
///     position: None,
///     employment_type: EmploymentType::FullTime,
///     joining_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
///     basic_salary: Decimal::new(3000, 0),
///     allowances: Default::default(),
///     contract_days_per_month: 30,
///     contract_hours_per_day: Decimal::new(8, 0),
///     overtime: Default::default(),
/// };
///
/// // 3000 / (30 × 8) = 12.50 per hour, × 1.5 = 18.75, × 10 hours
/// let result = calculate_overtime(&employee, Decimal::new(10, 0), Decimal::new(15, 1), 2, 1);
/// assert_eq!(result.amount, Decimal::new(18750, 2));
/// assert_eq!(result.source, OvertimeRateSource::DefaultMultiplier);
/// ```
pub fn calculate_overtime(
    employee: &Employee,
    overtime_hours: Decimal,
    default_multiplier: Decimal,
    scale: u32,
    step_number: u32,
) -> OvertimeResult {
    let hourly_rate = hourly_rate(employee);

    let (rate_per_hour, source, multiplier) = match (
        employee.overtime.fixed_rate,
        employee.overtime.multiplier,
    ) {
        (Some(fixed), _) => (fixed, OvertimeRateSource::FixedRate, None),
        (None, Some(multiplier)) => (
            hourly_rate * multiplier,
            OvertimeRateSource::EmployeeMultiplier,
            Some(multiplier),
        ),
        (None, None) => (
            hourly_rate * default_multiplier,
            OvertimeRateSource::DefaultMultiplier,
            Some(default_multiplier),
        ),
    };

    let hours = overtime_hours.max(Decimal::ZERO);
    let amount = round_money(hours * rate_per_hour, scale);

    let reasoning = match (source, multiplier) {
        _ if hours.is_zero() => "No overtime hours recorded".to_string(),
        (OvertimeRateSource::FixedRate, _) => format!(
            "{} overtime hours × fixed rate {} = {}",
            hours.normalize(),
            rate_per_hour.normalize(),
            amount
        ),
        (_, Some(multiplier)) => format!(
            "{} overtime hours × hourly rate {} × {} = {}",
            hours.normalize(),
            round_money(hourly_rate, scale + 2).normalize(),
            multiplier.normalize(),
            amount
        ),
        (_, None) => format!("{} overtime hours = {}", hours.normalize(), amount),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "overtime".to_string(),
        rule_name: "Overtime Pay".to_string(),
        input: serde_json::json!({
            "overtime_hours": hours.normalize().to_string(),
            "basic_salary": employee.basic_salary.to_string(),
            "contract_days_per_month": employee.contract_days_per_month,
            "contract_hours_per_day": employee.contract_hours_per_day.normalize().to_string(),
            "fixed_rate": employee.overtime.fixed_rate.map(|r| r.to_string()),
            "multiplier": multiplier.map(|m| m.normalize().to_string())
        }),
        output: serde_json::json!({
            "hourly_rate": round_money(hourly_rate, scale + 2).to_string(),
            "rate_per_hour": round_money(rate_per_hour, scale + 2).to_string(),
            "source": source,
            "amount": amount.to_string()
        }),
        reasoning,
    };

    OvertimeResult {
        hours,
        hourly_rate,
        rate_per_hour,
        source,
        amount,
        audit_step,
    }
}
