//! Pro-rated base salary and allowances.
//!
//! Monthly amounts are pro-rated by `days_worked / contract_days_per_month`.
//! Callers validate the employee's compensation first, so the contract day
//! count is never zero here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AuditStep, Employee};

use super::round_money;

/// The result of pro-rating a monthly amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProratedAmount {
    /// The pro-rated, rounded amount.
    pub amount: Decimal,
    /// The daily rate the amount was built from.
    pub daily_rate: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

fn daily_rate(monthly: Decimal, contract_days: u32) -> Decimal {
    if contract_days == 0 {
        return Decimal::ZERO;
    }
    monthly / Decimal::from(contract_days)
}

/// Calculates the base salary earned for the days worked.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_base_salary;
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
/// let result = calculate_base_salary(&employee, 20, 2, 1);
/// assert_eq!(result.amount, Decimal::new(2000, 0));
/// ```
pub fn calculate_base_salary(
    employee: &Employee,
    days_worked: u32,
    scale: u32,
    step_number: u32,
) -> ProratedAmount {
    let daily_rate = daily_rate(employee.basic_salary, employee.contract_days_per_month);
    let amount = round_money(daily_rate * Decimal::from(days_worked), scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: "base_salary".to_string(),
        rule_name: "Pro-rated Base Salary".to_string(),
        input: serde_json::json!({
            "basic_salary": employee.basic_salary.to_string(),
            "contract_days_per_month": employee.contract_days_per_month,
            "days_worked": days_worked
        }),
        output: serde_json::json!({
            "daily_rate": round_money(daily_rate, scale + 2).to_string(),
            "amount": amount.to_string()
        }),
        reasoning: format!(
            "{} / {} contract days × {} days worked = {}",
            employee.basic_salary.normalize(),
            employee.contract_days_per_month,
            days_worked,
            amount
        ),
    };

    ProratedAmount {
        amount,
        daily_rate,
        audit_step,
    }
}

/// Calculates the allowances earned for the days worked.
pub fn calculate_allowances(
    employee: &Employee,
    days_worked: u32,
    scale: u32,
    step_number: u32,
) -> ProratedAmount {
    let monthly = employee.allowances.total();
    let daily_rate = daily_rate(monthly, employee.contract_days_per_month);
    let amount = round_money(daily_rate * Decimal::from(days_worked), scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: "allowances".to_string(),
        rule_name: "Pro-rated Allowances".to_string(),
        input: serde_json::json!({
            "food": employee.allowances.food.to_string(),
            "housing": employee.allowances.housing.to_string(),
            "transport": employee.allowances.transport.to_string(),
            "contract_days_per_month": employee.contract_days_per_month,
            "days_worked": days_worked
        }),
        output: serde_json::json!({
            "monthly_total": monthly.to_string(),
            "amount": amount.to_string()
        }),
        reasoning: if monthly.is_zero() {
            "No allowances configured".to_string()
        } else {
            format!(
                "{} monthly allowances / {} contract days × {} days worked = {}",
                monthly.normalize(),
                employee.contract_days_per_month,
                days_worked,
                amount
            )
        },
    };

    ProratedAmount {
        amount,
        daily_rate,
        audit_step,
    }
}

/// Gross and net pay for a payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayTotals {
    /// Base + allowances + overtime + bonus.
    pub gross: Decimal,
    /// Gross less advance and loan repayments.
    pub net: Decimal,
    /// The audit step recording the totals.
    pub audit_step: AuditStep,
}

/// Sums the earning components and subtracts advance repayments.
pub fn calculate_pay_totals(
    base_salary: Decimal,
    allowances: Decimal,
    overtime: Decimal,
    bonus: Decimal,
    advance_deduction: Decimal,
    step_number: u32,
) -> PayTotals {
    let gross = base_salary + allowances + overtime + bonus;
    let net = gross - advance_deduction;

    let audit_step = AuditStep {
        step_number,
        rule_id: "pay_totals".to_string(),
        rule_name: "Gross and Net Pay".to_string(),
        input: serde_json::json!({
            "base_salary": base_salary.to_string(),
            "allowances": allowances.to_string(),
            "overtime": overtime.to_string(),
            "bonus": bonus.to_string(),
            "advance_deduction": advance_deduction.to_string()
        }),
        output: serde_json::json!({
            "gross": gross.to_string(),
            "net": net.to_string()
        }),
        reasoning: format!(
            "Gross {} + {} + {} + {} = {}; net {} - {} = {}",
            base_salary, allowances, overtime, bonus, gross, gross, advance_deduction, net
        ),
    };

    PayTotals {
        gross,
        net,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Allowances, EmployeeStatus, EmploymentType, OvertimeTerms};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_employee(basic: &str, contract_days: u32) -> Employee {
        Employee {
            id: "emp_001".to_string(),
            full_name: "Sara Malik".to_string(),
            status: EmployeeStatus::Active,
            category: "all".to_string(),
            department: None,
            position: None,
            employment_type: EmploymentType::FullTime,
            joining_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            basic_salary: dec(basic),
            allowances: Allowances {
                food: dec("300"),
                housing: dec("600"),
                transport: dec("0"),
            },
            contract_days_per_month: contract_days,
            contract_hours_per_day: dec("8"),
            overtime: OvertimeTerms::default(),
        }
    }

    #[test]
    fn test_base_salary_prorated_by_days() {
        let result = calculate_base_salary(&create_employee("3000", 30), 20, 2, 1);
        assert_eq!(result.amount, dec("2000"));
        assert_eq!(result.daily_rate, dec("100"));
    }

    #[test]
    fn test_full_month_pays_full_salary() {
        let result = calculate_base_salary(&create_employee("3000", 26), 26, 2, 1);
        assert_eq!(result.amount, dec("3000"));
    }

    #[test]
    fn test_base_salary_rounds_to_scale() {
        // 3000 / 26 × 7 = 807.6923...
        let result = calculate_base_salary(&create_employee("3000", 26), 7, 2, 1);
        assert_eq!(result.amount, dec("807.69"));
    }

    #[test]
    fn test_zero_days_worked_pays_nothing() {
        let result = calculate_base_salary(&create_employee("3000", 30), 0, 2, 1);
        assert_eq!(result.amount, Decimal::ZERO);
    }

    #[test]
    fn test_allowances_prorated_by_days() {
        let result = calculate_allowances(&create_employee("3000", 30), 20, 2, 2);
        assert_eq!(result.amount, dec("600"));
        assert_eq!(result.audit_step.output["monthly_total"], "900");
    }

    #[test]
    fn test_pay_totals() {
        let totals = calculate_pay_totals(
            dec("2000"),
            dec("600"),
            dec("187.50"),
            dec("0"),
            dec("400"),
            6,
        );
        assert_eq!(totals.gross, dec("2787.50"));
        assert_eq!(totals.net, dec("2387.50"));
        assert_eq!(totals.audit_step.step_number, 6);
    }

    #[test]
    fn test_no_allowances_reasoning() {
        let mut employee = create_employee("3000", 30);
        employee.allowances = Allowances::default();

        let result = calculate_allowances(&employee, 20, 2, 2);
        assert_eq!(result.amount, Decimal::ZERO);
        assert_eq!(result.audit_step.reasoning, "No allowances configured");
    }
}
