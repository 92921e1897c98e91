//! End-of-service calculations.
//!
//! All components use a daily rate of `basic_salary / days_per_month_basis`.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SettlementPolicy;
use crate::models::AuditStep;

use super::round_money;

/// Length of service between joining and the last working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePeriod {
    /// Whole calendar months completed.
    pub completed_months: u32,
    /// Completed months / 12.
    pub years: Decimal,
}

/// Measures service in completed months.
///
/// A month is completed once the day of month of the joining date is reached
/// again.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::service_period;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let joined = NaiveDate::from_ymd_opt(2022, 7, 15).unwrap();
/// let left = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
///
/// let service = service_period(joined, left);
/// assert_eq!(service.completed_months, 41);
/// ```
pub fn service_period(joining_date: NaiveDate, last_working_date: NaiveDate) -> ServicePeriod {
    let mut months = (last_working_date.year() - joining_date.year()) * 12
        + last_working_date.month() as i32
        - joining_date.month() as i32;
    if last_working_date.day() < joining_date.day() {
        months -= 1;
    }
    let completed_months = months.max(0) as u32;

    ServicePeriod {
        completed_months,
        years: Decimal::from(completed_months) / Decimal::from(12),
    }
}

/// One computed settlement component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementComponent {
    /// The rounded amount.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

fn daily_rate(basic_salary: Decimal, policy: &SettlementPolicy) -> Decimal {
    if policy.days_per_month_basis <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    basic_salary / policy.days_per_month_basis
}

/// Calculates end-of-service gratuity.
///
/// Gratuity is `daily rate × gratuity_days_per_year × service years`, and zero
/// when service is below `minimum_service_years`.
pub fn calculate_gratuity(
    basic_salary: Decimal,
    service: &ServicePeriod,
    policy: &SettlementPolicy,
    scale: u32,
    step_number: u32,
) -> SettlementComponent {
    let daily = daily_rate(basic_salary, policy);
    let eligible = service.years >= policy.minimum_service_years;
    let amount = if eligible {
        round_money(daily * policy.gratuity_days_per_year * service.years, scale)
    } else {
        Decimal::ZERO
    };

    let reasoning = if eligible {
        format!(
            "{} / {} × {} days × {} years of service = {}",
            basic_salary.normalize(),
            policy.days_per_month_basis.normalize(),
            policy.gratuity_days_per_year.normalize(),
            round_money(service.years, 4).normalize(),
            amount
        )
    } else {
        format!(
            "{} months of service is below the {} year minimum; no gratuity",
            service.completed_months,
            policy.minimum_service_years.normalize()
        )
    };

    SettlementComponent {
        amount,
        audit_step: AuditStep {
            step_number,
            rule_id: "gratuity".to_string(),
            rule_name: "End-of-service Gratuity".to_string(),
            input: serde_json::json!({
                "basic_salary": basic_salary.to_string(),
                "completed_months": service.completed_months,
                "gratuity_days_per_year": policy.gratuity_days_per_year.to_string(),
                "minimum_service_years": policy.minimum_service_years.to_string()
            }),
            output: serde_json::json!({
                "eligible": eligible,
                "amount": amount.to_string()
            }),
            reasoning,
        },
    }
}

/// Calculates encashment of untaken leave days.
pub fn calculate_leave_encashment(
    basic_salary: Decimal,
    pending_leave_days: Decimal,
    policy: &SettlementPolicy,
    scale: u32,
    step_number: u32,
) -> SettlementComponent {
    let days = pending_leave_days.max(Decimal::ZERO);
    let amount = round_money(daily_rate(basic_salary, policy) * days, scale);

    SettlementComponent {
        amount,
        audit_step: AuditStep {
            step_number,
            rule_id: "leave_encashment".to_string(),
            rule_name: "Leave Encashment".to_string(),
            input: serde_json::json!({
                "basic_salary": basic_salary.to_string(),
                "pending_leave_days": days.normalize().to_string()
            }),
            output: serde_json::json!({ "amount": amount.to_string() }),
            reasoning: format!(
                "{} / {} × {} pending leave days = {}",
                basic_salary.normalize(),
                policy.days_per_month_basis.normalize(),
                days.normalize(),
                amount
            ),
        },
    }
}

/// Calculates the recovery for notice days not served.
pub fn calculate_notice_recovery(
    basic_salary: Decimal,
    shortfall_days: Decimal,
    policy: &SettlementPolicy,
    scale: u32,
    step_number: u32,
) -> SettlementComponent {
    let days = shortfall_days.max(Decimal::ZERO);
    let amount = round_money(daily_rate(basic_salary, policy) * days, scale);

    SettlementComponent {
        amount,
        audit_step: AuditStep {
            step_number,
            rule_id: "notice_recovery".to_string(),
            rule_name: "Notice Period Recovery".to_string(),
            input: serde_json::json!({
                "basic_salary": basic_salary.to_string(),
                "notice_shortfall_days": days.normalize().to_string()
            }),
            output: serde_json::json!({ "amount": amount.to_string() }),
            reasoning: if days.is_zero() {
                "Notice period fully served".to_string()
            } else {
                format!(
                    "{} / {} × {} unserved notice days = {}",
                    basic_salary.normalize(),
                    policy.days_per_month_basis.normalize(),
                    days.normalize(),
                    amount
                )
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_service_period_whole_years() {
        let service = service_period(date(2022, 7, 1), date(2026, 7, 1));
        assert_eq!(service.completed_months, 48);
        assert_eq!(service.years, dec("4"));
    }

    #[test]
    fn test_service_period_partial_month_not_counted() {
        let service = service_period(date(2022, 7, 15), date(2022, 9, 14));
        assert_eq!(service.completed_months, 1);
    }

    #[test]
    fn test_service_period_before_joining_is_zero() {
        let service = service_period(date(2026, 7, 1), date(2026, 1, 1));
        assert_eq!(service.completed_months, 0);
        assert_eq!(service.years, Decimal::ZERO);
    }

    #[test]
    fn test_gratuity_for_four_years() {
        let service = service_period(date(2022, 7, 1), date(2026, 7, 1));
        let result = calculate_gratuity(dec("3000"), &service, &SettlementPolicy::default(), 2, 1);

        // 3000 / 30 × 21 × 4
        assert_eq!(result.amount, dec("8400"));
        assert_eq!(result.audit_step.output["eligible"], true);
    }

    #[test]
    fn test_gratuity_uses_fractional_years() {
        let service = service_period(date(2022, 8, 1), date(2026, 7, 1));
        let result = calculate_gratuity(dec("3000"), &service, &SettlementPolicy::default(), 2, 1);

        // 47 months: 2100 × 47 / 12
        assert_eq!(result.amount, dec("8225"));
    }

    #[test]
    fn test_no_gratuity_below_minimum_service() {
        let service = service_period(date(2025, 9, 1), date(2026, 7, 1));
        let result = calculate_gratuity(dec("3000"), &service, &SettlementPolicy::default(), 2, 1);

        assert_eq!(result.amount, Decimal::ZERO);
        assert_eq!(result.audit_step.output["eligible"], false);
    }

    #[test]
    fn test_configurable_gratuity_days() {
        let policy = SettlementPolicy {
            gratuity_days_per_year: dec("15"),
            ..SettlementPolicy::default()
        };
        let service = service_period(date(2022, 7, 1), date(2026, 7, 1));
        let result = calculate_gratuity(dec("3000"), &service, &policy, 2, 1);

        assert_eq!(result.amount, dec("6000"));
    }

    #[test]
    fn test_leave_encashment() {
        let result =
            calculate_leave_encashment(dec("3000"), dec("10"), &SettlementPolicy::default(), 2, 1);
        assert_eq!(result.amount, dec("1000"));
    }

    #[test]
    fn test_notice_recovery() {
        let result =
            calculate_notice_recovery(dec("3000"), dec("5"), &SettlementPolicy::default(), 2, 1);
        assert_eq!(result.amount, dec("500"));

        let none =
            calculate_notice_recovery(dec("3000"), Decimal::ZERO, &SettlementPolicy::default(), 2, 1);
        assert_eq!(none.amount, Decimal::ZERO);
        assert_eq!(none.audit_step.reasoning, "Notice period fully served");
    }
}
