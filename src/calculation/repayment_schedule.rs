//! Repayment schedules for advances and loans.
//!
//! Interest-free advances split the principal evenly. Loans with an annual
//! interest rate amortise with the annuity formula
//! `P × i / (1 − (1 + i)^−n)` where `i` is the monthly rate.
//!
//! Every installment except the last is rounded to the money scale; the
//! last one absorbs the rounding difference so the schedule sums exactly to
//! the total repayable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, PayrollResult};
use crate::models::{Installment, PayrollMonth};

use super::round_money;

/// A computed repayment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentPlan {
    /// The regular monthly installment.
    pub monthly_installment: Decimal,
    /// Principal plus interest.
    pub total_repayable: Decimal,
    /// One entry per month, starting at the first repayment month.
    pub installments: Vec<Installment>,
}

fn overflow(what: &str) -> PayrollError {
    PayrollError::CalculationError {
        message: format!("Repayment {} is out of range", what),
    }
}

/// Computes the unrounded regular installment.
fn exact_installment(
    principal: Decimal,
    annual_rate: Option<Decimal>,
    installments: u32,
) -> PayrollResult<Decimal> {
    let count = Decimal::from(installments);
    let monthly_rate = annual_rate.unwrap_or(Decimal::ZERO) / Decimal::from(1200);
    if monthly_rate <= Decimal::ZERO {
        return principal.checked_div(count).ok_or_else(|| overflow("installment"));
    }

    let factor = Decimal::ONE + monthly_rate;
    let mut growth = Decimal::ONE;
    for _ in 0..installments {
        growth = growth.checked_mul(factor).ok_or_else(|| overflow("interest"))?;
    }
    // P × i × g / (g − 1), equivalent to P × i / (1 − g⁻¹)
    principal
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(growth - Decimal::ONE))
        .ok_or_else(|| overflow("installment"))
}

/// Returns the rounded monthly installment for a principal.
///
/// Used for eligibility checks before a schedule exists.
pub fn monthly_installment(
    principal: Decimal,
    annual_rate: Option<Decimal>,
    installments: u32,
    scale: u32,
) -> PayrollResult<Decimal> {
    if installments == 0 {
        return Err(PayrollError::CalculationError {
            message: "Installment count must be at least 1".to_string(),
        });
    }
    Ok(round_money(
        exact_installment(principal, annual_rate, installments)?,
        scale,
    ))
}

/// Builds the repayment plan starting at `first_month`.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::build_repayment_plan;
/// use payroll_engine::models::PayrollMonth;
/// use rust_decimal::Decimal;
///
/// let first = PayrollMonth::new(2026, 2).unwrap();
/// let plan = build_repayment_plan(Decimal::new(1000, 0), None, 3, first, 2).unwrap();
///
/// let amounts: Vec<Decimal> = plan.installments.iter().map(|i| i.amount).collect();
/// assert_eq!(amounts, vec![Decimal::new(33333, 2), Decimal::new(33333, 2), Decimal::new(33334, 2)]);
/// assert_eq!(plan.installments[2].month, PayrollMonth::new(2026, 4).unwrap());
/// ```
pub fn build_repayment_plan(
    principal: Decimal,
    annual_rate: Option<Decimal>,
    installments: u32,
    first_month: PayrollMonth,
    scale: u32,
) -> PayrollResult<RepaymentPlan> {
    if principal <= Decimal::ZERO {
        return Err(PayrollError::CalculationError {
            message: format!("Principal must be positive, got {}", principal),
        });
    }

    let regular = monthly_installment(principal, annual_rate, installments, scale)?;
    let exact = exact_installment(principal, annual_rate, installments)?;
    let total_repayable = if annual_rate.is_some_and(|r| r > Decimal::ZERO) {
        let total = exact
            .checked_mul(Decimal::from(installments))
            .ok_or_else(|| overflow("total"))?;
        round_money(total, scale)
    } else {
        principal
    };

    let mut schedule = Vec::with_capacity(installments as usize);
    for number in 1..=installments {
        let month = first_month
            .add_months(number - 1)
            .ok_or_else(|| PayrollError::CalculationError {
                message: format!("Installment {} falls outside the supported calendar", number),
            })?;
        let amount = if number == installments {
            total_repayable - regular * Decimal::from(installments - 1)
        } else {
            regular
        };
        schedule.push(Installment {
            number,
            month,
            amount,
        });
    }

    Ok(RepaymentPlan {
        monthly_installment: regular,
        total_repayable,
        installments: schedule,
    })
}
