//! Salary advances and loans.
//!
//! Both kinds share one lifecycle:
//!
//! ```text
//! pending -> approved -> paid -> partially_repaid -> closed
//!        \-> rejected
//! ```
//!
//! Eligibility is checked when a request is submitted and again when a
//! pending request is edited. The repayment schedule is built when the
//! money is handed over, starting the month after payment.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::calculation::{build_repayment_plan, monthly_installment, round_money};
use crate::config::AdvancePolicy;
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    Advance, AdvanceKind, AdvanceStatus, Employee, PayrollItem, PayrollItemType, PayrollMonth,
    PayrollStatus, Repayment,
};
use crate::store::Ledger;

use super::PayrollEngine;

/// A salary advance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceRequest {
    /// The requesting employee.
    pub employee_id: String,
    /// The amount requested.
    pub amount: Decimal,
    /// Number of monthly installments.
    #[serde(default = "default_installments")]
    pub installments: u32,
    /// Free-text reason.
    #[serde(default)]
    pub reason: String,
}

/// A loan request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    /// The requesting employee.
    pub employee_id: String,
    /// The principal requested.
    pub amount: Decimal,
    /// Number of monthly installments.
    pub installments: u32,
    /// Annual interest rate in percent. `None` for an interest-free loan.
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    /// Free-text reason.
    #[serde(default)]
    pub reason: String,
}

fn default_installments() -> u32 {
    1
}

/// Changes to a pending request. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceUpdate {
    /// New requested amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// New installment count.
    #[serde(default)]
    pub installments: Option<u32>,
    /// New annual interest rate, loans only.
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    /// New reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Aggregate figures over all advances and loans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceStatistics {
    /// Number of requests.
    pub total_requests: usize,
    /// Requests awaiting a decision.
    pub pending: usize,
    /// Approved but not yet handed over.
    pub approved: usize,
    /// Rejected requests.
    pub rejected: usize,
    /// Handed over, nothing repaid yet.
    pub paid: usize,
    /// Handed over and partly repaid.
    pub partially_repaid: usize,
    /// Fully repaid.
    pub closed: usize,
    /// Sum of requested amounts.
    pub total_requested: Decimal,
    /// Sum of approved amounts on requests that were not rejected.
    pub total_approved: Decimal,
    /// Sum of amounts handed over.
    pub total_disbursed: Decimal,
    /// Sum of balances still owed on disbursed requests.
    pub total_outstanding: Decimal,
    /// Mean requested amount.
    pub average_amount: Decimal,
    /// Share of requests that were approved, in percent.
    pub approval_rate: Decimal,
}

/// An installment falling due in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueInstallment {
    /// The advance or loan.
    pub advance_id: Uuid,
    /// The employee owing it.
    pub employee_id: String,
    /// Advance or loan.
    pub kind: AdvanceKind,
    /// Number of the latest installment scheduled on or before the month.
    pub installment_number: u32,
    /// The amount due, overdue installments included, capped at the remaining balance.
    pub amount: Decimal,
    /// The balance before this installment.
    pub remaining_balance: Decimal,
}

/// Applies a repayment to an advance, moving it to `partially_repaid` or
/// `closed`.
pub(crate) fn apply_repayment(
    advance: &mut Advance,
    amount: Decimal,
    month: PayrollMonth,
    payroll_id: Option<Uuid>,
    at: DateTime<Utc>,
) -> PayrollResult<()> {
    if amount <= Decimal::ZERO {
        return Err(PayrollError::InvalidRequest {
            field: "amount".to_string(),
            message: format!("repayment must be positive, got {}", amount),
        });
    }
    if amount > advance.remaining_balance {
        return Err(PayrollError::RepaymentExceedsBalance {
            advance_id: advance.id,
            amount,
            remaining: advance.remaining_balance,
        });
    }

    let balance_after = advance.remaining_balance - amount;
    let next = if balance_after.is_zero() {
        AdvanceStatus::Closed
    } else {
        AdvanceStatus::PartiallyRepaid
    };
    transition(advance, next)?;

    advance.remaining_balance = balance_after;
    advance.repayments.push(Repayment {
        id: Uuid::new_v4(),
        amount,
        month,
        payroll_id,
        balance_after,
        recorded_at: at,
    });
    Ok(())
}

/// Removes the repayments a payroll recorded and restores the balance.
pub(crate) fn reverse_repayments(advance: &mut Advance, payroll_id: Uuid) {
    let reversed: Decimal = advance
        .repayments
        .iter()
        .filter(|r| r.payroll_id == Some(payroll_id))
        .map(|r| r.amount)
        .sum();
    if reversed.is_zero() {
        return;
    }

    advance.repayments.retain(|r| r.payroll_id != Some(payroll_id));
    advance.remaining_balance += reversed;
    advance.status = if advance.repayments.is_empty() {
        AdvanceStatus::Paid
    } else {
        AdvanceStatus::PartiallyRepaid
    };
}

fn transition(advance: &mut Advance, next: AdvanceStatus) -> PayrollResult<()> {
    if !advance.status.can_transition_to(next) {
        return Err(PayrollError::InvalidTransition {
            entity: "advance",
            id: advance.id,
            from: advance.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    advance.status = next;
    Ok(())
}

/// Highest annual interest rate, in percent, a loan may carry.
const MAX_INTEREST_RATE: Decimal = Decimal::ONE_HUNDRED;

fn validate_terms(
    amount: Decimal,
    installments: u32,
    interest_rate: Option<Decimal>,
    policy: &AdvancePolicy,
) -> PayrollResult<()> {
    if amount <= Decimal::ZERO {
        return Err(PayrollError::InvalidRequest {
            field: "amount".to_string(),
            message: format!("must be positive, got {}", amount),
        });
    }
    if installments == 0 || installments > policy.max_installments {
        return Err(PayrollError::InvalidRequest {
            field: "installments".to_string(),
            message: format!(
                "must be between 1 and {}, got {}",
                policy.max_installments, installments
            ),
        });
    }
    if let Some(rate) = interest_rate {
        if rate < Decimal::ZERO || rate > MAX_INTEREST_RATE {
            return Err(PayrollError::InvalidRequest {
                field: "interest_rate".to_string(),
                message: format!("must be between 0 and {}, got {}", MAX_INTEREST_RATE, rate),
            });
        }
    }
    Ok(())
}

/// Outstanding salary advances plus the request must stay within the
/// configured share of basic salary.
fn check_advance_limit(
    ledger: &Ledger,
    employee: &Employee,
    amount: Decimal,
    exclude: Option<Uuid>,
    policy: &AdvancePolicy,
) -> PayrollResult<()> {
    let outstanding: Decimal = ledger
        .advances_for(&employee.id)
        .into_iter()
        .filter(|a| a.kind == AdvanceKind::SalaryAdvance && a.is_outstanding())
        .filter(|a| Some(a.id) != exclude)
        .map(|a| a.remaining_balance)
        .sum();
    let limit = employee.basic_salary * policy.max_advance_ratio;

    if outstanding + amount > limit {
        return Err(PayrollError::AdvanceLimitExceeded {
            requested: amount,
            outstanding,
            limit: limit.normalize(),
        });
    }
    Ok(())
}

/// Existing loan installments plus the new one must stay within the
/// configured debt-to-income ratio.
fn check_debt_to_income(
    ledger: &Ledger,
    employee: &Employee,
    new_installment: Decimal,
    exclude: Option<Uuid>,
    policy: &AdvancePolicy,
) -> PayrollResult<()> {
    if employee.basic_salary <= Decimal::ZERO {
        return Err(PayrollError::InvalidEmployee {
            field: "basic_salary".to_string(),
            message: format!("Employee {} has no base salary configured", employee.full_name),
        });
    }

    let existing: Decimal = ledger
        .advances_for(&employee.id)
        .into_iter()
        .filter(|a| a.kind == AdvanceKind::Loan && a.is_outstanding())
        .filter(|a| Some(a.id) != exclude)
        .map(|a| a.monthly_installment)
        .sum();
    let ratio = round_money((existing + new_installment) / employee.basic_salary, 4);

    if ratio > policy.max_debt_to_income {
        return Err(PayrollError::DebtToIncomeExceeded {
            ratio,
            limit: policy.max_debt_to_income,
        });
    }
    Ok(())
}

fn active_employee<'a>(ledger: &'a Ledger, employee_id: &str) -> PayrollResult<&'a Employee> {
    let employee = ledger.employee(employee_id)?;
    if !employee.is_active() {
        return Err(PayrollError::InvalidEmployee {
            field: "status".to_string(),
            message: format!("Employee {} is not active", employee.full_name),
        });
    }
    Ok(employee)
}

/// Checks eligibility for an advance with the given terms.
fn check_eligibility(
    ledger: &Ledger,
    advance: &Advance,
    policy: &AdvancePolicy,
    scale: u32,
) -> PayrollResult<Decimal> {
    validate_terms(
        advance.requested_amount,
        advance.installments,
        advance.interest_rate,
        policy,
    )?;
    let employee = active_employee(ledger, &advance.employee_id)?;
    let installment = monthly_installment(
        advance.requested_amount,
        advance.interest_rate,
        advance.installments,
        scale,
    )?;

    match advance.kind {
        AdvanceKind::SalaryAdvance => check_advance_limit(
            ledger,
            employee,
            advance.requested_amount,
            Some(advance.id),
            policy,
        )?,
        AdvanceKind::Loan => {
            check_debt_to_income(ledger, employee, installment, Some(advance.id), policy)?
        }
    }
    Ok(installment)
}

impl PayrollEngine {
    /// Submits a salary advance request.
    ///
    /// Fails with `AdvanceLimitExceeded` when outstanding advances plus the
    /// request exceed the configured share of basic salary.
    pub fn request_advance(&mut self, request: AdvanceRequest) -> PayrollResult<Advance> {
        self.submit(
            AdvanceKind::SalaryAdvance,
            request.employee_id,
            request.amount,
            request.installments,
            None,
            request.reason,
        )
    }

    /// Submits a loan request.
    ///
    /// Fails with `DebtToIncomeExceeded` when the employee's monthly loan
    /// installments, including this one, exceed the configured share of
    /// basic salary.
    pub fn request_loan(&mut self, request: LoanRequest) -> PayrollResult<Advance> {
        self.submit(
            AdvanceKind::Loan,
            request.employee_id,
            request.amount,
            request.installments,
            request.interest_rate,
            request.reason,
        )
    }

    fn submit(
        &mut self,
        kind: AdvanceKind,
        employee_id: String,
        amount: Decimal,
        installments: u32,
        interest_rate: Option<Decimal>,
        reason: String,
    ) -> PayrollResult<Advance> {
        let policy = &self.config.policy().advances;
        let scale = self.config.policy().rounding.scale;

        let advance = self.store.transaction(|ledger| {
            let mut advance = Advance {
                id: Uuid::new_v4(),
                employee_id,
                kind,
                requested_amount: amount,
                approved_amount: None,
                interest_rate,
                installments,
                monthly_installment: Decimal::ZERO,
                reason,
                status: AdvanceStatus::Pending,
                remaining_balance: amount,
                schedule: Vec::new(),
                repayments: Vec::new(),
                approved_by: None,
                approved_at: None,
                rejection_reason: None,
                paid_on: None,
                requested_at: Utc::now(),
            };
            advance.monthly_installment = check_eligibility(ledger, &advance, policy, scale)?;
            ledger.advances.insert(advance.id, advance.clone());
            Ok(advance)
        })?;

        info!(
            advance_id = %advance.id,
            employee_id = %advance.employee_id,
            kind = advance.kind.as_str(),
            amount = %advance.requested_amount,
            "Advance requested"
        );
        Ok(advance)
    }

    /// Edits a pending request and re-checks eligibility.
    pub fn update_advance(&mut self, advance_id: Uuid, update: AdvanceUpdate) -> PayrollResult<Advance> {
        let policy = &self.config.policy().advances;
        let scale = self.config.policy().rounding.scale;

        let advance = self.store.transaction(|ledger| {
            let mut advance = ledger.advance(advance_id)?.clone();
            if advance.status != AdvanceStatus::Pending {
                return Err(PayrollError::NotEditable {
                    entity: "advance",
                    id: advance_id,
                    status: advance.status.as_str().to_string(),
                });
            }
            if update.interest_rate.is_some() && advance.kind == AdvanceKind::SalaryAdvance {
                return Err(PayrollError::InvalidRequest {
                    field: "interest_rate".to_string(),
                    message: "salary advances are interest-free".to_string(),
                });
            }

            if let Some(amount) = update.amount {
                advance.requested_amount = amount;
                advance.remaining_balance = amount;
            }
            if let Some(installments) = update.installments {
                advance.installments = installments;
            }
            if let Some(rate) = update.interest_rate {
                advance.interest_rate = Some(rate);
            }
            if let Some(reason) = update.reason {
                advance.reason = reason;
            }

            advance.monthly_installment = check_eligibility(ledger, &advance, policy, scale)?;
            ledger.advances.insert(advance.id, advance.clone());
            Ok(advance)
        })?;

        info!(advance_id = %advance_id, "Advance updated");
        Ok(advance)
    }

    /// Approves a pending request, optionally for less than was asked.
    pub fn approve_advance(
        &mut self,
        advance_id: Uuid,
        approver: &str,
        approved_amount: Option<Decimal>,
    ) -> PayrollResult<Advance> {
        let scale = self.scale();

        let advance = self.store.transaction(|ledger| {
            let advance = ledger.advance_mut(advance_id)?;
            let amount = approved_amount.unwrap_or(advance.requested_amount);
            if amount <= Decimal::ZERO || amount > advance.requested_amount {
                return Err(PayrollError::InvalidRequest {
                    field: "approved_amount".to_string(),
                    message: format!(
                        "must be positive and at most the requested {}, got {}",
                        advance.requested_amount, amount
                    ),
                });
            }

            transition(advance, AdvanceStatus::Approved)?;
            advance.approved_amount = Some(amount);
            advance.remaining_balance = amount;
            advance.monthly_installment =
                monthly_installment(amount, advance.interest_rate, advance.installments, scale)?;
            advance.approved_by = Some(approver.to_string());
            advance.approved_at = Some(Utc::now());
            Ok(advance.clone())
        })?;

        info!(advance_id = %advance_id, approver, amount = %advance.principal(), "Advance approved");
        Ok(advance)
    }

    /// Rejects a pending request.
    pub fn reject_advance(&mut self, advance_id: Uuid, reason: &str) -> PayrollResult<Advance> {
        let advance = self.store.transaction(|ledger| {
            let advance = ledger.advance_mut(advance_id)?;
            transition(advance, AdvanceStatus::Rejected)?;
            advance.rejection_reason = Some(reason.to_string());
            advance.remaining_balance = Decimal::ZERO;
            Ok(advance.clone())
        })?;

        info!(advance_id = %advance_id, reason, "Advance rejected");
        Ok(advance)
    }

    /// Records that an approved advance was handed over and builds its
    /// repayment schedule, starting the month after `paid_on`.
    pub fn mark_advance_paid(&mut self, advance_id: Uuid, paid_on: NaiveDate) -> PayrollResult<Advance> {
        let scale = self.scale();

        let advance = self.store.transaction(|ledger| {
            let advance = ledger.advance_mut(advance_id)?;
            transition(advance, AdvanceStatus::Paid)?;

            let first_month = PayrollMonth::of(paid_on).next().ok_or_else(|| {
                PayrollError::CalculationError {
                    message: format!("No month follows {}", paid_on),
                }
            })?;
            let plan = build_repayment_plan(
                advance.principal(),
                advance.interest_rate,
                advance.installments,
                first_month,
                scale,
            )?;

            advance.monthly_installment = plan.monthly_installment;
            advance.remaining_balance = plan.total_repayable;
            advance.schedule = plan.installments;
            advance.paid_on = Some(paid_on);
            Ok(advance.clone())
        })?;

        info!(
            advance_id = %advance_id,
            paid_on = %paid_on,
            repayable = %advance.remaining_balance,
            "Advance paid out"
        );
        Ok(advance)
    }

    /// Records a repayment against a disbursed advance.
    ///
    /// When `payroll_id` is given the payroll must belong to the same
    /// employee, cover `month` and still be pending; a deduction item is
    /// appended and its net pay lowered in the same transaction.
    pub fn record_repayment(
        &mut self,
        advance_id: Uuid,
        amount: Decimal,
        month: PayrollMonth,
        payroll_id: Option<Uuid>,
    ) -> PayrollResult<Advance> {
        let advance = self.store.transaction(|ledger| {
            let now = Utc::now();
            if let Some(payroll_id) = payroll_id {
                let payroll_month = ledger.payroll(payroll_id)?.month;
                if payroll_month != month {
                    return Err(PayrollError::InvalidRequest {
                        field: "month".to_string(),
                        message: format!("payroll covers {}, repayment given for {}", payroll_month, month),
                    });
                }
            }
            let advance = ledger.advance_mut(advance_id)?;
            apply_repayment(advance, amount, month, payroll_id, now)?;
            let advance = advance.clone();

            if let Some(payroll_id) = payroll_id {
                let payroll = ledger.payroll_mut(payroll_id)?;
                if payroll.employee_id != advance.employee_id {
                    return Err(PayrollError::InvalidRequest {
                        field: "payroll_id".to_string(),
                        message: format!(
                            "payroll belongs to '{}', advance to '{}'",
                            payroll.employee_id, advance.employee_id
                        ),
                    });
                }
                if payroll.status != PayrollStatus::Pending {
                    return Err(PayrollError::NotEditable {
                        entity: "payroll",
                        id: payroll_id,
                        status: payroll.status.as_str().to_string(),
                    });
                }
                payroll.advance_deduction += amount;
                payroll.deduction_amount += amount;
                payroll.final_amount -= amount;

                let item_type = match advance.kind {
                    AdvanceKind::SalaryAdvance => PayrollItemType::AdvanceDeduction,
                    AdvanceKind::Loan => PayrollItemType::LoanDeduction,
                };
                ledger.payroll_items.push(PayrollItem::new(
                    payroll_id,
                    item_type,
                    "Manual repayment".to_string(),
                    -amount,
                    false,
                    serde_json::json!({
                        "advance_id": advance_id,
                        "remaining_after": advance.remaining_balance.to_string()
                    }),
                ));
            }
            Ok(advance)
        })?;

        info!(
            advance_id = %advance_id,
            amount = %amount,
            remaining = %advance.remaining_balance,
            "Repayment recorded"
        );
        Ok(advance)
    }

    /// Looks up an advance or loan.
    pub fn advance(&self, advance_id: Uuid) -> PayrollResult<&Advance> {
        self.ledger().advance(advance_id)
    }

    /// Returns an employee's advances and loans, oldest first.
    pub fn advances_for(&self, employee_id: &str) -> Vec<&Advance> {
        self.ledger().advances_for(employee_id)
    }

    /// Computes request counts, amounts and the approval rate.
    pub fn advance_statistics(&self) -> AdvanceStatistics {
        let scale = self.scale();
        let mut stats = AdvanceStatistics::default();

        for advance in self.ledger().advances.values() {
            stats.total_requests += 1;
            stats.total_requested += advance.requested_amount;
            match advance.status {
                AdvanceStatus::Pending => stats.pending += 1,
                AdvanceStatus::Approved => stats.approved += 1,
                AdvanceStatus::Rejected => stats.rejected += 1,
                AdvanceStatus::Paid => stats.paid += 1,
                AdvanceStatus::PartiallyRepaid => stats.partially_repaid += 1,
                AdvanceStatus::Closed => stats.closed += 1,
            }
            if advance.status != AdvanceStatus::Rejected {
                stats.total_approved += advance.approved_amount.unwrap_or(Decimal::ZERO);
            }
            if advance.paid_on.is_some() {
                stats.total_disbursed += advance.principal();
            }
            if advance.status.is_disbursed() {
                stats.total_outstanding += advance.remaining_balance;
            }
        }

        if stats.total_requests > 0 {
            let total = Decimal::from(stats.total_requests);
            let approved =
                stats.approved + stats.paid + stats.partially_repaid + stats.closed;
            stats.average_amount = round_money(stats.total_requested / total, scale);
            stats.approval_rate =
                round_money(Decimal::from(approved) / total * Decimal::ONE_HUNDRED, 2);
        }
        stats
    }

    /// Lists installments falling due in a month that have not been repaid.
    pub fn advances_due(&self, month: PayrollMonth) -> Vec<DueInstallment> {
        let mut due: Vec<DueInstallment> = self
            .ledger()
            .advances
            .values()
            .filter(|a| a.status.is_disbursed())
            .filter_map(|a| {
                let installment = a.current_installment(month)?;
                let amount = a.amount_due(month).min(a.remaining_balance);
                if amount <= Decimal::ZERO {
                    return None;
                }
                Some(DueInstallment {
                    advance_id: a.id,
                    employee_id: a.employee_id.clone(),
                    kind: a.kind,
                    installment_number: installment.number,
                    amount,
                    remaining_balance: a.remaining_balance,
                })
            })
            .collect();
        due.sort_by(|a, b| a.employee_id.cmp(&b.employee_id).then(a.advance_id.cmp(&b.advance_id)));
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{date, dec, engine, month, paid_advance};

    fn advance_request(amount: &str, installments: u32) -> AdvanceRequest {
        AdvanceRequest {
            employee_id: "emp_001".to_string(),
            amount: dec(amount),
            installments,
            reason: "Family emergency".to_string(),
        }
    }

    fn loan_request(amount: &str, installments: u32, rate: Option<&str>) -> LoanRequest {
        LoanRequest {
            employee_id: "emp_001".to_string(),
            amount: dec(amount),
            installments,
            interest_rate: rate.map(dec),
            reason: "Car purchase".to_string(),
        }
    }

    #[test]
    fn test_request_advance_within_limit() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("1200", 3)).unwrap();

        assert_eq!(advance.status, AdvanceStatus::Pending);
        assert_eq!(advance.monthly_installment, dec("400"));
        assert_eq!(advance.remaining_balance, dec("1200"));
    }

    #[test]
    fn test_advance_limit_counts_outstanding_requests() {
        let mut engine = engine();
        engine.request_advance(advance_request("1000", 2)).unwrap();

        // 50% of 3000 basic = 1500; 1000 already outstanding
        match engine.request_advance(advance_request("800", 2)) {
            Err(PayrollError::AdvanceLimitExceeded {
                requested,
                outstanding,
                limit,
            }) => {
                assert_eq!(requested, dec("800"));
                assert_eq!(outstanding, dec("1000"));
                assert_eq!(limit, dec("1500"));
            }
            other => panic!("Expected AdvanceLimitExceeded, got {:?}", other),
        }
        assert_eq!(engine.ledger().advances.len(), 1);
    }

    #[test]
    fn test_rejected_advance_frees_limit() {
        let mut engine = engine();
        let first = engine.request_advance(advance_request("1500", 3)).unwrap();
        engine.reject_advance(first.id, "Budget").unwrap();

        assert!(engine.request_advance(advance_request("1500", 3)).is_ok());
    }

    #[test]
    fn test_loan_debt_to_income() {
        let mut engine = engine();
        // 12000 / 12 = 1000 a month, 33% of 3000
        engine.request_loan(loan_request("12000", 12, None)).unwrap();

        // another 300 a month takes the ratio to 43%
        let result = engine.request_loan(loan_request("3600", 12, None));
        match result {
            Err(PayrollError::DebtToIncomeExceeded { ratio, limit }) => {
                assert_eq!(ratio, dec("0.4333"));
                assert_eq!(limit, dec("0.4"));
            }
            other => panic!("Expected DebtToIncomeExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_installment_count_bounds() {
        let mut engine = engine();
        let result = engine.request_loan(loan_request("1000", 0, None));
        assert!(matches!(result, Err(PayrollError::InvalidRequest { .. })));

        let result = engine.request_loan(loan_request("1000", 61, None));
        assert!(matches!(result, Err(PayrollError::InvalidRequest { .. })));
    }

    #[test]
    fn test_update_only_while_pending() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("600", 2)).unwrap();

        let updated = engine
            .update_advance(
                advance.id,
                AdvanceUpdate {
                    amount: Some(dec("900")),
                    installments: Some(3),
                    ..AdvanceUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.monthly_installment, dec("300"));

        engine.approve_advance(advance.id, "manager", None).unwrap();
        let result = engine.update_advance(advance.id, AdvanceUpdate::default());
        assert!(matches!(result, Err(PayrollError::NotEditable { .. })));
    }

    #[test]
    fn test_interest_rate_bounds_on_request_and_update() {
        let mut engine = engine();
        for rate in ["-1", "100.01", "5000"] {
            let result = engine.request_loan(loan_request("1000", 60, Some(rate)));
            assert!(matches!(result, Err(PayrollError::InvalidRequest { ref field, .. }) if field == "interest_rate"));
        }
        assert!(engine.ledger().advances.is_empty());

        let loan = engine.request_loan(loan_request("1200", 12, Some("100"))).unwrap();
        let result = engine.update_advance(
            loan.id,
            AdvanceUpdate {
                interest_rate: Some(dec("-5")),
                ..AdvanceUpdate::default()
            },
        );
        assert!(matches!(result, Err(PayrollError::InvalidRequest { ref field, .. }) if field == "interest_rate"));
        assert_eq!(engine.advance(loan.id).unwrap().interest_rate, Some(dec("100")));
    }

    #[test]
    fn test_update_rechecks_limit_without_counting_itself() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("1400", 2)).unwrap();

        let update = AdvanceUpdate {
            amount: Some(dec("1500")),
            ..AdvanceUpdate::default()
        };
        assert!(engine.update_advance(advance.id, update).is_ok());

        let update = AdvanceUpdate {
            amount: Some(dec("1600")),
            ..AdvanceUpdate::default()
        };
        let result = engine.update_advance(advance.id, update);
        assert!(matches!(result, Err(PayrollError::AdvanceLimitExceeded { .. })));
    }

    #[test]
    fn test_approve_lower_amount() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("1200", 3)).unwrap();

        let approved = engine
            .approve_advance(advance.id, "manager", Some(dec("900")))
            .unwrap();
        assert_eq!(approved.principal(), dec("900"));
        assert_eq!(approved.monthly_installment, dec("300"));

        let result = engine.approve_advance(advance.id, "manager", None);
        assert!(matches!(result, Err(PayrollError::InvalidTransition { .. })));
    }

    #[test]
    fn test_approve_more_than_requested_rejected() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("600", 3)).unwrap();

        let result = engine.approve_advance(advance.id, "manager", Some(dec("700")));
        assert!(matches!(result, Err(PayrollError::InvalidRequest { .. })));
    }

    #[test]
    fn test_mark_paid_builds_schedule_from_next_month() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);
        let advance = engine.advance(advance_id).unwrap();

        let months: Vec<PayrollMonth> = advance.schedule.iter().map(|i| i.month).collect();
        assert_eq!(
            months,
            vec![month(2026, 2), month(2026, 3), month(2026, 4)]
        );
        assert_eq!(advance.paid_on, Some(date(2026, 1, 10)));
    }

    #[test]
    fn test_loan_with_interest_repays_total() {
        let mut engine = engine();
        engine.add_employee({
            let mut e = crate::services::fixtures::employee("emp_001");
            e.basic_salary = dec("5000");
            e
        });

        let loan = engine
            .request_loan(loan_request("12000", 12, Some("12")))
            .unwrap();
        engine.approve_advance(loan.id, "manager", None).unwrap();
        let loan = engine.mark_advance_paid(loan.id, date(2026, 1, 31)).unwrap();

        assert_eq!(loan.monthly_installment, dec("1066.19"));
        assert_eq!(loan.remaining_balance, dec("12794.23"));
        let scheduled: Decimal = loan.schedule.iter().map(|i| i.amount).sum();
        assert_eq!(scheduled, loan.remaining_balance);
    }

    #[test]
    fn test_record_repayment_closes_advance() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);

        let advance = engine
            .record_repayment(advance_id, dec("500"), month(2026, 2), None)
            .unwrap();
        assert_eq!(advance.status, AdvanceStatus::PartiallyRepaid);
        assert_eq!(advance.remaining_balance, dec("700"));

        let result = engine.record_repayment(advance_id, dec("800"), month(2026, 3), None);
        assert!(matches!(result, Err(PayrollError::RepaymentExceedsBalance { .. })));

        let advance = engine
            .record_repayment(advance_id, dec("700"), month(2026, 3), None)
            .unwrap();
        assert_eq!(advance.status, AdvanceStatus::Closed);
        assert_eq!(advance.total_repaid(), dec("1200"));
    }

    #[test]
    fn test_repayment_before_payout_rejected() {
        let mut engine = engine();
        let advance = engine.request_advance(advance_request("600", 2)).unwrap();

        let result = engine.record_repayment(advance.id, dec("100"), month(2026, 2), None);
        assert!(matches!(result, Err(PayrollError::InvalidTransition { .. })));
    }

    #[test]
    fn test_repayment_against_pending_payroll_lowers_net() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);
        let payroll = engine.generate_payroll("emp_001", month(2026, 2)).unwrap();

        engine
            .record_repayment(advance_id, dec("100"), month(2026, 2), Some(payroll.id))
            .unwrap();

        let payroll = engine.payroll(payroll.id).unwrap();
        assert_eq!(payroll.advance_deduction, dec("500"));
        assert_eq!(payroll.final_amount, dec("2287.50"));
        assert_eq!(engine.advance(advance_id).unwrap().remaining_balance, dec("700"));
    }

    #[test]
    fn test_repayment_month_must_match_payroll() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);
        let payroll = engine.generate_payroll("emp_001", month(2026, 2)).unwrap();

        let result = engine.record_repayment(advance_id, dec("100"), month(2026, 3), Some(payroll.id));
        assert!(matches!(result, Err(PayrollError::InvalidRequest { ref field, .. }) if field == "month"));

        let advance = engine.advance(advance_id).unwrap();
        assert_eq!(advance.remaining_balance, dec("800"));
        assert!(!advance.repaid_in(month(2026, 3)));
        assert_eq!(engine.advances_due(month(2026, 3))[0].amount, dec("400"));
    }

    #[test]
    fn test_repayment_against_approved_payroll_rolls_back() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);
        let payroll = engine.generate_payroll("emp_001", month(2026, 2)).unwrap();
        engine.approve_payroll(payroll.id, "finance").unwrap();

        let result =
            engine.record_repayment(advance_id, dec("100"), month(2026, 2), Some(payroll.id));
        assert!(matches!(result, Err(PayrollError::NotEditable { .. })));
        assert_eq!(engine.advance(advance_id).unwrap().remaining_balance, dec("800"));
    }

    #[test]
    fn test_advances_due() {
        let mut engine = engine();
        let advance_id = paid_advance(&mut engine, "1200", 3);

        let due = engine.advances_due(month(2026, 2));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].advance_id, advance_id);
        assert_eq!(due[0].amount, dec("400"));

        engine.generate_payroll("emp_001", month(2026, 2)).unwrap();
        assert!(engine.advances_due(month(2026, 2)).is_empty());
        assert!(engine.advances_due(month(2026, 1)).is_empty());

        // March and April still owed once the schedule has run out.
        let overdue = engine.advances_due(month(2026, 6));
        assert_eq!(overdue[0].amount, dec("800"));
        assert_eq!(overdue[0].installment_number, 3);
    }

    #[test]
    fn test_statistics() {
        let mut engine = engine();
        paid_advance(&mut engine, "600", 2);
        let rejected = engine.request_advance(advance_request("300", 1)).unwrap();
        engine.reject_advance(rejected.id, "Too frequent").unwrap();
        engine.request_advance(advance_request("300", 1)).unwrap();

        let stats = engine.advance_statistics();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.paid, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.total_requested, dec("1200"));
        assert_eq!(stats.total_disbursed, dec("600"));
        assert_eq!(stats.total_outstanding, dec("600"));
        assert_eq!(stats.average_amount, dec("400"));
        assert_eq!(stats.approval_rate, dec("33.33"));
    }
}
