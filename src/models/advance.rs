//! Salary advance and loan models.
//!
//! Advances and loans share one lifecycle and one record type; they differ in
//! how eligibility is checked and whether interest is charged.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PayrollMonth;

/// Whether the record is a short-term salary advance or a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceKind {
    /// Salary advance, repaid without interest.
    SalaryAdvance,
    /// Loan, optionally carrying an annual interest rate.
    Loan,
}

impl AdvanceKind {
    /// Returns the snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvanceKind::SalaryAdvance => "salary_advance",
            AdvanceKind::Loan => "loan",
        }
    }
}

/// The lifecycle status of an advance or loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    /// Requested and awaiting a decision.
    Pending,
    /// Approved but not yet disbursed.
    Approved,
    /// Rejected by an approver.
    Rejected,
    /// Disbursed to the employee; repayment not started.
    Paid,
    /// Some repayments recorded.
    PartiallyRepaid,
    /// Fully repaid or written off at settlement.
    Closed,
}

impl AdvanceStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvanceStatus::Pending => "pending",
            AdvanceStatus::Approved => "approved",
            AdvanceStatus::Rejected => "rejected",
            AdvanceStatus::Paid => "paid",
            AdvanceStatus::PartiallyRepaid => "partially_repaid",
            AdvanceStatus::Closed => "closed",
        }
    }

    /// Returns true if the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: AdvanceStatus) -> bool {
        use AdvanceStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Paid)
                | (Paid, PartiallyRepaid)
                | (Paid, Closed)
                | (PartiallyRepaid, PartiallyRepaid)
                | (PartiallyRepaid, Closed)
        )
    }

    /// Returns true once money has left the company and is being recovered.
    pub fn is_disbursed(&self) -> bool {
        matches!(self, AdvanceStatus::Paid | AdvanceStatus::PartiallyRepaid)
    }
}

/// One scheduled monthly installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the schedule.
    pub number: u32,
    /// The payroll month the installment is due in.
    pub month: PayrollMonth,
    /// The installment amount.
    pub amount: Decimal,
}

/// A recorded repayment against an advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repayment {
    /// Unique identifier for the repayment.
    pub id: Uuid,
    /// The amount repaid.
    pub amount: Decimal,
    /// The month the repayment counts toward.
    pub month: PayrollMonth,
    /// The payroll that withheld the repayment, if any.
    pub payroll_id: Option<Uuid>,
    /// Balance left after this repayment.
    pub balance_after: Decimal,
    /// When the repayment was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A salary advance or loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    /// Unique identifier for the advance.
    pub id: Uuid,
    /// The borrowing employee.
    pub employee_id: String,
    /// Advance or loan.
    pub kind: AdvanceKind,
    /// The amount requested.
    pub requested_amount: Decimal,
    /// The amount approved, which may be lower than requested.
    pub approved_amount: Option<Decimal>,
    /// Annual interest rate in percent; loans only.
    pub interest_rate: Option<Decimal>,
    /// Number of monthly installments.
    pub installments: u32,
    /// Expected monthly installment.
    pub monthly_installment: Decimal,
    /// Reason given by the employee.
    pub reason: String,
    /// The lifecycle status.
    pub status: AdvanceStatus,
    /// Amount still owed.
    pub remaining_balance: Decimal,
    /// Repayment schedule, built when the advance is paid.
    pub schedule: Vec<Installment>,
    /// Repayment history.
    pub repayments: Vec<Repayment>,
    /// Who approved the request.
    pub approved_by: Option<String>,
    /// When the request was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// Why the request was rejected.
    pub rejection_reason: Option<String>,
    /// The date the money was disbursed.
    pub paid_on: Option<NaiveDate>,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

impl Advance {
    /// The principal: the approved amount once set, else the requested amount.
    pub fn principal(&self) -> Decimal {
        self.approved_amount.unwrap_or(self.requested_amount)
    }

    /// Returns true while the advance counts toward the employee's debt.
    pub fn is_outstanding(&self) -> bool {
        !matches!(self.status, AdvanceStatus::Rejected | AdvanceStatus::Closed)
            && self.remaining_balance > Decimal::ZERO
    }

    /// The latest installment scheduled on or before `month`, if any.
    pub fn current_installment(&self, month: PayrollMonth) -> Option<&Installment> {
        self.schedule.iter().rev().find(|i| i.month <= month)
    }

    /// The amount falling due in `month`, before capping at the balance.
    ///
    /// Every installment scheduled up to and including the month counts, less
    /// what has been repaid so far, so an installment missed in an earlier
    /// month stays due. Zero once a repayment is recorded for the month.
    pub fn amount_due(&self, month: PayrollMonth) -> Decimal {
        if self.repaid_in(month) {
            return Decimal::ZERO;
        }
        let scheduled: Decimal = self
            .schedule
            .iter()
            .filter(|i| i.month <= month)
            .map(|i| i.amount)
            .sum();
        (scheduled - self.total_repaid()).max(Decimal::ZERO)
    }

    /// Returns true if a repayment has already been recorded for `month`.
    pub fn repaid_in(&self, month: PayrollMonth) -> bool {
        self.repayments.iter().any(|r| r.month == month)
    }

    /// The total repaid so far.
    pub fn total_repaid(&self) -> Decimal {
        self.repayments.iter().map(|r| r.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_advance(status: AdvanceStatus, remaining: &str) -> Advance {
        Advance {
            id: Uuid::new_v4(),
            employee_id: "emp_001".to_string(),
            kind: AdvanceKind::SalaryAdvance,
            requested_amount: dec("1200"),
            approved_amount: None,
            interest_rate: None,
            installments: 3,
            monthly_installment: dec("400"),
            reason: "Medical bills".to_string(),
            status,
            remaining_balance: dec(remaining),
            schedule: vec![Installment {
                number: 1,
                month: PayrollMonth::new(2026, 2).unwrap(),
                amount: dec("400"),
            }],
            repayments: Vec::new(),
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            paid_on: None,
            requested_at: Utc::now(),
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        use AdvanceStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Paid));
        assert!(Paid.can_transition_to(PartiallyRepaid));
        assert!(PartiallyRepaid.can_transition_to(Closed));

        assert!(!Pending.can_transition_to(Paid));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Closed.can_transition_to(PartiallyRepaid));
    }

    #[test]
    fn test_principal_prefers_approved_amount() {
        let mut advance = create_advance(AdvanceStatus::Pending, "1200");
        assert_eq!(advance.principal(), dec("1200"));

        advance.approved_amount = Some(dec("900"));
        assert_eq!(advance.principal(), dec("900"));
    }

    #[test]
    fn test_outstanding_excludes_closed_and_rejected() {
        assert!(create_advance(AdvanceStatus::Pending, "1200").is_outstanding());
        assert!(create_advance(AdvanceStatus::PartiallyRepaid, "400").is_outstanding());
        assert!(!create_advance(AdvanceStatus::Rejected, "1200").is_outstanding());
        assert!(!create_advance(AdvanceStatus::Closed, "0").is_outstanding());
    }

    #[test]
    fn test_installment_lookup_by_month() {
        let advance = create_advance(AdvanceStatus::Paid, "1200");
        let jan = PayrollMonth::new(2026, 1).unwrap();
        let feb = PayrollMonth::new(2026, 2).unwrap();
        let mar = PayrollMonth::new(2026, 3).unwrap();

        assert_eq!(advance.current_installment(feb).unwrap().amount, dec("400"));
        assert_eq!(advance.current_installment(mar).unwrap().number, 1);
        assert!(advance.current_installment(jan).is_none());
        assert!(!advance.repaid_in(feb));
    }

    #[test]
    fn test_missed_installments_stay_due() {
        let mut advance = create_advance(AdvanceStatus::PartiallyRepaid, "800");
        advance.schedule = (1..=3)
            .map(|n| Installment {
                number: n,
                month: PayrollMonth::new(2026, n + 1).unwrap(),
                amount: dec("400"),
            })
            .collect();
        advance.repayments.push(Repayment {
            id: Uuid::new_v4(),
            amount: dec("400"),
            month: PayrollMonth::new(2026, 2).unwrap(),
            payroll_id: None,
            balance_after: dec("800"),
            recorded_at: Utc::now(),
        });

        // March skipped: April owes March and April, June owes the rest.
        assert_eq!(advance.amount_due(PayrollMonth::new(2026, 1).unwrap()), Decimal::ZERO);
        assert_eq!(advance.amount_due(PayrollMonth::new(2026, 2).unwrap()), Decimal::ZERO);
        assert_eq!(advance.amount_due(PayrollMonth::new(2026, 4).unwrap()), dec("800"));
        assert_eq!(advance.amount_due(PayrollMonth::new(2026, 6).unwrap()), dec("800"));
    }
}
