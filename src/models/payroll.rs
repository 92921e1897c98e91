//! Payroll, payroll item and payroll run models.
//!
//! A [`Payroll`] holds the computed totals for one employee and month. The
//! [`PayrollItem`] ledger attached to it is append-only and explains how the
//! totals were assembled.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuditTrace, PayrollMonth};

/// The lifecycle status of a payroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    /// Generated and awaiting approval.
    Pending,
    /// Approved for payment.
    Approved,
    /// Paid out.
    Paid,
    /// Cancelled before payment.
    Cancelled,
}

impl PayrollStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Pending => "pending",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Paid => "paid",
            PayrollStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if the lifecycle allows moving to `next`.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PayrollStatus;
    ///
    /// assert!(PayrollStatus::Pending.can_transition_to(PayrollStatus::Approved));
    /// assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Cancelled));
    /// ```
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (PayrollStatus::Pending, PayrollStatus::Approved)
                | (PayrollStatus::Approved, PayrollStatus::Paid)
                | (PayrollStatus::Pending, PayrollStatus::Cancelled)
                | (PayrollStatus::Approved, PayrollStatus::Cancelled)
        )
    }
}

/// Payment details recorded when a payroll is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// How the payment was made (e.g. "bank_transfer").
    pub method: String,
    /// External reference for the payment.
    pub reference: Option<String>,
    /// When the payment was processed.
    pub paid_at: DateTime<Utc>,
}

/// One payroll per employee and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payroll {
    /// Unique identifier for the payroll.
    pub id: Uuid,
    /// The employee paid.
    pub employee_id: String,
    /// The month paid.
    pub month: PayrollMonth,
    /// Pro-rated base salary.
    pub base_salary: Decimal,
    /// Pro-rated allowances.
    pub allowances: Decimal,
    /// Overtime hours paid.
    pub overtime_hours: Decimal,
    /// Overtime amount paid.
    pub overtime_amount: Decimal,
    /// Bonus paid.
    pub bonus_amount: Decimal,
    /// Advance and loan repayments withheld.
    pub advance_deduction: Decimal,
    /// Total deductions from gross.
    pub deduction_amount: Decimal,
    /// Base + allowances + overtime + bonus.
    pub gross_amount: Decimal,
    /// Net amount payable.
    pub final_amount: Decimal,
    /// Days with hours on approved timesheets.
    pub days_worked: u32,
    /// Sum of regular hours on approved timesheets.
    pub total_worked_hours: Decimal,
    /// The lifecycle status.
    pub status: PayrollStatus,
    /// The batch run that produced this payroll, if any.
    pub payroll_run_id: Option<Uuid>,
    /// Who approved the payroll.
    pub approved_by: Option<String>,
    /// When the payroll was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// Payment details once paid.
    pub payment: Option<PaymentDetails>,
    /// When the payroll was generated.
    pub created_at: DateTime<Utc>,
    /// The calculation audit trace.
    pub audit_trace: AuditTrace,
}

impl Payroll {
    /// Returns the payment date, if the payroll has been paid.
    pub fn paid_on(&self) -> Option<NaiveDate> {
        self.payment.as_ref().map(|p| p.paid_at.date_naive())
    }
}

/// The kind of line recorded in the payroll item ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollItemType {
    /// Pro-rated base salary.
    BaseSalary,
    /// Pro-rated allowances.
    Allowances,
    /// Overtime pay.
    Overtime,
    /// Bonus pay.
    Bonus,
    /// Salary advance repayment.
    AdvanceDeduction,
    /// Loan repayment.
    LoanDeduction,
    /// Payment log entry.
    Payment,
}

/// An append-only ledger line explaining part of a payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollItem {
    /// Unique identifier for the item.
    pub id: Uuid,
    /// The payroll the item belongs to.
    pub payroll_id: Uuid,
    /// The kind of line.
    #[serde(rename = "type")]
    pub item_type: PayrollItemType,
    /// Human-readable description.
    pub description: String,
    /// Signed amount; deductions are negative.
    pub amount: Decimal,
    /// Whether the amount is taxable income.
    pub is_taxable: bool,
    /// Extra data (hours, advance id, ...).
    pub metadata: serde_json::Value,
    /// When the item was recorded.
    pub created_at: DateTime<Utc>,
}

impl PayrollItem {
    /// Creates a new item stamped with the current time.
    pub fn new(
        payroll_id: Uuid,
        item_type: PayrollItemType,
        description: String,
        amount: Decimal,
        is_taxable: bool,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payroll_id,
            item_type,
            description,
            amount,
            is_taxable,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// A bonus recorded for an employee ahead of payroll generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    /// The employee receiving the bonus.
    pub employee_id: String,
    /// The month the bonus is paid in.
    pub month: PayrollMonth,
    /// The bonus amount.
    pub amount: Decimal,
    /// Description shown on the payroll item.
    pub description: String,
}

/// The status of a batch payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Generated and awaiting approval.
    Pending,
    /// All payrolls approved.
    Completed,
    /// All payrolls cancelled.
    Rejected,
}

impl RunStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Completed => "completed",
            RunStatus::Rejected => "rejected",
        }
    }
}

/// A batch payroll run for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique identifier for the run.
    pub id: Uuid,
    /// The month processed.
    pub month: PayrollMonth,
    /// Who started the run.
    pub run_by: String,
    /// The run status.
    pub status: RunStatus,
    /// Number of active employees considered.
    pub total_employees: usize,
    /// Payrolls generated by the run.
    pub payroll_ids: Vec<Uuid>,
    /// Rejection notes.
    pub notes: Option<String>,
    /// When the run was started.
    pub created_at: DateTime<Utc>,
}
