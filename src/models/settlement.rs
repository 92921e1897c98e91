//! Final settlement models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuditTrace, PaymentDetails};

/// The lifecycle status of a final settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Calculated and open for adjustment.
    Pending,
    /// Approved for payment.
    Approved,
    /// Paid out.
    Paid,
    /// Cancelled.
    Cancelled,
}

impl SettlementStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Approved => "approved",
            SettlementStatus::Paid => "paid",
            SettlementStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Approved, Paid) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

/// The inputs needed to settle a leaving employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// The leaving employee.
    pub employee_id: String,
    /// Last day worked.
    pub last_working_date: NaiveDate,
    /// Untaken leave days to encash.
    #[serde(default)]
    pub pending_leave_days: Decimal,
    /// Notice days the employee did not serve.
    #[serde(default)]
    pub notice_shortfall_days: Decimal,
    /// Overtime earned but not yet paid.
    #[serde(default)]
    pub overtime_amount: Decimal,
    /// Bonus owed.
    #[serde(default)]
    pub bonus_amount: Decimal,
    /// Any other recoveries.
    #[serde(default)]
    pub other_deductions: Decimal,
}

/// Manual corrections to a pending settlement; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAdjustment {
    /// Replacement allowances.
    pub allowances: Option<Decimal>,
    /// Replacement overtime amount.
    pub overtime_amount: Option<Decimal>,
    /// Replacement leave encashment.
    pub leave_encashment: Option<Decimal>,
    /// Replacement gratuity.
    pub gratuity_amount: Option<Decimal>,
    /// Replacement bonus.
    pub bonus_amount: Option<Decimal>,
    /// Replacement advance deduction.
    pub advance_deduction: Option<Decimal>,
    /// Replacement loan deduction.
    pub loan_deduction: Option<Decimal>,
    /// Replacement other deductions.
    pub other_deductions: Option<Decimal>,
}

/// The final settlement for an employee leaving the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSettlement {
    /// Unique identifier for the settlement.
    pub id: Uuid,
    /// The leaving employee.
    pub employee_id: String,
    /// Last day worked.
    pub last_working_date: NaiveDate,
    /// Service in years, from completed months.
    pub service_years: Decimal,
    /// Monthly basic salary.
    pub basic_salary: Decimal,
    /// Monthly allowances.
    pub allowances: Decimal,
    /// Unpaid overtime.
    pub overtime_amount: Decimal,
    /// Leave encashment.
    pub leave_encashment: Decimal,
    /// End-of-service gratuity.
    pub gratuity_amount: Decimal,
    /// Bonus owed.
    pub bonus_amount: Decimal,
    /// Outstanding salary advances recovered.
    pub advance_deduction: Decimal,
    /// Outstanding loans recovered.
    pub loan_deduction: Decimal,
    /// Notice shortfall and other recoveries.
    pub other_deductions: Decimal,
    /// Sum of earnings.
    pub gross_amount: Decimal,
    /// Sum of deductions.
    pub total_deductions: Decimal,
    /// Amount payable.
    pub net_amount: Decimal,
    /// The lifecycle status.
    pub status: SettlementStatus,
    /// Unpaid payrolls folded into the settlement.
    pub payroll_ids: Vec<Uuid>,
    /// Who approved the settlement.
    pub approved_by: Option<String>,
    /// When the settlement was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// Payment details once paid.
    pub payment: Option<PaymentDetails>,
    /// Why the settlement was cancelled.
    pub cancellation_reason: Option<String>,
    /// When the settlement was calculated.
    pub created_at: DateTime<Utc>,
    /// The calculation audit trace.
    pub audit_trace: AuditTrace,
}

impl FinalSettlement {
    /// Recomputes gross, total deductions and net from the components.
    pub fn recompute_totals(&mut self) {
        self.gross_amount = self.basic_salary
            + self.allowances
            + self.overtime_amount
            + self.leave_encashment
            + self.gratuity_amount
            + self.bonus_amount;
        self.total_deductions = self.advance_deduction + self.loan_deduction + self.other_deductions;
        self.net_amount = self.gross_amount - self.total_deductions;
    }

    /// Applies manual corrections and recomputes the totals.
    pub fn apply_adjustment(&mut self, adjustment: &SettlementAdjustment) {
        let fields = [
            (&mut self.allowances, adjustment.allowances),
            (&mut self.overtime_amount, adjustment.overtime_amount),
            (&mut self.leave_encashment, adjustment.leave_encashment),
            (&mut self.gratuity_amount, adjustment.gratuity_amount),
            (&mut self.bonus_amount, adjustment.bonus_amount),
            (&mut self.advance_deduction, adjustment.advance_deduction),
            (&mut self.loan_deduction, adjustment.loan_deduction),
            (&mut self.other_deductions, adjustment.other_deductions),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        self.recompute_totals();
    }
}
