//! Advance and loan deductions for a payroll month.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Advance, AdvanceKind, AuditStep, PayrollMonth};

/// One advance or loan repayment withheld from a payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceDeductionLine {
    /// The advance repaid.
    pub advance_id: Uuid,
    /// Advance or loan.
    pub kind: AdvanceKind,
    /// The amount due this month, overdue installments included.
    pub scheduled: Decimal,
    /// The amount withheld.
    pub amount: Decimal,
    /// The balance left once the amount is applied.
    pub remaining_after: Decimal,
}

/// The result of collecting advance deductions for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceDeductionResult {
    /// One line per advance repaid this month.
    pub lines: Vec<AdvanceDeductionLine>,
    /// Sum of all lines.
    pub total: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Collects the installments due in `month` across an employee's advances.
///
/// An advance contributes when it has been disbursed and still has a balance.
/// It contributes its [`Advance::amount_due`] for the month, capped at the
/// remaining balance, so installments missed in months without a payroll are
/// collected by the next one.
pub fn calculate_advance_deductions(
    advances: &[Advance],
    month: PayrollMonth,
    step_number: u32,
) -> AdvanceDeductionResult {
    let mut lines = Vec::new();

    for advance in advances {
        if !advance.status.is_disbursed() || advance.remaining_balance <= Decimal::ZERO {
            continue;
        }
        let due = advance.amount_due(month);
        if due <= Decimal::ZERO {
            continue;
        }

        let amount = due.min(advance.remaining_balance);
        lines.push(AdvanceDeductionLine {
            advance_id: advance.id,
            kind: advance.kind,
            scheduled: due,
            amount,
            remaining_after: advance.remaining_balance - amount,
        });
    }

    let total: Decimal = lines.iter().map(|l| l.amount).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "advance_deduction".to_string(),
        rule_name: "Advance and Loan Deductions".to_string(),
        input: serde_json::json!({
            "month": month.to_string(),
            "advances_considered": advances.len()
        }),
        output: serde_json::json!({
            "lines": lines.iter().map(|l| serde_json::json!({
                "advance_id": l.advance_id.to_string(),
                "kind": l.kind.as_str(),
                "amount": l.amount.to_string(),
                "remaining_after": l.remaining_after.to_string()
            })).collect::<Vec<_>>(),
            "total": total.to_string()
        }),
        reasoning: if lines.is_empty() {
            format!("No installments due in {}", month)
        } else {
            format!(
                "{} installment(s) due in {} totalling {}",
                lines.len(),
                month,
                total
            )
        },
    };

    AdvanceDeductionResult {
        lines,
        total,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdvanceStatus, Installment, Repayment};
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn month(m: u32) -> PayrollMonth {
        PayrollMonth::new(2026, m).unwrap()
    }

    fn create_advance(kind: AdvanceKind, status: AdvanceStatus, remaining: &str) -> Advance {
        Advance {
            id: Uuid::new_v4(),
            employee_id: "emp_001".to_string(),
            kind,
            requested_amount: dec("1200"),
            approved_amount: Some(dec("1200")),
            interest_rate: None,
            installments: 3,
            monthly_installment: dec("400"),
            reason: "School fees".to_string(),
            status,
            remaining_balance: dec(remaining),
            schedule: (1..=3)
                .map(|n| Installment {
                    number: n,
                    month: month(n + 1),
                    amount: dec("400"),
                })
                .collect(),
            repayments: Vec::new(),
            approved_by: Some("mgr_001".to_string()),
            approved_at: None,
            rejection_reason: None,
            paid_on: None,
            requested_at: Utc::now(),
        }
    }

    #[test]
    fn test_deducts_scheduled_installment() {
        let advances = vec![create_advance(
            AdvanceKind::SalaryAdvance,
            AdvanceStatus::Paid,
            "1200",
        )];

        let result = calculate_advance_deductions(&advances, month(2), 5);

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.total, dec("400"));
        assert_eq!(result.lines[0].remaining_after, dec("800"));
        assert_eq!(result.audit_step.step_number, 5);
    }

    #[test]
    fn test_caps_at_remaining_balance() {
        let advances = vec![create_advance(
            AdvanceKind::Loan,
            AdvanceStatus::PartiallyRepaid,
            "150",
        )];

        let result = calculate_advance_deductions(&advances, month(3), 1);

        // February and March both unpaid
        assert_eq!(result.lines[0].scheduled, dec("800"));
        assert_eq!(result.lines[0].amount, dec("150"));
        assert_eq!(result.lines[0].remaining_after, Decimal::ZERO);
    }

    #[test]
    fn test_skips_undisbursed_and_closed() {
        let advances = vec![
            create_advance(AdvanceKind::SalaryAdvance, AdvanceStatus::Approved, "1200"),
            create_advance(AdvanceKind::SalaryAdvance, AdvanceStatus::Closed, "0"),
        ];

        let result = calculate_advance_deductions(&advances, month(2), 1);
        assert!(result.lines.is_empty());
        assert_eq!(result.total, Decimal::ZERO);
    }

    #[test]
    fn test_skips_month_without_installment() {
        let advances = vec![create_advance(
            AdvanceKind::SalaryAdvance,
            AdvanceStatus::Paid,
            "1200",
        )];

        let result = calculate_advance_deductions(&advances, month(1), 1);
        assert!(result.lines.is_empty());
        assert_eq!(result.audit_step.reasoning, "No installments due in 2026-01");
    }

    #[test]
    fn test_skips_month_already_repaid() {
        let mut advance = create_advance(AdvanceKind::SalaryAdvance, AdvanceStatus::PartiallyRepaid, "800");
        advance.repayments.push(Repayment {
            id: Uuid::new_v4(),
            amount: dec("400"),
            month: month(2),
            payroll_id: None,
            balance_after: dec("800"),
            recorded_at: Utc::now(),
        });

        let result = calculate_advance_deductions(&[advance], month(2), 1);
        assert!(result.lines.is_empty());
    }

    #[test]
    fn test_collects_installment_missed_in_earlier_month() {
        let mut advance = create_advance(AdvanceKind::SalaryAdvance, AdvanceStatus::PartiallyRepaid, "800");
        advance.repayments.push(Repayment {
            id: Uuid::new_v4(),
            amount: dec("400"),
            month: month(2),
            payroll_id: None,
            balance_after: dec("800"),
            recorded_at: Utc::now(),
        });

        let april = calculate_advance_deductions(std::slice::from_ref(&advance), month(4), 1);
        assert_eq!(april.total, dec("800"));
        assert_eq!(april.lines[0].remaining_after, Decimal::ZERO);

        let after_schedule = calculate_advance_deductions(&[advance], month(7), 1);
        assert_eq!(after_schedule.total, dec("800"));
    }

    #[test]
    fn test_sums_advance_and_loan() {
        let advances = vec![
            create_advance(AdvanceKind::SalaryAdvance, AdvanceStatus::Paid, "1200"),
            create_advance(AdvanceKind::Loan, AdvanceStatus::PartiallyRepaid, "800"),
        ];

        let result = calculate_advance_deductions(&advances, month(2), 1);
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.total, dec("800"));
    }
}
