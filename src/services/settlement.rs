//! Final settlements for leaving employees.
//!
//! A settlement pays out the last month's salary together with gratuity and
//! leave encashment, and recovers outstanding advances, loans and unserved
//! notice. Creating one marks the employee as resigned; paying it closes the
//! employee's remaining advances and loans.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    calculate_gratuity, calculate_leave_encashment, calculate_notice_recovery, service_period,
};
use crate::config::SettlementPolicy;
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    AdvanceKind, AuditStep, AuditTrace, EmployeeStatus, FinalSettlement, PaymentDetails,
    PayrollMonth, PayrollStatus, SettlementAdjustment, SettlementRequest, SettlementStatus,
};
use crate::store::Ledger;

use super::advances::apply_repayment;
use super::PayrollEngine;

/// One labelled amount in a settlement report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummaryRow {
    /// What the amount is for.
    pub label: String,
    /// The amount.
    pub amount: Decimal,
}

impl SettlementSummaryRow {
    fn new(label: &str, amount: Decimal) -> Self {
        Self {
            label: label.to_string(),
            amount,
        }
    }
}

/// A printable statement of a final settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// The settlement.
    pub settlement_id: Uuid,
    /// The employee id.
    pub employee_id: String,
    /// The employee's name.
    pub employee_name: String,
    /// Department, if known.
    pub department: Option<String>,
    /// Position, if known.
    pub position: Option<String>,
    /// The date the employee joined.
    pub joining_date: NaiveDate,
    /// Last day worked.
    pub last_working_date: NaiveDate,
    /// Service in years.
    pub service_years: Decimal,
    /// Earnings lines, in statement order.
    pub earnings: Vec<SettlementSummaryRow>,
    /// Deduction lines, in statement order.
    pub deductions: Vec<SettlementSummaryRow>,
    /// Sum of earnings.
    pub gross_amount: Decimal,
    /// Sum of deductions.
    pub total_deductions: Decimal,
    /// Amount payable.
    pub net_amount: Decimal,
    /// The settlement status.
    pub status: SettlementStatus,
    /// When the settlement was calculated.
    pub calculated_at: DateTime<Utc>,
    /// When it was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When it was paid.
    pub paid_at: Option<DateTime<Utc>>,
}

fn transition(settlement: &mut FinalSettlement, next: SettlementStatus) -> PayrollResult<()> {
    if !settlement.status.can_transition_to(next) {
        return Err(PayrollError::InvalidTransition {
            entity: "settlement",
            id: settlement.id,
            from: settlement.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    settlement.status = next;
    Ok(())
}

fn non_negative(field: &str, value: Decimal) -> PayrollResult<()> {
    if value < Decimal::ZERO {
        return Err(PayrollError::InvalidRequest {
            field: field.to_string(),
            message: format!("must not be negative, got {}", value),
        });
    }
    Ok(())
}

fn validate_request(request: &SettlementRequest) -> PayrollResult<()> {
    non_negative("pending_leave_days", request.pending_leave_days)?;
    non_negative("notice_shortfall_days", request.notice_shortfall_days)?;
    non_negative("overtime_amount", request.overtime_amount)?;
    non_negative("bonus_amount", request.bonus_amount)?;
    non_negative("other_deductions", request.other_deductions)
}

fn validate_adjustment(adjustment: &SettlementAdjustment) -> PayrollResult<()> {
    let fields = [
        ("allowances", adjustment.allowances),
        ("overtime_amount", adjustment.overtime_amount),
        ("leave_encashment", adjustment.leave_encashment),
        ("gratuity_amount", adjustment.gratuity_amount),
        ("bonus_amount", adjustment.bonus_amount),
        ("advance_deduction", adjustment.advance_deduction),
        ("loan_deduction", adjustment.loan_deduction),
        ("other_deductions", adjustment.other_deductions),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            non_negative(field, value)?;
        }
    }
    Ok(())
}

/// Remaining balances of the employee's disbursed advances and loans.
fn outstanding_balances(ledger: &Ledger, employee_id: &str) -> (Decimal, Decimal) {
    ledger
        .advances_for(employee_id)
        .into_iter()
        .filter(|a| a.status.is_disbursed())
        .fold((Decimal::ZERO, Decimal::ZERO), |(advances, loans), a| match a.kind {
            AdvanceKind::SalaryAdvance => (advances + a.remaining_balance, loans),
            AdvanceKind::Loan => (advances, loans + a.remaining_balance),
        })
}

fn create_in(
    ledger: &mut Ledger,
    policy: &SettlementPolicy,
    scale: u32,
    request: &SettlementRequest,
) -> PayrollResult<FinalSettlement> {
    let employee = ledger.employee(&request.employee_id)?.clone();
    let exists = ledger.settlements.values().any(|s| {
        s.employee_id == employee.id && s.status != SettlementStatus::Cancelled
    });
    if exists {
        return Err(PayrollError::SettlementAlreadyExists {
            employee_id: employee.id,
        });
    }
    if request.last_working_date < employee.joining_date {
        return Err(PayrollError::InvalidRequest {
            field: "last_working_date".to_string(),
            message: format!(
                "{} is before the joining date {}",
                request.last_working_date, employee.joining_date
            ),
        });
    }

    let mut trace = AuditTrace::default();
    let basic = employee.basic_salary;
    let service = service_period(employee.joining_date, request.last_working_date);

    let gratuity = calculate_gratuity(basic, &service, policy, scale, trace.next_step_number());
    trace.record(gratuity.audit_step);
    let encashment = calculate_leave_encashment(
        basic,
        request.pending_leave_days,
        policy,
        scale,
        trace.next_step_number(),
    );
    trace.record(encashment.audit_step);
    let notice = calculate_notice_recovery(
        basic,
        request.notice_shortfall_days,
        policy,
        scale,
        trace.next_step_number(),
    );
    trace.record(notice.audit_step);

    let (advance_deduction, loan_deduction) = outstanding_balances(ledger, &employee.id);
    trace.record(AuditStep {
        step_number: trace.next_step_number(),
        rule_id: "outstanding_debt".to_string(),
        rule_name: "Outstanding Advances and Loans".to_string(),
        input: serde_json::json!({ "employee_id": employee.id }),
        output: serde_json::json!({
            "advance_deduction": advance_deduction.to_string(),
            "loan_deduction": loan_deduction.to_string()
        }),
        reasoning: format!(
            "Recovering {} in salary advances and {} in loans",
            advance_deduction, loan_deduction
        ),
    });

    let mut unpaid: Vec<(PayrollMonth, Uuid)> = ledger
        .payrolls
        .values()
        .filter(|p| {
            p.employee_id == employee.id
                && matches!(p.status, PayrollStatus::Pending | PayrollStatus::Approved)
        })
        .map(|p| (p.month, p.id))
        .collect();
    unpaid.sort();

    let mut settlement = FinalSettlement {
        id: Uuid::new_v4(),
        employee_id: employee.id.clone(),
        last_working_date: request.last_working_date,
        service_years: service.years,
        basic_salary: basic,
        allowances: employee.allowances.total(),
        overtime_amount: request.overtime_amount,
        leave_encashment: encashment.amount,
        gratuity_amount: gratuity.amount,
        bonus_amount: request.bonus_amount,
        advance_deduction,
        loan_deduction,
        other_deductions: request.other_deductions + notice.amount,
        gross_amount: Decimal::ZERO,
        total_deductions: Decimal::ZERO,
        net_amount: Decimal::ZERO,
        status: SettlementStatus::Pending,
        payroll_ids: unpaid.into_iter().map(|(_, id)| id).collect(),
        approved_by: None,
        approved_at: None,
        payment: None,
        cancellation_reason: None,
        created_at: Utc::now(),
        audit_trace: AuditTrace::default(),
    };
    settlement.recompute_totals();

    trace.record(AuditStep {
        step_number: trace.next_step_number(),
        rule_id: "settlement_totals".to_string(),
        rule_name: "Settlement Totals".to_string(),
        input: serde_json::json!({
            "basic_salary": settlement.basic_salary.to_string(),
            "allowances": settlement.allowances.to_string(),
            "overtime_amount": settlement.overtime_amount.to_string(),
            "leave_encashment": settlement.leave_encashment.to_string(),
            "gratuity_amount": settlement.gratuity_amount.to_string(),
            "bonus_amount": settlement.bonus_amount.to_string(),
            "other_deductions": settlement.other_deductions.to_string()
        }),
        output: serde_json::json!({
            "gross_amount": settlement.gross_amount.to_string(),
            "total_deductions": settlement.total_deductions.to_string(),
            "net_amount": settlement.net_amount.to_string()
        }),
        reasoning: format!(
            "{} - {} = {}",
            settlement.gross_amount, settlement.total_deductions, settlement.net_amount
        ),
    });
    if settlement.net_amount < Decimal::ZERO {
        trace.warn(
            "NEGATIVE_NET_SETTLEMENT",
            format!(
                "Recoveries exceed earnings by {}",
                -settlement.net_amount
            ),
            "warning",
        );
    }
    settlement.audit_trace = trace;

    ledger.employee_mut(&employee.id)?.status = EmployeeStatus::Resigned;
    ledger.settlements.insert(settlement.id, settlement.clone());
    Ok(settlement)
}

fn mark_paid_in(
    ledger: &mut Ledger,
    settlement_id: Uuid,
    method: &str,
    reference: Option<String>,
) -> PayrollResult<FinalSettlement> {
    let now = Utc::now();
    let mut settlement = ledger.settlement(settlement_id)?.clone();
    transition(&mut settlement, SettlementStatus::Paid)?;
    settlement.payment = Some(PaymentDetails {
        method: method.to_string(),
        reference,
        paid_at: now,
    });

    let month = PayrollMonth::of(settlement.last_working_date);
    let open: Vec<(Uuid, Decimal)> = ledger
        .advances_for(&settlement.employee_id)
        .into_iter()
        .filter(|a| a.status.is_disbursed() && a.remaining_balance > Decimal::ZERO)
        .map(|a| (a.id, a.remaining_balance))
        .collect();
    for (advance_id, balance) in open {
        apply_repayment(ledger.advance_mut(advance_id)?, balance, month, None, now)?;
    }

    ledger.settlements.insert(settlement.id, settlement.clone());
    Ok(settlement)
}

impl PayrollEngine {
    /// Calculates the final settlement for a leaving employee.
    ///
    /// The employee is marked resigned and any pending or approved payrolls
    /// are linked to the settlement. Fails if the employee already has a
    /// settlement that was not cancelled.
    pub fn create_settlement(&mut self, request: SettlementRequest) -> PayrollResult<FinalSettlement> {
        validate_request(&request)?;
        let policy = &self.config.policy().settlement;
        let scale = self.config.policy().rounding.scale;

        let settlement = self
            .store
            .transaction(|ledger| create_in(ledger, policy, scale, &request))?;

        info!(
            settlement_id = %settlement.id,
            employee_id = %settlement.employee_id,
            net_amount = %settlement.net_amount,
            linked_payrolls = settlement.payroll_ids.len(),
            "Final settlement created"
        );
        if !settlement.audit_trace.warnings.is_empty() {
            warn!(settlement_id = %settlement.id, "Settlement recoveries exceed earnings");
        }
        Ok(settlement)
    }

    /// Applies manual corrections to a pending settlement.
    pub fn update_settlement(
        &mut self,
        settlement_id: Uuid,
        adjustment: SettlementAdjustment,
    ) -> PayrollResult<FinalSettlement> {
        validate_adjustment(&adjustment)?;

        let settlement = self.store.transaction(|ledger| {
            let mut settlement = ledger.settlement(settlement_id)?.clone();
            if settlement.status != SettlementStatus::Pending {
                return Err(PayrollError::NotEditable {
                    entity: "settlement",
                    id: settlement_id,
                    status: settlement.status.as_str().to_string(),
                });
            }

            settlement.apply_adjustment(&adjustment);
            let step_number = settlement.audit_trace.next_step_number();
            settlement.audit_trace.record(AuditStep {
                step_number,
                rule_id: "manual_adjustment".to_string(),
                rule_name: "Manual Adjustment".to_string(),
                input: serde_json::json!(adjustment),
                output: serde_json::json!({
                    "gross_amount": settlement.gross_amount.to_string(),
                    "total_deductions": settlement.total_deductions.to_string(),
                    "net_amount": settlement.net_amount.to_string()
                }),
                reasoning: format!("Adjusted net amount: {}", settlement.net_amount),
            });

            ledger.settlements.insert(settlement.id, settlement.clone());
            Ok(settlement)
        })?;

        info!(settlement_id = %settlement_id, net_amount = %settlement.net_amount, "Settlement updated");
        Ok(settlement)
    }

    /// Approves a pending settlement.
    pub fn approve_settlement(&mut self, settlement_id: Uuid, approver: &str) -> PayrollResult<FinalSettlement> {
        let settlement = self.store.transaction(|ledger| {
            let settlement = ledger.settlement_mut(settlement_id)?;
            transition(settlement, SettlementStatus::Approved)?;
            settlement.approved_by = Some(approver.to_string());
            settlement.approved_at = Some(Utc::now());
            Ok(settlement.clone())
        })?;

        info!(settlement_id = %settlement_id, approver, "Settlement approved");
        Ok(settlement)
    }

    /// Pays an approved settlement and closes the employee's outstanding
    /// advances and loans.
    pub fn mark_settlement_paid(
        &mut self,
        settlement_id: Uuid,
        method: &str,
        reference: Option<String>,
    ) -> PayrollResult<FinalSettlement> {
        let settlement = self
            .store
            .transaction(|ledger| mark_paid_in(ledger, settlement_id, method, reference))?;

        info!(settlement_id = %settlement_id, method, "Settlement paid");
        Ok(settlement)
    }

    /// Cancels a settlement that has not been paid.
    pub fn cancel_settlement(&mut self, settlement_id: Uuid, reason: &str) -> PayrollResult<FinalSettlement> {
        let settlement = self.store.transaction(|ledger| {
            let settlement = ledger.settlement_mut(settlement_id)?;
            transition(settlement, SettlementStatus::Cancelled)?;
            settlement.cancellation_reason = Some(reason.to_string());
            Ok(settlement.clone())
        })?;

        info!(settlement_id = %settlement_id, reason, "Settlement cancelled");
        Ok(settlement)
    }

    /// Looks up a settlement.
    pub fn settlement(&self, settlement_id: Uuid) -> PayrollResult<&FinalSettlement> {
        self.ledger().settlement(settlement_id)
    }

    /// Returns settlements, optionally filtered by status, oldest first.
    pub fn settlements(&self, status: Option<SettlementStatus>) -> Vec<&FinalSettlement> {
        let mut settlements: Vec<&FinalSettlement> = self
            .ledger()
            .settlements
            .values()
            .filter(|s| status.is_none_or(|status| s.status == status))
            .collect();
        settlements.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        settlements
    }

    /// Builds the statement for a settlement.
    pub fn settlement_report(&self, settlement_id: Uuid) -> PayrollResult<SettlementReport> {
        let ledger = self.ledger();
        let settlement = ledger.settlement(settlement_id)?;
        let employee = ledger.employee(&settlement.employee_id)?;

        Ok(SettlementReport {
            settlement_id,
            employee_id: employee.id.clone(),
            employee_name: employee.full_name.clone(),
            department: employee.department.clone(),
            position: employee.position.clone(),
            joining_date: employee.joining_date,
            last_working_date: settlement.last_working_date,
            service_years: settlement.service_years,
            earnings: vec![
                SettlementSummaryRow::new("Basic salary", settlement.basic_salary),
                SettlementSummaryRow::new("Allowances", settlement.allowances),
                SettlementSummaryRow::new("Overtime", settlement.overtime_amount),
                SettlementSummaryRow::new("Leave encashment", settlement.leave_encashment),
                SettlementSummaryRow::new("Gratuity", settlement.gratuity_amount),
                SettlementSummaryRow::new("Bonus", settlement.bonus_amount),
            ],
            deductions: vec![
                SettlementSummaryRow::new("Salary advances", settlement.advance_deduction),
                SettlementSummaryRow::new("Loans", settlement.loan_deduction),
                SettlementSummaryRow::new("Other deductions", settlement.other_deductions),
            ],
            gross_amount: settlement.gross_amount,
            total_deductions: settlement.total_deductions,
            net_amount: settlement.net_amount,
            status: settlement.status,
            calculated_at: settlement.created_at,
            approved_at: settlement.approved_at,
            paid_at: settlement.payment.as_ref().map(|p| p.paid_at),
        })
    }
}
