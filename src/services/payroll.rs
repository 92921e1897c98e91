//! Payroll generation, batch runs and the payroll lifecycle.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    calculate_advance_deductions, calculate_allowances, calculate_base_salary, calculate_overtime,
    calculate_pay_totals, round_money, summarize_attendance,
};
use crate::config::PayrollConfig;
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    Advance, AdvanceKind, AuditStep, AuditTrace, Bonus, PaymentDetails, Payroll, PayrollItem,
    PayrollItemType, PayrollMonth, PayrollRun, PayrollStatus, RunStatus, Timesheet,
};
use crate::store::Ledger;

use super::advances::{apply_repayment, reverse_repayments};
use super::{BatchIssue, PayrollEngine};

/// The outcome of generating payrolls for every active employee in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// The payroll month.
    pub month: PayrollMonth,
    /// Active employees considered.
    pub total_employees: usize,
    /// Payrolls created.
    pub generated: Vec<Payroll>,
    /// Employees skipped because a payroll exists or nothing was approved.
    pub skipped: Vec<BatchIssue>,
    /// Employees whose generation failed.
    pub failed: Vec<BatchIssue>,
}

impl BatchReport {
    /// Sum of gross amounts across generated payrolls.
    pub fn total_gross(&self) -> Decimal {
        self.generated.iter().map(|p| p.gross_amount).sum()
    }

    /// Sum of net amounts across generated payrolls.
    pub fn total_net(&self) -> Decimal {
        self.generated.iter().map(|p| p.final_amount).sum()
    }
}

/// A payroll run together with the batch that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// The persisted run.
    pub run: PayrollRun,
    /// The per-employee results.
    pub report: BatchReport,
}

fn transition(payroll: &mut Payroll, next: PayrollStatus) -> PayrollResult<()> {
    if !payroll.status.can_transition_to(next) {
        return Err(PayrollError::InvalidTransition {
            entity: "payroll",
            id: payroll.id,
            from: payroll.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    payroll.status = next;
    Ok(())
}

fn bonus_step(bonuses: &[&Bonus], total: Decimal, step_number: u32) -> AuditStep {
    AuditStep {
        step_number,
        rule_id: "bonus".to_string(),
        rule_name: "Bonuses".to_string(),
        input: serde_json::json!({
            "bonuses": bonuses
                .iter()
                .map(|b| serde_json::json!({
                    "amount": b.amount.to_string(),
                    "description": b.description
                }))
                .collect::<Vec<_>>()
        }),
        output: serde_json::json!({ "amount": total.to_string() }),
        reasoning: if bonuses.is_empty() {
            "No bonuses recorded for the month".to_string()
        } else {
            format!("{} bonus(es) totalling {}", bonuses.len(), total)
        },
    }
}

/// Generates one payroll inside an open transaction.
fn generate_in(
    ledger: &mut Ledger,
    config: &PayrollConfig,
    employee_id: &str,
    month: PayrollMonth,
    run_id: Option<Uuid>,
) -> PayrollResult<Payroll> {
    let employee = ledger.employee(employee_id)?.clone();

    if ledger.find_payroll(employee_id, month).is_some() {
        return Err(PayrollError::PayrollAlreadyExists {
            employee_id: employee_id.to_string(),
            month,
        });
    }

    let timesheets: Vec<Timesheet> = ledger
        .timesheets
        .iter()
        .filter(|t| t.employee_id == employee_id)
        .cloned()
        .collect();

    let mut trace = AuditTrace::default();
    let attendance = summarize_attendance(&timesheets, month, trace.next_step_number());
    if attendance.approved_timesheets == 0 {
        return Err(PayrollError::NoApprovedTimesheets {
            employee_id: employee_id.to_string(),
            month,
        });
    }
    employee.validate_compensation()?;
    trace.record(attendance.audit_step);

    let policy = config.policy();
    let scale = policy.rounding.scale;

    let base = calculate_base_salary(&employee, attendance.days_worked, scale, trace.next_step_number());
    trace.record(base.audit_step);

    let allowances =
        calculate_allowances(&employee, attendance.days_worked, scale, trace.next_step_number());
    trace.record(allowances.audit_step);

    let overtime = calculate_overtime(
        &employee,
        attendance.overtime_hours,
        policy.overtime.default_multiplier,
        scale,
        trace.next_step_number(),
    );
    trace.record(overtime.audit_step);

    let bonuses: Vec<&Bonus> = ledger
        .bonuses
        .iter()
        .filter(|b| b.employee_id == employee_id && b.month == month)
        .collect();
    let bonus_amount = round_money(bonuses.iter().map(|b| b.amount).sum(), scale);
    trace.record(bonus_step(&bonuses, bonus_amount, trace.next_step_number()));
    let bonus_description = bonuses
        .iter()
        .map(|b| b.description.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let advances: Vec<Advance> = ledger
        .advances_for(employee_id)
        .into_iter()
        .cloned()
        .collect();
    let deductions = calculate_advance_deductions(&advances, month, trace.next_step_number());
    trace.record(deductions.audit_step);

    let totals = calculate_pay_totals(
        base.amount,
        allowances.amount,
        overtime.amount,
        bonus_amount,
        deductions.total,
        trace.next_step_number(),
    );
    trace.record(totals.audit_step);

    if totals.net < Decimal::ZERO {
        trace.warn(
            "NEGATIVE_NET_PAY",
            format!(
                "Advance repayments of {} exceed gross pay of {}",
                deductions.total, totals.gross
            ),
            "high",
        );
    }
    if attendance.days_worked > employee.contract_days_per_month {
        trace.warn(
            "DAYS_EXCEED_CONTRACT",
            format!(
                "{} days worked exceeds {} contract days",
                attendance.days_worked, employee.contract_days_per_month
            ),
            "medium",
        );
    }

    let now = Utc::now();
    let payroll = Payroll {
        id: Uuid::new_v4(),
        employee_id: employee_id.to_string(),
        month,
        base_salary: base.amount,
        allowances: allowances.amount,
        overtime_hours: overtime.hours,
        overtime_amount: overtime.amount,
        bonus_amount,
        advance_deduction: deductions.total,
        deduction_amount: deductions.total,
        gross_amount: totals.gross,
        final_amount: totals.net,
        days_worked: attendance.days_worked,
        total_worked_hours: attendance.total_hours,
        status: PayrollStatus::Pending,
        payroll_run_id: run_id,
        approved_by: None,
        approved_at: None,
        payment: None,
        created_at: now,
        audit_trace: trace,
    };

    let mut items = Vec::new();
    let mut push_item = |item_type, description: String, amount: Decimal, taxable, metadata| {
        if !amount.is_zero() {
            items.push(PayrollItem::new(
                payroll.id,
                item_type,
                description,
                amount,
                taxable,
                metadata,
            ));
        }
    };
    push_item(
        PayrollItemType::BaseSalary,
        format!("Base salary for {} days", attendance.days_worked),
        base.amount,
        true,
        serde_json::json!({ "daily_rate": round_money(base.daily_rate, scale).to_string() }),
    );
    push_item(
        PayrollItemType::Allowances,
        "Food, housing and transport allowances".to_string(),
        allowances.amount,
        true,
        serde_json::json!({ "monthly_total": employee.allowances.total().to_string() }),
    );
    push_item(
        PayrollItemType::Overtime,
        format!("Overtime {} hours", overtime.hours.normalize()),
        overtime.amount,
        true,
        serde_json::json!({
            "hours": overtime.hours.to_string(),
            "rate_per_hour": overtime.rate_per_hour.to_string()
        }),
    );
    push_item(
        PayrollItemType::Bonus,
        bonus_description,
        bonus_amount,
        true,
        serde_json::Value::Null,
    );
    for line in &deductions.lines {
        let item_type = match line.kind {
            AdvanceKind::SalaryAdvance => PayrollItemType::AdvanceDeduction,
            AdvanceKind::Loan => PayrollItemType::LoanDeduction,
        };
        push_item(
            item_type,
            format!("{} repayment", line.kind.as_str().replace('_', " ")),
            -line.amount,
            false,
            serde_json::json!({
                "advance_id": line.advance_id,
                "remaining_after": line.remaining_after.to_string()
            }),
        );
    }

    for line in &deductions.lines {
        let advance = ledger.advance_mut(line.advance_id)?;
        apply_repayment(advance, line.amount, month, Some(payroll.id), now)?;
    }

    ledger.payroll_items.extend(items);
    ledger.payrolls.insert(payroll.id, payroll.clone());
    Ok(payroll)
}

impl PayrollEngine {
    /// Generates the payroll for one employee and month.
    ///
    /// Fails with `PayrollAlreadyExists` if a live payroll exists, with
    /// `NoApprovedTimesheets` if nothing was manager-approved in the month,
    /// and with `InvalidEmployee` if the compensation is incomplete. The
    /// payroll, its items and the advance balance updates commit together.
    pub fn generate_payroll(&mut self, employee_id: &str, month: PayrollMonth) -> PayrollResult<Payroll> {
        let config = &self.config;
        let payroll = self
            .store
            .transaction(|ledger| generate_in(ledger, config, employee_id, month, None))?;

        info!(
            employee_id,
            month = %month,
            gross = %payroll.gross_amount,
            net = %payroll.final_amount,
            "Payroll generated"
        );
        Ok(payroll)
    }

    /// Generates payrolls for every active employee.
    ///
    /// Each employee runs in its own transaction; one failure does not stop
    /// the batch.
    pub fn generate_batch(&mut self, month: PayrollMonth) -> BatchReport {
        self.generate_batch_for_run(month, None)
    }

    fn generate_batch_for_run(&mut self, month: PayrollMonth, run_id: Option<Uuid>) -> BatchReport {
        let mut employee_ids: Vec<String> = self
            .ledger()
            .employees
            .values()
            .filter(|e| e.is_active())
            .map(|e| e.id.clone())
            .collect();
        employee_ids.sort();

        let mut report = BatchReport {
            month,
            total_employees: employee_ids.len(),
            generated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for employee_id in &employee_ids {
            let config = &self.config;
            let result = self
                .store
                .transaction(|ledger| generate_in(ledger, config, employee_id, month, run_id));

            match result {
                Ok(payroll) => report.generated.push(payroll),
                Err(error) if error.is_skip() => {
                    report.skipped.push(BatchIssue::new(self.ledger(), employee_id, &error));
                }
                Err(error) => {
                    warn!(employee_id = %employee_id, month = %month, error = %error, "Payroll generation failed");
                    report.failed.push(BatchIssue::new(self.ledger(), employee_id, &error));
                }
            }
        }

        info!(
            month = %month,
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Payroll batch finished"
        );
        report
    }

    /// Generates a batch and records it as a pending payroll run.
    pub fn run_for_month(&mut self, month: PayrollMonth, run_by: &str) -> PayrollResult<RunOutcome> {
        let run_id = Uuid::new_v4();
        let report = self.generate_batch_for_run(month, Some(run_id));

        let run = PayrollRun {
            id: run_id,
            month,
            run_by: run_by.to_string(),
            status: RunStatus::Pending,
            total_employees: report.total_employees,
            payroll_ids: report.generated.iter().map(|p| p.id).collect(),
            notes: None,
            created_at: Utc::now(),
        };
        let stored = run.clone();
        self.store.transaction(|ledger| {
            ledger.payroll_runs.insert(stored.id, stored);
            Ok(())
        })?;

        info!(run_id = %run.id, month = %month, run_by, "Payroll run created");
        Ok(RunOutcome { run, report })
    }

    /// Approves every pending payroll in a run and completes the run.
    ///
    /// Payrolls cancelled individually since the run was created are left
    /// alone.
    pub fn approve_run(&mut self, run_id: Uuid, approver: &str) -> PayrollResult<PayrollRun> {
        let run = self.store.transaction(|ledger| {
            let run = ledger.run_mut(run_id)?.clone();
            if run.status != RunStatus::Pending {
                return Err(PayrollError::InvalidTransition {
                    entity: "payroll run",
                    id: run_id,
                    from: run.status.as_str().to_string(),
                    to: RunStatus::Completed.as_str().to_string(),
                });
            }

            let now = Utc::now();
            for payroll_id in &run.payroll_ids {
                let payroll = ledger.payroll_mut(*payroll_id)?;
                if payroll.status == PayrollStatus::Pending {
                    transition(payroll, PayrollStatus::Approved)?;
                    payroll.approved_by = Some(approver.to_string());
                    payroll.approved_at = Some(now);
                }
            }

            let run = ledger.run_mut(run_id)?;
            run.status = RunStatus::Completed;
            Ok(run.clone())
        })?;

        info!(run_id = %run_id, approver, payrolls = run.payroll_ids.len(), "Payroll run approved");
        Ok(run)
    }

    /// Cancels every payroll in a run and rejects the run.
    ///
    /// Fails without changes if any payroll in the run has already been paid.
    pub fn reject_run(&mut self, run_id: Uuid, notes: Option<String>) -> PayrollResult<PayrollRun> {
        let run = self.store.transaction(|ledger| {
            let run = ledger.run_mut(run_id)?.clone();
            if run.status != RunStatus::Pending {
                return Err(PayrollError::InvalidTransition {
                    entity: "payroll run",
                    id: run_id,
                    from: run.status.as_str().to_string(),
                    to: RunStatus::Rejected.as_str().to_string(),
                });
            }

            for payroll_id in &run.payroll_ids {
                if ledger.payroll(*payroll_id)?.status != PayrollStatus::Cancelled {
                    cancel_in(ledger, *payroll_id)?;
                }
            }

            let run = ledger.run_mut(run_id)?;
            run.status = RunStatus::Rejected;
            run.notes = notes;
            Ok(run.clone())
        })?;

        info!(run_id = %run_id, "Payroll run rejected");
        Ok(run)
    }

    /// Approves a pending payroll.
    pub fn approve_payroll(&mut self, payroll_id: Uuid, approver: &str) -> PayrollResult<Payroll> {
        let payroll = self.store.transaction(|ledger| {
            let payroll = ledger.payroll_mut(payroll_id)?;
            transition(payroll, PayrollStatus::Approved)?;
            payroll.approved_by = Some(approver.to_string());
            payroll.approved_at = Some(Utc::now());
            Ok(payroll.clone())
        })?;

        info!(payroll_id = %payroll_id, approver, "Payroll approved");
        Ok(payroll)
    }

    /// Marks an approved payroll as paid and appends a payment item.
    pub fn process_payment(
        &mut self,
        payroll_id: Uuid,
        method: &str,
        reference: Option<String>,
    ) -> PayrollResult<Payroll> {
        let payroll = self.store.transaction(|ledger| {
            let payroll = ledger.payroll_mut(payroll_id)?;
            transition(payroll, PayrollStatus::Paid)?;
            payroll.payment = Some(PaymentDetails {
                method: method.to_string(),
                reference: reference.clone(),
                paid_at: Utc::now(),
            });
            let payroll = payroll.clone();

            ledger.payroll_items.push(PayrollItem::new(
                payroll_id,
                PayrollItemType::Payment,
                format!("Paid by {}", method),
                payroll.final_amount,
                false,
                serde_json::json!({ "method": method, "reference": reference }),
            ));
            Ok(payroll)
        })?;

        info!(payroll_id = %payroll_id, method, amount = %payroll.final_amount, "Payroll paid");
        Ok(payroll)
    }

    /// Cancels a payroll that has not been paid.
    ///
    /// Advance repayments the payroll recorded are reversed so the
    /// installments fall due again.
    pub fn cancel_payroll(&mut self, payroll_id: Uuid) -> PayrollResult<Payroll> {
        let payroll = self
            .store
            .transaction(|ledger| cancel_in(ledger, payroll_id))?;

        info!(payroll_id = %payroll_id, "Payroll cancelled");
        Ok(payroll)
    }

    /// Records a bonus to be included when the month's payroll is generated.
    pub fn record_bonus(
        &mut self,
        employee_id: &str,
        month: PayrollMonth,
        amount: Decimal,
        description: &str,
    ) -> PayrollResult<Bonus> {
        if amount <= Decimal::ZERO {
            return Err(PayrollError::InvalidRequest {
                field: "amount".to_string(),
                message: format!("bonus must be positive, got {}", amount),
            });
        }

        let bonus = self.store.transaction(|ledger| {
            ledger.employee(employee_id)?;
            if ledger.find_payroll(employee_id, month).is_some() {
                return Err(PayrollError::PayrollAlreadyExists {
                    employee_id: employee_id.to_string(),
                    month,
                });
            }
            let bonus = Bonus {
                employee_id: employee_id.to_string(),
                month,
                amount,
                description: description.to_string(),
            };
            ledger.bonuses.push(bonus.clone());
            Ok(bonus)
        })?;

        info!(employee_id, month = %month, amount = %amount, "Bonus recorded");
        Ok(bonus)
    }

    /// Looks up a payroll.
    pub fn payroll(&self, payroll_id: Uuid) -> PayrollResult<&Payroll> {
        self.ledger().payroll(payroll_id)
    }

    /// Returns the item ledger of a payroll in recording order.
    pub fn payroll_items(&self, payroll_id: Uuid) -> Vec<&PayrollItem> {
        self.ledger().items_for(payroll_id)
    }

    /// Returns a month's payrolls ordered by employee.
    pub fn payrolls_for_month(&self, month: PayrollMonth) -> Vec<&Payroll> {
        let mut payrolls: Vec<&Payroll> = self
            .ledger()
            .payrolls
            .values()
            .filter(|p| p.month == month)
            .collect();
        payrolls.sort_by(|a, b| a.employee_id.cmp(&b.employee_id).then(a.created_at.cmp(&b.created_at)));
        payrolls
    }
}

fn cancel_in(ledger: &mut Ledger, payroll_id: Uuid) -> PayrollResult<Payroll> {
    let payroll = ledger.payroll_mut(payroll_id)?;
    transition(payroll, PayrollStatus::Cancelled)?;
    let payroll = payroll.clone();

    for advance in ledger.advances.values_mut() {
        if advance.employee_id == payroll.employee_id {
            reverse_repayments(advance, payroll_id);
        }
    }
    Ok(payroll)
}
