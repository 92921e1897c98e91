//! Deduction rules, templates and the deductions recorded against payrolls.
//!
//! Rule deductions are recorded as [`PayrollDeduction`]s beside the payroll;
//! they do not change its net amount. Approved pre-tax deductions reduce
//! taxable income (see [`tax`](super::tax)).

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{DeductionContext, DeductionResult, evaluate_deduction_rule};
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    DeductionMethod, DeductionRule, DeductionRuleDraft, DeductionStatus, DeductionTemplate,
    PayrollDeduction, PayrollStatus,
};
use crate::store::Ledger;

use super::{BatchIssue, PayrollEngine};

/// The rule deductions that apply to one payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    /// The payroll evaluated.
    pub payroll_id: Uuid,
    /// Rules that produced a positive amount, in rule order.
    pub deductions: Vec<DeductionResult>,
    /// Sum of the amounts.
    pub total: Decimal,
}

/// Rules created for one employee from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateApplication {
    /// The employee.
    pub employee_id: String,
    /// The rules created.
    pub rule_ids: Vec<Uuid>,
}

/// The outcome of applying a template to a set of employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateApplicationReport {
    /// The template applied.
    pub template_id: Uuid,
    /// Employees the rules were created for.
    pub applied: Vec<TemplateApplication>,
    /// Employees that failed.
    pub failed: Vec<BatchIssue>,
}

/// The result of recording deductions for one payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeductionDetail {
    /// The payroll.
    pub payroll_id: Uuid,
    /// Deductions recorded, empty on failure.
    pub recorded: Vec<PayrollDeduction>,
    /// The error message on failure.
    pub error: Option<String>,
}

/// The outcome of recording deductions for a set of payrolls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeductionReport {
    /// Payrolls processed successfully.
    pub processed: usize,
    /// Payrolls that failed.
    pub failed: usize,
    /// One entry per payroll, in input order.
    pub details: Vec<BulkDeductionDetail>,
}

fn invalid(rule_id: Uuid, message: impl Into<String>) -> PayrollError {
    PayrollError::InvalidRule {
        rule_id,
        message: message.into(),
    }
}

/// Checks that a rule carries the data its method needs.
fn validate_rule(rule: &DeductionRule) -> PayrollResult<()> {
    if rule.name.trim().is_empty() {
        return Err(invalid(rule.id, "name must not be empty"));
    }
    if rule
        .effective_until
        .is_some_and(|until| until < rule.effective_from)
    {
        return Err(invalid(rule.id, "effective_until is before effective_from"));
    }

    match &rule.method {
        DeductionMethod::Fixed { amount } if *amount < Decimal::ZERO => {
            Err(invalid(rule.id, format!("fixed amount {} is negative", amount)))
        }
        DeductionMethod::Percentage { percentage }
            if *percentage < Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED =>
        {
            Err(invalid(
                rule.id,
                format!("percentage {} is outside 0..=100", percentage),
            ))
        }
        DeductionMethod::Tiered { tiers } if tiers.is_empty() => {
            Err(invalid(rule.id, "tiered rule has no tiers"))
        }
        DeductionMethod::Tiered { tiers } => {
            match tiers
                .iter()
                .find(|t| t.fixed_amount.is_none() && t.percentage.is_none())
            {
                Some(tier) => Err(invalid(
                    rule.id,
                    format!(
                        "tier from {} has neither fixed_amount nor percentage",
                        tier.amount_from
                    ),
                )),
                None => Ok(()),
            }
        }
        DeductionMethod::Conditional { conditions } if conditions.is_empty() => {
            Err(invalid(rule.id, "conditional rule has no conditions"))
        }
        _ => Ok(()),
    }
}

/// Evaluates every applicable rule against a payroll.
fn breakdown_in(
    ledger: &Ledger,
    scale: u32,
    payroll_id: Uuid,
    as_of: NaiveDate,
) -> PayrollResult<DeductionBreakdown> {
    let payroll = ledger.payroll(payroll_id)?;
    let employee = ledger.employee(&payroll.employee_id)?;
    let ctx = DeductionContext {
        employee,
        payroll,
        as_of,
    };

    let mut deductions = Vec::new();
    for rule in ledger
        .deduction_rules
        .iter()
        .filter(|r| r.applies_to(employee, as_of))
    {
        let result = evaluate_deduction_rule(rule, &ctx, scale, deductions.len() as u32 + 1)?;
        if result.amount > Decimal::ZERO {
            deductions.push(result);
        }
    }

    let total = deductions.iter().map(|d| d.amount).sum();
    Ok(DeductionBreakdown {
        payroll_id,
        deductions,
        total,
    })
}

fn record_in(
    ledger: &mut Ledger,
    scale: u32,
    payroll_id: Uuid,
    as_of: NaiveDate,
) -> PayrollResult<Vec<PayrollDeduction>> {
    let status = ledger.payroll(payroll_id)?.status;
    if status == PayrollStatus::Cancelled {
        return Err(PayrollError::NotEditable {
            entity: "payroll",
            id: payroll_id,
            status: status.as_str().to_string(),
        });
    }

    let breakdown = breakdown_in(ledger, scale, payroll_id, as_of)?;
    let now = Utc::now();
    let mut recorded = Vec::new();

    for result in breakdown.deductions {
        let already_recorded = ledger.payroll_deductions.iter().any(|d| {
            d.payroll_id == payroll_id
                && d.rule_id == result.rule_id
                && d.status != DeductionStatus::Rejected
        });
        if already_recorded {
            continue;
        }

        let deduction = PayrollDeduction {
            id: Uuid::new_v4(),
            payroll_id,
            rule_id: result.rule_id,
            amount: result.amount,
            status: if result.requires_approval {
                DeductionStatus::Pending
            } else {
                DeductionStatus::Approved
            },
            reviewed_by: None,
            notes: None,
            created_at: now,
        };
        ledger.payroll_deductions.push(deduction.clone());
        recorded.push(deduction);
    }
    Ok(recorded)
}

fn review(
    ledger: &mut Ledger,
    deduction_id: Uuid,
    next: DeductionStatus,
    reviewer: &str,
    notes: Option<String>,
) -> PayrollResult<PayrollDeduction> {
    let deduction = ledger.payroll_deduction_mut(deduction_id)?;
    if deduction.status != DeductionStatus::Pending {
        return Err(PayrollError::InvalidTransition {
            entity: "payroll deduction",
            id: deduction_id,
            from: deduction.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    deduction.status = next;
    deduction.reviewed_by = Some(reviewer.to_string());
    deduction.notes = notes;
    Ok(deduction.clone())
}

impl PayrollEngine {
    /// Validates and stores a new deduction rule.
    pub fn create_rule(&mut self, draft: DeductionRuleDraft) -> PayrollResult<DeductionRule> {
        let rule = DeductionRule::from_draft(draft);
        validate_rule(&rule)?;

        let stored = rule.clone();
        self.store.transaction(|ledger| {
            ledger.deduction_rules.push(stored);
            Ok(())
        })?;

        info!(rule_id = %rule.id, name = %rule.name, method = rule.method.as_str(), "Deduction rule created");
        Ok(rule)
    }

    /// Stores a template after validating each of its rule drafts.
    pub fn create_template(
        &mut self,
        name: &str,
        description: Option<String>,
        rules: Vec<DeductionRuleDraft>,
    ) -> PayrollResult<DeductionTemplate> {
        for draft in &rules {
            validate_rule(&DeductionRule::from_draft(draft.clone()))?;
        }

        let template = DeductionTemplate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description,
            rules,
        };
        let stored = template.clone();
        self.store.transaction(|ledger| {
            ledger.deduction_templates.insert(stored.id, stored);
            Ok(())
        })?;

        info!(template_id = %template.id, name, rules = template.rules.len(), "Deduction template created");
        Ok(template)
    }

    /// Creates the template's rules for each employee, scoped to the
    /// employee's category.
    ///
    /// Each employee runs in its own transaction; failures are collected.
    pub fn apply_template(
        &mut self,
        template_id: Uuid,
        employee_ids: &[String],
    ) -> PayrollResult<TemplateApplicationReport> {
        let template = self
            .ledger()
            .deduction_templates
            .get(&template_id)
            .cloned()
            .ok_or(PayrollError::NotFound {
                entity: "deduction template",
                id: template_id,
            })?;

        let mut report = TemplateApplicationReport {
            template_id,
            applied: Vec::new(),
            failed: Vec::new(),
        };

        for employee_id in employee_ids {
            let result = self.store.transaction(|ledger| {
                let category = ledger.employee(employee_id)?.category.clone();
                let mut rule_ids = Vec::new();
                for draft in &template.rules {
                    let mut rule = DeductionRule::from_draft(draft.clone());
                    rule.category = category.clone();
                    rule_ids.push(rule.id);
                    ledger.deduction_rules.push(rule);
                }
                Ok(rule_ids)
            });

            match result {
                Ok(rule_ids) => report.applied.push(TemplateApplication {
                    employee_id: employee_id.clone(),
                    rule_ids,
                }),
                Err(error) => {
                    warn!(employee_id = %employee_id, template_id = %template_id, error = %error, "Template application failed");
                    report
                        .failed
                        .push(BatchIssue::new(self.ledger(), employee_id, &error));
                }
            }
        }

        info!(
            template_id = %template_id,
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Deduction template applied"
        );
        Ok(report)
    }

    /// Evaluates the applicable rules against a payroll without recording
    /// anything.
    pub fn calculate_deductions(&self, payroll_id: Uuid, as_of: NaiveDate) -> PayrollResult<DeductionBreakdown> {
        breakdown_in(self.ledger(), self.scale(), payroll_id, as_of)
    }

    /// Records rule deductions for each payroll.
    ///
    /// Deductions are `pending` when the rule requires approval and
    /// `approved` otherwise. A rule already recorded for a payroll and not
    /// rejected is not recorded again.
    pub fn process_bulk_deductions(&mut self, payroll_ids: &[Uuid], as_of: NaiveDate) -> BulkDeductionReport {
        let scale = self.scale();
        let mut report = BulkDeductionReport::default();

        for payroll_id in payroll_ids {
            let result = self
                .store
                .transaction(|ledger| record_in(ledger, scale, *payroll_id, as_of));

            match result {
                Ok(recorded) => {
                    report.processed += 1;
                    report.details.push(BulkDeductionDetail {
                        payroll_id: *payroll_id,
                        recorded,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(payroll_id = %payroll_id, error = %error, "Deduction processing failed");
                    report.failed += 1;
                    report.details.push(BulkDeductionDetail {
                        payroll_id: *payroll_id,
                        recorded: Vec::new(),
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        info!(processed = report.processed, failed = report.failed, "Bulk deductions processed");
        report
    }

    /// Approves a pending deduction.
    pub fn approve_deduction(&mut self, deduction_id: Uuid, reviewer: &str) -> PayrollResult<PayrollDeduction> {
        let deduction = self.store.transaction(|ledger| {
            review(ledger, deduction_id, DeductionStatus::Approved, reviewer, None)
        })?;
        info!(deduction_id = %deduction_id, reviewer, "Deduction approved");
        Ok(deduction)
    }

    /// Rejects a pending deduction.
    pub fn reject_deduction(
        &mut self,
        deduction_id: Uuid,
        reviewer: &str,
        notes: Option<String>,
    ) -> PayrollResult<PayrollDeduction> {
        let deduction = self.store.transaction(|ledger| {
            review(ledger, deduction_id, DeductionStatus::Rejected, reviewer, notes)
        })?;
        info!(deduction_id = %deduction_id, reviewer, "Deduction rejected");
        Ok(deduction)
    }

    /// Returns the deductions recorded against a payroll.
    pub fn deductions_for(&self, payroll_id: Uuid) -> Vec<&PayrollDeduction> {
        self.ledger()
            .payroll_deductions
            .iter()
            .filter(|d| d.payroll_id == payroll_id)
            .collect()
    }
}
