//! Tax calculation, reports, year-end adjustments and tax documents.
//!
//! Taxable income is a payroll's gross amount less its approved pre-tax
//! deductions. Every applicable tax rule runs against it and the results
//! are summed.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{TaxResult, calculate_tax, round_money};
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    DeductionStatus, Employee, MonthlyTaxSummary, Payroll, PayrollStatus, TaxDocument, TaxMethod,
    TaxRule,
};
use crate::store::Ledger;

use super::{BatchIssue, PayrollEngine};

/// The taxes owed on one payroll or income figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculation {
    /// The payroll taxed, absent for synthetic annual figures.
    pub payroll_id: Option<Uuid>,
    /// The employee.
    pub employee_id: String,
    /// Gross income before deductions.
    pub gross_income: Decimal,
    /// Approved pre-tax deductions.
    pub pre_tax_deductions: Decimal,
    /// Gross less pre-tax deductions, never negative.
    pub taxable_income: Decimal,
    /// Sum of every rule's tax.
    pub total_tax: Decimal,
    /// One entry per applicable rule.
    pub details: Vec<TaxResult>,
}

/// One payroll's line in a tax report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTaxSummary {
    /// The employee.
    pub employee_id: String,
    /// The employee's name.
    pub employee_name: String,
    /// The payroll.
    pub payroll_id: Uuid,
    /// The date the payroll was paid.
    pub paid_on: NaiveDate,
    /// Gross income.
    pub gross_income: Decimal,
    /// Taxable income.
    pub taxable_income: Decimal,
    /// Tax due.
    pub total_tax: Decimal,
    /// Per-rule results.
    pub details: Vec<TaxResult>,
}

/// Taxes across the payrolls paid in a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReport {
    /// First day of the range.
    pub period_start: NaiveDate,
    /// Last day of the range.
    pub period_end: NaiveDate,
    /// The employee category filtered on, `all` for none.
    pub category: String,
    /// Sum of gross income.
    pub total_gross_income: Decimal,
    /// Sum of taxable income.
    pub total_taxable_income: Decimal,
    /// Sum of tax.
    pub total_tax: Decimal,
    /// Sum of approved rule deductions on the reported payrolls.
    pub total_deductions: Decimal,
    /// One line per payroll, by payment date.
    pub employees: Vec<EmployeeTaxSummary>,
}

/// Which way a year-end adjustment goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// The employee owes more tax.
    AdditionalPayment,
    /// The employee overpaid.
    Refund,
    /// Monthly and annual tax agree.
    None,
}

/// Tax paid over a year compared with tax on the year's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEndAdjustment {
    /// The employee.
    pub employee_id: String,
    /// The tax year.
    pub year: i32,
    /// Payrolls paid in the year.
    pub payroll_count: usize,
    /// Sum of gross income.
    pub total_gross_income: Decimal,
    /// Sum of approved pre-tax deductions.
    pub total_deductions: Decimal,
    /// Sum of monthly tax.
    pub total_tax_paid: Decimal,
    /// Tax on the annual figures.
    pub final_tax: Decimal,
    /// `final_tax - total_tax_paid`.
    pub adjustment_amount: Decimal,
    /// The direction of the adjustment.
    pub adjustment_type: AdjustmentType,
    /// The annual calculation.
    pub calculation: TaxCalculation,
}

/// The outcome of generating tax documents for several employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDocumentBatch {
    /// The tax year.
    pub year: i32,
    /// Documents generated.
    pub generated: Vec<TaxDocument>,
    /// Employees that failed.
    pub failed: Vec<BatchIssue>,
}

fn pre_tax_deductions(ledger: &Ledger, payroll_id: Uuid) -> PayrollResult<Decimal> {
    let mut total = Decimal::ZERO;
    for deduction in ledger
        .payroll_deductions
        .iter()
        .filter(|d| d.payroll_id == payroll_id && d.status == DeductionStatus::Approved)
    {
        if ledger.deduction_rule(deduction.rule_id)?.is_pre_tax {
            total += deduction.amount;
        }
    }
    Ok(total)
}

fn approved_deductions(ledger: &Ledger, payroll_id: Uuid) -> Decimal {
    ledger
        .payroll_deductions
        .iter()
        .filter(|d| d.payroll_id == payroll_id && d.status == DeductionStatus::Approved)
        .map(|d| d.amount)
        .sum()
}

/// Runs every applicable tax rule against an income figure.
fn tax_on_income(
    ledger: &Ledger,
    employee: &Employee,
    gross_income: Decimal,
    pre_tax_deductions: Decimal,
    as_of: NaiveDate,
    scale: u32,
) -> PayrollResult<TaxCalculation> {
    let taxable_income = (gross_income - pre_tax_deductions).max(Decimal::ZERO);

    let mut details = Vec::new();
    for rule in ledger
        .tax_rules
        .iter()
        .filter(|r| r.applies_to(employee, as_of))
    {
        details.push(calculate_tax(rule, taxable_income, scale, details.len() as u32 + 1)?);
    }

    Ok(TaxCalculation {
        payroll_id: None,
        employee_id: employee.id.clone(),
        gross_income,
        pre_tax_deductions,
        taxable_income,
        total_tax: details.iter().map(|d| d.tax).sum(),
        details,
    })
}

fn payroll_tax(ledger: &Ledger, payroll: &Payroll, as_of: NaiveDate, scale: u32) -> PayrollResult<TaxCalculation> {
    let employee = ledger.employee(&payroll.employee_id)?;
    let pre_tax = pre_tax_deductions(ledger, payroll.id)?;
    let mut calculation = tax_on_income(ledger, employee, payroll.gross_amount, pre_tax, as_of, scale)?;
    calculation.payroll_id = Some(payroll.id);
    Ok(calculation)
}

fn validate_tax_rule(rule: &TaxRule) -> PayrollResult<()> {
    let invalid = |message: String| PayrollError::InvalidRule {
        rule_id: rule.id,
        message,
    };
    let in_range = |rate: Decimal| rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED;

    match &rule.method {
        TaxMethod::FlatRate { rate } if !in_range(*rate) => {
            Err(invalid(format!("rate {} is outside 0..=100", rate)))
        }
        TaxMethod::Progressive { brackets } | TaxMethod::ThresholdBased { brackets } => {
            if brackets.is_empty() {
                return Err(invalid(format!("{} rule has no brackets", rule.method.as_str())));
            }
            match brackets.iter().find(|b| !in_range(b.rate)) {
                Some(bracket) => Err(invalid(format!(
                    "bracket from {} has rate {} outside 0..=100",
                    bracket.min_income, bracket.rate
                ))),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// Builds the tax document for one employee and year.
fn document_in(ledger: &mut Ledger, scale: u32, employee_id: &str, year: i32) -> PayrollResult<TaxDocument> {
    ledger.employee(employee_id)?;

    let mut payrolls: Vec<&Payroll> = ledger
        .payrolls
        .values()
        .filter(|p| {
            p.employee_id == employee_id
                && p.month.year() == year
                && p.status != PayrollStatus::Cancelled
        })
        .collect();
    if payrolls.is_empty() {
        return Err(PayrollError::NoPayrollsForTaxYear {
            employee_id: employee_id.to_string(),
            year,
        });
    }
    payrolls.sort_by_key(|p| p.month);

    let mut document = TaxDocument {
        id: Uuid::new_v4(),
        document_number: TaxDocument::document_number_for(employee_id, year),
        employee_id: employee_id.to_string(),
        tax_year: year,
        gross_income: Decimal::ZERO,
        tax_withheld: Decimal::ZERO,
        net_income: Decimal::ZERO,
        total_deductions: Decimal::ZERO,
        overtime_income: Decimal::ZERO,
        bonus_income: Decimal::ZERO,
        advance_deductions: Decimal::ZERO,
        effective_tax_rate: Decimal::ZERO,
        payroll_ids: Vec::new(),
        monthly_breakdown: Vec::new(),
        generated_at: Utc::now(),
    };

    for payroll in payrolls {
        let tax = payroll_tax(ledger, payroll, payroll.month.last_day(), scale)?.total_tax;

        document.gross_income += payroll.gross_amount;
        document.tax_withheld += tax;
        document.net_income += payroll.final_amount;
        document.total_deductions +=
            payroll.deduction_amount + approved_deductions(ledger, payroll.id);
        document.overtime_income += payroll.overtime_amount;
        document.bonus_income += payroll.bonus_amount;
        document.advance_deductions += payroll.advance_deduction;
        document.payroll_ids.push(payroll.id);

        match document.monthly_breakdown.last_mut() {
            Some(summary) if summary.month == payroll.month => {
                summary.gross_income += payroll.gross_amount;
                summary.tax_withheld += tax;
                summary.net_income += payroll.final_amount;
                summary.overtime += payroll.overtime_amount;
                summary.bonus += payroll.bonus_amount;
            }
            _ => document.monthly_breakdown.push(MonthlyTaxSummary {
                month: payroll.month,
                gross_income: payroll.gross_amount,
                tax_withheld: tax,
                net_income: payroll.final_amount,
                overtime: payroll.overtime_amount,
                bonus: payroll.bonus_amount,
            }),
        }
    }

    if document.gross_income > Decimal::ZERO {
        document.effective_tax_rate = round_money(
            document.tax_withheld / document.gross_income * Decimal::ONE_HUNDRED,
            2,
        );
    }

    // One document per employee and year; regenerating replaces it.
    if let Some(existing) = ledger
        .tax_documents
        .values()
        .find(|d| d.employee_id == employee_id && d.tax_year == year)
    {
        document.id = existing.id;
    }
    ledger.tax_documents.insert(document.id, document.clone());
    Ok(document)
}

impl PayrollEngine {
    /// Validates and stores a tax rule.
    pub fn add_tax_rule(&mut self, rule: TaxRule) -> PayrollResult<TaxRule> {
        validate_tax_rule(&rule)?;
        let stored = rule.clone();
        self.store.transaction(|ledger| {
            ledger.tax_rules.push(stored);
            Ok(())
        })?;
        info!(rule_id = %rule.id, name = %rule.name, method = rule.method.as_str(), "Tax rule added");
        Ok(rule)
    }

    /// Calculates the taxes on a payroll as of a date.
    pub fn calculate_taxes(&self, payroll_id: Uuid, as_of: NaiveDate) -> PayrollResult<TaxCalculation> {
        let ledger = self.ledger();
        payroll_tax(ledger, ledger.payroll(payroll_id)?, as_of, self.scale())
    }

    /// Reports taxes on every payroll paid between `start` and `end`
    /// inclusive, optionally limited to one employee category.
    pub fn generate_tax_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<&str>,
    ) -> PayrollResult<TaxReport> {
        if end < start {
            return Err(PayrollError::InvalidRequest {
                field: "period_end".to_string(),
                message: format!("{} is before {}", end, start),
            });
        }

        let ledger = self.ledger();
        let scale = self.scale();
        let category = category.unwrap_or("all");

        let mut paid: Vec<(NaiveDate, &Payroll)> = ledger
            .payrolls
            .values()
            .filter(|p| p.status == PayrollStatus::Paid)
            .filter_map(|p| p.paid_on().map(|date| (date, p)))
            .filter(|(date, _)| *date >= start && *date <= end)
            .collect();
        paid.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.employee_id.cmp(&b.1.employee_id)));

        let mut report = TaxReport {
            period_start: start,
            period_end: end,
            category: category.to_string(),
            total_gross_income: Decimal::ZERO,
            total_taxable_income: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            employees: Vec::new(),
        };

        for (paid_on, payroll) in paid {
            let employee = ledger.employee(&payroll.employee_id)?;
            if category != "all" && employee.category != category {
                continue;
            }
            let calculation = payroll_tax(ledger, payroll, paid_on, scale)?;

            report.total_gross_income += calculation.gross_income;
            report.total_taxable_income += calculation.taxable_income;
            report.total_tax += calculation.total_tax;
            report.total_deductions += approved_deductions(ledger, payroll.id);
            report.employees.push(EmployeeTaxSummary {
                employee_id: employee.id.clone(),
                employee_name: employee.full_name.clone(),
                payroll_id: payroll.id,
                paid_on,
                gross_income: calculation.gross_income,
                taxable_income: calculation.taxable_income,
                total_tax: calculation.total_tax,
                details: calculation.details,
            });
        }
        Ok(report)
    }

    /// Compares the tax paid on each of a year's paid payrolls with the tax
    /// the same rules give on the year's totals.
    pub fn calculate_year_end_adjustments(&self, employee_id: &str, year: i32) -> PayrollResult<YearEndAdjustment> {
        let ledger = self.ledger();
        let scale = self.scale();
        let employee = ledger.employee(employee_id)?;

        let mut payroll_count = 0;
        let mut total_gross = Decimal::ZERO;
        let mut total_deductions = Decimal::ZERO;
        let mut total_tax_paid = Decimal::ZERO;

        for payroll in ledger.payrolls.values().filter(|p| {
            p.employee_id == employee_id
                && p.status == PayrollStatus::Paid
                && p.paid_on().is_some_and(|date| date.year() == year)
        }) {
            let paid_on = payroll.paid_on().unwrap_or(payroll.month.last_day());
            let calculation = payroll_tax(ledger, payroll, paid_on, scale)?;
            payroll_count += 1;
            total_gross += calculation.gross_income;
            total_deductions += calculation.pre_tax_deductions;
            total_tax_paid += calculation.total_tax;
        }

        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| PayrollError::InvalidRequest {
            field: "year".to_string(),
            message: format!("{} is not a valid year", year),
        })?;
        let calculation = tax_on_income(ledger, employee, total_gross, total_deductions, year_end, scale)?;

        let adjustment_amount = calculation.total_tax - total_tax_paid;
        let adjustment_type = if adjustment_amount > Decimal::ZERO {
            AdjustmentType::AdditionalPayment
        } else if adjustment_amount < Decimal::ZERO {
            AdjustmentType::Refund
        } else {
            AdjustmentType::None
        };

        Ok(YearEndAdjustment {
            employee_id: employee_id.to_string(),
            year,
            payroll_count,
            total_gross_income: total_gross,
            total_deductions,
            total_tax_paid,
            final_tax: calculation.total_tax,
            adjustment_amount,
            adjustment_type,
            calculation,
        })
    }

    /// Generates, or regenerates, an employee's tax document for a year
    /// from the year's non-cancelled payrolls.
    pub fn generate_tax_document(&mut self, employee_id: &str, year: i32) -> PayrollResult<TaxDocument> {
        let scale = self.scale();
        let document = self
            .store
            .transaction(|ledger| document_in(ledger, scale, employee_id, year))?;

        info!(
            employee_id,
            year,
            document_number = %document.document_number,
            tax_withheld = %document.tax_withheld,
            "Tax document generated"
        );
        Ok(document)
    }

    /// Generates tax documents for the given employees, or for every active
    /// employee when `employee_ids` is `None`.
    pub fn generate_tax_documents(&mut self, year: i32, employee_ids: Option<&[String]>) -> TaxDocumentBatch {
        let scale = self.scale();
        let mut ids: Vec<String> = match employee_ids {
            Some(ids) => ids.to_vec(),
            None => self
                .ledger()
                .employees
                .values()
                .filter(|e| e.is_active())
                .map(|e| e.id.clone())
                .collect(),
        };
        if employee_ids.is_none() {
            ids.sort();
        }

        let mut batch = TaxDocumentBatch {
            year,
            generated: Vec::new(),
            failed: Vec::new(),
        };
        for employee_id in &ids {
            match self
                .store
                .transaction(|ledger| document_in(ledger, scale, employee_id, year))
            {
                Ok(document) => batch.generated.push(document),
                Err(error) => {
                    warn!(employee_id = %employee_id, year, error = %error, "Tax document generation failed");
                    batch
                        .failed
                        .push(BatchIssue::new(self.ledger(), employee_id, &error));
                }
            }
        }

        info!(year, generated = batch.generated.len(), failed = batch.failed.len(), "Tax documents generated");
        batch
    }

    /// Returns the tax documents for a year ordered by document number.
    pub fn tax_documents(&self, year: i32) -> Vec<&TaxDocument> {
        let mut documents: Vec<&TaxDocument> = self
            .ledger()
            .tax_documents
            .values()
            .filter(|d| d.tax_year == year)
            .collect();
        documents.sort_by(|a, b| a.document_number.cmp(&b.document_number));
        documents
    }
}
