//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod advance;
mod audit;
mod deduction;
mod employee;
mod pay_month;
mod payroll;
mod settlement;
mod tax;
mod timesheet;

pub use advance::{Advance, AdvanceKind, AdvanceStatus, Installment, Repayment};
pub use audit::{AuditStep, AuditTrace, AuditWarning};
pub use deduction::{
    BaseAmount, Condition, ConditionField, ConditionOperator, DeductionMethod, DeductionRule,
    DeductionRuleDraft, DeductionStatus, DeductionTemplate, PayrollDeduction, Tier,
};
pub use employee::{Allowances, Employee, EmployeeStatus, EmploymentType, OvertimeTerms};
pub use pay_month::PayrollMonth;
pub use payroll::{
    Bonus, PaymentDetails, Payroll, PayrollItem, PayrollItemType, PayrollRun, PayrollStatus,
    RunStatus,
};
pub use settlement::{FinalSettlement, SettlementAdjustment, SettlementRequest, SettlementStatus};
pub use tax::{MonthlyTaxSummary, TaxBracket, TaxDocument, TaxMethod, TaxRule};
pub use timesheet::{Timesheet, TimesheetStatus};
