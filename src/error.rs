//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every error condition the calculation and service layers can raise.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PayrollMonth;

/// The main error type for the payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::PayrollError;
///
/// let error = PayrollError::ConfigNotFound {
///     path: "/missing/policy.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/policy.yaml");
/// ```
#[derive(Debug, Error)]
pub enum PayrollError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// No employee exists with the given id.
    #[error("Employee not found: {id}")]
    EmployeeNotFound {
        /// The employee id that was looked up.
        id: String,
    },

    /// An employee record was invalid or contained inconsistent data.
    #[error("Invalid employee field '{field}': {message}")]
    InvalidEmployee {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A payroll already exists for the employee and month.
    #[error("Payroll already exists for employee '{employee_id}' for {month}")]
    PayrollAlreadyExists {
        /// The employee id.
        employee_id: String,
        /// The payroll month.
        month: PayrollMonth,
    },

    /// The employee has no manager-approved timesheets in the month.
    #[error("No approved timesheets found for employee '{employee_id}' for {month}")]
    NoApprovedTimesheets {
        /// The employee id.
        employee_id: String,
        /// The payroll month.
        month: PayrollMonth,
    },

    /// An entity lookup by id failed.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity ("payroll", "advance", ...).
        entity: &'static str,
        /// The id that was looked up.
        id: Uuid,
    },

    /// A lifecycle transition is not allowed from the current status.
    #[error("Cannot move {entity} '{id}' from '{from}' to '{to}'")]
    InvalidTransition {
        /// The kind of entity.
        entity: &'static str,
        /// The id of the entity.
        id: Uuid,
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },

    /// A request carried a value outside its allowed range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidRequest {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// An entity can only be modified while it is still pending.
    #[error("Cannot modify {entity} '{id}' in status '{status}'")]
    NotEditable {
        /// The kind of entity.
        entity: &'static str,
        /// The id of the entity.
        id: Uuid,
        /// The current status.
        status: String,
    },

    /// A salary advance request would push outstanding advances over the limit.
    #[error(
        "Total advance amount cannot exceed {limit} (outstanding {outstanding}, requested {requested})"
    )]
    AdvanceLimitExceeded {
        /// The amount requested.
        requested: Decimal,
        /// Outstanding balance on existing advances.
        outstanding: Decimal,
        /// The maximum total allowed.
        limit: Decimal,
    },

    /// A loan request would push the debt-to-income ratio over the limit.
    #[error("Debt-to-income ratio {ratio} exceeds the limit of {limit}")]
    DebtToIncomeExceeded {
        /// The ratio the loan would produce.
        ratio: Decimal,
        /// The configured maximum ratio.
        limit: Decimal,
    },

    /// A repayment is larger than the remaining balance.
    #[error("Repayment of {amount} exceeds remaining balance {remaining} on advance '{advance_id}'")]
    RepaymentExceedsBalance {
        /// The advance id.
        advance_id: Uuid,
        /// The attempted repayment.
        amount: Decimal,
        /// The balance left on the advance.
        remaining: Decimal,
    },

    /// A rule is missing the data its calculation method needs.
    #[error("Invalid rule '{rule_id}': {message}")]
    InvalidRule {
        /// The rule id.
        rule_id: Uuid,
        /// What is wrong with the rule.
        message: String,
    },

    /// A deduction condition cannot be evaluated.
    #[error("Invalid condition on field '{field}': {message}")]
    InvalidCondition {
        /// The field the condition reads.
        field: String,
        /// Why the condition cannot be evaluated.
        message: String,
    },

    /// The employee already has a final settlement.
    #[error("Final settlement already exists for employee '{employee_id}'")]
    SettlementAlreadyExists {
        /// The employee id.
        employee_id: String,
    },

    /// No payrolls exist to build a tax document from.
    #[error("No payroll records found for employee '{employee_id}' in tax year {year}")]
    NoPayrollsForTaxYear {
        /// The employee id.
        employee_id: String,
        /// The tax year.
        year: i32,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl PayrollError {
    /// Returns true for the two pre-checks that make a batch skip an employee
    /// rather than count it as a failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            PayrollError::PayrollAlreadyExists { .. } | PayrollError::NoApprovedTimesheets { .. }
        )
    }
}

/// A type alias for Results that return PayrollError.
pub type PayrollResult<T> = Result<T, PayrollError>;
