//! Employee model and related types.
//!
//! This module defines the Employee struct together with the compensation
//! configuration the payroll pipeline reads from it.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, PayrollResult};

/// Represents the employment status of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Currently employed and included in payroll runs.
    Active,
    /// Temporarily not on payroll.
    Inactive,
    /// On extended leave.
    OnLeave,
    /// Has resigned and is being settled.
    Resigned,
    /// Employment has been terminated.
    Terminated,
}

/// Represents the type of employment arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    /// Full-time employment.
    FullTime,
    /// Part-time employment.
    PartTime,
    /// Fixed-term contract.
    Contract,
}

impl EmploymentType {
    /// Returns the snake_case name used in configuration and conditions.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::Contract => "contract",
        }
    }
}

/// Fixed monthly allowances paid on top of basic salary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowances {
    /// Food allowance per month.
    #[serde(default)]
    pub food: Decimal,
    /// Housing allowance per month.
    #[serde(default)]
    pub housing: Decimal,
    /// Transport allowance per month.
    #[serde(default)]
    pub transport: Decimal,
}

impl Allowances {
    /// Returns the sum of all monthly allowances.
    pub fn total(&self) -> Decimal {
        self.food + self.housing + self.transport
    }
}

/// How overtime hours are paid for an employee.
///
/// A fixed rate wins over a multiplier; with neither set, the configured
/// default multiplier applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeTerms {
    /// Multiplier on the hourly rate (e.g. 1.5).
    #[serde(default)]
    pub multiplier: Option<Decimal>,
    /// Fixed amount paid per overtime hour.
    #[serde(default)]
    pub fixed_rate: Option<Decimal>,
}

/// Represents an employee on the payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name used in reports and error lists.
    pub full_name: String,
    /// The employment status.
    pub status: EmployeeStatus,
    /// Category used to select deduction and tax rules.
    #[serde(default = "default_category")]
    pub category: String,
    /// Department name.
    #[serde(default)]
    pub department: Option<String>,
    /// Position or designation.
    #[serde(default)]
    pub position: Option<String>,
    /// The type of employment arrangement.
    pub employment_type: EmploymentType,
    /// The date the employee joined.
    pub joining_date: NaiveDate,
    /// Monthly basic salary.
    pub basic_salary: Decimal,
    /// Monthly allowances.
    #[serde(default)]
    pub allowances: Allowances,
    /// Contract working days per month.
    pub contract_days_per_month: u32,
    /// Contract working hours per day.
    pub contract_hours_per_day: Decimal,
    /// Overtime payment terms.
    #[serde(default)]
    pub overtime: OvertimeTerms,
}

fn default_category() -> String {
    "all".to_string()
}

impl Employee {
    /// Returns true if the employee takes part in payroll runs.
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    /// Checks the compensation fields the payroll pipeline divides by.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{Employee, EmployeeStatus, EmploymentType};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let mut employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     full_name: "Sara Malik".to_string(),
    ///     status: EmployeeStatus::Active,
    ///     category: "all".to_string(),
    ///     department: None,
    ///     position: None,
    ///     employment_type: EmploymentType::FullTime,
    ///     joining_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
    ///     basic_salary: Decimal::new(3000, 0),
    ///     allowances: Default::default(),
    ///     contract_days_per_month: 30,
    ///     contract_hours_per_day: Decimal::new(8, 0),
    ///     overtime: Default::default(),
    /// };
    /// assert!(employee.validate_compensation().is_ok());
    ///
    /// employee.basic_salary = Decimal::ZERO;
    /// assert!(employee.validate_compensation().is_err());
    /// ```
    pub fn validate_compensation(&self) -> PayrollResult<()> {
        if self.basic_salary <= Decimal::ZERO {
            return Err(PayrollError::InvalidEmployee {
                field: "basic_salary".to_string(),
                message: format!("Employee {} has no base salary configured", self.full_name),
            });
        }
        if self.contract_days_per_month == 0 {
            return Err(PayrollError::InvalidEmployee {
                field: "contract_days_per_month".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.contract_hours_per_day <= Decimal::ZERO {
            return Err(PayrollError::InvalidEmployee {
                field: "contract_hours_per_day".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns whole years of service completed on `as_of`.
    pub fn years_of_service(&self, as_of: NaiveDate) -> u32 {
        let mut years = as_of.year() - self.joining_date.year();
        if (as_of.month(), as_of.day()) < (self.joining_date.month(), self.joining_date.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }

    /// Returns true when the employee falls under a rule's category selector.
    pub fn matches_category(&self, category: &str) -> bool {
        category == "all" || category == self.category
    }
}
