//! Timesheet model and related types.
//!
//! A timesheet is one dated record of hours worked by an employee. Only
//! timesheets that made it through the full approval chain feed payroll.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The approval state of a timesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimesheetStatus {
    /// Initial status when created.
    Draft,
    /// Submitted by the employee.
    Submitted,
    /// Approved by the foreman.
    ForemanApproved,
    /// Approved by the timesheet incharge.
    InchargeApproved,
    /// Approved by the checking incharge.
    CheckingApproved,
    /// Final approval by the manager.
    ManagerApproved,
    /// Rejected at any stage.
    Rejected,
}

/// Represents one day's worked hours for an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timesheet {
    /// Unique identifier for the timesheet.
    pub id: String,
    /// The employee the hours belong to.
    pub employee_id: String,
    /// The date worked.
    pub date: NaiveDate,
    /// Regular hours worked.
    pub hours_worked: Decimal,
    /// Overtime hours worked.
    #[serde(default)]
    pub overtime_hours: Decimal,
    /// The approval state.
    pub status: TimesheetStatus,
}

impl Timesheet {
    /// Returns regular plus overtime hours.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::{Timesheet, TimesheetStatus};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let timesheet = Timesheet {
    ///     id: "ts_001".to_string(),
    ///     employee_id: "emp_001".to_string(),
    ///     date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
    ///     hours_worked: Decimal::new(8, 0),
    ///     overtime_hours: Decimal::new(25, 1),
    ///     status: TimesheetStatus::ManagerApproved,
    /// };
    /// assert_eq!(timesheet.total_hours(), Decimal::new(105, 1));
    /// ```
    pub fn total_hours(&self) -> Decimal {
        self.hours_worked + self.overtime_hours
    }

    /// Returns true if the timesheet counts toward payroll.
    pub fn is_payable(&self) -> bool {
        self.status == TimesheetStatus::ManagerApproved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_timesheet(status: TimesheetStatus) -> Timesheet {
        Timesheet {
            id: "ts_001".to_string(),
            employee_id: "emp_001".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            hours_worked: dec("8"),
            overtime_hours: dec("0"),
            status,
        }
    }

    #[test]
    fn test_only_manager_approved_is_payable() {
        assert!(create_timesheet(TimesheetStatus::ManagerApproved).is_payable());
        assert!(!create_timesheet(TimesheetStatus::CheckingApproved).is_payable());
        assert!(!create_timesheet(TimesheetStatus::Submitted).is_payable());
        assert!(!create_timesheet(TimesheetStatus::Rejected).is_payable());
    }

    #[test]
    fn test_deserialize_timesheet_without_overtime() {
        let json = r#"{
            "id": "ts_002",
            "employee_id": "emp_001",
            "date": "2026-01-16",
            "hours_worked": "7.5",
            "status": "manager_approved"
        }"#;

        let timesheet: Timesheet = serde_json::from_str(json).unwrap();
        assert_eq!(timesheet.overtime_hours, Decimal::ZERO);
        assert_eq!(timesheet.total_hours(), dec("7.5"));
        assert_eq!(timesheet.status, TimesheetStatus::ManagerApproved);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TimesheetStatus::InchargeApproved).unwrap(),
            "\"incharge_approved\""
        );
    }
}
