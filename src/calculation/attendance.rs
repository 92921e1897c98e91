//! Attendance summary from approved timesheets.
//!
//! Only manager-approved timesheets dated inside the payroll month count.
//! A day counts as worked when its regular plus overtime hours are positive.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AuditStep, PayrollMonth, Timesheet};

/// The attendance figures a payroll is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Number of approved timesheets considered.
    pub approved_timesheets: usize,
    /// Days with hours recorded.
    pub days_worked: u32,
    /// Sum of regular hours.
    pub total_hours: Decimal,
    /// Sum of overtime hours.
    pub overtime_hours: Decimal,
    /// The audit step recording the summary.
    pub audit_step: AuditStep,
}

/// Summarises an employee's payable timesheets for a month.
///
/// Timesheets outside `month`, or not yet manager-approved, are ignored. The
/// caller filters by employee.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::summarize_attendance;
/// use payroll_engine::models::{PayrollMonth, Timesheet, TimesheetStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let month = PayrollMonth::new(2026, 2).unwrap();
/// let timesheets = vec![Timesheet {
///     id: "ts_001".to_string(),
///     employee_id: "emp_001".to_string(),
///     date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
///     hours_worked: Decimal::new(8, 0),
///     overtime_hours: Decimal::new(2, 0),
///     status: TimesheetStatus::ManagerApproved,
/// }];
///
/// let summary = summarize_attendance(&timesheets, month, 1);
/// assert_eq!(summary.days_worked, 1);
/// assert_eq!(summary.overtime_hours, Decimal::new(2, 0));
/// ```
pub fn summarize_attendance(
    timesheets: &[Timesheet],
    month: PayrollMonth,
    step_number: u32,
) -> AttendanceSummary {
    let payable: Vec<&Timesheet> = timesheets
        .iter()
        .filter(|t| t.is_payable() && month.contains(t.date))
        .collect();

    let days_worked = payable
        .iter()
        .filter(|t| t.total_hours() > Decimal::ZERO)
        .count() as u32;
    let total_hours: Decimal = payable.iter().map(|t| t.hours_worked).sum();
    let overtime_hours: Decimal = payable.iter().map(|t| t.overtime_hours).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "attendance_summary".to_string(),
        rule_name: "Attendance Summary".to_string(),
        input: serde_json::json!({
            "month": month.to_string(),
            "timesheets_supplied": timesheets.len(),
            "approved_in_month": payable.len()
        }),
        output: serde_json::json!({
            "days_worked": days_worked,
            "total_hours": total_hours.normalize().to_string(),
            "overtime_hours": overtime_hours.normalize().to_string()
        }),
        reasoning: format!(
            "{} manager-approved timesheets in {}: {} days worked, {} regular hours, {} overtime hours",
            payable.len(),
            month,
            days_worked,
            total_hours.normalize(),
            overtime_hours.normalize()
        ),
    };

    AttendanceSummary {
        approved_timesheets: payable.len(),
        days_worked,
        total_hours,
        overtime_hours,
        audit_step,
    }
}
