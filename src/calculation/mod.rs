//! Calculation logic for the payroll engine.
//!
//! This module contains the pure calculation functions the services compose:
//! attendance summaries, pro-rated earnings, overtime, advance repayment
//! schedules and deductions, deduction and tax rule evaluation, and the
//! end-of-service components of a final settlement.
//!
//! Every function that contributes to an amount returns an
//! [`AuditStep`](crate::models::AuditStep) alongside it.

mod advance_deduction;
mod attendance;
mod deduction_rules;
mod earnings;
mod overtime;
mod repayment_schedule;
mod rounding;
mod settlement;
mod tax;

pub use advance_deduction::{
    AdvanceDeductionLine, AdvanceDeductionResult, calculate_advance_deductions,
};
pub use attendance::{AttendanceSummary, summarize_attendance};
pub use deduction_rules::{
    DeductionContext, DeductionResult, evaluate_condition, evaluate_deduction_rule,
};
pub use earnings::{
    PayTotals, ProratedAmount, calculate_allowances, calculate_base_salary, calculate_pay_totals,
};
pub use overtime::{OvertimeRateSource, OvertimeResult, calculate_overtime, hourly_rate};
pub use repayment_schedule::{RepaymentPlan, build_repayment_plan, monthly_installment};
pub use rounding::round_money;
pub use settlement::{
    ServicePeriod, SettlementComponent, calculate_gratuity, calculate_leave_encashment,
    calculate_notice_recovery, service_period,
};
pub use tax::{TaxResult, calculate_tax, progressive_tax};
