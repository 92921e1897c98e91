//! Payroll workflows built on the calculation functions and the store.
//!
//! [`PayrollEngine`] owns the configuration and the [`PayrollStore`]. Its
//! operations are grouped by area, one `impl` block per submodule:
//!
//! - [`payroll`]: generation, batch runs, approval, payment and cancellation
//! - [`deductions`]: deduction rules, templates and recorded deductions
//! - [`tax`]: tax calculation, reports, year-end adjustments and documents
//! - [`advances`]: salary advances and loans
//! - [`settlement`]: final settlements
//!
//! Every mutating operation runs in one store transaction. Batch operations
//! run one transaction per employee and collect failures instead of stopping.

pub mod advances;
pub mod deductions;
pub mod payroll;
pub mod settlement;
pub mod tax;

use serde::{Deserialize, Serialize};

use crate::config::PayrollConfig;
use crate::error::PayrollError;
use crate::models::{Employee, Timesheet};
use crate::store::{Ledger, PayrollStore};

pub use advances::{
    AdvanceRequest, AdvanceStatistics, AdvanceUpdate, DueInstallment, LoanRequest,
};
pub use deductions::{
    BulkDeductionDetail, BulkDeductionReport, DeductionBreakdown, TemplateApplication,
    TemplateApplicationReport,
};
pub use payroll::{BatchReport, RunOutcome};
pub use settlement::{SettlementReport, SettlementSummaryRow};
pub use tax::{
    AdjustmentType, EmployeeTaxSummary, TaxCalculation, TaxDocumentBatch, TaxReport,
    YearEndAdjustment,
};

/// An employee a batch operation skipped or failed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchIssue {
    /// The employee id.
    pub employee_id: String,
    /// The employee's name, for reports.
    pub employee_name: String,
    /// The error message.
    pub reason: String,
}

impl BatchIssue {
    pub(crate) fn new(ledger: &Ledger, employee_id: &str, error: &PayrollError) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            employee_name: ledger
                .employees
                .get(employee_id)
                .map(|e| e.full_name.clone())
                .unwrap_or_default(),
            reason: error.to_string(),
        }
    }
}

/// The payroll engine: configuration plus persisted state.
///
/// # Example
///
/// ```
/// use payroll_engine::config::PayrollConfig;
/// use payroll_engine::services::PayrollEngine;
///
/// let engine = PayrollEngine::new(PayrollConfig::default());
/// assert!(engine.ledger().payrolls.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PayrollEngine {
    config: PayrollConfig,
    store: PayrollStore,
}

impl PayrollEngine {
    /// Creates an engine with an empty ledger seeded with the configured rules.
    pub fn new(config: PayrollConfig) -> Self {
        let ledger = Ledger {
            deduction_rules: config.deduction_rules().to_vec(),
            tax_rules: config.tax_rules().to_vec(),
            ..Ledger::default()
        };
        Self::with_store(config, PayrollStore::with_ledger(ledger))
    }

    /// Creates an engine over an existing store.
    pub fn with_store(config: PayrollConfig, store: PayrollStore) -> Self {
        Self { config, store }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Returns the committed ledger.
    pub fn ledger(&self) -> &Ledger {
        self.store.ledger()
    }

    /// Adds or replaces an employee.
    pub fn add_employee(&mut self, employee: Employee) {
        self.store.upsert_employee(employee);
    }

    /// Adds timesheets.
    pub fn add_timesheets<I: IntoIterator<Item = Timesheet>>(&mut self, timesheets: I) {
        for timesheet in timesheets {
            self.store.add_timesheet(timesheet);
        }
    }

    fn scale(&self) -> u32 {
        self.config.policy().rounding.scale
    }
}
