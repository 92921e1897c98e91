//! In-memory persistence for the payroll engine.
//!
//! The [`Ledger`] holds every entity the engine reads and writes. Writes go
//! through [`PayrollStore::transaction`], which runs a closure against a
//! working copy of the ledger and only commits it when the closure returns
//! `Ok`. A failed operation therefore leaves no partial state behind.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    Advance, Bonus, DeductionRule, DeductionTemplate, Employee, FinalSettlement, Payroll,
    PayrollDeduction, PayrollItem, PayrollMonth, PayrollRun, PayrollStatus, TaxDocument, TaxRule,
    Timesheet,
};

/// All persisted payroll entities.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Employees by id.
    pub employees: HashMap<String, Employee>,
    /// Timesheets in insertion order.
    pub timesheets: Vec<Timesheet>,
    /// Payrolls by id.
    pub payrolls: HashMap<Uuid, Payroll>,
    /// The append-only payroll item ledger.
    pub payroll_items: Vec<PayrollItem>,
    /// Batch runs by id.
    pub payroll_runs: HashMap<Uuid, PayrollRun>,
    /// Bonuses awaiting or included in payroll.
    pub bonuses: Vec<Bonus>,
    /// Advances and loans by id.
    pub advances: HashMap<Uuid, Advance>,
    /// Deduction rules in evaluation order.
    pub deduction_rules: Vec<DeductionRule>,
    /// Deduction templates by id.
    pub deduction_templates: HashMap<Uuid, DeductionTemplate>,
    /// Deductions recorded against payrolls.
    pub payroll_deductions: Vec<PayrollDeduction>,
    /// Tax rules in evaluation order.
    pub tax_rules: Vec<TaxRule>,
    /// Tax documents by id.
    pub tax_documents: HashMap<Uuid, TaxDocument>,
    /// Final settlements by id.
    pub settlements: HashMap<Uuid, FinalSettlement>,
}

impl Ledger {
    /// Looks up an employee.
    pub fn employee(&self, id: &str) -> PayrollResult<&Employee> {
        self.employees
            .get(id)
            .ok_or_else(|| PayrollError::EmployeeNotFound { id: id.to_string() })
    }

    /// Looks up an employee for update.
    pub fn employee_mut(&mut self, id: &str) -> PayrollResult<&mut Employee> {
        self.employees
            .get_mut(id)
            .ok_or_else(|| PayrollError::EmployeeNotFound { id: id.to_string() })
    }

    /// Looks up a payroll.
    pub fn payroll(&self, id: Uuid) -> PayrollResult<&Payroll> {
        self.payrolls
            .get(&id)
            .ok_or(PayrollError::NotFound { entity: "payroll", id })
    }

    /// Looks up a payroll for update.
    pub fn payroll_mut(&mut self, id: Uuid) -> PayrollResult<&mut Payroll> {
        self.payrolls
            .get_mut(&id)
            .ok_or(PayrollError::NotFound { entity: "payroll", id })
    }

    /// Finds the live payroll for an employee and month. Cancelled payrolls
    /// are ignored.
    pub fn find_payroll(&self, employee_id: &str, month: PayrollMonth) -> Option<&Payroll> {
        self.payrolls.values().find(|p| {
            p.employee_id == employee_id
                && p.month == month
                && p.status != PayrollStatus::Cancelled
        })
    }

    /// Returns the ledger lines of a payroll in recording order.
    pub fn items_for(&self, payroll_id: Uuid) -> Vec<&PayrollItem> {
        self.payroll_items
            .iter()
            .filter(|i| i.payroll_id == payroll_id)
            .collect()
    }

    /// Looks up a batch run for update.
    pub fn run_mut(&mut self, id: Uuid) -> PayrollResult<&mut PayrollRun> {
        self.payroll_runs
            .get_mut(&id)
            .ok_or(PayrollError::NotFound { entity: "payroll run", id })
    }

    /// Looks up an advance.
    pub fn advance(&self, id: Uuid) -> PayrollResult<&Advance> {
        self.advances
            .get(&id)
            .ok_or(PayrollError::NotFound { entity: "advance", id })
    }

    /// Looks up an advance for update.
    pub fn advance_mut(&mut self, id: Uuid) -> PayrollResult<&mut Advance> {
        self.advances
            .get_mut(&id)
            .ok_or(PayrollError::NotFound { entity: "advance", id })
    }

    /// Returns an employee's advances, oldest request first.
    pub fn advances_for(&self, employee_id: &str) -> Vec<&Advance> {
        let mut advances: Vec<&Advance> = self
            .advances
            .values()
            .filter(|a| a.employee_id == employee_id)
            .collect();
        advances.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        advances
    }

    /// Looks up a deduction rule.
    pub fn deduction_rule(&self, id: Uuid) -> PayrollResult<&DeductionRule> {
        self.deduction_rules
            .iter()
            .find(|r| r.id == id)
            .ok_or(PayrollError::NotFound {
                entity: "deduction rule",
                id,
            })
    }

    /// Looks up a recorded deduction for update.
    pub fn payroll_deduction_mut(&mut self, id: Uuid) -> PayrollResult<&mut PayrollDeduction> {
        self.payroll_deductions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(PayrollError::NotFound {
                entity: "payroll deduction",
                id,
            })
    }

    /// Looks up a settlement.
    pub fn settlement(&self, id: Uuid) -> PayrollResult<&FinalSettlement> {
        self.settlements
            .get(&id)
            .ok_or(PayrollError::NotFound { entity: "settlement", id })
    }

    /// Looks up a settlement for update.
    pub fn settlement_mut(&mut self, id: Uuid) -> PayrollResult<&mut FinalSettlement> {
        self.settlements
            .get_mut(&id)
            .ok_or(PayrollError::NotFound { entity: "settlement", id })
    }
}

/// Owns the ledger and applies writes atomically.
///
/// # Example
///
/// ```
/// use payroll_engine::error::PayrollError;
/// use payroll_engine::store::PayrollStore;
///
/// let mut store = PayrollStore::default();
/// let result: Result<(), PayrollError> = store.transaction(|ledger| {
///     ledger.timesheets.clear();
///     Err(PayrollError::CalculationError { message: "abort".to_string() })
/// });
///
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PayrollStore {
    ledger: Ledger,
}

impl PayrollStore {
    /// Creates a store around an existing ledger.
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Read access to the committed ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs `f` against a working copy and commits it only on success.
    ///
    /// The working copy is a full clone of the ledger, so each call costs time
    /// proportional to everything stored. Batch operations open one
    /// transaction per employee; keep that in mind when sizing a single
    /// in-memory ledger.
    pub fn transaction<T, F>(&mut self, f: F) -> PayrollResult<T>
    where
        F: FnOnce(&mut Ledger) -> PayrollResult<T>,
    {
        let mut working = self.ledger.clone();
        let value = f(&mut working)?;
        self.ledger = working;
        Ok(value)
    }

    /// Adds or replaces an employee.
    pub fn upsert_employee(&mut self, employee: Employee) {
        self.ledger.employees.insert(employee.id.clone(), employee);
    }

    /// Adds a timesheet.
    pub fn add_timesheet(&mut self, timesheet: Timesheet) {
        self.ledger.timesheets.push(timesheet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmployeeStatus, EmploymentType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn create_employee(id: &str) -> Employee {
        Employee {
            id: id.to_string(),
            full_name: "Omar Haddad".to_string(),
            status: EmployeeStatus::Active,
            category: "all".to_string(),
            department: None,
            position: None,
            employment_type: EmploymentType::FullTime,
            joining_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            basic_salary: Decimal::new(4000, 0),
            allowances: Default::default(),
            contract_days_per_month: 30,
            contract_hours_per_day: Decimal::new(8, 0),
            overtime: Default::default(),
        }
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let mut store = PayrollStore::default();

        store
            .transaction(|ledger| {
                ledger
                    .employees
                    .insert("emp_001".to_string(), create_employee("emp_001"));
                Ok(())
            })
            .unwrap();

        assert!(store.ledger().employee("emp_001").is_ok());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut store = PayrollStore::default();
        store.upsert_employee(create_employee("emp_001"));

        let result: PayrollResult<()> = store.transaction(|ledger| {
            ledger.employee_mut("emp_001")?.status = EmployeeStatus::Resigned;
            ledger.employee_mut("emp_404")?;
            Ok(())
        });

        assert!(matches!(result, Err(PayrollError::EmployeeNotFound { .. })));
        assert_eq!(
            store.ledger().employee("emp_001").unwrap().status,
            EmployeeStatus::Active
        );
    }

    #[test]
    fn test_missing_entities_report_kind() {
        let ledger = Ledger::default();
        let id = Uuid::new_v4();

        match ledger.advance(id) {
            Err(PayrollError::NotFound { entity, id: missing }) => {
                assert_eq!(entity, "advance");
                assert_eq!(missing, id);
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
