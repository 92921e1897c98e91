//! Deduction rule, template and recorded deduction models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Employee;

/// Which payroll amount a deduction rule is calculated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseAmount {
    /// The payroll's gross amount.
    #[default]
    Gross,
    /// The payroll's pro-rated base salary.
    Basic,
    /// The payroll's final (net) amount.
    Net,
}

/// One band of a tiered deduction.
///
/// A tier pays its `fixed_amount` when set, otherwise `percentage` of the base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Inclusive lower bound.
    pub amount_from: Decimal,
    /// Inclusive upper bound; open-ended when absent.
    #[serde(default)]
    pub amount_to: Option<Decimal>,
    /// Fixed amount deducted inside this tier.
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    /// Percentage of the base deducted inside this tier.
    #[serde(default)]
    pub percentage: Option<Decimal>,
}

/// The payroll or employee field a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    /// Payroll gross amount.
    GrossAmount,
    /// Payroll base salary.
    BasicSalary,
    /// Employee department.
    Department,
    /// Employee position.
    Position,
    /// Employee employment type.
    EmploymentType,
    /// Whole years since the employee joined.
    YearsOfService,
}

impl ConditionField {
    /// Returns the snake_case name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionField::GrossAmount => "gross_amount",
            ConditionField::BasicSalary => "basic_salary",
            ConditionField::Department => "department",
            ConditionField::Position => "position",
            ConditionField::EmploymentType => "employment_type",
            ConditionField::YearsOfService => "years_of_service",
        }
    }
}

/// Comparison operator used by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Equal.
    #[serde(rename = "=")]
    Eq,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Lte,
    /// Member of a list.
    #[serde(rename = "in")]
    In,
    /// Not a member of a list.
    #[serde(rename = "not_in")]
    NotIn,
}

/// A condition of a conditional deduction.
///
/// When the condition holds it contributes `amount`, or `percentage` of the
/// payroll's gross amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// The field compared.
    pub field: ConditionField,
    /// The comparison operator.
    pub operator: ConditionOperator,
    /// The value compared against: a number, a string or a list of strings.
    pub value: serde_json::Value,
    /// Fixed amount contributed when the condition holds.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Percentage of gross contributed when the condition holds.
    #[serde(default)]
    pub percentage: Option<Decimal>,
}

/// How a deduction rule computes its amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "calculation_method", rename_all = "snake_case")]
pub enum DeductionMethod {
    /// A constant amount.
    Fixed {
        /// The amount deducted.
        amount: Decimal,
    },
    /// A percentage of the base amount.
    Percentage {
        /// Rate in percent.
        percentage: Decimal,
    },
    /// The single tier containing the base amount.
    Tiered {
        /// The tiers, in any order.
        tiers: Vec<Tier>,
    },
    /// The sum over every condition that holds.
    Conditional {
        /// The conditions.
        conditions: Vec<Condition>,
    },
}

impl DeductionMethod {
    /// Returns the snake_case name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionMethod::Fixed { .. } => "fixed",
            DeductionMethod::Percentage { .. } => "percentage",
            DeductionMethod::Tiered { .. } => "tiered",
            DeductionMethod::Conditional { .. } => "conditional",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_category() -> String {
    "all".to_string()
}

/// The fields needed to create a deduction rule.
///
/// Templates store drafts; [`DeductionRule::from_draft`] turns one into a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRuleDraft {
    /// Display name.
    pub name: String,
    /// Employee category the rule applies to, or "all".
    #[serde(default = "default_category")]
    pub category: String,
    /// How the amount is calculated.
    #[serde(flatten)]
    pub method: DeductionMethod,
    /// The payroll amount the calculation runs against.
    #[serde(default)]
    pub base_amount: BaseAmount,
    /// Whether the deduction reduces taxable income.
    #[serde(default)]
    pub is_pre_tax: bool,
    /// Whether recorded deductions start as pending.
    #[serde(default)]
    pub requires_approval: bool,
    /// First day the rule applies.
    pub effective_from: NaiveDate,
    /// Last day the rule applies; open-ended when absent.
    #[serde(default)]
    pub effective_until: Option<NaiveDate>,
}

/// A configured deduction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRule {
    /// Unique identifier for the rule.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Employee category the rule applies to, or "all".
    #[serde(default = "default_category")]
    pub category: String,
    /// How the amount is calculated.
    #[serde(flatten)]
    pub method: DeductionMethod,
    /// The payroll amount the calculation runs against.
    #[serde(default)]
    pub base_amount: BaseAmount,
    /// Whether the deduction reduces taxable income.
    #[serde(default)]
    pub is_pre_tax: bool,
    /// Whether recorded deductions start as pending.
    #[serde(default)]
    pub requires_approval: bool,
    /// Inactive rules are never applied.
    #[serde(default = "default_true")]
    pub active: bool,
    /// First day the rule applies.
    pub effective_from: NaiveDate,
    /// Last day the rule applies; open-ended when absent.
    #[serde(default)]
    pub effective_until: Option<NaiveDate>,
}

impl DeductionRule {
    /// Builds an active rule with a fresh id from a draft.
    pub fn from_draft(draft: DeductionRuleDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            category: draft.category,
            method: draft.method,
            base_amount: draft.base_amount,
            is_pre_tax: draft.is_pre_tax,
            requires_approval: draft.requires_approval,
            active: true,
            effective_from: draft.effective_from,
            effective_until: draft.effective_until,
        }
    }

    /// Returns true if the rule is in force for `employee` on `as_of`.
    pub fn applies_to(&self, employee: &Employee, as_of: NaiveDate) -> bool {
        self.active
            && employee.matches_category(&self.category)
            && self.effective_from <= as_of
            && self.effective_until.is_none_or(|until| as_of <= until)
    }
}

/// A named bundle of rule drafts applied to employees in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionTemplate {
    /// Unique identifier for the template.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// The rules created for each employee the template is applied to.
    pub rules: Vec<DeductionRuleDraft>,
}

/// The approval status of a recorded deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionStatus {
    /// Awaiting approval.
    Pending,
    /// Approved; counts toward taxable income reduction if pre-tax.
    Approved,
    /// Rejected.
    Rejected,
}

impl DeductionStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionStatus::Pending => "pending",
            DeductionStatus::Approved => "approved",
            DeductionStatus::Rejected => "rejected",
        }
    }
}

/// A deduction computed from a rule and recorded against a payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollDeduction {
    /// Unique identifier for the deduction.
    pub id: Uuid,
    /// The payroll deducted from.
    pub payroll_id: Uuid,
    /// The rule that produced the deduction.
    pub rule_id: Uuid,
    /// The amount deducted.
    pub amount: Decimal,
    /// The approval status.
    pub status: DeductionStatus,
    /// Who approved or rejected the deduction.
    pub reviewed_by: Option<String>,
    /// Rejection reason.
    pub notes: Option<String>,
    /// When the deduction was recorded.
    pub created_at: DateTime<Utc>,
}
