//! Audit trail models.
//!
//! Every calculation function records an [`AuditStep`] describing what went in,
//! what came out and why, so a payroll total can be explained line by line.

use serde::{Deserialize, Serialize};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
///
/// # Example
///
/// ```
/// use payroll_engine::models::AuditTrace;
///
/// let trace = AuditTrace::default();
/// assert_eq!(trace.next_step_number(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
}

impl AuditTrace {
    /// Returns the step number the next recorded step should carry.
    pub fn next_step_number(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    /// Appends a step.
    pub fn record(&mut self, step: AuditStep) {
        self.steps.push(step);
    }

    /// Appends a warning.
    pub fn warn(&mut self, code: &str, message: String, severity: &str) {
        self.warnings.push(AuditWarning {
            code: code.to_string(),
            message,
            severity: severity.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_step(step_number: u32) -> AuditStep {
        AuditStep {
            step_number,
            rule_id: "base_salary".to_string(),
            rule_name: "Base Salary".to_string(),
            input: serde_json::json!({"days_worked": 20}),
            output: serde_json::json!({"amount": "2000.00"}),
            reasoning: "3000 / 30 × 20 days = 2000.00".to_string(),
        }
    }

    #[test]
    fn test_next_step_number_follows_recorded_steps() {
        let mut trace = AuditTrace::default();
        trace.record(create_step(1));
        trace.record(create_step(2));
        assert_eq!(trace.next_step_number(), 3);
    }

    #[test]
    fn test_warn_appends_warning() {
        let mut trace = AuditTrace::default();
        trace.warn("ADVANCE_CAPPED", "capped at balance".to_string(), "low");

        assert_eq!(trace.warnings.len(), 1);
        assert_eq!(trace.warnings[0].code, "ADVANCE_CAPPED");
        assert_eq!(trace.warnings[0].severity, "low");
    }

    #[test]
    fn test_audit_step_serialization() {
        let json = serde_json::to_value(create_step(1)).unwrap();
        assert_eq!(json["rule_id"], "base_salary");
        assert_eq!(json["output"]["amount"], "2000.00");
    }
}
