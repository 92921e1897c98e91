//! Configuration loading and management for the payroll engine.
//!
//! This module loads the payroll policy together with the deduction and tax
//! rules from a directory of YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Loaded policy for: {}", config.policy().company.name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AdvancePolicy, CompanyMetadata, DeductionRulesConfig, OvertimePolicy, PayrollConfig,
    PayrollPolicy, RoundingPolicy, SettlementPolicy, TaxRulesConfig,
};
