//! Payroll Engine for monthly salaried staff
//!
//! This crate generates monthly payrolls from approved timesheets, manages
//! salary advances and loans, evaluates deduction and tax rules, and settles
//! employees who leave. Every calculated amount carries an audit trace.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
