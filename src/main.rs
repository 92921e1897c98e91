//! Batch payroll runner.
//!
//! Loads the YAML configuration and a JSON file of employees and timesheets,
//! generates payrolls for one month and prints the batch report as JSON.
//!
//! Environment (also read from `.env`):
//!
//! - `PAYROLL_CONFIG_DIR`: configuration directory, default `./config/default`
//! - `PAYROLL_DATA_FILE`: employees and timesheets, default `./data/sample.json`
//! - `PAYROLL_MONTH`: `YYYY-MM`, default the current month
//! - `RUST_LOG`: log filter, default `payroll_engine=info`

use std::env;
use std::fs;
use std::process::ExitCode;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use payroll_engine::config::ConfigLoader;
use payroll_engine::error::{PayrollError, PayrollResult};
use payroll_engine::models::{Employee, PayrollMonth, Timesheet};
use payroll_engine::services::PayrollEngine;

#[derive(Debug, Deserialize)]
struct DataFile {
    employees: Vec<Employee>,
    #[serde(default)]
    timesheets: Vec<Timesheet>,
}

fn load_data(path: &str) -> PayrollResult<DataFile> {
    let content = fs::read_to_string(path).map_err(|_| PayrollError::ConfigNotFound {
        path: path.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| PayrollError::ConfigParseError {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn run() -> PayrollResult<()> {
    let config_dir =
        env::var("PAYROLL_CONFIG_DIR").unwrap_or_else(|_| "./config/default".to_string());
    let data_file =
        env::var("PAYROLL_DATA_FILE").unwrap_or_else(|_| "./data/sample.json".to_string());
    let month = match env::var("PAYROLL_MONTH") {
        Ok(value) => value.parse()?,
        Err(_) => PayrollMonth::of(Utc::now().date_naive()),
    };

    let config = ConfigLoader::load(&config_dir)?.into_config();
    let data = load_data(&data_file)?;

    let mut engine = PayrollEngine::new(config);
    for employee in data.employees {
        engine.add_employee(employee);
    }
    engine.add_timesheets(data.timesheets);

    let report = engine.generate_batch(month);
    info!(
        month = %month,
        generated = report.generated.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        total_net = %report.total_net(),
        "Batch complete"
    );

    let output = serde_json::to_string_pretty(&report).map_err(|e| {
        PayrollError::CalculationError {
            message: format!("failed to serialize report: {}", e),
        }
    })?;
    println!("{}", output);
    Ok(())
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("payroll_engine=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Payroll batch failed");
            ExitCode::FAILURE
        }
    }
}
