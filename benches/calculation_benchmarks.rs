//! Performance benchmarks for the payroll engine.
//!
//! This benchmark suite covers the hot paths of a monthly run:
//! - Single payroll generation from a month of timesheets
//! - Batch generation for 100 and 1000 employees
//! - Repayment schedule construction for loans
//! - Progressive tax evaluation
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use payroll_engine::calculation::{build_repayment_plan, progressive_tax};
use payroll_engine::config::PayrollConfig;
use payroll_engine::models::{
    Allowances, Employee, EmployeeStatus, EmploymentType, OvertimeTerms, PayrollMonth, TaxBracket,
    Timesheet, TimesheetStatus,
};
use payroll_engine::services::PayrollEngine;

fn month() -> PayrollMonth {
    PayrollMonth::new(2026, 2).unwrap()
}

/// Creates an employee on 3000 basic with 900 in allowances.
fn create_employee(index: usize) -> Employee {
    Employee {
        id: format!("emp_bench_{:04}", index),
        full_name: format!("Bench Employee {}", index),
        status: EmployeeStatus::Active,
        category: "all".to_string(),
        department: None,
        position: None,
        employment_type: EmploymentType::FullTime,
        joining_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        basic_salary: Decimal::new(3000, 0),
        allowances: Allowances {
            food: Decimal::new(300, 0),
            housing: Decimal::new(600, 0),
            transport: Decimal::ZERO,
        },
        contract_days_per_month: 30,
        contract_hours_per_day: Decimal::new(8, 0),
        overtime: OvertimeTerms::default(),
    }
}

/// Creates 20 approved 8-hour days with 2 overtime hours each.
fn create_timesheets(employee_id: &str) -> Vec<Timesheet> {
    (1..=20)
        .map(|day| Timesheet {
            id: format!("ts_{}_{:02}", employee_id, day),
            employee_id: employee_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            hours_worked: Decimal::new(8, 0),
            overtime_hours: Decimal::new(2, 0),
            status: TimesheetStatus::ManagerApproved,
        })
        .collect()
}

/// Creates an engine with `count` employees and their timesheets.
fn create_engine(count: usize) -> PayrollEngine {
    let mut engine = PayrollEngine::new(PayrollConfig::default());
    for index in 0..count {
        let employee = create_employee(index);
        engine.add_timesheets(create_timesheets(&employee.id));
        engine.add_employee(employee);
    }
    engine
}

/// Benchmark: one payroll from 20 timesheets.
fn bench_single_payroll(c: &mut Criterion) {
    let engine = create_engine(1);

    c.bench_function("single_payroll", |b| {
        b.iter_batched(
            || engine.clone(),
            |mut engine| black_box(engine.generate_payroll("emp_bench_0000", month()).unwrap()),
            criterion::BatchSize::SmallInput,
        )
    });
}

/// Benchmark: batch of 100 employees.
fn bench_batch_100(c: &mut Criterion) {
    let engine = create_engine(100);

    let mut group = c.benchmark_group("batch_processing");
    group.throughput(Throughput::Elements(100));

    group.bench_function("batch_100", |b| {
        b.iter_batched(
            || engine.clone(),
            |mut engine| black_box(engine.generate_batch(month())),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

/// Benchmark: batch of 1000 employees.
fn bench_batch_1000(c: &mut Criterion) {
    let engine = create_engine(1000);

    let mut group = c.benchmark_group("batch_processing");
    group.throughput(Throughput::Elements(1000));
    group.sample_size(10);

    group.bench_function("batch_1000", |b| {
        b.iter_batched(
            || engine.clone(),
            |mut engine| black_box(engine.generate_batch(month())),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

/// Benchmark: repayment schedules of growing length.
fn bench_repayment_schedules(c: &mut Criterion) {
    let mut group = c.benchmark_group("repayment_schedule");

    for installments in [6u32, 24, 60].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(installments),
            installments,
            |b, &installments| {
                b.iter(|| {
                    black_box(
                        build_repayment_plan(
                            Decimal::new(12000, 0),
                            Some(Decimal::new(12, 0)),
                            installments,
                            month(),
                            2,
                        )
                        .unwrap(),
                    )
                })
            },
        );
    }

    group.finish();
}

/// Benchmark: three-bracket progressive tax.
fn bench_progressive_tax(c: &mut Criterion) {
    let brackets = vec![
        TaxBracket {
            min_income: Decimal::ZERO,
            max_income: Some(Decimal::new(3000, 0)),
            rate: Decimal::ZERO,
        },
        TaxBracket {
            min_income: Decimal::new(3000, 0),
            max_income: Some(Decimal::new(6000, 0)),
            rate: Decimal::new(5, 0),
        },
        TaxBracket {
            min_income: Decimal::new(6000, 0),
            max_income: None,
            rate: Decimal::new(10, 0),
        },
    ];

    c.bench_function("progressive_tax", |b| {
        b.iter(|| black_box(progressive_tax(&brackets, black_box(Decimal::new(755025, 2)))))
    });
}

criterion_group!(
    benches,
    bench_single_payroll,
    bench_batch_100,
    bench_batch_1000,
    bench_repayment_schedules,
    bench_progressive_tax,
);
criterion_main!(benches);
