use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{consts::BULK_ROWS, entity::{employee, leave_balance, leave_encashment, prelude::*}, error::PayrollError, payroll::{employees::{self, EmployeeFilter}, run::{self, PayrollRun, ProcessedPeriod}}, utils};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncashmentRequest {
    pub payment_period: String,
    #[serde(default)]
    pub filter: EmployeeFilter,
    pub leave_type: i32,
    pub cutoff_date: NaiveDate,
    /// Days kept back from encashment
    pub threshold: Decimal,
}

impl EncashmentRequest {
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.payment_period.trim().is_empty() {
            return Err(PayrollError::validation("`payment_period` must not be empty"));
        }

        validate_threshold(self.threshold)
    }
}

fn validate_threshold(threshold: Decimal) -> Result<(), PayrollError> {
    if threshold < Decimal::ZERO {
        return Err(PayrollError::validation("`threshold` must not be negative"));
    }

    Ok(())
}

/// Days beyond `threshold` and what they pay, `None` when nothing is encashable
pub fn encashable(balance_days: Decimal, threshold: Decimal, daily_salary: Decimal) -> Option<(Decimal, Decimal)> {
    if balance_days <= threshold {
        return None;
    }

    let encash_days = balance_days - threshold;

    Some((encash_days, utils::round_money(encash_days * daily_salary)))
}

/// Most recent balance of `leave_type` on or before `cutoff_date`, per employee
pub async fn latest_balances<C: ConnectionTrait>(
    db: &C,
    employee_ids: &[Uuid],
    leave_type: i32,
    cutoff_date: NaiveDate,
) -> Result<HashMap<Uuid, leave_balance::Model>, PayrollError> {
    if employee_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut latest = HashMap::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let balances = LeaveBalance::find()
            .filter(leave_balance::Column::EmployeeId.is_in(ids.iter().copied()))
            .filter(leave_balance::Column::LeaveType.eq(leave_type))
            .filter(leave_balance::Column::BalanceAsOn.lte(cutoff_date))
            .order_by_asc(leave_balance::Column::EmployeeId)
            .order_by_desc(leave_balance::Column::BalanceAsOn)
            .all(db).await?;

        for balance in balances {
            latest.entry(balance.employee_id).or_insert(balance);
        }
    }

    Ok(latest)
}

pub struct EncashmentCandidate {
    employee: employee::Model,
    balance: Option<leave_balance::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncashmentLine {
    pub employee_id: Uuid,
    pub employee_code: String,
    pub leave_type: i32,
    pub balance_days: Decimal,
    pub encash_days: Decimal,
    pub daily_salary: Decimal,
    pub encash_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedEncashment {
    pub payment_period: String,
    pub total_employees: usize,
    pub eligible_count: usize,
    pub total_payable: Decimal,
    pub per_employee: Vec<EncashmentLine>,
}

pub struct EncashmentRun {
    request: EncashmentRequest,
}

impl EncashmentRun {
    pub fn new(request: EncashmentRequest) -> Result<Self, PayrollError> {
        request.validate()?;

        Ok(Self { request })
    }
}

impl PayrollRun for EncashmentRun {
    type Candidate = EncashmentCandidate;
    type Line = EncashmentLine;
    type Outcome = GeneratedEncashment;

    fn name(&self) -> &'static str {
        "leave encashment"
    }

    async fn select<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<EncashmentCandidate>, PayrollError> {
        let employees = employees::list_employees(db, &self.request.filter).await?;
        if employees.is_empty() {
            return Err(PayrollError::not_found("no active employee matches the filter"));
        }

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let processed = processed_employees(db, &self.request.payment_period, &employee_ids).await?;

        let employees = employees.into_iter()
            .filter(|employee| !processed.contains(&employee.id))
            .collect::<Vec<_>>();

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let mut balances = latest_balances(db, &employee_ids, self.request.leave_type, self.request.cutoff_date).await?;

        Ok(employees.into_iter()
            .map(|employee| {
                let balance = balances.remove(&employee.id);
                EncashmentCandidate { employee, balance }
            })
            .collect())
    }

    fn compute(&self, candidate: &EncashmentCandidate) -> Option<EncashmentLine> {
        let balance = candidate.balance.as_ref()?;
        let daily_salary = candidate.employee.daily_salary;
        let (encash_days, encash_amount) = encashable(balance.balance_days, self.request.threshold, daily_salary)?;

        Some(EncashmentLine {
            employee_id: candidate.employee.id,
            employee_code: candidate.employee.code.clone(),
            leave_type: balance.leave_type,
            balance_days: balance.balance_days,
            encash_days,
            daily_salary,
            encash_amount,
        })
    }

    async fn persist<C: ConnectionTrait>(&self, db: &C, considered: usize, lines: Vec<EncashmentLine>) -> Result<GeneratedEncashment, PayrollError> {
        let period = &self.request.payment_period;
        let now = utils::now();

        LeaveEncashment::delete_many()
            .filter(leave_encashment::Column::PaymentPeriod.eq(period))
            .filter(leave_encashment::Column::Processed.eq(false))
            .exec(db).await?;

        for chunk in lines.chunks(BULK_ROWS) {
            LeaveEncashment::insert_many(chunk.iter().map(|line| leave_encashment::ActiveModel {
                created_at: Set(now),
                updated_at: Set(now),
                employee_id: Set(line.employee_id),
                payment_period: Set(period.clone()),
                leave_type: Set(line.leave_type),
                balance_days: Set(line.balance_days),
                encash_days: Set(line.encash_days),
                daily_salary: Set(line.daily_salary),
                encash_amount: Set(line.encash_amount),
                processed: Set(false),
                processed_at: Set(None),
                ..Default::default()
            })).exec_without_returning(db).await?;
        }

        Ok(GeneratedEncashment {
            payment_period: period.clone(),
            total_employees: considered,
            eligible_count: lines.len(),
            total_payable: lines.iter().map(|line| line.encash_amount).sum(),
            per_employee: lines,
        })
    }
}

async fn processed_employees<C: ConnectionTrait>(db: &C, period: &str, employee_ids: &[Uuid]) -> Result<HashSet<Uuid>, PayrollError> {
    let mut processed = HashSet::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let rows = LeaveEncashment::find()
            .filter(leave_encashment::Column::PaymentPeriod.eq(period))
            .filter(leave_encashment::Column::Processed.eq(true))
            .filter(leave_encashment::Column::EmployeeId.is_in(ids.iter().copied()))
            .all(db).await?;

        processed.extend(rows.into_iter().map(|row| row.employee_id));
    }

    Ok(processed)
}

pub async fn generate(db: &DatabaseConnection, request: EncashmentRequest) -> Result<GeneratedEncashment, PayrollError> {
    let run = EncashmentRun::new(request)?;
    let generated = run::execute(&run, db).await?;

    info!(
        payment_period = %generated.payment_period,
        eligible = generated.eligible_count,
        total_payable = %generated.total_payable,
        "leave encashment generated",
    );

    Ok(generated)
}

pub async fn process(db: &DatabaseConnection, period: &str) -> Result<ProcessedPeriod, PayrollError> {
    let txn = db.begin().await?;

    let unprocessed = LeaveEncashment::find()
        .filter(leave_encashment::Column::PaymentPeriod.eq(period))
        .filter(leave_encashment::Column::Processed.eq(false))
        .lock_exclusive()
        .all(&txn).await?;

    if unprocessed.is_empty() {
        return Err(PayrollError::not_found(format!("no unprocessed leave encashment for {period}")));
    }

    let now = utils::now();

    for chunk in unprocessed.chunks(BULK_ROWS) {
        LeaveEncashment::update_many()
            .set(leave_encashment::ActiveModel {
                updated_at: Set(now),
                processed: Set(true),
                processed_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(leave_encashment::Column::Id.is_in(chunk.iter().map(|row| row.id)))
            .exec(&txn).await?;
    }

    txn.commit().await?;

    let processed = ProcessedPeriod {
        payment_period: period.to_string(),
        processed_count: unprocessed.len(),
        total_amount: unprocessed.iter().map(|row| row.encash_amount).sum(),
    };

    info!(payment_period = period, count = processed.processed_count, total = %processed.total_amount, "leave encashment processed");

    Ok(processed)
}

/// What one employee would encash, nothing is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncashmentPreview {
    pub employee_id: Uuid,
    pub leave_type: i32,
    pub cutoff_date: NaiveDate,
    pub balance_days: Decimal,
    pub balance_as_on: Option<NaiveDate>,
    pub threshold: Decimal,
    pub encash_days: Decimal,
    pub daily_salary: Decimal,
    pub encash_amount: Decimal,
}

pub async fn preview<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    leave_type: i32,
    cutoff_date: NaiveDate,
    threshold: Decimal,
) -> Result<EncashmentPreview, PayrollError> {
    validate_threshold(threshold)?;

    let daily_salary = employees::daily_salary(db, employee_id).await?;
    let balance = latest_balances(db, &[employee_id], leave_type, cutoff_date).await?
        .remove(&employee_id);

    let balance_days = balance.as_ref().map(|balance| balance.balance_days).unwrap_or_default();
    let (encash_days, encash_amount) = encashable(balance_days, threshold, daily_salary)
        .unwrap_or_default();

    Ok(EncashmentPreview {
        employee_id,
        leave_type,
        cutoff_date,
        balance_days,
        balance_as_on: balance.map(|balance| balance.balance_as_on),
        threshold,
        encash_days,
        daily_salary,
        encash_amount,
    })
}
