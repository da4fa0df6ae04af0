use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{prelude::DateTimeWithTimeZone, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{consts::BULK_ROWS, entity::{bonus_record, bonus_summary, employee, prelude::*, salary_component::SalaryField, sea_orm_active_enums::{PayoutStatus, SummaryStatus}}, error::PayrollError, payroll::{configuration::{self, BonusSettings}, employees::{self, EmployeeFilter}, run::{self, PayrollRun, ProcessedPeriod}}, utils};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusRequest {
    pub payment_period: String,
    #[serde(default)]
    pub filter: EmployeeFilter,
    /// Components summed into the base salary when no override is given
    #[serde(default)]
    pub salary_components: Vec<SalaryField>,
    /// Same base salary for every employee
    pub base_salary: Option<Decimal>,
}

impl BonusRequest {
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.payment_period.trim().is_empty() {
            return Err(PayrollError::validation("`payment_period` must not be empty"));
        }

        match self.base_salary {
            Some(base_salary) if base_salary < Decimal::ZERO => {
                Err(PayrollError::validation("`base_salary` must not be negative"))
            },
            None if self.salary_components.is_empty() => {
                Err(PayrollError::validation("select at least one salary component or give a `base_salary`"))
            },
            _ => Ok(()),
        }
    }
}

/// Bonus for one base salary
///
/// The base is clamped between the minimum wages and the eligibility cutoff
/// before the rate applies, the result is raised to `min_bonus` and capped at
/// `max_bonus` when that is set.
pub fn bonus_amount(base_salary: Decimal, settings: &BonusSettings) -> Decimal {
    let clamped = base_salary.max(settings.min_wages).min(settings.eligibility_cutoff);
    let amount = utils::round_money(clamped * settings.bonus_rate / dec!(100)).max(settings.min_bonus);

    if settings.max_bonus > Decimal::ZERO {
        amount.min(settings.max_bonus)
    } else {
        amount
    }
}

pub struct BonusCandidate {
    employee: employee::Model,
    base_salary: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusLine {
    pub employee_id: Uuid,
    pub employee_code: String,
    pub base_salary: Decimal,
    pub bonus_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBonus {
    pub summary: bonus_summary::Model,
    pub records: Vec<BonusLine>,
}

pub struct BonusRun {
    request: BonusRequest,
    settings: BonusSettings,
}

impl BonusRun {
    pub fn new(request: BonusRequest, settings: BonusSettings) -> Result<Self, PayrollError> {
        request.validate()?;

        Ok(Self { request, settings })
    }
}

impl PayrollRun for BonusRun {
    type Candidate = BonusCandidate;
    type Line = BonusLine;
    type Outcome = GeneratedBonus;

    fn name(&self) -> &'static str {
        "bonus"
    }

    async fn select<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<BonusCandidate>, PayrollError> {
        let employees = employees::list_employees(db, &self.request.filter).await?;
        if employees.is_empty() {
            return Err(PayrollError::not_found("no active employee matches the filter"));
        }

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let processed = processed_employees(db, &self.request.payment_period, &employee_ids).await?;

        let employees = employees.into_iter()
            .filter(|employee| !processed.contains(&employee.id))
            .collect::<Vec<_>>();

        if let Some(base_salary) = self.request.base_salary {
            return Ok(employees.into_iter()
                .map(|employee| BonusCandidate { employee, base_salary: Some(base_salary) })
                .collect());
        }

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let salaries = employees::current_salaries(db, &employee_ids).await?;

        Ok(employees.into_iter()
            .map(|employee| {
                let base_salary = salaries.get(&employee.id)
                    .map(|salary| employees::base_salary(salary, &self.request.salary_components));

                BonusCandidate { employee, base_salary }
            })
            .collect())
    }

    fn compute(&self, candidate: &BonusCandidate) -> Option<BonusLine> {
        let base_salary = candidate.base_salary?;

        Some(BonusLine {
            employee_id: candidate.employee.id,
            employee_code: candidate.employee.code.clone(),
            base_salary,
            bonus_amount: bonus_amount(base_salary, &self.settings),
        })
    }

    async fn persist<C: ConnectionTrait>(&self, db: &C, considered: usize, lines: Vec<BonusLine>) -> Result<GeneratedBonus, PayrollError> {
        let period = &self.request.payment_period;
        let now = utils::now();

        BonusRecord::delete_many()
            .filter(bonus_record::Column::PaymentPeriod.eq(period))
            .filter(bonus_record::Column::Status.eq(PayoutStatus::Pending))
            .exec(db).await?;

        retire_summary(db, period, SummaryStatus::Deleted, now).await?;

        for chunk in lines.chunks(BULK_ROWS) {
            BonusRecord::insert_many(chunk.iter().map(|line| bonus_record::ActiveModel {
                created_at: Set(now),
                updated_at: Set(now),
                employee_id: Set(line.employee_id),
                payment_period: Set(period.clone()),
                base_salary: Set(line.base_salary),
                bonus_amount: Set(line.bonus_amount),
                status: Set(PayoutStatus::Pending),
                processed_at: Set(None),
                ..Default::default()
            })).exec_without_returning(db).await?;
        }

        let filters = serde_json::to_value(&self.request.filter)
            .map_err(|e| DbErr::Json(e.to_string()))?;

        let summary = BonusSummary::insert(bonus_summary::ActiveModel {
            created_at: Set(now),
            updated_at: Set(now),
            payment_period: Set(period.clone()),
            filters: Set(filters),
            total_employees: Set(considered as i32),
            eligible_employees: Set(lines.len() as i32),
            total_payable: Set(lines.iter().map(|line| line.bonus_amount).sum()),
            status: Set(SummaryStatus::Generated),
            generated_at: Set(now),
            processed_at: Set(None),
            deleted_at: Set(None),
            ..Default::default()
        }).exec_with_returning(db).await?;

        Ok(GeneratedBonus { summary, records: lines })
    }
}

async fn processed_employees<C: ConnectionTrait>(db: &C, period: &str, employee_ids: &[Uuid]) -> Result<HashSet<Uuid>, PayrollError> {
    let mut processed = HashSet::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let records = BonusRecord::find()
            .filter(bonus_record::Column::PaymentPeriod.eq(period))
            .filter(bonus_record::Column::Status.eq(PayoutStatus::Processed))
            .filter(bonus_record::Column::EmployeeId.is_in(ids.iter().copied()))
            .all(db).await?;

        processed.extend(records.into_iter().map(|record| record.employee_id));
    }

    Ok(processed)
}

/// Moves the `generated` summary of `period` to `status`, returns how many moved
async fn retire_summary<C: ConnectionTrait>(db: &C, period: &str, status: SummaryStatus, at: DateTimeWithTimeZone) -> Result<u64, PayrollError> {
    let mut model = bonus_summary::ActiveModel {
        updated_at: Set(at),
        status: Set(status),
        ..Default::default()
    };
    match status {
        SummaryStatus::Processed => model.processed_at = Set(Some(at)),
        SummaryStatus::Deleted => model.deleted_at = Set(Some(at)),
        SummaryStatus::Generated => {},
    }

    let retired = BonusSummary::update_many()
        .set(model)
        .filter(bonus_summary::Column::PaymentPeriod.eq(period))
        .filter(bonus_summary::Column::Status.eq(SummaryStatus::Generated))
        .exec(db).await?;

    Ok(retired.rows_affected)
}

pub async fn generate(db: &DatabaseConnection, request: BonusRequest) -> Result<GeneratedBonus, PayrollError> {
    request.validate()?;

    let config = configuration::active_bonus(db).await?;
    let run = BonusRun::new(request, BonusSettings::from(&config))?;

    let generated = run::execute(&run, db).await?;

    info!(
        payment_period = %generated.summary.payment_period,
        eligible = generated.summary.eligible_employees,
        total_payable = %generated.summary.total_payable,
        "bonus generated",
    );

    Ok(generated)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusStatement {
    pub summary: bonus_summary::Model,
    pub records: Vec<bonus_record::Model>,
}

/// Latest summary of `period` that was not deleted, with every record of the period
pub async fn summary<C: ConnectionTrait>(db: &C, period: &str) -> Result<BonusStatement, PayrollError> {
    let summary = BonusSummary::find()
        .filter(bonus_summary::Column::PaymentPeriod.eq(period))
        .filter(bonus_summary::Column::Status.ne(SummaryStatus::Deleted))
        .order_by_desc(bonus_summary::Column::GeneratedAt)
        .one(db).await?
        .ok_or_else(|| PayrollError::not_found(format!("no bonus generated for {period}")))?;

    let records = BonusRecord::find()
        .filter(bonus_record::Column::PaymentPeriod.eq(period))
        .order_by_asc(bonus_record::Column::EmployeeId)
        .all(db).await?;

    Ok(BonusStatement { summary, records })
}

pub async fn process(db: &DatabaseConnection, period: &str) -> Result<ProcessedPeriod, PayrollError> {
    let txn = db.begin().await?;

    let pending = BonusRecord::find()
        .filter(bonus_record::Column::PaymentPeriod.eq(period))
        .filter(bonus_record::Column::Status.eq(PayoutStatus::Pending))
        .lock_exclusive()
        .all(&txn).await?;

    if pending.is_empty() {
        return Err(PayrollError::not_found(format!("no pending bonus for {period}")));
    }

    let now = utils::now();

    for chunk in pending.chunks(BULK_ROWS) {
        BonusRecord::update_many()
            .set(bonus_record::ActiveModel {
                updated_at: Set(now),
                status: Set(PayoutStatus::Processed),
                processed_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(bonus_record::Column::Id.is_in(chunk.iter().map(|record| record.id)))
            .exec(&txn).await?;
    }

    retire_summary(&txn, period, SummaryStatus::Processed, now).await?;
    txn.commit().await?;

    let processed = ProcessedPeriod {
        payment_period: period.to_string(),
        processed_count: pending.len(),
        total_amount: pending.iter().map(|record| record.bonus_amount).sum(),
    };

    info!(payment_period = period, count = processed.processed_count, total = %processed.total_amount, "bonus processed");

    Ok(processed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPeriod {
    pub payment_period: String,
    pub deleted_count: u64,
}

/// Drops the pending bonus of `period` and retires its generated summary; processed records stay
pub async fn delete(db: &DatabaseConnection, period: &str) -> Result<DeletedPeriod, PayrollError> {
    let txn = db.begin().await?;

    let deleted = BonusRecord::delete_many()
        .filter(bonus_record::Column::PaymentPeriod.eq(period))
        .filter(bonus_record::Column::Status.eq(PayoutStatus::Pending))
        .exec(&txn).await?;

    let retired = retire_summary(&txn, period, SummaryStatus::Deleted, utils::now()).await?;

    if deleted.rows_affected == 0 && retired == 0 {
        return Err(PayrollError::not_found(format!("no pending bonus for {period}")));
    }

    txn.commit().await?;

    info!(payment_period = period, count = deleted.rows_affected, "pending bonus deleted");

    Ok(DeletedPeriod { payment_period: period.to_string(), deleted_count: deleted.rows_affected })
}
