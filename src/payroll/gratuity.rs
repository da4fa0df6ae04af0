use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{consts::{BULK_ROWS, DAYS_PER_YEAR}, entity::{employee, gratuity_record, prelude::*, salary_component, sea_orm_active_enums::{PayoutStatus, YearRounding}}, error::PayrollError, payroll::{configuration::{self, GratuitySettings}, employees::{self, EmployeeFilter}, run::{self, PayrollRun}}, utils};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuityRequest {
    pub month: i16,
    pub year: i32,
    /// Service end for employees that have not exited
    pub cutoff_date: NaiveDate,
    #[serde(default)]
    pub filter: EmployeeFilter,
}

impl GratuityRequest {
    pub fn validate(&self) -> Result<(), PayrollError> {
        validate_month(self.month)
    }
}

fn validate_month(month: i16) -> Result<(), PayrollError> {
    if !(1..=12).contains(&month) {
        return Err(PayrollError::validation("`month` must be between 1 and 12"));
    }

    Ok(())
}

/// Completed years between both dates under `rounding`, zero when `end_date` comes first
pub fn years_of_service(joining_date: NaiveDate, end_date: NaiveDate, rounding: YearRounding) -> Decimal {
    if joining_date > end_date {
        return Decimal::ZERO;
    }

    let years = Decimal::from((end_date - joining_date).num_days()) / DAYS_PER_YEAR;

    match rounding {
        YearRounding::RoundDown => years.floor(),
        YearRounding::RoundUp => years.ceil(),
        YearRounding::RoundNearest => years.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        YearRounding::Raw2dp => years.round_dp_with_strategy(2, RoundingStrategy::ToZero),
    }
}

pub fn gratuity_amount(base_salary: Decimal, years: Decimal, settings: &GratuitySettings) -> Decimal {
    utils::round_money(base_salary * settings.payable_days * years / settings.month_days)
}

/// Why an employee gets no gratuity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("joined on {joining_date}, after the service end {end_date}")]
    JoinedAfterEnd { joining_date: NaiveDate, end_date: NaiveDate },
    #[error("{years} years of service, {min_years} required")]
    ShortService { years: Decimal, min_years: Decimal },
    #[error("only exited employees are eligible")]
    NotExited,
    #[error("no current salary")]
    NoSalary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuityLine {
    pub employee_id: Uuid,
    pub employee_code: String,
    pub joining_date: NaiveDate,
    pub end_date: NaiveDate,
    pub years_of_service: Decimal,
    pub last_drawn_salary: Decimal,
    pub gratuity_amount: Decimal,
}

/// Gratuity of one employee as of `cutoff_date`, or why there is none
pub fn assess(
    employee: &employee::Model,
    salary: Option<&salary_component::Model>,
    cutoff_date: NaiveDate,
    settings: &GratuitySettings,
) -> Result<GratuityLine, Ineligible> {
    let end_date = employee.exit_date.unwrap_or(cutoff_date);

    if employee.joining_date > end_date {
        return Err(Ineligible::JoinedAfterEnd { joining_date: employee.joining_date, end_date });
    }

    let years = years_of_service(employee.joining_date, end_date, settings.year_rounding);
    if years < settings.min_years {
        return Err(Ineligible::ShortService { years, min_years: settings.min_years });
    }
    if settings.exit_only && employee.exit_date.is_none() {
        return Err(Ineligible::NotExited);
    }

    let salary = salary.ok_or(Ineligible::NoSalary)?;
    let base_salary = employees::base_salary(salary, &settings.salary_components);

    Ok(GratuityLine {
        employee_id: employee.id,
        employee_code: employee.code.clone(),
        joining_date: employee.joining_date,
        end_date,
        years_of_service: years,
        last_drawn_salary: base_salary,
        gratuity_amount: gratuity_amount(base_salary, years, settings),
    })
}

pub struct GratuityCandidate {
    employee: employee::Model,
    salary: Option<salary_component::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuitySummary {
    pub month: i16,
    pub year: i32,
    pub total_employees: usize,
    pub eligible_employees: usize,
    pub total_payable: Decimal,
    pub records: Vec<GratuityLine>,
}

pub struct GratuityRun {
    request: GratuityRequest,
    settings: GratuitySettings,
}

impl GratuityRun {
    pub fn new(request: GratuityRequest, settings: GratuitySettings) -> Result<Self, PayrollError> {
        request.validate()?;
        settings.validate()?;

        Ok(Self { request, settings })
    }
}

impl PayrollRun for GratuityRun {
    type Candidate = GratuityCandidate;
    type Line = GratuityLine;
    type Outcome = GratuitySummary;

    fn name(&self) -> &'static str {
        "gratuity"
    }

    async fn select<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<GratuityCandidate>, PayrollError> {
        let employees = employees::list_employees(db, &self.request.filter).await?;
        if employees.is_empty() {
            return Err(PayrollError::not_found("no active employee matches the filter"));
        }

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let processed = processed_employees(db, self.request.month, self.request.year, &employee_ids).await?;

        let employees = employees.into_iter()
            .filter(|employee| !processed.contains(&employee.id))
            .collect::<Vec<_>>();

        let employee_ids = employees.iter().map(|employee| employee.id).collect::<Vec<_>>();
        let mut salaries = employees::current_salaries(db, &employee_ids).await?;

        Ok(employees.into_iter()
            .map(|employee| {
                let salary = salaries.remove(&employee.id);
                GratuityCandidate { employee, salary }
            })
            .collect())
    }

    fn compute(&self, candidate: &GratuityCandidate) -> Option<GratuityLine> {
        assess(&candidate.employee, candidate.salary.as_ref(), self.request.cutoff_date, &self.settings).ok()
    }

    async fn persist<C: ConnectionTrait>(&self, db: &C, considered: usize, lines: Vec<GratuityLine>) -> Result<GratuitySummary, PayrollError> {
        let GratuityRequest { month, year, .. } = self.request;
        let now = utils::now();

        GratuityRecord::delete_many()
            .filter(gratuity_record::Column::Month.eq(month))
            .filter(gratuity_record::Column::Year.eq(year))
            .filter(gratuity_record::Column::Status.eq(PayoutStatus::Pending))
            .exec(db).await?;

        for chunk in lines.chunks(BULK_ROWS) {
            GratuityRecord::insert_many(chunk.iter().map(|line| gratuity_record::ActiveModel {
                created_at: Set(now),
                updated_at: Set(now),
                employee_id: Set(line.employee_id),
                joining_date: Set(line.joining_date),
                end_date: Set(line.end_date),
                years_of_service: Set(line.years_of_service),
                last_drawn_salary: Set(line.last_drawn_salary),
                gratuity_amount: Set(line.gratuity_amount),
                month: Set(month),
                year: Set(year),
                status: Set(PayoutStatus::Pending),
                processed_at: Set(None),
                ..Default::default()
            })).exec_without_returning(db).await?;
        }

        Ok(GratuitySummary {
            month,
            year,
            total_employees: considered,
            eligible_employees: lines.len(),
            total_payable: lines.iter().map(|line| line.gratuity_amount).sum(),
            records: lines,
        })
    }
}

async fn processed_employees<C: ConnectionTrait>(db: &C, month: i16, year: i32, employee_ids: &[Uuid]) -> Result<HashSet<Uuid>, PayrollError> {
    let mut processed = HashSet::new();
    for ids in employee_ids.chunks(BULK_ROWS) {
        let records = GratuityRecord::find()
            .filter(gratuity_record::Column::Month.eq(month))
            .filter(gratuity_record::Column::Year.eq(year))
            .filter(gratuity_record::Column::Status.eq(PayoutStatus::Processed))
            .filter(gratuity_record::Column::EmployeeId.is_in(ids.iter().copied()))
            .all(db).await?;

        processed.extend(records.into_iter().map(|record| record.employee_id));
    }

    Ok(processed)
}

pub async fn compute(db: &DatabaseConnection, request: GratuityRequest) -> Result<GratuitySummary, PayrollError> {
    request.validate()?;

    let config = configuration::active_gratuity(db).await?;
    let run = GratuityRun::new(request, GratuitySettings::from(&config))?;

    let summary = run::execute(&run, db).await?;

    info!(
        month = summary.month,
        year = summary.year,
        eligible = summary.eligible_employees,
        total_payable = %summary.total_payable,
        "gratuity computed",
    );

    Ok(summary)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedGratuity {
    pub month: i16,
    pub year: i32,
    pub processed_count: usize,
    pub total_amount: Decimal,
}

pub async fn process(db: &DatabaseConnection, month: i16, year: i32) -> Result<ProcessedGratuity, PayrollError> {
    validate_month(month)?;

    let txn = db.begin().await?;

    let pending = GratuityRecord::find()
        .filter(gratuity_record::Column::Month.eq(month))
        .filter(gratuity_record::Column::Year.eq(year))
        .filter(gratuity_record::Column::Status.eq(PayoutStatus::Pending))
        .lock_exclusive()
        .all(&txn).await?;

    if pending.is_empty() {
        return Err(PayrollError::not_found(format!("no pending gratuity for {year}-{month:02}")));
    }

    let now = utils::now();

    for chunk in pending.chunks(BULK_ROWS) {
        GratuityRecord::update_many()
            .set(gratuity_record::ActiveModel {
                updated_at: Set(now),
                status: Set(PayoutStatus::Processed),
                processed_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(gratuity_record::Column::Id.is_in(chunk.iter().map(|record| record.id)))
            .exec(&txn).await?;
    }

    txn.commit().await?;

    let processed = ProcessedGratuity {
        month,
        year,
        processed_count: pending.len(),
        total_amount: pending.iter().map(|record| record.gratuity_amount).sum(),
    };

    info!(month, year, count = processed.processed_count, total = %processed.total_amount, "gratuity processed");

    Ok(processed)
}

/// Gratuity one employee would get, nothing is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuityPreview {
    pub employee_id: Uuid,
    pub eligible: bool,
    pub reason: Option<String>,
    pub end_date: NaiveDate,
    pub years_of_service: Decimal,
    pub last_drawn_salary: Decimal,
    pub gratuity_amount: Decimal,
}

pub async fn preview(db: &DatabaseConnection, employee_id: Uuid, cutoff_date: NaiveDate) -> Result<GratuityPreview, PayrollError> {
    let employee = employees::find_employee(db, employee_id).await?;
    let salary = employees::current_salary(db, employee_id).await?;
    let settings = GratuitySettings::from(&configuration::active_gratuity(db).await?);

    let end_date = employee.exit_date.unwrap_or(cutoff_date);

    let preview = match assess(&employee, salary.as_ref(), cutoff_date, &settings) {
        Ok(line) => GratuityPreview {
            employee_id,
            eligible: true,
            reason: None,
            end_date: line.end_date,
            years_of_service: line.years_of_service,
            last_drawn_salary: line.last_drawn_salary,
            gratuity_amount: line.gratuity_amount,
        },
        Err(reason) => GratuityPreview {
            employee_id,
            eligible: false,
            reason: Some(reason.to_string()),
            end_date,
            years_of_service: years_of_service(employee.joining_date, end_date, settings.year_rounding),
            last_drawn_salary: salary.as_ref()
                .map(|salary| employees::base_salary(salary, &settings.salary_components))
                .unwrap_or_default(),
            gratuity_amount: Decimal::ZERO,
        },
    };

    Ok(preview)
}
