use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{entity::{attendance as attendance_entity, recalculation_log, sea_orm_active_enums::AttendanceStatus}, error::PayrollError, payroll::{attendance, employees::{self, EmployeeFilter}, jobs::{self, RecalculationQueue, Tally}}, utils};

/// Which employees a recalculation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    AllEmployees,
    Employee(Uuid),
}

impl Scope {
    /// `all_employees` wins over a supplied id
    pub fn new(all_employees: bool, employee_id: Option<Uuid>) -> Result<Self, PayrollError> {
        match (all_employees, employee_id) {
            (true, _) => Ok(Self::AllEmployees),
            (false, Some(employee_id)) => Ok(Self::Employee(employee_id)),
            (false, None) => Err(PayrollError::validation("`employee_id` is required unless `all_employees` is set")),
        }
    }

    fn employee_id(&self) -> Option<Uuid> {
        match self {
            Self::AllEmployees => None,
            Self::Employee(employee_id) => Some(*employee_id),
        }
    }
}

/// Inclusive range of days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    date_from: NaiveDate,
    date_to: NaiveDate,
}

impl Window {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self, PayrollError> {
        if date_from > date_to {
            return Err(PayrollError::validation("`date_from` must not be after `date_to`"));
        }

        Ok(Self { date_from, date_to })
    }
}

/// Registers a job and schedules it on the worker pool
pub async fn start(db: &DatabaseConnection, queue: &RecalculationQueue, window: Window, scope: Scope) -> Result<recalculation_log::Model, PayrollError> {
    let txn = db.begin().await?;

    if let Scope::Employee(employee_id) = scope {
        let employee = employees::find_employee(&txn, employee_id).await?;
        if !employee.is_active {
            return Err(PayrollError::validation(format!("employee {} is not active", employee.code)));
        }
    }

    if scope == Scope::AllEmployees {
        jobs::check_admission(&txn).await?;
    }

    let job = jobs::create_job(&txn, window.date_from, window.date_to, scope.employee_id()).await?;

    if scope == Scope::AllEmployees {
        jobs::mark_admitted(&txn, job.id).await?;
    }

    txn.commit().await?;

    if let Err(e) = queue.enqueue(job.id) {
        error!(job_id = %job.id, error = %e, "unable to schedule recalculation");
        jobs::fail(db, job.id, &e.to_string()).await?;
        return Err(e);
    }

    info!(job_id = %job.id, ?scope, date_from = %job.date_from, date_to = %job.date_to, "recalculation scheduled");

    Ok(job)
}

/// Puts jobs a previous process left in `started` back on the queue
///
/// Each job is worked again from its first employee, the counters are rebuilt.
pub async fn resume<C: ConnectionTrait>(db: &C, queue: &RecalculationQueue) -> Result<usize, PayrollError> {
    let pending = jobs::running_jobs(db).await?;

    for job in &pending {
        queue.enqueue(job.id)?;
        info!(job_id = %job.id, progress = job.progress, "recalculation resumed");
    }

    Ok(pending.len())
}

/// Progress after `done` of `total` employees, 100 is left for completion
pub fn running_progress(done: usize, total: usize) -> i16 {
    if total == 0 {
        return 0;
    }

    (done * 100 / total).min(99) as i16
}

/// Works a job through to a terminal state; failures end up on the job row
pub async fn run(db: &DatabaseConnection, job_id: Uuid) {
    if let Err(e) = recalculate(db, job_id).await {
        error!(%job_id, error = %e, "recalculation failed");

        if let Err(e) = jobs::fail(db, job_id, &e.to_string()).await {
            error!(%job_id, error = %e, "unable to record recalculation failure");
        }
    }
}

async fn recalculate<C: ConnectionTrait>(db: &C, job_id: Uuid) -> Result<(), PayrollError> {
    let job = jobs::find_job(db, job_id).await?;

    if job.status != jobs::STARTED {
        warn!(%job_id, status = %job.status, "skipping recalculation that is no longer running");
        return Ok(());
    }

    let employee_ids = job_employees(db, &job).await?;
    let total = employee_ids.len();
    let mut tally = Tally::default();

    for (done, employee_id) in employee_ids.iter().enumerate() {
        let records = attendance::get_range(db, &[*employee_id], job.date_from, job.date_to).await?;

        for record in &records {
            let (hours_worked, status) = attendance::derive(record.check_in, record.check_out);
            attendance::update_derived(db, record, hours_worked, status).await?;

            tally.processed += 1;
            if record.check_in.is_some() && record.check_out.is_some() {
                tally.updated += 1;
            }
        }

        jobs::record_progress(db, job_id, running_progress(done + 1, total), tally).await?;
    }

    jobs::complete(db, job_id, tally).await?;

    info!(%job_id, employees = total, processed = tally.processed, updated = tally.updated, "recalculation completed");

    Ok(())
}

async fn job_employees<C: ConnectionTrait>(db: &C, job: &recalculation_log::Model) -> Result<Vec<Uuid>, PayrollError> {
    match job.employee_id.filter(|_| !job.all_employees) {
        Some(employee_id) => Ok(vec![employee_id]),
        None => {
            let employees = employees::list_employees(db, &EmployeeFilter::default()).await?;
            Ok(employees.into_iter().map(|employee| employee.id).collect())
        },
    }
}

/// One attendance day with punches rendered as `HH:MM`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceView {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub hours_worked: Decimal,
    pub status: AttendanceStatus,
    pub is_manual: bool,
}

impl From<attendance_entity::Model> for AttendanceView {
    fn from(record: attendance_entity::Model) -> Self {
        Self {
            id: record.id,
            employee_id: record.employee_id,
            date: record.date,
            check_in: utils::format_clock(record.check_in),
            check_out: utils::format_clock(record.check_out),
            hours_worked: record.hours_worked,
            status: record.status,
            is_manual: record.is_manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAttendance {
    pub total_records: usize,
    pub records_updated: usize,
    pub employees_count: usize,
    pub attendance_data: Vec<AttendanceView>,
}

impl JobAttendance {
    fn new(records: Vec<attendance_entity::Model>) -> Self {
        Self {
            total_records: records.len(),
            records_updated: records.iter()
                .filter(|record| record.check_in.is_some() && record.check_out.is_some())
                .count(),
            employees_count: records.iter()
                .map(|record| record.employee_id)
                .collect::<HashSet<_>>()
                .len(),
            attendance_data: records.into_iter().map(AttendanceView::from).collect(),
        }
    }
}

/// Attendance over the window and scope of `job`, as it is stored now
pub async fn job_attendance<C: ConnectionTrait>(db: &C, job: &recalculation_log::Model) -> Result<JobAttendance, PayrollError> {
    let employee_ids = job_employees(db, job).await?;
    let records = attendance::get_range(db, &employee_ids, job.date_from, job.date_to).await?;

    Ok(JobAttendance::new(records))
}

/// Records punches entered by hand for one employee and day
pub async fn record_manual<C: ConnectionTrait>(
    db: &C,
    employee_id: Uuid,
    date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
) -> Result<attendance_entity::Model, PayrollError> {
    employees::find_employee(db, employee_id).await?;

    let record = attendance::upsert(db, employee_id, date, check_in, check_out, true).await?;

    info!(%employee_id, %date, hours_worked = %record.hours_worked, "manual attendance recorded");

    Ok(record)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    use super::*;
    use crate::{entity::employee, payroll::{attendance::fixtures as attendance_fixtures, employees::fixtures as employee_fixtures, jobs::fixtures as job_fixtures}};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn at(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult { last_insert_id: 0, rows_affected }
    }

    #[test]
    fn test_scope() {
        let employee_id = Uuid::new_v4();

        assert_eq!(Scope::new(true, None).unwrap(), Scope::AllEmployees);
        assert_eq!(Scope::new(true, Some(employee_id)).unwrap(), Scope::AllEmployees);
        assert_eq!(Scope::new(false, Some(employee_id)).unwrap(), Scope::Employee(employee_id));
        assert!(matches!(Scope::new(false, None), Err(PayrollError::Validation(_))));
    }

    #[test]
    fn test_window() {
        assert!(Window::new(day(1), day(1)).is_ok());
        assert!(Window::new(day(1), day(31)).is_ok());
        assert!(matches!(Window::new(day(2), day(1)), Err(PayrollError::Validation(_))));
    }

    #[test]
    fn test_running_progress() {
        assert_eq!(running_progress(0, 0), 0);
        assert_eq!(running_progress(1, 3), 33);
        assert_eq!(running_progress(2, 3), 66);
        assert_eq!(running_progress(3, 3), 99);
        assert_eq!(running_progress(1, 1), 99);
    }

    #[actix_web::test]
    async fn test_start_rejects_inactive_employee() {
        let mut employee = employee_fixtures::employee("EMP-0001", dec!(500), day(1));
        employee.is_active = false;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .into_connection();
        let (queue, _receiver) = RecalculationQueue::new();

        let result = start(&db, &queue, Window::new(day(1), day(31)).unwrap(), Scope::Employee(employee.id)).await;
        assert!(matches!(result, Err(PayrollError::Validation(_))));
    }

    #[actix_web::test]
    async fn test_start_single_employee_enqueues_job() {
        let employee = employee_fixtures::employee("EMP-0001", dec!(500), day(1));
        let job = job_fixtures::job(Some(employee.id), jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .append_query_results([
                vec![ job.clone() ],
            ])
            .into_connection();
        let (queue, mut receiver) = RecalculationQueue::new();

        let started = start(&db, &queue, Window::new(day(1), day(31)).unwrap(), Scope::Employee(employee.id)).await.unwrap();

        assert_eq!(started, job);
        assert_eq!(receiver.try_recv().unwrap(), job.id);
    }

    #[actix_web::test]
    async fn test_start_fails_job_when_queue_is_closed() {
        let employee = employee_fixtures::employee("EMP-0001", dec!(500), day(1));
        let job = job_fixtures::job(Some(employee.id), jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .append_query_results([
                vec![ job.clone() ],
            ])
            .append_exec_results([
                exec(1),
            ])
            .into_connection();
        let (queue, receiver) = RecalculationQueue::new();
        drop(receiver);

        let result = start(&db, &queue, Window::new(day(1), day(31)).unwrap(), Scope::Employee(employee.id)).await;
        assert!(matches!(result, Err(PayrollError::Store(_))));

        let log = db.into_transaction_log();
        let failed = &log[log.len() - 1].statements()[0];
        assert!(failed.sql.starts_with(r#"UPDATE "recalculation_log""#));
        assert!(format!("{:?}", failed.values).contains("failed: "));
    }

    #[actix_web::test]
    async fn test_resume_requeues_started_jobs() {
        let first = job_fixtures::job(None, jobs::STARTED, 40);
        let second = job_fixtures::job(Some(Uuid::new_v4()), jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ first.clone(), second.clone() ],
            ])
            .into_connection();
        let (queue, mut receiver) = RecalculationQueue::new();

        assert_eq!(resume(&db, &queue).await.unwrap(), 2);
        assert_eq!(receiver.try_recv().unwrap(), first.id);
        assert_eq!(receiver.try_recv().unwrap(), second.id);
        assert!(receiver.try_recv().is_err());
    }

    #[actix_web::test]
    async fn test_run_recomputes_and_completes() {
        let employee_id = Uuid::new_v4();
        let job = job_fixtures::job(Some(employee_id), jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .append_query_results([
                vec![
                    attendance_fixtures::record(employee_id, day(3), at(9, 0), at(17, 30)),
                    attendance_fixtures::record(employee_id, day(4), at(9, 0), None),
                ],
            ])
            .append_exec_results([
                exec(1),
                exec(1),
                exec(1),
                exec(1),
            ])
            .into_connection();

        run(&db, job.id).await;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 6);
        assert!(log[5].statements()[0].sql.contains("completed_at"));
    }

    #[actix_web::test]
    async fn test_run_store_error_fails_job_and_keeps_progress() {
        let first = employee_fixtures::employee("EMP-0001", dec!(500), day(1));
        let second = employee_fixtures::employee("EMP-0002", dec!(500), day(1));
        let job = job_fixtures::job(None, jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .append_query_results([
                vec![ first.clone(), second.clone() ],
            ])
            .append_query_results([
                vec![ attendance_fixtures::record(first.id, day(3), at(9, 0), at(17, 30)) ],
                vec![ attendance_fixtures::record(second.id, day(3), at(9, 0), at(17, 30)) ],
            ])
            .append_exec_results([
                exec(1),
                exec(1),
            ])
            .append_exec_errors([
                DbErr::Custom("connection reset".to_string()),
            ])
            .append_exec_results([
                exec(1),
            ])
            .into_connection();

        run(&db, job.id).await;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 8);

        let progress = &log[4].statements()[0];
        assert!(progress.sql.contains(r#""progress" = "#));
        assert!(format!("{:?}", progress.values).contains("SmallInt(Some(50))"));

        let failed = &log[7].statements()[0];
        assert!(failed.sql.starts_with(r#"UPDATE "recalculation_log""#));
        assert!(failed.sql.contains(r#""recalculation_log"."status" = "#));
        assert!(!failed.sql.contains(r#""progress" = "#));
        assert!(format!("{:?}", failed.values).contains("failed: store error: Custom Error: connection reset"));
    }

    #[actix_web::test]
    async fn test_run_skips_finished_job() {
        let job = job_fixtures::job(None, jobs::COMPLETED, 100);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .into_connection();

        run(&db, job.id).await;

        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[actix_web::test]
    async fn test_run_without_employees_completes() {
        let job = job_fixtures::job(None, jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .append_query_results([
                Vec::<employee::Model>::new(),
            ])
            .append_exec_results([
                exec(1),
            ])
            .into_connection();

        run(&db, job.id).await;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
        assert!(log[2].statements()[0].sql.contains("completed_at"));
    }

    #[test]
    fn test_job_attendance_counts() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let attendance = JobAttendance::new(vec![
            attendance_fixtures::record(first, day(3), at(9, 0), at(17, 30)),
            attendance_fixtures::record(first, day(4), at(9, 0), None),
            attendance_fixtures::record(second, day(3), at(9, 0), at(12, 0)),
        ]);

        assert_eq!(attendance.total_records, 3);
        assert_eq!(attendance.records_updated, 2);
        assert_eq!(attendance.employees_count, 2);
        assert_eq!(attendance.attendance_data[0].check_out.as_deref(), Some("17:30"));
        assert_eq!(attendance.attendance_data[1].check_out, None);
    }
}
