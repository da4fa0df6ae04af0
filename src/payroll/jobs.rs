use std::rc::Rc;

use actix_web::web;
use chrono::{Duration, NaiveDate};
use futures::{channel::mpsc::{self, UnboundedReceiver, UnboundedSender}, lock::Mutex, StreamExt as _};
use sea_orm::{prelude::DateTimeWithTimeZone, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{consts::{HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT, RECALCULATION_RATE_LIMIT, RECALCULATION_RATE_WINDOW_MINUTES}, entity::{prelude::*, recalculation_log, recalculation_rate_limit}, error::PayrollError, payroll::recalculation, utils};

pub const STARTED: &str = "started";
pub const COMPLETED: &str = "completed";
const FAILED_PREFIX: &str = "failed: ";

/// Running counters of a recalculation job
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub processed: i32,
    pub updated: i32,
}

/// Hands job ids from the request path over to the worker pool
#[derive(Clone)]
pub struct RecalculationQueue {
    sender: UnboundedSender<Uuid>,
}

impl RecalculationQueue {
    pub fn new() -> (Self, UnboundedReceiver<Uuid>) {
        let (sender, receiver) = mpsc::unbounded();

        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, job_id: Uuid) -> Result<(), PayrollError> {
        self.sender.unbounded_send(job_id)
            .map_err(|_| PayrollError::Store(DbErr::Custom(format!("recalculation queue is closed, job {job_id} was not scheduled"))))
    }
}

/// Spawns `workers` tasks on the current actix runtime draining `receiver`
///
/// Workers stop once every queue handle is dropped.
pub fn spawn_workers(db: web::Data<DatabaseConnection>, receiver: UnboundedReceiver<Uuid>, workers: usize) {
    let receiver = Rc::new(Mutex::new(receiver));

    for worker in 0..workers {
        let db = db.clone();
        let receiver = receiver.clone();

        actix_web::rt::spawn(async move {
            loop {
                let next = receiver.lock().await.next().await;
                let Some(job_id) = next else {
                    break;
                };

                debug!(worker, %job_id, "picked recalculation job");
                recalculation::run(db.as_ref(), job_id).await;
            }

            debug!(worker, "recalculation worker stopped");
        });
    }
}

pub fn admits(recent: u64) -> bool {
    recent < RECALCULATION_RATE_LIMIT
}

/// Denies an all-employee recalculation once the trailing window is full
///
/// Must run inside the transaction that later calls [`mark_admitted`], the
/// table lock serializes concurrent admissions until it commits.
pub async fn check_admission<C: ConnectionTrait>(txn: &C) -> Result<(), PayrollError> {
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        txn.execute_unprepared("LOCK TABLE recalculation_rate_limit IN SHARE ROW EXCLUSIVE MODE").await?;
    }

    let window_start = utils::now() - Duration::minutes(RECALCULATION_RATE_WINDOW_MINUTES);

    let expired = RecalculationRateLimit::delete_many()
        .filter(recalculation_rate_limit::Column::CreatedAt.lte(window_start))
        .exec(txn).await?;
    debug!(expired = expired.rows_affected, "pruned rate-limit marks");

    let recent = RecalculationRateLimit::find()
        .filter(recalculation_rate_limit::Column::CreatedAt.gt(window_start))
        .count(txn).await?;

    if !admits(recent) {
        warn!(recent, "all-employee recalculation denied");
        return Err(PayrollError::RateLimited(format!(
            "only {RECALCULATION_RATE_LIMIT} all-employee recalculations are allowed every {RECALCULATION_RATE_WINDOW_MINUTES} minutes"
        )));
    }

    Ok(())
}

pub async fn mark_admitted<C: ConnectionTrait>(txn: &C, job_id: Uuid) -> Result<(), PayrollError> {
    let now = utils::now();

    RecalculationRateLimit::insert(recalculation_rate_limit::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        job_id: Set(job_id),
        ..Default::default()
    }).exec_without_returning(txn).await?;

    Ok(())
}

/// Inserts a `started` job; without `employee_id` it covers every active employee
pub async fn create_job<C: ConnectionTrait>(db: &C, date_from: NaiveDate, date_to: NaiveDate, employee_id: Option<Uuid>) -> Result<recalculation_log::Model, PayrollError> {
    let now = utils::now();

    let job = RecalculationLog::insert(recalculation_log::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        date_from: Set(date_from),
        date_to: Set(date_to),
        all_employees: Set(employee_id.is_none()),
        employee_id: Set(employee_id),
        status: Set(STARTED.to_string()),
        progress: Set(0),
        records_processed: Set(0),
        records_updated: Set(0),
        started_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }).exec_with_returning(db).await?;

    Ok(job)
}

pub async fn find_job<C: ConnectionTrait>(db: &C, job_id: Uuid) -> Result<recalculation_log::Model, PayrollError> {
    RecalculationLog::find_by_id(job_id)
        .one(db).await?
        .ok_or_else(|| PayrollError::not_found(format!("recalculation job {job_id} does not exist")))
}

pub fn history_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(HISTORY_DEFAULT_LIMIT).clamp(1, HISTORY_MAX_LIMIT)
}

/// Jobs that have not reached a terminal state, oldest first
pub async fn running_jobs<C: ConnectionTrait>(db: &C) -> Result<Vec<recalculation_log::Model>, PayrollError> {
    let jobs = RecalculationLog::find()
        .filter(recalculation_log::Column::Status.eq(STARTED))
        .order_by_asc(recalculation_log::Column::StartedAt)
        .all(db).await?;

    Ok(jobs)
}

/// Most recent jobs first
pub async fn history<C: ConnectionTrait>(db: &C, limit: Option<u64>) -> Result<Vec<recalculation_log::Model>, PayrollError> {
    let jobs = RecalculationLog::find()
        .order_by_desc(recalculation_log::Column::StartedAt)
        .limit(history_limit(limit))
        .all(db).await?;

    Ok(jobs)
}

// Every write below only touches jobs that are still running, terminal rows stay as they are.

pub async fn record_progress<C: ConnectionTrait>(db: &C, job_id: Uuid, progress: i16, tally: Tally) -> Result<(), PayrollError> {
    update_running(db, job_id, recalculation_log::ActiveModel {
        progress: Set(progress),
        records_processed: Set(tally.processed),
        records_updated: Set(tally.updated),
        ..Default::default()
    }).await
}

pub async fn complete<C: ConnectionTrait>(db: &C, job_id: Uuid, tally: Tally) -> Result<(), PayrollError> {
    update_running(db, job_id, recalculation_log::ActiveModel {
        status: Set(COMPLETED.to_string()),
        progress: Set(100),
        records_processed: Set(tally.processed),
        records_updated: Set(tally.updated),
        completed_at: Set(Some(utils::now())),
        ..Default::default()
    }).await
}

pub async fn fail<C: ConnectionTrait>(db: &C, job_id: Uuid, reason: &str) -> Result<(), PayrollError> {
    update_running(db, job_id, recalculation_log::ActiveModel {
        status: Set(format!("{FAILED_PREFIX}{reason}")),
        ..Default::default()
    }).await
}

async fn update_running<C: ConnectionTrait>(db: &C, job_id: Uuid, mut model: recalculation_log::ActiveModel) -> Result<(), PayrollError> {
    model.updated_at = Set(utils::now());

    RecalculationLog::update_many()
        .set(model)
        .filter(recalculation_log::Column::Id.eq(job_id))
        .filter(recalculation_log::Column::Status.eq(STARTED))
        .exec(db).await?;

    Ok(())
}

/// Human readable line describing where a job stands
pub fn message(job: &recalculation_log::Model) -> String {
    match job.status.as_str() {
        STARTED => format!("recalculation in progress ({}%)", job.progress),
        COMPLETED => format!("recalculation completed, {} of {} records updated", job.records_updated, job.records_processed),
        status => match status.strip_prefix(FAILED_PREFIX) {
            Some(reason) => format!("recalculation failed: {reason}"),
            None => status.to_string(),
        },
    }
}

/// Job state as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub status: String,
    pub progress: i16,
    pub message: String,
    pub records_processed: i32,
    pub records_updated: i32,
    pub all_employees: bool,
    pub employee_id: Option<Uuid>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub started_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl From<recalculation_log::Model> for JobSnapshot {
    fn from(job: recalculation_log::Model) -> Self {
        Self {
            message: message(&job),
            id: job.id,
            status: job.status,
            progress: job.progress,
            records_processed: job.records_processed,
            records_updated: job.records_updated,
            all_employees: job.all_employees,
            employee_id: job.employee_id,
            date_from: job.date_from,
            date_to: job.date_to,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Local, NaiveDate};
    use uuid::Uuid;

    use crate::entity::recalculation_log;

    pub(crate) fn job(employee_id: Option<Uuid>, status: &str, progress: i16) -> recalculation_log::Model {
        recalculation_log::Model {
            id: Uuid::new_v4(),
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            date_from: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            all_employees: employee_id.is_none(),
            employee_id,
            status: status.to_string(),
            progress,
            records_processed: 0,
            records_updated: 0,
            started_at: Local::now().into(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{MockDatabase, MockExecResult, Value};

    use super::*;

    fn count_row(count: i64) -> Vec<BTreeMap<&'static str, Value>> {
        vec![ BTreeMap::from([("num_items", Value::BigInt(Some(count)))]) ]
    }

    #[test]
    fn test_admits() {
        assert!(admits(0));
        assert!(admits(2));
        assert!(!admits(3));
        assert!(!admits(7));
    }

    #[test]
    fn test_history_limit() {
        assert_eq!(history_limit(None), 10);
        assert_eq!(history_limit(Some(0)), 1);
        assert_eq!(history_limit(Some(25)), 25);
        assert_eq!(history_limit(Some(1000)), 100);
    }

    #[test]
    fn test_message() {
        let mut job = fixtures::job(None, STARTED, 40);
        assert_eq!(message(&job), "recalculation in progress (40%)");

        job.status = COMPLETED.to_string();
        job.records_processed = 10;
        job.records_updated = 7;
        assert_eq!(message(&job), "recalculation completed, 7 of 10 records updated");

        job.status = "failed: connection reset".to_string();
        assert_eq!(message(&job), "recalculation failed: connection reset");
    }

    #[actix_web::test]
    async fn test_check_admission() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
                MockExecResult { last_insert_id: 0, rows_affected: 4 },
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
            ])
            .append_query_results([ count_row(2) ])
            .append_query_results([ count_row(3) ])
            .into_connection();

        check_admission(&db).await.unwrap();
        assert!(matches!(check_admission(&db).await, Err(PayrollError::RateLimited(_))));

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 6);
        assert!(log[1].statements()[0].sql.starts_with(r#"DELETE FROM "recalculation_rate_limit""#));
        assert!(log[1].statements()[0].sql.contains(r#""created_at" <="#));
    }

    #[actix_web::test]
    async fn test_running_jobs_filters_started() {
        let job = fixtures::job(None, STARTED, 40);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .into_connection();

        assert_eq!(running_jobs(&db).await.unwrap(), vec![ job ]);

        let log = db.into_transaction_log();
        assert!(log[0].statements()[0].sql.contains(r#"WHERE "recalculation_log"."status" = $1"#));
    }

    #[actix_web::test]
    async fn test_find_job() {
        let job = fixtures::job(None, STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
                vec![],
            ])
            .into_connection();

        assert_eq!(find_job(&db, job.id).await.unwrap(), job);
        assert!(matches!(find_job(&db, Uuid::new_v4()).await, Err(PayrollError::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_workers_drain_queue_and_stop() {
        let job = fixtures::job(None, COMPLETED, 100);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
            ])
            .into_connection();
        let db = web::Data::new(db);

        let (queue, receiver) = RecalculationQueue::new();
        spawn_workers(db.clone(), receiver, 2);

        queue.enqueue(job.id).unwrap();
        drop(queue);
        actix_web::rt::time::sleep(std::time::Duration::from_millis(50)).await;

        let db = std::sync::Arc::try_unwrap(db.into_inner()).ok().unwrap();
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[test]
    fn test_enqueue_after_receiver_dropped() {
        let (queue, receiver) = RecalculationQueue::new();
        queue.enqueue(Uuid::new_v4()).unwrap();

        drop(receiver);
        assert!(matches!(queue.enqueue(Uuid::new_v4()), Err(PayrollError::Store(_))));
    }
}
