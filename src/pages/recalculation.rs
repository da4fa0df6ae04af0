use std::str::FromStr;

use actix_web::{dev, get, post, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use futures_util::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::recalculation_log, error::PayrollError, payroll::{jobs::{self, JobSnapshot, RecalculationQueue}, recalculation::{self, AttendanceView, Scope, Window}}, utils};

use model::*;

mod extractor;
mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(start_recalculation)
        .service(get_status)
        .service(get_attendance)
        .service(record_attendance)
        .service(get_history);
}

#[post("/start")]
async fn start_recalculation(db: web::Data<DatabaseConnection>, queue: web::Data<RecalculationQueue>, payload: web::Json<StartRecalculation>) -> Result<impl Responder, PayrollError> {
    let window = Window::new(payload.date_from, payload.date_to)?;
    let scope = Scope::new(payload.all_employees, payload.employee_id)?;

    let job = recalculation::start(db.as_ref(), queue.as_ref(), window, scope).await?;

    Ok(HttpResponse::Accepted().json(JobSnapshot::from(job)))
}

#[get("/status/{job_id}")]
async fn get_status(job: recalculation_log::Model) -> impl Responder {
    web::Json(JobSnapshot::from(job))
}

#[get("/attendance/{job_id}")]
async fn get_attendance(db: web::Data<DatabaseConnection>, job: recalculation_log::Model) -> Result<impl Responder, PayrollError> {
    let attendance = recalculation::job_attendance(db.as_ref(), &job).await?;

    Ok(web::Json(attendance))
}

#[post("")]
async fn record_attendance(db: web::Data<DatabaseConnection>, payload: web::Json<ManualAttendance>) -> Result<impl Responder, PayrollError> {
    let check_in = utils::parse_optional_clock(payload.check_in.as_deref())?;
    let check_out = utils::parse_optional_clock(payload.check_out.as_deref())?;

    let record = recalculation::record_manual(db.as_ref(), payload.employee_id, payload.date, check_in, check_out).await?;

    Ok(web::Json(AttendanceView::from(record)))
}

#[get("/history")]
async fn get_history(db: web::Data<DatabaseConnection>, query: web::Query<HistoryQuery>) -> Result<impl Responder, PayrollError> {
    let history = jobs::history(db.as_ref(), query.limit).await?
        .into_iter()
        .map(JobSnapshot::from)
        .collect::<Vec<_>>();

    Ok(web::Json(history))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use actix_web::{http::{Method, StatusCode}, test, App};
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    use crate::{entity::{attendance, employee}, payroll::{attendance::fixtures as attendance_fixtures, employees::fixtures as employee_fixtures, jobs::fixtures as job_fixtures}};

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn start_request(all_employees: bool, employee_id: Option<Uuid>, date_from: NaiveDate, date_to: NaiveDate) -> test::TestRequest {
        test::TestRequest::default()
            .uri("/start")
            .method(Method::POST)
            .set_json(StartRecalculation { date_from, date_to, all_employees, employee_id })
    }

    #[actix_web::test]
    async fn test_start_rejects_bad_requests() {
        let employee_id = Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<employee::Model>::new(),
            ]);
        let (queue, _receiver) = RecalculationQueue::new();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(queue))
                .service(start_recalculation)
        ).await;

        let response = test::call_service(&app, start_request(true, None, day(2), day(1)).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, start_request(false, None, day(1), day(2)).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, start_request(false, Some(employee_id), day(1), day(2)).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_fourth_all_employee_recalculation_is_rate_limited() {
        let job = job_fixtures::job(None, jobs::STARTED, 0);
        let count = |n: i64| vec![ BTreeMap::from([("num_items", Value::BigInt(Some(n)))]) ];
        let admitted = MockExecResult { last_insert_id: 0, rows_affected: 1 };

        let mut db = MockDatabase::new(DatabaseBackend::Postgres);
        for recent in 0..3 {
            db = db
                .append_query_results([ count(recent) ])
                .append_query_results([ vec![ job.clone() ] ]);
        }
        let db = db
            .append_query_results([ count(3) ])
            .append_exec_results(vec![ admitted.clone(); 11 ]);

        let (queue, _receiver) = RecalculationQueue::new();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::new(queue))
                .service(start_recalculation)
        ).await;

        for _ in 0..3 {
            let response = test::call_service(&app, start_request(true, None, day(1), day(31)).to_request()).await;
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        let response = test::call_service(&app, start_request(true, None, day(1), day(31)).to_request()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_record_attendance() {
        let employee = employee_fixtures::employee("EMP-0001", dec!(500), day(1));
        let record = attendance_fixtures::record(employee.id, day(3), NaiveTime::from_hms_opt(9, 0, 0), NaiveTime::from_hms_opt(17, 30, 0));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .append_query_results([
                Vec::<attendance::Model>::new(),
                vec![ record.clone() ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/recalculation")
                    .service(record_attendance))
        ).await;

        let req = test::TestRequest::default()
            .uri("/recalculation")
            .method(Method::POST)
            .set_json(ManualAttendance {
                employee_id: employee.id,
                date: day(3),
                check_in: Some("09:00".to_string()),
                check_out: Some("17:30".to_string()),
            })
            .to_request();

        let view: AttendanceView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view.hours_worked, dec!(8.5));
        assert_eq!(view.check_out.as_deref(), Some("17:30"));
    }

    #[actix_web::test]
    async fn test_record_attendance_rejects_bad_clock() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/recalculation")
                    .service(record_attendance))
        ).await;

        let req = test::TestRequest::default()
            .uri("/recalculation")
            .method(Method::POST)
            .set_json(ManualAttendance {
                employee_id: Uuid::new_v4(),
                date: day(3),
                check_in: Some("9am".to_string()),
                check_out: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_history() {
        let recent = vec![
            job_fixtures::job(None, jobs::COMPLETED, 100),
            job_fixtures::job(None, jobs::STARTED, 40),
        ];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([ recent ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(get_history)
        ).await;

        let req = test::TestRequest::default()
            .uri("/history?limit=2")
            .to_request();

        let history: Vec<JobSnapshot> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].progress, 40);
        assert_eq!(history[1].message, "recalculation in progress (40%)");
    }
}
