use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::PayrollError, payroll::encashment::{self, EncashmentRequest}};

use model::*;

mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(generate_encashment)
        .service(process_encashment)
        .service(preview_encashment);
}

#[post("/generate")]
async fn generate_encashment(db: web::Data<DatabaseConnection>, payload: web::Json<EncashmentRequest>) -> Result<impl Responder, PayrollError> {
    let generated = encashment::generate(db.as_ref(), payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(generated))
}

#[post("/process")]
async fn process_encashment(db: web::Data<DatabaseConnection>, payload: web::Json<ProcessEncashment>) -> Result<impl Responder, PayrollError> {
    let processed = encashment::process(db.as_ref(), &payload.payment_period).await?;

    Ok(web::Json(processed))
}

#[get("/employee/{employee_id}")]
async fn preview_encashment(db: web::Data<DatabaseConnection>, employee_id: web::Path<Uuid>, query: web::Query<PreviewQuery>) -> Result<impl Responder, PayrollError> {
    let preview = encashment::preview(db.as_ref(), employee_id.into_inner(), query.leave_type, query.cutoff_date, query.threshold).await?;

    Ok(web::Json(preview))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{entity::leave_encashment, payroll::{employees::{fixtures as employee_fixtures, EmployeeFilter}, encashment::{fixtures, EncashmentPreview, GeneratedEncashment}}};

    use super::*;

    #[actix_web::test]
    async fn test_generate_encashment() {
        let employee = employee_fixtures::employee("EMP-0001", dec!(500), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let cutoff_date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .append_query_results([
                Vec::<leave_encashment::Model>::new(),
            ])
            .append_query_results([
                vec![ fixtures::balance(employee.id, dec!(20), cutoff_date) ],
            ])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(generate_encashment)
        ).await;

        let req = test::TestRequest::default()
            .uri("/generate")
            .method(Method::POST)
            .set_json(EncashmentRequest {
                payment_period: "2025-06".to_string(),
                filter: EmployeeFilter::default(),
                leave_type: 7,
                cutoff_date,
                threshold: dec!(15),
            })
            .to_request();

        let generated: GeneratedEncashment = test::call_and_read_body_json(&app, req).await;
        assert_eq!(generated.eligible_count, 1);
        assert_eq!(generated.per_employee[0].encash_days, dec!(5));
        assert_eq!(generated.total_payable, dec!(2500));
    }

    #[actix_web::test]
    async fn test_process_without_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<leave_encashment::Model>::new(),
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(process_encashment)
        ).await;

        let req = test::TestRequest::default()
            .uri("/process")
            .method(Method::POST)
            .set_json(ProcessEncashment { payment_period: "2025-06".to_string() })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_preview_encashment() {
        let employee = employee_fixtures::employee("EMP-0001", dec!(500), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let as_on = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ employee.clone() ],
            ])
            .append_query_results([
                vec![ fixtures::balance(employee.id, dec!(20), as_on) ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(preview_encashment)
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/employee/{}?leave_type=7&cutoff_date=2025-06-30&threshold=15", employee.id))
            .to_request();

        let preview: EncashmentPreview = test::call_and_read_body_json(&app, req).await;
        assert_eq!(preview.balance_as_on, Some(as_on));
        assert_eq!(preview.encash_days, dec!(5));
        assert_eq!(preview.encash_amount, dec!(2500));
    }
}
