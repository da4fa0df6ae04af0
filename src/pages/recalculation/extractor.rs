use super::*;

impl FromRequest for recalculation_log::Model {
    type Error = PayrollError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let job_id = req.match_info().get("job_id").expect("This extractor must be used under `job_id` path");
            let Ok(job_id) = Uuid::from_str(job_id) else {
                return Err(PayrollError::validation("invalid `job_id`"));
            };

            let db = req.app_data::<web::Data<DatabaseConnection>>().expect("DatabaseConnection must be attached");

            jobs::find_job(db.as_ref(), job_id).await
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::payroll::jobs::fixtures;

    use super::*;

    #[actix_web::test]
    async fn test_job_extractor() {
        #[get("/{job_id}")]
        async fn test_handler(job: recalculation_log::Model) -> impl Responder {
            web::Json(job)
        }

        let job = fixtures::job(None, jobs::STARTED, 0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ job.clone() ],
                vec![],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(test_handler)
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/{}", job.id))
            .to_request();

        let returned_job: recalculation_log::Model = test::call_and_read_body_json(&app, req).await;
        assert_eq!(returned_job, job);

        let req = test::TestRequest::default()
            .uri(&format!("/{}", Uuid::new_v4()))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::default()
            .uri("/not-a-job")
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
