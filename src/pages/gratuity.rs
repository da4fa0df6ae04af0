use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::PayrollError, payroll::{configuration::{self, GratuitySettings}, gratuity::{self, GratuityRequest}}};

use model::*;

mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(compute_gratuity)
        .service(get_configuration)
        .service(set_configuration)
        .service(process_gratuity)
        .service(preview_gratuity);
}

#[post("/compute")]
async fn compute_gratuity(db: web::Data<DatabaseConnection>, payload: web::Json<GratuityRequest>) -> Result<impl Responder, PayrollError> {
    let summary = gratuity::compute(db.as_ref(), payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(summary))
}

#[get("/configuration")]
async fn get_configuration(db: web::Data<DatabaseConnection>) -> Result<impl Responder, PayrollError> {
    let config = configuration::active_gratuity(db.as_ref()).await?;

    Ok(web::Json(config))
}

#[post("/configuration")]
async fn set_configuration(db: web::Data<DatabaseConnection>, payload: web::Json<GratuitySettings>) -> Result<impl Responder, PayrollError> {
    let config = configuration::replace_gratuity(db.as_ref(), &payload).await?;

    Ok(HttpResponse::Created().json(config))
}

#[post("/process")]
async fn process_gratuity(db: web::Data<DatabaseConnection>, payload: web::Json<ProcessGratuity>) -> Result<impl Responder, PayrollError> {
    let processed = gratuity::process(db.as_ref(), payload.month, payload.year).await?;

    Ok(web::Json(processed))
}

#[get("/employee/{employee_id}")]
async fn preview_gratuity(db: web::Data<DatabaseConnection>, employee_id: web::Path<Uuid>, query: web::Query<PreviewQuery>) -> Result<impl Responder, PayrollError> {
    let preview = gratuity::preview(db.as_ref(), employee_id.into_inner(), query.cutoff_date).await?;

    Ok(web::Json(preview))
}
