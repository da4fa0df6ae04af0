use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

use crate::{error::PayrollError, payroll::{bonus::{self, BonusRequest}, configuration::{self, BonusSettings}}};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_configuration)
        .service(set_configuration)
        .service(generate_bonus)
        .service(get_summary)
        .service(process_bonus)
        .service(delete_bonus);
}

#[get("/configuration")]
async fn get_configuration(db: web::Data<DatabaseConnection>) -> Result<impl Responder, PayrollError> {
    let config = configuration::active_bonus(db.as_ref()).await?;

    Ok(web::Json(config))
}

#[post("/configuration")]
async fn set_configuration(db: web::Data<DatabaseConnection>, payload: web::Json<BonusSettings>) -> Result<impl Responder, PayrollError> {
    let config = configuration::replace_bonus(db.as_ref(), &payload).await?;

    Ok(HttpResponse::Created().json(config))
}

#[post("/generate")]
async fn generate_bonus(db: web::Data<DatabaseConnection>, payload: web::Json<BonusRequest>) -> Result<impl Responder, PayrollError> {
    let generated = bonus::generate(db.as_ref(), payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(generated))
}

#[get("/summary/{period}")]
async fn get_summary(db: web::Data<DatabaseConnection>, period: web::Path<String>) -> Result<impl Responder, PayrollError> {
    let statement = bonus::summary(db.as_ref(), &period).await?;

    Ok(web::Json(statement))
}

#[post("/process/{period}")]
async fn process_bonus(db: web::Data<DatabaseConnection>, period: web::Path<String>) -> Result<impl Responder, PayrollError> {
    let processed = bonus::process(db.as_ref(), &period).await?;

    Ok(web::Json(processed))
}

#[delete("/delete/{period}")]
async fn delete_bonus(db: web::Data<DatabaseConnection>, period: web::Path<String>) -> Result<impl Responder, PayrollError> {
    let deleted = bonus::delete(db.as_ref(), &period).await?;

    Ok(web::Json(deleted))
}
