use std::fs::OpenOptions;

use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::payroll::{jobs::{self, RecalculationQueue}, recalculation};

mod config;
mod consts;
mod error;
mod utils;

mod entity;
mod payroll;
mod pages;

#[actix_web::main]
async fn main() {
    let _ = dotenvy::dotenv();
    
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")
        .unwrap();
    
    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );
    
    tracing::subscriber::set_global_default(subscriber).unwrap();
    
    let config::Config {
        host_address,
        database_opt,
        recalculation_workers,
    } = config::load();
    
    let db = Database::connect(database_opt).await.expect("Unable to connect to database");
    Migrator::up(&db, None).await.expect("Unable to apply migrations");

    let database = web::Data::new(db);

    let (queue, receiver) = RecalculationQueue::new();
    jobs::spawn_workers(database.clone(), receiver, recalculation_workers);
    let resumed = recalculation::resume(database.as_ref(), &queue).await.expect("Unable to resume recalculation jobs");
    info!(workers = recalculation_workers, resumed, "recalculation workers started");

    let queue = web::Data::new(queue);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(queue.clone())
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    });
    
    server
        .bind(host_address).unwrap()
        .run().await.unwrap();
}
