use actix_web::web;

mod bonus;
mod gratuity;
mod leave_encashment;
mod recalculation;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/recalculation")
            .configure(recalculation::config))
        .service(web::scope("/bonus")
            .configure(bonus::config))
        .service(web::scope("/leave-encashment")
            .configure(leave_encashment::config))
        .service(web::scope("/gratuity")
            .configure(gratuity::config));
}
