use std::sync::Arc;

use actix_web::{web, HttpResponse};
use currency_sync_logic::{correlator::Correlator, error::ServiceError};

const SUCCESS_PREFIX: &str = "По заданным параметрам успешно получен ответ : ";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/currencies/all", web::get().to(all))
        .route("/currencies/single/{code}", web::get().to(single))
        .route("/currencies/filter/{list}", web::get().to(filter))
        .route("/health", web::get().to(health));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn all(correlator: web::Data<Arc<Correlator>>) -> HttpResponse {
    respond(correlator.query("ALL", "").await)
}

async fn single(correlator: web::Data<Arc<Correlator>>, path: web::Path<String>) -> HttpResponse {
    respond(correlator.query("SINGLE", &path.into_inner()).await)
}

async fn filter(correlator: web::Data<Arc<Correlator>>, path: web::Path<String>) -> HttpResponse {
    respond(correlator.query("FILTER", &path.into_inner()).await)
}

fn respond(result: Result<String, ServiceError>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok()
            .content_type("application/json; charset=utf-8")
            .body(format!("{SUCCESS_PREFIX}{body}")),
        Err(err) => {
            let status = actix_web::http::StatusCode::from_u16(err.http_status())
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status).body(err.to_string())
        }
    }
}
