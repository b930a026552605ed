// web-server/src/api/mod.rs
pub mod verify;

use actix_web::{get, http::Method, web, HttpResponse, Responder};
use common::models::verification::ErrorResponse;
use serde_json::json;

use crate::middleware::Cors;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(Cors::default())
            .service(api_index)
            .service(
                web::resource("/verify-telegram-data")
                    .route(web::post().to(verify::verify_init_data))
                    .route(web::method(Method::OPTIONS).to(verify::preflight))
                    .default_service(web::to(verify::method_not_allowed)),
            )
            .default_service(web::to(not_found)),
    );
}

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Mini App Server API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Not found"))
}
