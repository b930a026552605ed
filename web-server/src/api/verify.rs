// web-server/src/api/verify.rs
use actix_web::{http::header::ContentType, http::StatusCode, web, Error, HttpResponse};
use common::models::verification::{ErrorResponse, VerifiedResponse, VerifyInitDataRequest};

use crate::state::AppState;

const MISSING_INIT_DATA: &str = "Missing initData parameter";
const INVALID_BODY: &str = "Invalid request body";
const BODY_TOO_LARGE: &str = "Request body too large";
const INTERNAL_ERROR: &str = "Internal server error";
const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// Verify the init data the host handed to the Mini App.
///
/// Rejected payloads are a normal outcome and answer 200 with `valid: false`;
/// only request-shape and configuration problems map to 4xx/5xx.
pub async fn verify_init_data(
    state: web::Data<AppState>,
    body: Result<web::Bytes, Error>,
) -> HttpResponse {
    // Payload errors (size limit, broken stream) still get a JSON body
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            let status = e.as_response_error().status_code();
            tracing::warn!("Rejecting unreadable verification request: {}", e);
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                BODY_TOO_LARGE
            } else {
                INVALID_BODY
            };
            return HttpResponse::build(status).json(ErrorResponse::new(message));
        }
    };

    // An empty body is treated like `{}`
    let request = if body.is_empty() {
        VerifyInitDataRequest::default()
    } else {
        match serde_json::from_slice::<VerifyInitDataRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejecting malformed verification request: {}", e);
                return HttpResponse::BadRequest().json(ErrorResponse::new(INVALID_BODY));
            }
        }
    };

    let init_data = match request.init_data.filter(|data| !data.is_empty()) {
        Some(data) => data,
        None => {
            return HttpResponse::BadRequest().json(ErrorResponse::new(MISSING_INIT_DATA));
        }
    };

    let verifier = match state.verifier.as_ref() {
        Some(verifier) => verifier,
        None => {
            tracing::error!("Bot token is not configured, cannot verify init data");
            return HttpResponse::InternalServerError().json(ErrorResponse::new(INTERNAL_ERROR));
        }
    };

    match verifier.verify_now(&init_data) {
        Ok(data) => {
            match data.user_id() {
                Some(user_id) => tracing::info!("Init data verified for user {}", user_id),
                None => tracing::info!("Init data verified without user record"),
            }
            HttpResponse::Ok().json(VerifiedResponse::from(data))
        },
        Err(reason) => {
            tracing::warn!("Init data rejected: {}", reason.code());
            HttpResponse::Ok().json(ErrorResponse::from(reason))
        }
    }
}

/// CORS preflight: empty body, headers come from the CORS middleware
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().insert_header(ContentType::json()).finish()
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorResponse::new(METHOD_NOT_ALLOWED))
}
