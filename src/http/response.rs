//! Response hardening.
//!
//! # Design Decisions
//! - Headers only added when the handler did not set them
//! - Applied to every response, including static files
//! - Bodyless middleware rejections (timeout, body limit) are given a JSON body

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::intake::error::ErrorBody;

pub const REQUEST_TIMEOUT_MESSAGE: &str = "Request timed out.";
pub const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large.";

/// Replace the plain responses of the timeout and body-limit layers with
/// `{"error": ...}`. Responses that are already JSON pass through.
pub async fn json_rejections(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;

    let message = match response.status() {
        StatusCode::REQUEST_TIMEOUT => REQUEST_TIMEOUT_MESSAGE,
        StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE_MESSAGE,
        _ => return response,
    };
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }

    (
        response.status(),
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Add baseline security headers to every response.
pub fn with_security_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
}
