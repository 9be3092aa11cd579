//! Public route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::server::AppState;
use crate::intake::error::OkBody;
use crate::intake::{IntakeError, RawForm};

/// `POST /save`: register one submission.
///
/// The generated ID is deliberately not returned. Only a JSON object is a
/// form; arrays and scalars are malformed bodies.
pub async fn save(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(object)) => RawForm::from(object),
        Err(rejection) => {
            return IntakeError::MalformedBody(rejection.body_text()).into_response();
        }
    };

    match state.intake.submit_detached(form).await {
        Ok(_) => Json(OkBody { ok: true }).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Serialize)]
pub struct RegionView {
    pub label: String,
    pub key: String,
    pub prefix: char,
}

/// `GET /regions`: the labels the form may submit.
pub async fn list_regions(State(state): State<AppState>) -> Json<Vec<RegionView>> {
    let regions = state
        .intake
        .regions()
        .iter()
        .map(|r| RegionView {
            label: r.label.clone(),
            key: r.key.clone(),
            prefix: r.prefix,
        })
        .collect();

    Json(regions)
}

/// `GET /health`.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
