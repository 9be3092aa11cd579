use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub backend: String,
    pub uptime_secs: u64,
    pub regions: usize,
}

/// Counter position and stored records for one region.
///
/// `counter - stored` is the number of sequence numbers lost to failed writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegionCounter {
    pub key: String,
    pub label: String,
    pub prefix: char,
    pub counter: u64,
    pub stored: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        backend: state.backend.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        regions: state.intake.regions().len(),
    })
}

pub async fn get_counters(
    State(state): State<AdminState>,
) -> Result<Json<Vec<RegionCounter>>, StatusCode> {
    let stores = state.intake.stores();
    let counters = stores.counters.snapshot().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read counters");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut out = Vec::new();
    for region in state.intake.regions().iter() {
        let stored = stores.submissions.count(&region.key).await.map_err(|e| {
            tracing::error!(region = %region.key, error = %e, "Failed to count submissions");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        out.push(RegionCounter {
            key: region.key.clone(),
            label: region.label.clone(),
            prefix: region.prefix,
            counter: counters.get(&region.key).copied().unwrap_or(0),
            stored,
        });
    }

    Ok(Json(out))
}
