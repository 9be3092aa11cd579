//! Intake error types and their HTTP mapping.
//!
//! Every failure becomes `{"error": "<generic message>"}`. Storage detail is
//! logged here and never reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

pub const MISSING_FIELDS_MESSAGE: &str = "All fields are required.";
pub const INVALID_REGION_MESSAGE: &str = "Invalid region selected.";
pub const MALFORMED_BODY_MESSAGE: &str = "Invalid request body.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error saving file.";

/// Where a submission stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    IdAssigned,
    Persisted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Received => write!(f, "received"),
            Stage::Validated => write!(f, "validated"),
            Stage::IdAssigned => write!(f, "id_assigned"),
            Stage::Persisted => write!(f, "persisted"),
        }
    }
}

/// Errors that end a submission.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Body was not a JSON object.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing required fields")]
    MissingFields,

    #[error("unknown region label {0:?}")]
    InvalidRegion(String),

    /// Counter increment failed; no sequence number was consumed.
    #[error("counter increment failed: {0}")]
    Counter(#[source] StorageError),

    /// Record write failed after the counter advanced.
    #[error("writing submission {id} failed: {source}")]
    Persist {
        id: String,
        #[source]
        source: StorageError,
    },

    /// The detached submission task panicked or was aborted.
    #[error("submission task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntakeError {
    /// The stage this error short-circuits.
    pub fn stage(&self) -> Stage {
        match self {
            Self::MalformedBody(_) => Stage::Received,
            Self::MissingFields | Self::InvalidRegion(_) => Stage::Validated,
            Self::Counter(_) | Self::Task(_) => Stage::IdAssigned,
            Self::Persist { .. } => Stage::Persisted,
        }
    }

    /// True for client-caused failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedBody(_) | Self::MissingFields | Self::InvalidRegion(_)
        )
    }

    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MalformedBody(_) => (StatusCode::BAD_REQUEST, MALFORMED_BODY_MESSAGE),
            Self::MissingFields => (StatusCode::BAD_REQUEST, MISSING_FIELDS_MESSAGE),
            Self::InvalidRegion(_) => (StatusCode::BAD_REQUEST, INVALID_REGION_MESSAGE),
            Self::Counter(_) | Self::Persist { .. } | Self::Task(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkBody {
    pub ok: bool,
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if self.is_validation() {
            tracing::debug!(error = %self, stage = %self.stage(), "Submission rejected");
        } else {
            tracing::error!(error = %self, stage = %self.stage(), "Submission failed");
        }

        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}
