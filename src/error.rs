use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;

use crate::models::booking_model::BookingStatus;

/// Every failure the booking core can report.
///
/// Capacity and transition errors are business outcomes and travel unchanged
/// from the component that detected them up to the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Malformed or missing input.
    #[error("{0}")]
    InvalidRequest(String),

    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The show's seat pool cannot cover the request.
    #[error("requested {requested} seats but only {available} are available")]
    InsufficientCapacity { requested: u32, available: u32 },

    /// The booking state machine does not allow this move.
    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// A uniqueness key (theatre name, movie title, user email) is taken.
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Storage or task failure. The message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for BookingError {
    fn from(err: mongodb::error::Error) -> Self {
        BookingError::Internal(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for BookingError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        BookingError::Internal(format!("malformed document: {err}"))
    }
}

impl From<mongodb::bson::ser::Error> for BookingError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        BookingError::Internal(format!("unserializable document: {err}"))
    }
}

/// Maps a unique-index violation (server code 11000) to [`BookingError::Duplicate`].
pub fn classify_write_error(err: mongodb::error::Error, what: &str) -> BookingError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        if write_error.code == 11000 {
            return BookingError::Duplicate(format!("{what} already exists"));
        }
    }
    err.into()
}

pub type BookingResult<T> = Result<T, BookingError>;

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            BookingError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            BookingError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            BookingError::InsufficientCapacity { .. } => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_CAPACITY",
                self.to_string(),
            ),
            BookingError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", self.to_string())
            }
            BookingError::Duplicate(msg) => (StatusCode::CONFLICT, "DUPLICATE", msg.clone()),
            BookingError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            BookingError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
