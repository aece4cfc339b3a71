use axum::{extract::rejection::JsonRejection, Json};
use serde::Serialize;

use crate::error::{BookingError, BookingResult};

pub mod booking_controller;
pub mod health_controller;
pub mod movie_controller;
pub mod show_controller;
pub mod theatre_controller;
pub mod user_controller;

/// `{ "data": ... }` envelope used by the list endpoints.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Turns a JSON body rejection into a 400 with the usual error body.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> BookingResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| BookingError::InvalidRequest(rejection.body_text()))
}
