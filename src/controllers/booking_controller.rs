use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Json,
};
use serde_json::json;

use super::body;
use crate::auth::AuthUser;
use crate::error::BookingResult;
use crate::models::booking_model::{BookingCreatedResponse, BookingRequest, BookingResponse};
use crate::models::show_model::ShowResponse;
use crate::state::AppState;
use crate::utils::parse_object_id;

pub async fn add_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> BookingResult<Json<BookingCreatedResponse>> {
    let request = body(payload)?;
    let outcome = state.coordinator.book(user.user_id, &request).await?;

    state
        .feed
        .broadcast(
            "seats_updated",
            "success",
            json!(ShowResponse::from(outcome.show)),
        )
        .await;

    Ok(Json(BookingCreatedResponse {
        booking: outcome.booking.into(),
        updated_user: outcome.updated_user.map(Into::into),
    }))
}

pub async fn load_booking(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> BookingResult<Json<BookingResponse>> {
    let booking_id = parse_object_id(&id_str, "id")?;
    let booking = state.bookings.get(user.user_id, booking_id).await?;
    Ok(Json(booking.into()))
}

pub async fn cancel_booking(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> BookingResult<Json<BookingResponse>> {
    let booking_id = parse_object_id(&id_str, "id")?;
    let outcome = state.coordinator.cancel(user.user_id, booking_id).await?;

    if let Some(show) = outcome.show {
        state
            .feed
            .broadcast("seats_updated", "success", json!(ShowResponse::from(show)))
            .await;
    }
    Ok(Json(outcome.booking.into()))
}

pub async fn confirm_booking(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> BookingResult<Json<BookingResponse>> {
    let booking_id = parse_object_id(&id_str, "id")?;
    state.bookings.get(user.user_id, booking_id).await?;
    let booking = state.bookings.confirm(booking_id).await?;
    Ok(Json(booking.into()))
}
