use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::utils::serialize_object_id;

use super::user_model::UserResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    InProcess,
    Successful,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::InProcess => "IN_PROCESS",
            BookingStatus::Successful => "SUCCESSFUL",
            BookingStatus::Canceled => "CANCELED",
        }
    }

    /// States a booking may leave towards `to`.
    pub fn sources_of(to: BookingStatus) -> &'static [BookingStatus] {
        match to {
            BookingStatus::InProcess => &[],
            BookingStatus::Successful => &[BookingStatus::InProcess],
            BookingStatus::Canceled => &[BookingStatus::InProcess, BookingStatus::Successful],
        }
    }

    pub fn can_move_to(self, to: BookingStatus) -> bool {
        BookingStatus::sources_of(to).contains(&self)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub theatre_id: ObjectId,
    pub movie_id: ObjectId,
    pub show_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timing: DateTime<Utc>,
    pub seat_count: u32,
    pub total_cost: f64,
    pub status: BookingStatus,
    /// Set once the seats of a CANCELED booking are back in the show's pool.
    /// The flip from `false` to `true` is the release's idempotency record.
    #[serde(default)]
    pub seats_released: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub user_id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub theatre_id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub movie_id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub show_id: ObjectId,
    pub timing: DateTime<Utc>,
    pub seat_count: u32,
    pub total_cost: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            theatre_id: booking.theatre_id,
            movie_id: booking.movie_id,
            show_id: booking.show_id,
            timing: booking.timing,
            seat_count: booking.seat_count,
            total_cost: booking.total_cost,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

/// Body of `POST /bookings`; the user comes from the bearer token.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub theatre_id: Option<String>,
    pub movie_id: Option<String>,
    pub timing: Option<String>,
    pub seat_count: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedResponse {
    pub booking: BookingResponse,
    pub updated_user: Option<UserResponse>,
}
