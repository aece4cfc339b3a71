use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{self, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, BookingResult};
use crate::utils::{require_object_id, serialize_object_id};

/// A screening with its seat pool. `available_seats` stays within
/// `0..=total_seats` for the whole life of the show.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Show {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub theatre_id: ObjectId,
    pub movie_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    pub total_seats: u32,
    pub available_seats: u32,
    pub price_per_seat: f64,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShowResponse {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub theatre_id: ObjectId,
    #[serde(serialize_with = "serialize_object_id")]
    pub movie_id: ObjectId,
    pub start_time: DateTime<Utc>,
    pub total_seats: u32,
    pub available_seats: u32,
    pub price_per_seat: f64,
}

impl From<Show> for ShowResponse {
    fn from(show: Show) -> Self {
        Self {
            id: show.id,
            theatre_id: show.theatre_id,
            movie_id: show.movie_id,
            start_time: show.start_time,
            total_seats: show.total_seats,
            available_seats: show.available_seats,
            price_per_seat: show.price_per_seat,
        }
    }
}

/// Body of `POST /shows`. Every field is optional at the wire level so a
/// missing one becomes a 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewShow {
    pub theatre_id: Option<String>,
    pub movie_id: Option<String>,
    pub total_seats: Option<i64>,
    pub price_per_seat: Option<f64>,
    pub start_time: Option<String>,
}

impl NewShow {
    pub fn validate(&self) -> BookingResult<Show> {
        let theatre_id = require_object_id(self.theatre_id.as_deref(), "theatreId")?;
        let movie_id = require_object_id(self.movie_id.as_deref(), "movieId")?;
        let start_time = parse_timing(self.start_time.as_deref(), "startTime")?;

        let total_seats = match self.total_seats {
            Some(n) if n > 0 && n <= i64::from(u32::MAX) => n as u32,
            Some(_) => {
                return Err(BookingError::InvalidRequest(
                    "totalSeats must be a positive number".into(),
                ))
            }
            None => return Err(BookingError::InvalidRequest("totalSeats is missing".into())),
        };
        let price_per_seat = match self.price_per_seat {
            Some(p) if p.is_finite() && p >= 0.0 => p,
            Some(_) => {
                return Err(BookingError::InvalidRequest(
                    "pricePerSeat must be zero or more".into(),
                ))
            }
            None => {
                return Err(BookingError::InvalidRequest(
                    "pricePerSeat is missing".into(),
                ))
            }
        };

        Ok(Show {
            id: ObjectId::new(),
            theatre_id,
            movie_id,
            start_time,
            total_seats,
            available_seats: total_seats,
            price_per_seat,
        })
    }
}

/// Parses an RFC 3339 timestamp such as `2024-05-01T18:30:00Z`.
pub fn parse_timing(raw: Option<&str>, field: &str) -> BookingResult<DateTime<Utc>> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(BookingError::InvalidRequest(format!("{field} is missing"))),
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            BookingError::InvalidRequest(format!("{field} must be an RFC 3339 timestamp"))
        })
}

/// Typed show lookup. An absent field places no constraint on that axis.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShowFilter {
    pub theatre_id: Option<ObjectId>,
    pub movie_id: Option<ObjectId>,
    pub start_time: Option<DateTime<Utc>>,
}

impl ShowFilter {
    pub fn to_document(&self) -> Document {
        let mut query = Document::new();
        if let Some(theatre_id) = self.theatre_id {
            query.insert("theatre_id", theatre_id);
        }
        if let Some(movie_id) = self.movie_id {
            query.insert("movie_id", movie_id);
        }
        if let Some(start_time) = self.start_time {
            query.insert("start_time", bson::DateTime::from_chrono(start_time));
        }
        query
    }

    pub fn matches(&self, show: &Show) -> bool {
        self.theatre_id.map_or(true, |id| show.theatre_id == id)
            && self.movie_id.map_or(true, |id| show.movie_id == id)
            && self
                .start_time
                .map_or(true, |t| show.start_time.timestamp_millis() == t.timestamp_millis())
    }
}

/// Query string of `GET /shows`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShowQuery {
    pub theatre_id: Option<String>,
    pub movie_id: Option<String>,
    pub start_time: Option<String>,
}

impl ShowQuery {
    pub fn to_filter(&self) -> BookingResult<ShowFilter> {
        let id = |raw: &Option<String>, field: &str| -> BookingResult<Option<ObjectId>> {
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => require_object_id(Some(value), field).map(Some),
            }
        };
        let start_time = match self.start_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_timing(Some(value), "startTime")?),
        };
        Ok(ShowFilter {
            theatre_id: id(&self.theatre_id, "theatreId")?,
            movie_id: id(&self.movie_id, "movieId")?,
            start_time,
        })
    }
}
