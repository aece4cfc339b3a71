use mongodb::bson::oid::ObjectId;
use serde::{ser::SerializeSeq, Serializer};

use crate::error::BookingError;

pub fn serialize_object_id<S>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_hex())
}

pub fn serialize_object_ids<S>(ids: &[ObjectId], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(ids.len()))?;
    for id in ids {
        seq.serialize_element(&id.to_hex())?;
    }
    seq.end()
}

/// Parses a hex object id coming from a path or request body.
pub fn parse_object_id(raw: &str, field: &str) -> Result<ObjectId, BookingError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| BookingError::InvalidRequest(format!("{field} is not a valid id")))
}

/// Like [`parse_object_id`], but a missing or blank value is also rejected.
pub fn require_object_id(raw: Option<&str>, field: &str) -> Result<ObjectId, BookingError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => parse_object_id(value, field),
        _ => Err(BookingError::InvalidRequest(format!("{field} is missing"))),
    }
}

pub fn require_text(raw: Option<&str>, field: &str) -> Result<String, BookingError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(BookingError::InvalidRequest(format!("{field} is missing"))),
    }
}
