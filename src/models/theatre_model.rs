use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, BookingResult};
use crate::utils::{require_text, serialize_object_id, serialize_object_ids};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Theatre {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub address: String,
    /// Membership set of screened movies. Never holds duplicates.
    #[serde(default)]
    pub movies: Vec<ObjectId>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TheatreResponse {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub address: String,
    #[serde(serialize_with = "serialize_object_ids")]
    pub movies: Vec<ObjectId>,
}

impl From<Theatre> for TheatreResponse {
    fn from(theatre: Theatre) -> Self {
        Self {
            id: theatre.id,
            name: theatre.name,
            description: theatre.description,
            city: theatre.city,
            postal_code: theatre.postal_code,
            address: theatre.address,
            movies: theatre.movies,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTheatre {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
}

impl Theatre {
    /// Validates a registration payload. The movie set always starts empty.
    pub fn new(input: NewTheatre) -> BookingResult<Theatre> {
        Ok(Theatre {
            id: ObjectId::new(),
            name: require_text(input.name.as_deref(), "name")?,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            city: require_text(input.city.as_deref(), "city")?,
            postal_code: require_text(input.postal_code.as_deref(), "postalCode")?,
            address: require_text(input.address.as_deref(), "address")?,
            movies: Vec::new(),
        })
    }
}

/// Fields a theatre update may change. The movie set has its own route and
/// is never touched here.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TheatreUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
}

impl TheatreUpdate {
    pub fn validate(self) -> BookingResult<TheatreUpdate> {
        let text = |value: Option<String>, field: &str| -> BookingResult<Option<String>> {
            value
                .map(|v| require_text(Some(v.as_str()), field))
                .transpose()
        };
        let update = TheatreUpdate {
            name: text(self.name, "name")?,
            description: text(self.description, "description")?,
            city: text(self.city, "city")?,
            postal_code: text(self.postal_code, "postalCode")?,
            address: text(self.address, "address")?,
        };
        if update.to_document().is_empty() {
            return Err(BookingError::InvalidRequest(
                "no updatable fields were provided".into(),
            ));
        }
        Ok(update)
    }

    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        let fields = [
            ("name", &self.name),
            ("description", &self.description),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("address", &self.address),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                set.insert(key, value.clone());
            }
        }
        set
    }

    pub fn apply(&self, theatre: &mut Theatre) {
        if let Some(name) = &self.name {
            theatre.name = name.clone();
        }
        if let Some(description) = &self.description {
            theatre.description = Some(description.clone());
        }
        if let Some(city) = &self.city {
            theatre.city = city.clone();
        }
        if let Some(postal_code) = &self.postal_code {
            theatre.postal_code = postal_code.clone();
        }
        if let Some(address) = &self.address {
            theatre.address = address.clone();
        }
    }
}

/// Body of `PATCH /theatres/:id/movies`.
#[derive(Deserialize, Debug, Clone)]
pub struct TheatreMoviesUpdate {
    #[serde(default)]
    pub movies: Vec<String>,
    /// `true` adds the movies to the set, `false` removes them.
    pub insert: Option<bool>,
}
