use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, BookingResult};
use crate::utils::{require_text, serialize_object_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    #[default]
    Released,
    Upcoming,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub cast: Vec<String>,
    pub trailer_url: String,
    pub language: String,
    pub release_date: String,
    pub director: String,
    pub release_status: ReleaseStatus,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub cast: Vec<String>,
    pub trailer_url: String,
    pub language: String,
    pub release_date: String,
    pub director: String,
    pub release_status: ReleaseStatus,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            cast: movie.cast,
            trailer_url: movie.trailer_url,
            language: movie.language,
            release_date: movie.release_date,
            director: movie.director,
            release_status: movie.release_status,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cast: Option<Vec<String>>,
    pub trailer_url: Option<String>,
    pub language: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub release_status: Option<ReleaseStatus>,
}

impl Movie {
    /// Validates a creation payload and fills in the catalog defaults
    /// (language `English`, status `RELEASED`).
    pub fn new(input: NewMovie) -> BookingResult<Movie> {
        let cast = clean_cast(input.cast.unwrap_or_default())?;
        Ok(Movie {
            id: ObjectId::new(),
            title: require_text(input.title.as_deref(), "title")?,
            description: require_text(input.description.as_deref(), "description")?,
            cast,
            trailer_url: require_text(input.trailer_url.as_deref(), "trailerUrl")?,
            language: input
                .language
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "English".to_string()),
            release_date: require_text(input.release_date.as_deref(), "releaseDate")?,
            director: require_text(input.director.as_deref(), "director")?,
            release_status: input.release_status.unwrap_or_default(),
        })
    }
}

fn clean_cast(cast: Vec<String>) -> BookingResult<Vec<String>> {
    let cast: Vec<String> = cast
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if cast.is_empty() {
        return Err(BookingError::InvalidRequest(
            "cast must name at least one member".into(),
        ));
    }
    Ok(cast)
}

/// The only fields a movie update may touch. Anything else in the payload,
/// release status included, is ignored.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cast: Option<Vec<String>>,
    pub trailer_url: Option<String>,
    pub language: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
}

impl MovieUpdate {
    /// Trims every provided field and rejects blanks and empty updates.
    pub fn validate(self) -> BookingResult<MovieUpdate> {
        let text = |value: Option<String>, field: &str| -> BookingResult<Option<String>> {
            value
                .map(|v| require_text(Some(v.as_str()), field))
                .transpose()
        };
        let update = MovieUpdate {
            title: text(self.title, "title")?,
            description: text(self.description, "description")?,
            cast: self.cast.map(clean_cast).transpose()?,
            trailer_url: text(self.trailer_url, "trailerUrl")?,
            language: text(self.language, "language")?,
            release_date: text(self.release_date, "releaseDate")?,
            director: text(self.director, "director")?,
        };
        if update.to_document().is_empty() {
            return Err(BookingError::InvalidRequest(
                "no updatable fields were provided".into(),
            ));
        }
        Ok(update)
    }

    /// `$set` body using the stored field names.
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(title) = &self.title {
            set.insert("title", title.clone());
        }
        if let Some(description) = &self.description {
            set.insert("description", description.clone());
        }
        if let Some(cast) = &self.cast {
            set.insert("cast", cast.clone());
        }
        if let Some(trailer_url) = &self.trailer_url {
            set.insert("trailer_url", trailer_url.clone());
        }
        if let Some(language) = &self.language {
            set.insert("language", language.clone());
        }
        if let Some(release_date) = &self.release_date {
            set.insert("release_date", release_date.clone());
        }
        if let Some(director) = &self.director {
            set.insert("director", director.clone());
        }
        set
    }

    pub fn apply(&self, movie: &mut Movie) {
        if let Some(title) = &self.title {
            movie.title = title.clone();
        }
        if let Some(description) = &self.description {
            movie.description = description.clone();
        }
        if let Some(cast) = &self.cast {
            movie.cast = cast.clone();
        }
        if let Some(trailer_url) = &self.trailer_url {
            movie.trailer_url = trailer_url.clone();
        }
        if let Some(language) = &self.language {
            movie.language = language.clone();
        }
        if let Some(release_date) = &self.release_date {
            movie.release_date = release_date.clone();
        }
        if let Some(director) = &self.director {
            movie.director = director.clone();
        }
    }
}
