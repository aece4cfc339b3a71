use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::movie_model::Movie;
use crate::store::Store;

/// The many-to-many "theatre screens movie" relation, kept as a set on the
/// theatre. Both directions of change are idempotent.
#[derive(Clone)]
pub struct TheatreMovieAssociation {
    store: Arc<dyn Store>,
}

impl TheatreMovieAssociation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Set union. Every movie must exist; nothing is written otherwise.
    pub async fn add_movies(
        &self,
        theatre_id: ObjectId,
        movie_ids: &[ObjectId],
    ) -> BookingResult<Vec<Movie>> {
        if movie_ids.is_empty() {
            return Err(BookingError::InvalidRequest(
                "movies must list at least one id".into(),
            ));
        }
        if self.store.find_theatre(theatre_id).await?.is_none() {
            return Err(BookingError::not_found("Theatre", theatre_id));
        }

        let mut wanted = movie_ids.to_vec();
        wanted.sort();
        wanted.dedup();
        let known = self.store.existing_movies(&wanted).await?;
        if let Some(missing) = wanted.iter().find(|id| !known.contains(id)) {
            return Err(BookingError::not_found("Movie", missing));
        }

        if !self.store.add_theatre_movies(theatre_id, &wanted).await? {
            return Err(BookingError::not_found("Theatre", theatre_id));
        }
        tracing::info!(%theatre_id, count = wanted.len(), "Movies added to theatre");
        self.movies_at(theatre_id, None).await
    }

    /// Set difference. Ids that were never members are ignored.
    pub async fn remove_movies(
        &self,
        theatre_id: ObjectId,
        movie_ids: &[ObjectId],
    ) -> BookingResult<Vec<Movie>> {
        if !self.store.remove_theatre_movies(theatre_id, movie_ids).await? {
            return Err(BookingError::not_found("Theatre", theatre_id));
        }
        tracing::info!(%theatre_id, count = movie_ids.len(), "Movies removed from theatre");
        self.movies_at(theatre_id, None).await
    }

    /// Resolved movies screened at the theatre. With `movie_id`, only that
    /// entry, or nothing when it is not screened there.
    pub async fn movies_at(
        &self,
        theatre_id: ObjectId,
        movie_id: Option<ObjectId>,
    ) -> BookingResult<Vec<Movie>> {
        self.store
            .theatre_movies(theatre_id, movie_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Theatre", theatre_id))
    }
}
