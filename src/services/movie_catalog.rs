use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::movie_model::{Movie, MovieUpdate, NewMovie};
use crate::store::Store;

#[derive(Clone)]
pub struct MovieCatalog {
    store: Arc<dyn Store>,
}

impl MovieCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewMovie) -> BookingResult<Movie> {
        let movie = Movie::new(input)?;
        if self.store.find_movie_by_title(&movie.title).await?.is_some() {
            return Err(BookingError::Duplicate(format!(
                "movie titled {} already exists",
                movie.title
            )));
        }
        self.store.insert_movie(&movie).await?;
        tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie created");
        Ok(movie)
    }

    pub async fn get(&self, id: ObjectId) -> BookingResult<Movie> {
        self.store
            .find_movie(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Movie", id))
    }

    /// All movies, or with `name` those whose title contains it ignoring
    /// case. A name search with no hits is NotFound.
    pub async fn list(&self, name: Option<&str>) -> BookingResult<Vec<Movie>> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let movies = self.store.list_movies(name).await?;
        match name {
            Some(name) if movies.is_empty() => Err(BookingError::not_found("Movie", name)),
            _ => Ok(movies),
        }
    }

    pub async fn update(&self, id: ObjectId, update: MovieUpdate) -> BookingResult<Movie> {
        let update = update.validate()?;
        let movie = self
            .store
            .update_movie(id, &update)
            .await?
            .ok_or_else(|| BookingError::not_found("Movie", id))?;
        tracing::info!(movie_id = %id, "Movie updated");
        Ok(movie)
    }

    pub async fn delete(&self, id: ObjectId) -> BookingResult<()> {
        if !self.store.delete_movie(id).await? {
            return Err(BookingError::not_found("Movie", id));
        }
        tracing::info!(movie_id = %id, "Movie deleted");
        Ok(())
    }
}
