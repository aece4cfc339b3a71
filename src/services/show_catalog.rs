use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::show_model::{NewShow, Show, ShowFilter};
use crate::store::{SeatReservation, Store};

/// Attempts made to hand seats back when a booking could not be recorded.
const RELEASE_ATTEMPTS: u32 = 3;
const RELEASE_BACKOFF_MS: u64 = 50;

/// Seat-pool bookkeeping. Every mutation is a single conditional store write,
/// serialized per show and independent across shows.
#[derive(Clone)]
pub struct ShowCatalog {
    store: Arc<dyn Store>,
}

impl ShowCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_show(&self, input: &NewShow) -> BookingResult<Show> {
        let show = input.validate()?;

        if self.store.find_theatre(show.theatre_id).await?.is_none() {
            return Err(BookingError::not_found("Theatre", show.theatre_id));
        }
        if self.store.find_movie(show.movie_id).await?.is_none() {
            return Err(BookingError::not_found("Movie", show.movie_id));
        }

        self.store.insert_show(&show).await?;
        tracing::info!(
            show_id = %show.id,
            theatre_id = %show.theatre_id,
            movie_id = %show.movie_id,
            total_seats = show.total_seats,
            "Show created"
        );
        Ok(show)
    }

    pub async fn reserve_seats(&self, show_id: ObjectId, count: u32) -> BookingResult<Show> {
        if count == 0 {
            return Err(BookingError::InvalidRequest(
                "seat count must be greater than zero".into(),
            ));
        }
        match self.store.reserve_seats(show_id, count).await? {
            SeatReservation::Reserved(show) => {
                tracing::debug!(%show_id, count, available = show.available_seats, "Seats reserved");
                Ok(show)
            }
            SeatReservation::Insufficient { available } => {
                Err(BookingError::InsufficientCapacity {
                    requested: count,
                    available,
                })
            }
            SeatReservation::Missing => Err(BookingError::not_found("Show", show_id)),
        }
    }

    /// Returns seats to the pool. The pool is clamped at `total_seats`, so an
    /// over-release can never credit seats that were never sold.
    pub async fn release_seats(&self, show_id: ObjectId, count: u32) -> BookingResult<Show> {
        let show = self
            .store
            .release_seats(show_id, count)
            .await?
            .ok_or_else(|| BookingError::not_found("Show", show_id))?;
        tracing::debug!(%show_id, count, available = show.available_seats, "Seats released");
        Ok(show)
    }

    /// [`Self::release_seats`] with a bounded exponential backoff, used for
    /// compensation where giving up leaks seats.
    pub async fn release_with_retry(&self, show_id: ObjectId, count: u32) -> BookingResult<Show> {
        let mut attempt = 0;
        loop {
            match self.release_seats(show_id, count).await {
                Ok(show) => return Ok(show),
                Err(err @ BookingError::NotFound { .. }) => return Err(err),
                Err(err) => {
                    attempt += 1;
                    if attempt >= RELEASE_ATTEMPTS {
                        return Err(err);
                    }
                    tracing::warn!(%show_id, attempt, error = %err, "Seat release failed, retrying");
                    tokio::time::sleep(Duration::from_millis(RELEASE_BACKOFF_MS << attempt)).await;
                }
            }
        }
    }

    /// Shows matching the filter, minus those whose theatre has been deleted.
    pub async fn get_shows(&self, filter: &ShowFilter) -> BookingResult<Vec<Show>> {
        let shows = self.store.find_shows(filter).await?;

        let mut theatre_ids: Vec<ObjectId> = shows.iter().map(|s| s.theatre_id).collect();
        theatre_ids.sort();
        theatre_ids.dedup();
        let live = self.store.existing_theatres(&theatre_ids).await?;

        let shows: Vec<Show> = shows
            .into_iter()
            .filter(|s| live.contains(&s.theatre_id))
            .collect();
        if shows.is_empty() {
            return Err(BookingError::NotFound {
                entity: "Show",
                id: describe(filter),
            });
        }
        Ok(shows)
    }
}

fn describe(filter: &ShowFilter) -> String {
    let mut parts = Vec::new();
    if let Some(theatre_id) = filter.theatre_id {
        parts.push(format!("theatre {theatre_id}"));
    }
    if let Some(movie_id) = filter.movie_id {
        parts.push(format!("movie {movie_id}"));
    }
    if let Some(start_time) = filter.start_time {
        parts.push(format!("start {}", start_time.to_rfc3339()));
    }
    if parts.is_empty() {
        "any".to_string()
    } else {
        parts.join(", ")
    }
}
