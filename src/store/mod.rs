//! Persistence seam for the booking core.
//!
//! Every method that mutates a seat pool or a booking status is a single
//! conditional write: the precondition (enough seats, expected status,
//! release not yet claimed) is checked in the same step that applies the
//! change, so concurrent callers can never both pass it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::error::BookingResult;
use crate::models::{
    booking_model::{Booking, BookingStatus},
    movie_model::{Movie, MovieUpdate},
    payment_model::Payment,
    show_model::{Show, ShowFilter},
    theatre_model::{Theatre, TheatreUpdate},
    user_model::User,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Result of a conditional seat decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatReservation {
    Reserved(Show),
    Insufficient { available: u32 },
    Missing,
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- theatres ---
    async fn insert_theatre(&self, theatre: &Theatre) -> BookingResult<()>;
    async fn find_theatre(&self, id: ObjectId) -> BookingResult<Option<Theatre>>;
    async fn find_theatre_by_name(&self, name: &str) -> BookingResult<Option<Theatre>>;
    async fn list_theatres(&self, city: Option<&str>) -> BookingResult<Vec<Theatre>>;
    async fn update_theatre(
        &self,
        id: ObjectId,
        update: &TheatreUpdate,
    ) -> BookingResult<Option<Theatre>>;
    async fn delete_theatre(&self, id: ObjectId) -> BookingResult<bool>;
    /// Subset of `ids` naming theatres that still exist.
    async fn existing_theatres(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>>;
    /// Set union on the theatre's movies. `false` when the theatre is unknown.
    async fn add_theatre_movies(&self, id: ObjectId, movies: &[ObjectId]) -> BookingResult<bool>;
    /// Set difference on the theatre's movies. `false` when the theatre is unknown.
    async fn remove_theatre_movies(&self, id: ObjectId, movies: &[ObjectId])
        -> BookingResult<bool>;
    /// Resolved movies screened at a theatre, optionally narrowed to one
    /// movie, in one query. `None` when the theatre is unknown.
    async fn theatre_movies(
        &self,
        id: ObjectId,
        movie: Option<ObjectId>,
    ) -> BookingResult<Option<Vec<Movie>>>;

    // --- movies ---
    async fn insert_movie(&self, movie: &Movie) -> BookingResult<()>;
    async fn find_movie(&self, id: ObjectId) -> BookingResult<Option<Movie>>;
    async fn find_movie_by_title(&self, title: &str) -> BookingResult<Option<Movie>>;
    /// All movies, or those whose title contains `title` ignoring case.
    async fn list_movies(&self, title: Option<&str>) -> BookingResult<Vec<Movie>>;
    async fn update_movie(&self, id: ObjectId, update: &MovieUpdate)
        -> BookingResult<Option<Movie>>;
    async fn delete_movie(&self, id: ObjectId) -> BookingResult<bool>;
    async fn existing_movies(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>>;

    // --- shows ---
    async fn insert_show(&self, show: &Show) -> BookingResult<()>;
    async fn find_show(&self, id: ObjectId) -> BookingResult<Option<Show>>;
    async fn find_shows(&self, filter: &ShowFilter) -> BookingResult<Vec<Show>>;
    /// Decrements `available_seats` by `count` only if at least `count` remain.
    async fn reserve_seats(&self, id: ObjectId, count: u32) -> BookingResult<SeatReservation>;
    /// Increments `available_seats` by `count`, clamped to `total_seats`.
    async fn release_seats(&self, id: ObjectId, count: u32) -> BookingResult<Option<Show>>;

    // --- bookings ---
    async fn insert_booking(&self, booking: &Booking) -> BookingResult<()>;
    async fn find_booking(&self, id: ObjectId) -> BookingResult<Option<Booking>>;
    /// Moves the booking to `to` only if its status is one of `from`.
    async fn transition_booking(
        &self,
        id: ObjectId,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> BookingResult<Option<Booking>>;
    /// Claims the seat release of a CANCELED booking. Only one caller ever
    /// gets `true` per booking.
    async fn claim_seat_release(&self, id: ObjectId) -> BookingResult<bool>;
    /// Hands a claim back after the release itself failed.
    async fn revert_seat_release(&self, id: ObjectId) -> BookingResult<()>;
    async fn stale_bookings(&self, created_before: DateTime<Utc>) -> BookingResult<Vec<Booking>>;
    async fn unreleased_cancellations(&self) -> BookingResult<Vec<Booking>>;

    // --- users ---
    async fn insert_user(&self, user: &User) -> BookingResult<()>;
    async fn find_user(&self, id: ObjectId) -> BookingResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> BookingResult<Option<User>>;
    async fn add_user_booking(&self, user_id: ObjectId, booking_id: ObjectId)
        -> BookingResult<Option<User>>;

    // --- payments ---
    /// At most one payment exists per booking.
    async fn insert_payment(&self, payment: &Payment) -> BookingResult<()>;
    async fn find_payment(&self, booking_id: ObjectId) -> BookingResult<Option<Payment>>;
}
