//! In-process store backed by ordered maps.
//!
//! Each show sits behind its own mutex, so reservations on different shows
//! never contend; the map-level lock is only held long enough to find the
//! show's slot. No lock is ever held across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::{
    booking_model::{Booking, BookingStatus},
    movie_model::{Movie, MovieUpdate},
    payment_model::Payment,
    show_model::{Show, ShowFilter},
    theatre_model::{Theatre, TheatreUpdate},
    user_model::User,
};

use super::{SeatReservation, Store};

#[derive(Default)]
pub struct MemoryStore {
    theatres: RwLock<BTreeMap<ObjectId, Theatre>>,
    movies: RwLock<BTreeMap<ObjectId, Movie>>,
    shows: RwLock<BTreeMap<ObjectId, Arc<Mutex<Show>>>>,
    bookings: Mutex<BTreeMap<ObjectId, Booking>>,
    users: RwLock<BTreeMap<ObjectId, User>>,
    payments: Mutex<BTreeMap<ObjectId, Payment>>,
    #[cfg(test)]
    fail_booking_inserts: std::sync::atomic::AtomicBool,
    #[cfg(test)]
    fail_payment_inserts: std::sync::atomic::AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following booking insert fail, as a broken storage
    /// connection would.
    #[cfg(test)]
    pub fn fail_booking_inserts(&self, fail: bool) {
        self.fail_booking_inserts
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Same as [`MemoryStore::fail_booking_inserts`], for payments.
    #[cfg(test)]
    pub fn fail_payment_inserts(&self, fail: bool) {
        self.fail_payment_inserts
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_writes(flag: &std::sync::atomic::AtomicBool, what: &str) -> BookingResult<()> {
        if flag.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BookingError::Internal(format!("{what} write rejected")));
        }
        Ok(())
    }

    #[cfg(test)]
    fn check_booking_writes(&self) -> BookingResult<()> {
        Self::check_writes(&self.fail_booking_inserts, "booking")
    }

    #[cfg(not(test))]
    fn check_booking_writes(&self) -> BookingResult<()> {
        Ok(())
    }

    #[cfg(test)]
    fn check_payment_writes(&self) -> BookingResult<()> {
        Self::check_writes(&self.fail_payment_inserts, "payment")
    }

    #[cfg(not(test))]
    fn check_payment_writes(&self) -> BookingResult<()> {
        Ok(())
    }

    fn show_slot(&self, id: ObjectId) -> Option<Arc<Mutex<Show>>> {
        read(&self.shows).get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_theatre(&self, theatre: &Theatre) -> BookingResult<()> {
        let mut theatres = write(&self.theatres);
        if theatres.values().any(|t| t.name == theatre.name) {
            return Err(BookingError::Duplicate("theatre already exists".into()));
        }
        theatres.insert(theatre.id, theatre.clone());
        Ok(())
    }

    async fn find_theatre(&self, id: ObjectId) -> BookingResult<Option<Theatre>> {
        Ok(read(&self.theatres).get(&id).cloned())
    }

    async fn find_theatre_by_name(&self, name: &str) -> BookingResult<Option<Theatre>> {
        Ok(read(&self.theatres)
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn list_theatres(&self, city: Option<&str>) -> BookingResult<Vec<Theatre>> {
        Ok(read(&self.theatres)
            .values()
            .filter(|t| city.map_or(true, |c| t.city == c))
            .cloned()
            .collect())
    }

    async fn update_theatre(
        &self,
        id: ObjectId,
        update: &TheatreUpdate,
    ) -> BookingResult<Option<Theatre>> {
        let mut theatres = write(&self.theatres);
        if let Some(name) = &update.name {
            if theatres.values().any(|t| t.id != id && &t.name == name) {
                return Err(BookingError::Duplicate("theatre already exists".into()));
            }
        }
        Ok(theatres.get_mut(&id).map(|theatre| {
            update.apply(theatre);
            theatre.clone()
        }))
    }

    async fn delete_theatre(&self, id: ObjectId) -> BookingResult<bool> {
        Ok(write(&self.theatres).remove(&id).is_some())
    }

    async fn existing_theatres(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>> {
        let theatres = read(&self.theatres);
        Ok(ids
            .iter()
            .copied()
            .filter(|id| theatres.contains_key(id))
            .collect())
    }

    async fn add_theatre_movies(&self, id: ObjectId, movies: &[ObjectId]) -> BookingResult<bool> {
        let mut theatres = write(&self.theatres);
        let Some(theatre) = theatres.get_mut(&id) else {
            return Ok(false);
        };
        for movie in movies {
            if !theatre.movies.contains(movie) {
                theatre.movies.push(*movie);
            }
        }
        Ok(true)
    }

    async fn remove_theatre_movies(
        &self,
        id: ObjectId,
        movies: &[ObjectId],
    ) -> BookingResult<bool> {
        let mut theatres = write(&self.theatres);
        let Some(theatre) = theatres.get_mut(&id) else {
            return Ok(false);
        };
        theatre.movies.retain(|m| !movies.contains(m));
        Ok(true)
    }

    async fn theatre_movies(
        &self,
        id: ObjectId,
        movie: Option<ObjectId>,
    ) -> BookingResult<Option<Vec<Movie>>> {
        let theatres = read(&self.theatres);
        let Some(theatre) = theatres.get(&id) else {
            return Ok(None);
        };
        let catalog = read(&self.movies);
        let mut resolved: Vec<Movie> = theatre
            .movies
            .iter()
            .filter(|m| movie.map_or(true, |wanted| **m == wanted))
            .filter_map(|m| catalog.get(m).cloned())
            .collect();
        resolved.sort_by_key(|m| m.id);
        Ok(Some(resolved))
    }

    async fn insert_movie(&self, movie: &Movie) -> BookingResult<()> {
        let mut movies = write(&self.movies);
        if movies.values().any(|m| m.title == movie.title) {
            return Err(BookingError::Duplicate("movie already exists".into()));
        }
        movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn find_movie(&self, id: ObjectId) -> BookingResult<Option<Movie>> {
        Ok(read(&self.movies).get(&id).cloned())
    }

    async fn find_movie_by_title(&self, title: &str) -> BookingResult<Option<Movie>> {
        Ok(read(&self.movies).values().find(|m| m.title == title).cloned())
    }

    async fn list_movies(&self, title: Option<&str>) -> BookingResult<Vec<Movie>> {
        let needle = title.map(str::to_lowercase);
        Ok(read(&self.movies)
            .values()
            .filter(|m| {
                needle
                    .as_deref()
                    .map_or(true, |n| m.title.to_lowercase().contains(n))
            })
            .cloned()
            .collect())
    }

    async fn update_movie(
        &self,
        id: ObjectId,
        update: &MovieUpdate,
    ) -> BookingResult<Option<Movie>> {
        let mut movies = write(&self.movies);
        if let Some(title) = &update.title {
            if movies.values().any(|m| m.id != id && &m.title == title) {
                return Err(BookingError::Duplicate("movie already exists".into()));
            }
        }
        Ok(movies.get_mut(&id).map(|movie| {
            update.apply(movie);
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: ObjectId) -> BookingResult<bool> {
        Ok(write(&self.movies).remove(&id).is_some())
    }

    async fn existing_movies(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>> {
        let movies = read(&self.movies);
        Ok(ids
            .iter()
            .copied()
            .filter(|id| movies.contains_key(id))
            .collect())
    }

    async fn insert_show(&self, show: &Show) -> BookingResult<()> {
        write(&self.shows).insert(show.id, Arc::new(Mutex::new(show.clone())));
        Ok(())
    }

    async fn find_show(&self, id: ObjectId) -> BookingResult<Option<Show>> {
        let Some(slot) = self.show_slot(id) else {
            return Ok(None);
        };
        let show = lock(&slot).clone();
        Ok(Some(show))
    }

    async fn find_shows(&self, filter: &ShowFilter) -> BookingResult<Vec<Show>> {
        let slots: Vec<Arc<Mutex<Show>>> = read(&self.shows).values().cloned().collect();
        let mut shows: Vec<Show> = slots
            .iter()
            .map(|slot| lock(slot).clone())
            .filter(|show| filter.matches(show))
            .collect();
        shows.sort_by_key(|show| show.start_time);
        Ok(shows)
    }

    async fn reserve_seats(&self, id: ObjectId, count: u32) -> BookingResult<SeatReservation> {
        let Some(slot) = self.show_slot(id) else {
            return Ok(SeatReservation::Missing);
        };
        let mut show = lock(&slot);
        if show.available_seats < count {
            return Ok(SeatReservation::Insufficient {
                available: show.available_seats,
            });
        }
        show.available_seats -= count;
        Ok(SeatReservation::Reserved(show.clone()))
    }

    async fn release_seats(&self, id: ObjectId, count: u32) -> BookingResult<Option<Show>> {
        let Some(slot) = self.show_slot(id) else {
            return Ok(None);
        };
        let mut show = lock(&slot);
        show.available_seats = show
            .available_seats
            .saturating_add(count)
            .min(show.total_seats);
        Ok(Some(show.clone()))
    }

    async fn insert_booking(&self, booking: &Booking) -> BookingResult<()> {
        self.check_booking_writes()?;
        lock(&self.bookings).insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: ObjectId) -> BookingResult<Option<Booking>> {
        Ok(lock(&self.bookings).get(&id).cloned())
    }

    async fn transition_booking(
        &self,
        id: ObjectId,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> BookingResult<Option<Booking>> {
        let mut bookings = lock(&self.bookings);
        Ok(bookings
            .get_mut(&id)
            .filter(|b| from.contains(&b.status))
            .map(|booking| {
                booking.status = to;
                booking.clone()
            }))
    }

    async fn claim_seat_release(&self, id: ObjectId) -> BookingResult<bool> {
        let mut bookings = lock(&self.bookings);
        match bookings.get_mut(&id) {
            Some(b) if b.status == BookingStatus::Canceled && !b.seats_released => {
                b.seats_released = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revert_seat_release(&self, id: ObjectId) -> BookingResult<()> {
        if let Some(booking) = lock(&self.bookings).get_mut(&id) {
            booking.seats_released = false;
        }
        Ok(())
    }

    async fn stale_bookings(&self, created_before: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
        Ok(lock(&self.bookings)
            .values()
            .filter(|b| b.status == BookingStatus::InProcess && b.created_at < created_before)
            .cloned()
            .collect())
    }

    async fn unreleased_cancellations(&self) -> BookingResult<Vec<Booking>> {
        Ok(lock(&self.bookings)
            .values()
            .filter(|b| b.status == BookingStatus::Canceled && !b.seats_released)
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: &User) -> BookingResult<()> {
        let mut users = write(&self.users);
        if users.values().any(|u| u.email == user.email) {
            return Err(BookingError::Duplicate("user already exists".into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: ObjectId) -> BookingResult<Option<User>> {
        Ok(read(&self.users).get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> BookingResult<Option<User>> {
        Ok(read(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn add_user_booking(
        &self,
        user_id: ObjectId,
        booking_id: ObjectId,
    ) -> BookingResult<Option<User>> {
        let mut users = write(&self.users);
        Ok(users.get_mut(&user_id).map(|user| {
            if !user.bookings.contains(&booking_id) {
                user.bookings.push(booking_id);
            }
            user.clone()
        }))
    }

    async fn insert_payment(&self, payment: &Payment) -> BookingResult<()> {
        self.check_payment_writes()?;
        let mut payments = lock(&self.payments);
        if payments.values().any(|p| p.booking_id == payment.booking_id) {
            return Err(BookingError::Duplicate(
                "payment already recorded for booking".into(),
            ));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_payment(&self, booking_id: ObjectId) -> BookingResult<Option<Payment>> {
        Ok(lock(&self.payments)
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }
}
