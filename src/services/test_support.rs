use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::oid::ObjectId;

use crate::models::booking_model::BookingRequest;
use crate::models::movie_model::{Movie, ReleaseStatus};
use crate::models::show_model::Show;
use crate::models::theatre_model::Theatre;
use crate::models::user_model::{Role, User};
use crate::store::{MemoryStore, Store};

use super::{BookingLifecycle, ConsistencyCoordinator, ShowCatalog, TheatreMovieAssociation};

/// One theatre, one movie and one user in a fresh [`MemoryStore`].
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub shows: ShowCatalog,
    pub lifecycle: BookingLifecycle,
    pub associations: TheatreMovieAssociation,
    pub coordinator: ConsistencyCoordinator,
    pub theatre: Theatre,
    pub movie: Movie,
    pub user: User,
}

pub fn show_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap()
}

pub fn movie(title: &str) -> Movie {
    Movie {
        id: ObjectId::new(),
        title: title.to_string(),
        description: "A heist in a city that never sleeps".to_string(),
        cast: vec!["Ana Diaz".to_string()],
        trailer_url: "https://example.com/trailer".to_string(),
        language: "English".to_string(),
        release_date: "2024-04-12".to_string(),
        director: "J. Park".to_string(),
        release_status: ReleaseStatus::Released,
    }
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        let theatre = Theatre {
            id: ObjectId::new(),
            name: "Grand Plaza".to_string(),
            description: None,
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            address: "12 MG Road".to_string(),
            movies: Vec::new(),
        };
        let movie = movie("Night Shift");
        let user = User {
            id: ObjectId::new(),
            username: "maya".to_string(),
            email: "maya@example.com".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::User,
            bookings: Vec::new(),
        };
        store.insert_theatre(&theatre).await.unwrap();
        store.insert_movie(&movie).await.unwrap();
        store.insert_user(&user).await.unwrap();

        let shows = ShowCatalog::new(dyn_store.clone());
        let lifecycle = BookingLifecycle::new(dyn_store.clone(), shows.clone());
        let associations = TheatreMovieAssociation::new(dyn_store.clone());
        let coordinator =
            ConsistencyCoordinator::new(dyn_store, shows.clone(), lifecycle.clone());

        Self {
            store,
            shows,
            lifecycle,
            associations,
            coordinator,
            theatre,
            movie,
            user,
        }
    }

    pub async fn show(&self, total_seats: u32, price_per_seat: f64) -> Show {
        let show = Show {
            id: ObjectId::new(),
            theatre_id: self.theatre.id,
            movie_id: self.movie.id,
            start_time: show_time(),
            total_seats,
            available_seats: total_seats,
            price_per_seat,
        };
        self.store.insert_show(&show).await.unwrap();
        show
    }

    pub async fn available(&self, show_id: ObjectId) -> u32 {
        self.store
            .find_show(show_id)
            .await
            .unwrap()
            .expect("show exists")
            .available_seats
    }

    pub fn request(&self, seat_count: i64) -> BookingRequest {
        BookingRequest {
            theatre_id: Some(self.theatre.id.to_hex()),
            movie_id: Some(self.movie.id.to_hex()),
            timing: Some(show_time().to_rfc3339()),
            seat_count: Some(seat_count),
        }
    }
}
