//! MongoDB store.
//!
//! Seat-pool and booking-status changes are single `findOneAndUpdate` calls
//! whose filter carries the precondition, so the server applies the check and
//! the write atomically per document. No multi-document transaction is
//! needed (or assumed to be available).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, from_document, oid::ObjectId, Bson, Document},
    options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::Deserialize;

use crate::error::{classify_write_error, BookingResult};
use crate::models::{
    booking_model::{Booking, BookingStatus},
    movie_model::{Movie, MovieUpdate},
    payment_model::Payment,
    show_model::{Show, ShowFilter},
    theatre_model::{Theatre, TheatreUpdate},
    user_model::User,
};

use super::{SeatReservation, Store};

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

#[derive(Deserialize)]
struct TheatreMovies {
    #[serde(default)]
    movies: Vec<Movie>,
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

/// Matches `text` literally inside a `$regex`.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sorted_by(key: &str) -> FindOptions {
    let mut sort = Document::new();
    sort.insert(key, 1);
    FindOptions::builder().sort(sort).build()
}

impl MongoStore {
    /// Connects, pings the deployment and makes sure the unique indexes that
    /// back the uniqueness keys exist.
    pub async fn connect(uri: &str, database: &str) -> BookingResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!(database, "Connected to MongoDB");

        let store = Self { db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> BookingResult<()> {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.theatres()
            .create_index(unique(doc! { "name": 1 }), None)
            .await?;
        self.movies()
            .create_index(unique(doc! { "title": 1 }), None)
            .await?;
        self.users()
            .create_index(unique(doc! { "email": 1 }), None)
            .await?;
        self.payments()
            .create_index(unique(doc! { "booking_id": 1 }), None)
            .await?;
        self.shows()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "theatre_id": 1, "movie_id": 1, "start_time": 1 })
                    .build(),
                None,
            )
            .await?;
        self.bookings()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "status": 1, "created_at": 1 })
                    .build(),
                None,
            )
            .await?;
        Ok(())
    }

    fn theatres(&self) -> Collection<Theatre> {
        self.db.collection("theatres")
    }

    fn movies(&self) -> Collection<Movie> {
        self.db.collection("movies")
    }

    fn shows(&self) -> Collection<Show> {
        self.db.collection("shows")
    }

    fn bookings(&self) -> Collection<Booking> {
        self.db.collection("bookings")
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn payments(&self) -> Collection<Payment> {
        self.db.collection("payments")
    }

    async fn existing_ids(&self, collection: &str, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let docs: Vec<Document> = self
            .db
            .collection::<Document>(collection)
            .find(doc! { "_id": { "$in": ids.to_vec() } }, options)
            .await?
            .try_collect()
            .await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_theatre(&self, theatre: &Theatre) -> BookingResult<()> {
        self.theatres()
            .insert_one(theatre, None)
            .await
            .map_err(|e| classify_write_error(e, "theatre"))?;
        Ok(())
    }

    async fn find_theatre(&self, id: ObjectId) -> BookingResult<Option<Theatre>> {
        Ok(self.theatres().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_theatre_by_name(&self, name: &str) -> BookingResult<Option<Theatre>> {
        Ok(self.theatres().find_one(doc! { "name": name }, None).await?)
    }

    async fn list_theatres(&self, city: Option<&str>) -> BookingResult<Vec<Theatre>> {
        let mut filter = Document::new();
        if let Some(city) = city {
            filter.insert("city", city);
        }
        Ok(self
            .theatres()
            .find(filter, sorted_by("_id"))
            .await?
            .try_collect()
            .await?)
    }

    async fn update_theatre(
        &self,
        id: ObjectId,
        update: &TheatreUpdate,
    ) -> BookingResult<Option<Theatre>> {
        self.theatres()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": update.to_document() },
                return_updated(),
            )
            .await
            .map_err(|e| classify_write_error(e, "theatre"))
    }

    async fn delete_theatre(&self, id: ObjectId) -> BookingResult<bool> {
        let result = self.theatres().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn existing_theatres(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>> {
        self.existing_ids("theatres", ids).await
    }

    async fn add_theatre_movies(&self, id: ObjectId, movies: &[ObjectId]) -> BookingResult<bool> {
        let result = self
            .theatres()
            .update_one(
                doc! { "_id": id },
                doc! { "$addToSet": { "movies": { "$each": movies.to_vec() } } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn remove_theatre_movies(
        &self,
        id: ObjectId,
        movies: &[ObjectId],
    ) -> BookingResult<bool> {
        let result = self
            .theatres()
            .update_one(
                doc! { "_id": id },
                doc! { "$pull": { "movies": { "$in": movies.to_vec() } } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn theatre_movies(
        &self,
        id: ObjectId,
        movie: Option<ObjectId>,
    ) -> BookingResult<Option<Vec<Movie>>> {
        let members = match movie {
            Some(movie_id) => Bson::Document(doc! {
                "$filter": {
                    "input": { "$ifNull": ["$movies", []] },
                    "as": "m",
                    "cond": { "$eq": ["$$m", movie_id] }
                }
            }),
            None => Bson::Document(doc! { "$ifNull": ["$movies", []] }),
        };

        let pipeline = vec![
            doc! { "$match": { "_id": id } },
            doc! { "$project": { "movies": members } },
            doc! {
                "$lookup": {
                    "from": "movies",
                    "localField": "movies",
                    "foreignField": "_id",
                    "as": "movies"
                }
            },
        ];

        let mut cursor = self.theatres().aggregate(pipeline, None).await?;
        let Some(doc) = cursor.try_next().await? else {
            return Ok(None);
        };
        let mut listing: TheatreMovies = from_document(doc)?;
        listing.movies.sort_by_key(|m| m.id);
        Ok(Some(listing.movies))
    }

    async fn insert_movie(&self, movie: &Movie) -> BookingResult<()> {
        self.movies()
            .insert_one(movie, None)
            .await
            .map_err(|e| classify_write_error(e, "movie"))?;
        Ok(())
    }

    async fn find_movie(&self, id: ObjectId) -> BookingResult<Option<Movie>> {
        Ok(self.movies().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_movie_by_title(&self, title: &str) -> BookingResult<Option<Movie>> {
        Ok(self.movies().find_one(doc! { "title": title }, None).await?)
    }

    async fn list_movies(&self, title: Option<&str>) -> BookingResult<Vec<Movie>> {
        let mut filter = Document::new();
        if let Some(title) = title {
            filter.insert("title", doc! { "$regex": escape_regex(title), "$options": "i" });
        }
        Ok(self
            .movies()
            .find(filter, sorted_by("_id"))
            .await?
            .try_collect()
            .await?)
    }

    async fn update_movie(
        &self,
        id: ObjectId,
        update: &MovieUpdate,
    ) -> BookingResult<Option<Movie>> {
        self.movies()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": update.to_document() },
                return_updated(),
            )
            .await
            .map_err(|e| classify_write_error(e, "movie"))
    }

    async fn delete_movie(&self, id: ObjectId) -> BookingResult<bool> {
        let result = self.movies().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn existing_movies(&self, ids: &[ObjectId]) -> BookingResult<Vec<ObjectId>> {
        self.existing_ids("movies", ids).await
    }

    async fn insert_show(&self, show: &Show) -> BookingResult<()> {
        self.shows().insert_one(show, None).await?;
        Ok(())
    }

    async fn find_show(&self, id: ObjectId) -> BookingResult<Option<Show>> {
        Ok(self.shows().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_shows(&self, filter: &ShowFilter) -> BookingResult<Vec<Show>> {
        Ok(self
            .shows()
            .find(filter.to_document(), sorted_by("start_time"))
            .await?
            .try_collect()
            .await?)
    }

    async fn reserve_seats(&self, id: ObjectId, count: u32) -> BookingResult<SeatReservation> {
        let count = i64::from(count);
        let reserved = self
            .shows()
            .find_one_and_update(
                doc! { "_id": id, "available_seats": { "$gte": count } },
                doc! { "$inc": { "available_seats": -count } },
                return_updated(),
            )
            .await?;

        if let Some(show) = reserved {
            return Ok(SeatReservation::Reserved(show));
        }
        // The conditional write did not match: tell a missing show apart from
        // a pool that is too small.
        Ok(match self.find_show(id).await? {
            Some(show) => SeatReservation::Insufficient {
                available: show.available_seats,
            },
            None => SeatReservation::Missing,
        })
    }

    async fn release_seats(&self, id: ObjectId, count: u32) -> BookingResult<Option<Show>> {
        let clamped = vec![doc! {
            "$set": {
                "available_seats": {
                    "$min": ["$total_seats", { "$add": ["$available_seats", i64::from(count)] }]
                }
            }
        }];
        Ok(self
            .shows()
            .find_one_and_update(doc! { "_id": id }, clamped, return_updated())
            .await?)
    }

    async fn insert_booking(&self, booking: &Booking) -> BookingResult<()> {
        self.bookings().insert_one(booking, None).await?;
        Ok(())
    }

    async fn find_booking(&self, id: ObjectId) -> BookingResult<Option<Booking>> {
        Ok(self.bookings().find_one(doc! { "_id": id }, None).await?)
    }

    async fn transition_booking(
        &self,
        id: ObjectId,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> BookingResult<Option<Booking>> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        Ok(self
            .bookings()
            .find_one_and_update(
                doc! { "_id": id, "status": { "$in": from } },
                doc! { "$set": { "status": to.as_str() } },
                return_updated(),
            )
            .await?)
    }

    async fn claim_seat_release(&self, id: ObjectId) -> BookingResult<bool> {
        let result = self
            .bookings()
            .update_one(
                doc! {
                    "_id": id,
                    "status": BookingStatus::Canceled.as_str(),
                    "seats_released": false
                },
                doc! { "$set": { "seats_released": true } },
                None,
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn revert_seat_release(&self, id: ObjectId) -> BookingResult<()> {
        self.bookings()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "seats_released": false } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn stale_bookings(&self, created_before: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings()
            .find(
                doc! {
                    "status": BookingStatus::InProcess.as_str(),
                    "created_at": { "$lt": bson::DateTime::from_chrono(created_before) }
                },
                sorted_by("created_at"),
            )
            .await?
            .try_collect()
            .await?)
    }

    async fn unreleased_cancellations(&self) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings()
            .find(
                doc! {
                    "status": BookingStatus::Canceled.as_str(),
                    "seats_released": false
                },
                None,
            )
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_user(&self, user: &User) -> BookingResult<()> {
        self.users()
            .insert_one(user, None)
            .await
            .map_err(|e| classify_write_error(e, "user"))?;
        Ok(())
    }

    async fn find_user(&self, id: ObjectId) -> BookingResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> BookingResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn add_user_booking(
        &self,
        user_id: ObjectId,
        booking_id: ObjectId,
    ) -> BookingResult<Option<User>> {
        Ok(self
            .users()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! { "$addToSet": { "bookings": booking_id } },
                return_updated(),
            )
            .await?)
    }

    async fn insert_payment(&self, payment: &Payment) -> BookingResult<()> {
        self.payments()
            .insert_one(payment, None)
            .await
            .map_err(|e| classify_write_error(e, "payment"))?;
        Ok(())
    }

    async fn find_payment(&self, booking_id: ObjectId) -> BookingResult<Option<Payment>> {
        Ok(self
            .payments()
            .find_one(doc! { "booking_id": booking_id }, None)
            .await?)
    }
}
