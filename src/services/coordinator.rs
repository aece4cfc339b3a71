//! Cross-entity booking flows.
//!
//! A booking touches three records: the show's seat pool, the booking itself
//! and the user's booking index. The pool and the booking are kept
//! consistent (seats are never held without a booking, and a canceled
//! booking's seats come back exactly once); the user index is best effort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::booking_model::{Booking, BookingRequest};
use crate::models::show_model::{Show, ShowFilter};
use crate::models::user_model::User;
use crate::store::Store;

use super::{BookingLifecycle, CancelOutcome, ShowCatalog, ValidatedBooking};

#[derive(Debug, Clone, PartialEq)]
pub struct BookingOutcome {
    pub booking: Booking,
    /// The show right after the reservation.
    pub show: Show,
    /// `None` when the user's booking index could not be updated.
    pub updated_user: Option<User>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    /// IN_PROCESS bookings moved to CANCELED.
    pub expired: usize,
    /// Earlier cancellations whose seats were only now returned.
    pub settled: usize,
}

#[derive(Clone)]
pub struct ConsistencyCoordinator {
    store: Arc<dyn Store>,
    shows: ShowCatalog,
    lifecycle: BookingLifecycle,
}

impl ConsistencyCoordinator {
    pub fn new(store: Arc<dyn Store>, shows: ShowCatalog, lifecycle: BookingLifecycle) -> Self {
        Self {
            store,
            shows,
            lifecycle,
        }
    }

    pub async fn book(
        &self,
        user_id: ObjectId,
        request: &BookingRequest,
    ) -> BookingResult<BookingOutcome> {
        let ticket = BookingLifecycle::validate(request)?;

        if self.store.find_user(user_id).await?.is_none() {
            return Err(BookingError::not_found("User", user_id));
        }
        let show = self.resolve_show(&ticket).await?;

        // Reserve and record run on their own task: if the caller goes away
        // between the two writes, the task still finishes or compensates.
        let shows = self.shows.clone();
        let lifecycle = self.lifecycle.clone();
        let seat_count = ticket.seat_count;
        let (booking, show) = tokio::spawn(async move {
            let reserved = shows.reserve_seats(show.id, seat_count).await?;
            match lifecycle.record(user_id, &reserved, seat_count).await {
                Ok(booking) => Ok::<_, BookingError>((booking, reserved)),
                Err(err) => {
                    tracing::error!(show_id = %show.id, seat_count, error = %err, "Booking write failed, returning seats");
                    if let Err(release_err) = shows.release_with_retry(show.id, seat_count).await {
                        tracing::error!(
                            show_id = %show.id,
                            seat_count,
                            error = %release_err,
                            "Seats stay reserved without a booking"
                        );
                    }
                    Err(BookingError::Internal(format!("booking was not recorded: {err}")))
                }
            }
        })
        .await
        .map_err(|err| BookingError::Internal(format!("booking task failed: {err}")))??;

        let updated_user = match self.store.add_user_booking(user_id, booking.id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!(%user_id, booking_id = %booking.id, "User vanished before the booking was indexed");
                None
            }
            Err(err) => {
                tracing::warn!(%user_id, booking_id = %booking.id, error = %err, "Could not index booking on user");
                None
            }
        };

        Ok(BookingOutcome {
            booking,
            show,
            updated_user,
        })
    }

    /// Cancels a booking on behalf of its owner.
    pub async fn cancel(
        &self,
        user_id: ObjectId,
        booking_id: ObjectId,
    ) -> BookingResult<CancelOutcome> {
        self.lifecycle.get(user_id, booking_id).await?;
        self.lifecycle.cancel(booking_id).await
    }

    /// Expires IN_PROCESS bookings created before `cutoff` and finishes any
    /// seat release an earlier cancellation left behind.
    pub async fn expire_stale(&self, cutoff: DateTime<Utc>) -> BookingResult<ExpiryReport> {
        let mut report = ExpiryReport::default();

        for booking in self.store.stale_bookings(cutoff).await? {
            match self.lifecycle.expire(booking.id).await {
                Ok(Some(_)) => report.expired += 1,
                // Confirmed or canceled since the scan.
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(booking_id = %booking.id, error = %err, "Could not expire booking");
                }
            }
        }

        for booking in self.store.unreleased_cancellations().await? {
            match self.lifecycle.settle_release(&booking).await {
                Ok(Some(_)) => report.settled += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(booking_id = %booking.id, error = %err, "Could not settle seat release");
                }
            }
        }

        if report != ExpiryReport::default() {
            tracing::info!(expired = report.expired, settled = report.settled, "Expiry sweep finished");
        }
        Ok(report)
    }

    async fn resolve_show(&self, ticket: &ValidatedBooking) -> BookingResult<Show> {
        let filter = ShowFilter {
            theatre_id: Some(ticket.theatre_id),
            movie_id: Some(ticket.movie_id),
            start_time: Some(ticket.timing),
        };
        // Several shows with the same key are not prevented; take the first.
        self.shows
            .get_shows(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::not_found("Show", ticket.timing.to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking_model::BookingStatus;
    use crate::services::test_support::Fixture;
    use assert_matches::assert_matches;
    use chrono::Duration;

    #[tokio::test]
    async fn book_then_cancel_restores_the_pool() {
        let fx = Fixture::new().await;
        let show = fx.show(100, 10.0).await;

        let outcome = fx.coordinator.book(fx.user.id, &fx.request(30)).await.unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::InProcess);
        assert_eq!(outcome.show.available_seats, 70);
        assert_eq!(outcome.booking.total_cost, 300.0);
        assert_eq!(fx.available(show.id).await, 70);
        let user = outcome.updated_user.expect("user index updated");
        assert_eq!(user.bookings, vec![outcome.booking.id]);

        let canceled = fx
            .coordinator
            .cancel(fx.user.id, outcome.booking.id)
            .await
            .unwrap();
        assert_eq!(canceled.booking.status, BookingStatus::Canceled);
        assert_eq!(fx.available(show.id).await, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_books_for_the_last_seats_admit_one() {
        let fx = Fixture::new().await;
        let show = fx.show(5, 10.0).await;

        let first = {
            let coordinator = fx.coordinator.clone();
            let request = fx.request(5);
            let user_id = fx.user.id;
            tokio::spawn(async move { coordinator.book(user_id, &request).await })
        };
        let second = {
            let coordinator = fx.coordinator.clone();
            let request = fx.request(5);
            let user_id = fx.user.id;
            tokio::spawn(async move { coordinator.book(user_id, &request).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(BookingError::InsufficientCapacity { requested: 5, available: 0 })
        )));
        assert_eq!(fx.available(show.id).await, 0);
    }

    #[tokio::test]
    async fn bad_requests_touch_nothing() {
        let fx = Fixture::new().await;
        let show = fx.show(10, 10.0).await;

        assert_matches!(
            fx.coordinator.book(fx.user.id, &fx.request(0)).await,
            Err(BookingError::InvalidRequest(_))
        );
        let mut request = fx.request(2);
        request.theatre_id = None;
        assert_matches!(
            fx.coordinator.book(fx.user.id, &request).await,
            Err(BookingError::InvalidRequest(_))
        );
        assert_eq!(fx.available(show.id).await, 10);
    }

    #[tokio::test]
    async fn unknown_show_is_not_found() {
        let fx = Fixture::new().await;
        fx.show(10, 10.0).await;

        let mut request = fx.request(2);
        request.timing = Some("2030-01-01T00:00:00Z".into());
        assert_matches!(
            fx.coordinator.book(fx.user.id, &request).await,
            Err(BookingError::NotFound { entity: "Show", .. })
        );
    }

    #[tokio::test]
    async fn failed_booking_write_returns_the_seats() {
        let fx = Fixture::new().await;
        let show = fx.show(10, 10.0).await;
        fx.store.fail_booking_inserts(true);

        assert_matches!(
            fx.coordinator.book(fx.user.id, &fx.request(4)).await,
            Err(BookingError::Internal(_))
        );
        assert_eq!(fx.available(show.id).await, 10);
        let user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        assert!(user.bookings.is_empty());
    }

    #[tokio::test]
    async fn cancel_by_another_user_is_not_found() {
        let fx = Fixture::new().await;
        let show = fx.show(10, 10.0).await;
        let outcome = fx.coordinator.book(fx.user.id, &fx.request(3)).await.unwrap();

        assert_matches!(
            fx.coordinator.cancel(ObjectId::new(), outcome.booking.id).await,
            Err(BookingError::NotFound { .. })
        );
        assert_eq!(fx.available(show.id).await, 7);
    }

    #[tokio::test]
    async fn expiry_cancels_stale_bookings_and_settles_leftovers() {
        let fx = Fixture::new().await;
        let show = fx.show(20, 10.0).await;

        let stale = fx.coordinator.book(fx.user.id, &fx.request(3)).await.unwrap();
        let confirmed = fx.coordinator.book(fx.user.id, &fx.request(2)).await.unwrap();
        fx.lifecycle.confirm(confirmed.booking.id).await.unwrap();
        let half_canceled = fx.coordinator.book(fx.user.id, &fx.request(4)).await.unwrap();
        fx.store
            .transition_booking(
                half_canceled.booking.id,
                &[BookingStatus::InProcess],
                BookingStatus::Canceled,
            )
            .await
            .unwrap();
        assert_eq!(fx.available(show.id).await, 11);

        let report = fx
            .coordinator
            .expire_stale(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(report, ExpiryReport { expired: 1, settled: 1 });
        assert_eq!(fx.available(show.id).await, 18);
        let stale = fx.store.find_booking(stale.booking.id).await.unwrap().unwrap();
        assert_eq!(stale.status, BookingStatus::Canceled);

        let again = fx
            .coordinator
            .expire_stale(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(again, ExpiryReport::default());
        assert_eq!(fx.available(show.id).await, 18);
    }

    #[tokio::test]
    async fn booking_confirmed_after_the_scan_survives_expiry() {
        let fx = Fixture::new().await;
        let show = fx.show(10, 10.0).await;
        let outcome = fx.coordinator.book(fx.user.id, &fx.request(3)).await.unwrap();

        let scanned = fx
            .store
            .stale_bookings(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(scanned.len(), 1);
        fx.lifecycle.confirm(outcome.booking.id).await.unwrap();

        assert_eq!(fx.lifecycle.expire(scanned[0].id).await.unwrap(), None);
        let booking = fx.store.find_booking(outcome.booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Successful);
        assert!(!booking.seats_released);
        assert_eq!(fx.available(show.id).await, 7);

        let report = fx
            .coordinator
            .expire_stale(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(report, ExpiryReport::default());
        assert_eq!(fx.available(show.id).await, 7);
    }

    #[tokio::test]
    async fn expiry_ignores_fresh_bookings() {
        let fx = Fixture::new().await;
        let show = fx.show(20, 10.0).await;
        fx.coordinator.book(fx.user.id, &fx.request(3)).await.unwrap();

        let report = fx
            .coordinator
            .expire_stale(Utc::now() - Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(report, ExpiryReport::default());
        assert_eq!(fx.available(show.id).await, 17);
    }
}
