use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::error::{BookingError, BookingResult};
use crate::models::booking_model::{Booking, BookingRequest, BookingStatus};
use crate::models::payment_model::{Payment, PaymentStatus};
use crate::models::show_model::{parse_timing, Show};
use crate::store::Store;
use crate::utils::require_object_id;

use super::ShowCatalog;

/// A booking request whose shape has been checked. Nothing has been looked up
/// or reserved yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedBooking {
    pub theatre_id: ObjectId,
    pub movie_id: ObjectId,
    pub timing: DateTime<Utc>,
    pub seat_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub booking: Booking,
    /// The show after the seats went back, when this call released them.
    pub show: Option<Show>,
}

/// The IN_PROCESS → SUCCESSFUL | CANCELED state machine.
///
/// Every status change is a conditional store write keyed on the current
/// status, so of two racing transitions only one can apply. Cancellation
/// additionally claims the seat release (`seats_released: false → true`)
/// before crediting the show, which makes the release happen exactly once.
#[derive(Clone)]
pub struct BookingLifecycle {
    store: Arc<dyn Store>,
    shows: ShowCatalog,
}

impl BookingLifecycle {
    pub fn new(store: Arc<dyn Store>, shows: ShowCatalog) -> Self {
        Self { store, shows }
    }

    pub fn validate(request: &BookingRequest) -> BookingResult<ValidatedBooking> {
        let theatre_id = require_object_id(request.theatre_id.as_deref(), "theatreId")?;
        let movie_id = require_object_id(request.movie_id.as_deref(), "movieId")?;
        let timing = parse_timing(request.timing.as_deref(), "timing")?;
        let seat_count = match request.seat_count {
            Some(n) if n > 0 && n <= i64::from(u32::MAX) => n as u32,
            Some(_) => {
                return Err(BookingError::InvalidRequest(
                    "seatCount must be greater than zero".into(),
                ))
            }
            None => return Err(BookingError::InvalidRequest("seatCount is missing".into())),
        };
        Ok(ValidatedBooking {
            theatre_id,
            movie_id,
            timing,
            seat_count,
        })
    }

    /// Persists an IN_PROCESS booking for seats already taken from `show`.
    pub async fn record(
        &self,
        user_id: ObjectId,
        show: &Show,
        seat_count: u32,
    ) -> BookingResult<Booking> {
        let booking = Booking {
            id: ObjectId::new(),
            user_id,
            theatre_id: show.theatre_id,
            movie_id: show.movie_id,
            show_id: show.id,
            timing: show.start_time,
            seat_count,
            total_cost: f64::from(seat_count) * show.price_per_seat,
            status: BookingStatus::InProcess,
            seats_released: false,
            created_at: Utc::now(),
        };
        self.store.insert_booking(&booking).await?;
        tracing::info!(
            booking_id = %booking.id,
            user_id = %user_id,
            show_id = %show.id,
            seat_count,
            "Booking recorded"
        );
        Ok(booking)
    }

    /// Moves an IN_PROCESS booking to SUCCESSFUL and records its payment.
    ///
    /// A booking left SUCCESSFUL without a payment (the payment write failed
    /// after the status write) gets its payment on the next confirm.
    pub async fn confirm(&self, booking_id: ObjectId) -> BookingResult<Booking> {
        let to = BookingStatus::Successful;
        let (booking, retry) = match self.transition(booking_id, to).await {
            Ok(booking) => (booking, false),
            Err(BookingError::InvalidTransition {
                from: BookingStatus::Successful,
                ..
            }) => {
                let repeat = BookingError::InvalidTransition {
                    from: BookingStatus::Successful,
                    to,
                };
                if self.store.find_payment(booking_id).await?.is_some() {
                    return Err(repeat);
                }
                let booking = self
                    .store
                    .find_booking(booking_id)
                    .await?
                    .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;
                if booking.status != BookingStatus::Successful {
                    return Err(BookingError::InvalidTransition {
                        from: booking.status,
                        to,
                    });
                }
                (booking, true)
            }
            Err(err) => return Err(err),
        };

        let payment = Payment {
            id: ObjectId::new(),
            booking_id,
            amount: booking.total_cost,
            status: PaymentStatus::Success,
            created_at: Utc::now(),
        };
        match self.store.insert_payment(&payment).await {
            Ok(()) => {}
            // Another confirm recorded it first.
            Err(BookingError::Duplicate(_)) if retry => {
                return Err(BookingError::InvalidTransition {
                    from: BookingStatus::Successful,
                    to,
                })
            }
            Err(BookingError::Duplicate(_)) => {}
            Err(err) => {
                tracing::error!(%booking_id, error = %err, "Booking confirmed but payment was not recorded");
                return Err(err);
            }
        }

        if retry {
            tracing::info!(%booking_id, amount = booking.total_cost, "Missing payment recorded");
        } else {
            tracing::info!(%booking_id, amount = booking.total_cost, "Booking confirmed");
        }
        Ok(booking)
    }

    pub async fn cancel(&self, booking_id: ObjectId) -> BookingResult<CancelOutcome> {
        let to = BookingStatus::Canceled;
        if let Some(booking) = self
            .store
            .transition_booking(booking_id, BookingStatus::sources_of(to), to)
            .await?
        {
            tracing::info!(%booking_id, seat_count = booking.seat_count, "Booking canceled");
            let show = self.settle_release(&booking).await?;
            return Ok(CancelOutcome { booking, show });
        }

        let current = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;
        // An earlier cancel may have stopped between the status write and the
        // release; finish it before reporting the repeat.
        if current.status == BookingStatus::Canceled && !current.seats_released {
            self.settle_release(&current).await?;
        }
        Err(BookingError::InvalidTransition {
            from: current.status,
            to,
        })
    }

    /// Cancels a booking only while it is still IN_PROCESS.
    ///
    /// `Ok(None)` when it was confirmed, canceled or removed in the meantime.
    pub async fn expire(&self, booking_id: ObjectId) -> BookingResult<Option<CancelOutcome>> {
        let Some(booking) = self
            .store
            .transition_booking(booking_id, &[BookingStatus::InProcess], BookingStatus::Canceled)
            .await?
        else {
            return Ok(None);
        };
        tracing::info!(%booking_id, seat_count = booking.seat_count, "Booking expired");
        let show = self.settle_release(&booking).await?;
        Ok(Some(CancelOutcome { booking, show }))
    }

    /// Returns a canceled booking's seats to its show, at most once.
    ///
    /// `Ok(None)` when another caller already holds the release or the show
    /// no longer exists.
    pub async fn settle_release(&self, booking: &Booking) -> BookingResult<Option<Show>> {
        if !self.store.claim_seat_release(booking.id).await? {
            return Ok(None);
        }

        match self
            .shows
            .release_with_retry(booking.show_id, booking.seat_count)
            .await
        {
            Ok(show) => Ok(Some(show)),
            Err(BookingError::NotFound { .. }) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    show_id = %booking.show_id,
                    "Show is gone, nothing to release into"
                );
                Ok(None)
            }
            Err(err) => {
                if let Err(revert_err) = self.store.revert_seat_release(booking.id).await {
                    tracing::error!(
                        booking_id = %booking.id,
                        error = %revert_err,
                        "Could not hand back the seat release claim"
                    );
                }
                Err(err)
            }
        }
    }

    /// Fetches a booking owned by `user_id`. Other users' bookings read as
    /// missing.
    pub async fn get(&self, user_id: ObjectId, booking_id: ObjectId) -> BookingResult<Booking> {
        match self.store.find_booking(booking_id).await? {
            Some(booking) if booking.user_id == user_id => Ok(booking),
            _ => Err(BookingError::not_found("Booking", booking_id)),
        }
    }

    async fn transition(&self, booking_id: ObjectId, to: BookingStatus) -> BookingResult<Booking> {
        let current = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;
        if !current.status.can_move_to(to) {
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to,
            });
        }

        if let Some(booking) = self
            .store
            .transition_booking(booking_id, BookingStatus::sources_of(to), to)
            .await?
        {
            return Ok(booking);
        }
        // Lost a race; report the status that won.
        let from = self
            .store
            .find_booking(booking_id)
            .await?
            .map_or(current.status, |b| b.status);
        Err(BookingError::InvalidTransition { from, to })
    }
}
