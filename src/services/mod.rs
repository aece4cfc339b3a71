//! Business operations over a [`crate::store::Store`].
//!
//! [`ShowCatalog`], [`BookingLifecycle`] and [`TheatreMovieAssociation`] each
//! own one consistency concern; [`ConsistencyCoordinator`] composes them into
//! the cross-entity booking flows. The remaining services are plain catalog
//! and account collaborators.

pub mod accounts;
pub mod booking_lifecycle;
pub mod coordinator;
pub mod movie_catalog;
pub mod show_catalog;
pub mod theatre_movies;
pub mod theatre_registry;

pub use accounts::Accounts;
pub use booking_lifecycle::{BookingLifecycle, CancelOutcome, ValidatedBooking};
pub use coordinator::{BookingOutcome, ConsistencyCoordinator, ExpiryReport};
pub use movie_catalog::MovieCatalog;
pub use show_catalog::ShowCatalog;
pub use theatre_movies::TheatreMovieAssociation;
pub use theatre_registry::TheatreRegistry;

#[cfg(test)]
pub(crate) mod test_support;
