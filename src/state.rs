use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    Accounts, BookingLifecycle, ConsistencyCoordinator, MovieCatalog, ShowCatalog,
    TheatreMovieAssociation, TheatreRegistry,
};
use crate::store::Store;
use crate::websockets::LiveFeed;

/// Everything a handler can reach, installed on the router as an
/// `Extension`. Cloning is cheap; all services share one store handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub shows: ShowCatalog,
    pub bookings: BookingLifecycle,
    pub associations: TheatreMovieAssociation,
    pub coordinator: ConsistencyCoordinator,
    pub movies: MovieCatalog,
    pub theatres: TheatreRegistry,
    pub accounts: Accounts,
    pub feed: LiveFeed,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let shows = ShowCatalog::new(store.clone());
        let bookings = BookingLifecycle::new(store.clone(), shows.clone());
        let coordinator = ConsistencyCoordinator::new(store.clone(), shows.clone(), bookings.clone());

        Self {
            associations: TheatreMovieAssociation::new(store.clone()),
            movies: MovieCatalog::new(store.clone()),
            theatres: TheatreRegistry::new(store.clone()),
            accounts: Accounts::new(store, config.jwt.clone()),
            config: Arc::new(config),
            shows,
            bookings,
            coordinator,
            feed: LiveFeed::new(),
        }
    }
}
