use std::sync::Arc;

use anyhow::anyhow;
use cinema_booking::{
    app,
    background::spawn_expiry_sweeper,
    config::{AppConfig, StorageBackend},
    state::AppState,
    store::{MemoryStore, MongoStore, Store},
};
use shuttle_runtime::{SecretStore, Secrets};

#[shuttle_runtime::main]
async fn main(#[Secrets] secret_store: SecretStore) -> shuttle_axum::ShuttleAxum {
    let config = AppConfig::from_lookup(|key| secret_store.get(key))
        .map_err(|err| anyhow!("invalid configuration: {err}"))?;

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Mongo => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow!("MONGODB_URI is required for the mongo backend"))?;
            let store = MongoStore::connect(uri, &config.database_name)
                .await
                .map_err(|err| anyhow!("could not connect to MongoDB: {err}"))?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let ttl = config.booking_ttl;
    let every = config.sweep_interval;
    let state = AppState::new(config, store);
    spawn_expiry_sweeper(state.coordinator.clone(), ttl, every);

    Ok(app(state).into())
}
