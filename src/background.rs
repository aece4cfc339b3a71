use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::services::ConsistencyCoordinator;

/// Periodically expires bookings left IN_PROCESS for longer than `ttl` and
/// settles seat releases an interrupted cancel left behind.
pub fn spawn_expiry_sweeper(
    coordinator: ConsistencyCoordinator,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => ttl,
            Err(err) => {
                tracing::error!(error = %err, "Booking TTL out of range, sweeper not started");
                return;
            }
        };
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(err) = coordinator.expire_stale(Utc::now() - ttl).await {
                tracing::warn!(error = %err, "Expiry sweep failed");
            }
        }
    })
}
