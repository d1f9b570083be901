//! Monthly removal of expired license records.

use chrono::Utc;
use licensekey_store::{next_sweep_after, sweep_expired, LicenseStore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawns a task that sweeps expired records at midnight UTC on the first of
/// every month. Failures are logged and the next sweep is still scheduled.
pub fn spawn_sweep(store: LicenseStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_sweep_after(now);
            debug!("Next expiry sweep at {}", next.to_rfc3339());

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let store = store.clone();
            match tokio::task::spawn_blocking(move || sweep_expired(&store, Utc::now())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Expiry sweep failed: {}", e),
                Err(e) => warn!("Expiry sweep task failed: {}", e),
            }
        }
    })
}
