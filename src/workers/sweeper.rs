//! Periodic removal of expired and exhausted uploads.

use crate::db::DbActorHandle;
use crate::error::SatchelError;
use crate::server::guards::rate_limit::ClientRateLimiter;
use crate::storage::BlobStore;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::{debug, error, info};

pub struct Sweeper {
    db: DbActorHandle,
    blobs: BlobStore,
    limiter: Option<Arc<ClientRateLimiter>>,
}

impl Sweeper {
    pub fn new(
        db: DbActorHandle,
        blobs: BlobStore,
        limiter: Option<Arc<ClientRateLimiter>>,
    ) -> Self {
        Self { db, blobs, limiter }
    }

    /// Purges rows unavailable at `now` together with their blobs; returns the purged ids.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<Vec<String>, SatchelError> {
        let ids = self.db.purge_expired(now).await?;
        for id in &ids {
            self.blobs.discard(id).await;
        }
        if let Some(limiter) = self.limiter.as_deref() {
            limiter.retain_recent();
            debug!(clients = limiter.tracked_clients(), "Pruned rate limit state");
        }
        Ok(ids)
    }

    /// Runs [`Sweeper::sweep_once`] every `period` until the runtime shuts down.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = IntervalStream::new(ticker);

            while ticks.next().await.is_some() {
                match self.sweep_once(Utc::now()).await {
                    Ok(ids) if !ids.is_empty() => {
                        info!(purged = ids.len(), "Sweeper removed expired files");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Sweeper pass failed"),
                }
            }
        })
    }
}
