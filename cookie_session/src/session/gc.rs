use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::session::config::AuthConfig;
use crate::session::errors::SessionError;

/// Sessions removed by one sweep, per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub access: u64,
    pub refresh: u64,
}

impl AuthConfig {
    /// Remove every session that expired at or before `now`, in both tiers,
    /// along with stale resume tickets.
    pub async fn gc(&self, now: DateTime<Utc>) -> Result<GcReport, SessionError> {
        let access = self.access.store.gc(now).await?;
        let refresh = self.refresh.store.gc(now).await?;
        self.resume_tickets.purge_expired(now).await;
        Ok(GcReport { access, refresh })
    }
}

/// Sweep both tiers every `interval` on a background task.
///
/// Store errors are logged and the next tick tries again. A zero interval
/// disables the sweeper: the task logs a warning and returns.
pub fn spawn_gc_task(config: AuthConfig, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            tracing::warn!("Session GC interval is zero, background sweeping disabled");
            return;
        }
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match config.gc(Utc::now()).await {
                Ok(report) if report.access + report.refresh > 0 => {
                    tracing::info!(
                        "Session GC removed {} access and {} refresh sessions",
                        report.access,
                        report.refresh
                    );
                }
                Ok(_) => tracing::debug!("Session GC found nothing to remove"),
                Err(e) => tracing::error!("Session GC failed: {}", e),
            }
        }
    })
}
