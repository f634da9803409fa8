use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::time;
use tracing::{error, info};

use super::{DashboardCache, DashboardCompiler};

/// Recompiles the dashboard on a fixed interval and publishes it to the
/// cache.
pub struct RefreshService {
    compiler: DashboardCompiler,
    cache: DashboardCache,
    gardener_id: i64,
    interval: Duration,
}

impl RefreshService {
    pub fn new(
        compiler: DashboardCompiler,
        cache: DashboardCache,
        gardener_id: i64,
        interval: Duration,
    ) -> Self {
        Self {
            compiler,
            cache,
            gardener_id,
            interval,
        }
    }

    /// Runs the refresh loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            gardener_id = self.gardener_id,
            interval_secs = self.interval.as_secs(),
            "Dashboard refresh loop started"
        );
        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %format!("{e:#}"), "Dashboard refresh failed");
            }
        }
    }

    /// Compile once and, on success, replace the cached view. A failed
    /// compilation leaves the previous view in place.
    pub async fn run_once(&self) -> anyhow::Result<()> {
        let view = self
            .compiler
            .compile(self.gardener_id, Utc::now())
            .await
            .with_context(|| format!("compiling dashboard for gardener {}", self.gardener_id))?;
        self.cache.update(view).await;
        Ok(())
    }
}
