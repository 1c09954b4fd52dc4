//! Model Refresh Background Job
//!
//! Periodically schedules a full model rebuild so the published snapshot is
//! replaced before it expires. Disabled when the interval is zero.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::services::ModelManager;

#[derive(Clone)]
pub struct ModelRefreshConfig {
    pub interval: Duration,
}

impl ModelRefreshConfig {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(secs),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Start the refresh loop; returns immediately when disabled
pub async fn start_model_refresh(models: Arc<ModelManager>, config: ModelRefreshConfig) {
    if !config.enabled() {
        tracing::info!("Model refresh job disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Starting model refresh background job"
    );

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately and startup already trained
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if models.trigger_retrain() {
            tracing::info!("Scheduled model rebuild started");
        } else {
            tracing::debug!("Scheduled model rebuild skipped, build already running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockModelCache;
    use crate::db::MockCatalogSource;
    use crate::config::RecommendationConfig;
    use crate::services::{IoPool, ModelSettings};

    #[tokio::test]
    async fn test_disabled_job_returns_immediately() {
        let models = Arc::new(ModelManager::new(
            Arc::new(MockCatalogSource::new()),
            Arc::new(MockModelCache::new()),
            IoPool::new(1, Duration::from_secs(1)),
            ModelSettings::from(&RecommendationConfig::default()),
        ));

        tokio::time::timeout(
            Duration::from_secs(1),
            start_model_refresh(models, ModelRefreshConfig::from_secs(0)),
        )
        .await
        .expect("disabled job should return");
    }
}
