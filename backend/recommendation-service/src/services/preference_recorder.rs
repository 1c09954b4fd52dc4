use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{preference_key, ModelCache};
use crate::error::Result;
use crate::models::{InteractionAction, PreferenceEvent};
use crate::services::worker_pool::IoPool;

/// Appends interaction events to the per-user bounded preference log
#[derive(Clone)]
pub struct PreferenceRecorder {
    cache: Arc<dyn ModelCache>,
    pool: IoPool,
    cap: usize,
    ttl: Duration,
}

impl PreferenceRecorder {
    pub fn new(cache: Arc<dyn ModelCache>, pool: IoPool, cap: usize, ttl: Duration) -> Self {
        Self {
            cache,
            pool,
            cap,
            ttl,
        }
    }

    pub async fn record(
        &self,
        user_id: &str,
        track_id: &str,
        action: InteractionAction,
    ) -> Result<()> {
        let event = PreferenceEvent {
            track_id: track_id.to_string(),
            action,
            timestamp: Utc::now(),
        };
        let payload = serde_json::to_vec(&event)?;
        let key = preference_key(user_id);

        self.pool
            .run(
                "preference_push",
                self.cache.push_capped(&key, payload, self.cap, self.ttl),
            )
            .await?;

        debug!(user_id = %user_id, track_id = %track_id, action = %action, "Recorded preference event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockModelCache;
    use crate::error::AppError;

    fn pool() -> IoPool {
        IoPool::new(1, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_event_is_pushed_with_cap_and_ttl() {
        let mut cache = MockModelCache::new();
        cache
            .expect_push_capped()
            .withf(|key, value, cap, ttl| {
                let event: PreferenceEvent = serde_json::from_slice(value).unwrap();
                key == "user_prefs:u1"
                    && event.track_id == "t9"
                    && event.action == InteractionAction::Like
                    && *cap == 1000
                    && *ttl == Duration::from_secs(2_592_000)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let recorder = PreferenceRecorder::new(
            Arc::new(cache),
            pool(),
            1000,
            Duration::from_secs(2_592_000),
        );
        recorder
            .record("u1", "t9", InteractionAction::Like)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cache_failure_is_reported() {
        let mut cache = MockModelCache::new();
        cache
            .expect_push_capped()
            .returning(|_, _, _, _| Err(AppError::DataAccess("redis down".into())));

        let recorder =
            PreferenceRecorder::new(Arc::new(cache), pool(), 1000, Duration::from_secs(60));
        let result = recorder.record("u1", "t1", InteractionAction::Play).await;
        assert!(result.unwrap_err().is_data_access());
    }
}
