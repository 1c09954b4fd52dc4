//! Hybrid Recommendation Engine
//!
//! Fans out to the content, collaborative and trending channels, blends
//! their ranked lists and falls back to trending when the blend cannot be
//! produced in time.

pub mod collaborative_filtering;
pub mod content_based;
pub mod features;
pub mod hybrid_ranker;
pub mod model_codec;
pub mod model_manager;
pub mod preference_recorder;
pub mod trending;
pub mod worker_pool;

pub use hybrid_ranker::{ChannelResults, HybridRanker, HybridWeights};
pub use model_manager::{ModelManager, ModelSettings, ModelSnapshot, ModelState};
pub use preference_recorder::PreferenceRecorder;
pub use trending::TrendingSource;
pub use worker_pool::IoPool;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ModelCache;
use crate::config::RecommendationConfig;
use crate::db::CatalogSource;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ChannelItem, InteractionAction, ReasonTag, Recommendation, SimilarTrack};

#[derive(Debug, Clone)]
struct EngineSettings {
    seed_window_days: i32,
    seed_limit: i64,
    request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub model_state: ModelState,
    pub retraining: bool,
    pub trained_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub tracks: usize,
    pub users: usize,
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogSource>,
    models: Arc<ModelManager>,
    trending: TrendingSource,
    preferences: PreferenceRecorder,
    ranker: HybridRanker,
    pool: IoPool,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        cache: Arc<dyn ModelCache>,
        config: &RecommendationConfig,
    ) -> Self {
        let pool = IoPool::new(config.io_pool_size, config.io_timeout());
        let models = Arc::new(ModelManager::new(
            Arc::clone(&catalog),
            Arc::clone(&cache),
            pool.clone(),
            ModelSettings::from(config),
        ));
        let trending = TrendingSource::new(
            Arc::clone(&catalog),
            pool.clone(),
            config.trending_window_days,
        );
        let preferences = PreferenceRecorder::new(
            cache,
            pool.clone(),
            config.preference_cap,
            config.preference_ttl(),
        );

        Self {
            catalog,
            models,
            trending,
            preferences,
            ranker: HybridRanker::new(config.weights()),
            pool,
            settings: EngineSettings {
                seed_window_days: config.seed_window_days,
                seed_limit: config.seed_limit,
                request_timeout: config.request_timeout(),
            },
        }
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    pub async fn initialize(&self) -> Result<()> {
        self.models.initialize().await
    }

    /// Blended recommendations for a user, falling back to trending
    pub async fn recommend(&self, user_id: &str, limit: usize) -> Result<Vec<Recommendation>> {
        let outcome =
            tokio::time::timeout(self.settings.request_timeout, self.hybrid(user_id, limit)).await;

        match outcome {
            Ok(Ok(recommendations)) => {
                metrics::record_request("hybrid");
                Ok(recommendations)
            }
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Hybrid pipeline failed, serving trending");
                self.fallback(limit).await
            }
            Err(_) => {
                warn!(
                    user_id = %user_id,
                    timeout_ms = self.settings.request_timeout.as_millis() as u64,
                    "Hybrid pipeline timed out, serving trending"
                );
                self.fallback(limit).await
            }
        }
    }

    async fn hybrid(&self, user_id: &str, limit: usize) -> Result<Vec<Recommendation>> {
        let snapshot = self.models.current();
        if snapshot.is_none() {
            debug!("No usable models, model channels stay empty");
        }

        let content: JoinHandle<Result<Vec<ChannelItem>>> = {
            let snapshot = snapshot.clone();
            let catalog = Arc::clone(&self.catalog);
            let pool = self.pool.clone();
            let user_id = user_id.to_string();
            let settings = self.settings.clone();
            tokio::spawn(async move {
                let Some(snapshot) = snapshot else {
                    return Ok::<_, AppError>(Vec::new());
                };
                let seeds = pool
                    .run(
                        "recent_user_tracks",
                        catalog.recent_user_tracks(
                            &user_id,
                            settings.seed_window_days,
                            settings.seed_limit,
                        ),
                    )
                    .await?;
                Ok(snapshot.content.similar_for_seeds(&seeds, limit))
            })
        };

        let collaborative: JoinHandle<Result<Vec<ChannelItem>>> = {
            let user_id = user_id.to_string();
            tokio::spawn(async move {
                Ok::<_, AppError>(
                    snapshot
                        .map(|s| s.collaborative.recommend(&user_id, limit))
                        .unwrap_or_default(),
                )
            })
        };

        let trending: JoinHandle<Result<Vec<ChannelItem>>> = {
            let source = self.trending.clone();
            tokio::spawn(async move { source.top(limit).await })
        };

        let (content, collaborative, trending) = tokio::join!(content, collaborative, trending);
        let channels = ChannelResults {
            content: channel_or_empty(ReasonTag::ContentBased, content),
            collaborative: channel_or_empty(ReasonTag::CollaborativeFiltering, collaborative),
            trending: channel_or_empty(ReasonTag::Trending, trending),
        };

        debug!(
            user_id = %user_id,
            content = channels.content.len(),
            collaborative = channels.collaborative.len(),
            trending = channels.trending.len(),
            "Channels collected"
        );

        self.ranker.combine(&channels, limit)
    }

    async fn fallback(&self, limit: usize) -> Result<Vec<Recommendation>> {
        match self.trending.top(limit).await {
            Ok(items) => {
                metrics::record_request("fallback");
                Ok(items
                    .into_iter()
                    .map(|item| Recommendation {
                        track_id: item.track_id,
                        total_score: item.score,
                        reasons: vec![item.reason],
                    })
                    .collect())
            }
            Err(e) => {
                metrics::record_request("error");
                warn!(error = %e, "Trending fallback failed");
                Err(if e.is_data_access() {
                    e
                } else {
                    AppError::DataAccess(e.to_string())
                })
            }
        }
    }

    /// Tracks similar to one track; empty when the track or the model is unknown
    pub fn similar_tracks(&self, track_id: &str, limit: usize) -> Vec<SimilarTrack> {
        match self.models.current() {
            Some(snapshot) => snapshot.content.similar_to(track_id, limit),
            None => Vec::new(),
        }
    }

    /// Append to the user's preference log on a background task. Failures
    /// are logged, never surfaced; the handle may be awaited or dropped.
    pub fn record_interaction(
        &self,
        user_id: &str,
        track_id: &str,
        action: InteractionAction,
    ) -> JoinHandle<()> {
        let preferences = self.preferences.clone();
        let user_id = user_id.to_string();
        let track_id = track_id.to_string();

        tokio::spawn(async move {
            match preferences.record(&user_id, &track_id, action).await {
                Ok(()) => metrics::record_preference_event(action.as_str(), "success"),
                Err(e) => {
                    metrics::record_preference_event(action.as_str(), "error");
                    warn!(
                        user_id = %user_id,
                        track_id = %track_id,
                        error = %e,
                        "Failed to record user interaction"
                    );
                }
            }
        })
    }

    /// Fire-and-forget rebuild; false when one is already running
    pub fn trigger_retrain(&self) -> bool {
        let started = self.models.trigger_retrain();
        info!(started, "Model retraining requested");
        started
    }

    pub fn health(&self) -> EngineHealth {
        let snapshot = self.models.peek();
        EngineHealth {
            model_state: self.models.state(),
            retraining: self.models.is_retraining(),
            trained_at: snapshot.as_ref().map(|s| s.trained_at),
            expires_at: snapshot.as_ref().map(|s| s.expires_at),
            tracks: snapshot.as_ref().map(|s| s.content.len()).unwrap_or(0),
            users: snapshot
                .as_ref()
                .map(|s| s.collaborative.user_ids().len())
                .unwrap_or(0),
        }
    }
}

/// A failed or panicked channel contributes nothing
fn channel_or_empty(
    channel: ReasonTag,
    joined: std::result::Result<Result<Vec<ChannelItem>>, tokio::task::JoinError>,
) -> Vec<ChannelItem> {
    let failure = match joined {
        Ok(Ok(items)) => return items,
        Ok(Err(e)) => AppError::ChannelFailure {
            channel: channel.as_str(),
            reason: e.to_string(),
        },
        Err(e) => AppError::ChannelFailure {
            channel: channel.as_str(),
            reason: e.to_string(),
        },
    };

    metrics::record_channel_failure(channel.as_str());
    warn!(error = %failure, "Channel degraded to empty result");
    Vec::new()
}
