//! Model Lifecycle Manager
//!
//! Owns the published `(content, collaborative)` snapshot. Builds happen in
//! isolation and are published with a single pointer swap, so readers either
//! see the previous snapshot or the complete new one. At most one build runs
//! at a time, and a failed build holds off serving-triggered rebuilds for a
//! cooldown.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::cache::{ModelCache, COLLABORATIVE_MODEL_KEY, CONTENT_MODEL_KEY};
use crate::config::RecommendationConfig;
use crate::db::CatalogSource;
use crate::error::Result;
use crate::metrics;
use crate::services::collaborative_filtering::{CollaborativeModel, FactorizationParams};
use crate::services::content_based::ContentModel;
use crate::services::features::FeatureBuilder;
use crate::services::model_codec;
use crate::services::worker_pool::IoPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    Cache,
    Training,
}

/// Immutable pair of trained models
#[derive(Debug)]
pub struct ModelSnapshot {
    pub content: ContentModel,
    pub collaborative: CollaborativeModel,
    pub trained_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
}

impl ModelSnapshot {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub max_vocabulary: usize,
    pub factorization: FactorizationParams,
    pub interaction_window_days: i32,
    pub model_ttl: Duration,
    /// Per-call budget for snapshot loads and model cache I/O
    pub training_timeout: Duration,
    pub retrain_cooldown: Duration,
}

impl From<&RecommendationConfig> for ModelSettings {
    fn from(config: &RecommendationConfig) -> Self {
        Self {
            max_vocabulary: config.max_vocabulary,
            factorization: FactorizationParams {
                rank: config.svd_rank,
                n_iter: config.svd_iterations,
                seed: config.svd_seed,
            },
            interaction_window_days: config.interaction_window_days,
            model_ttl: config.model_ttl(),
            training_timeout: config.training_timeout(),
            retrain_cooldown: config.retrain_cooldown(),
        }
    }
}

/// Clears the single-flight flag when a build ends, including on panic
struct TrainingGuard<'a>(&'a AtomicBool);

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ModelManager {
    catalog: Arc<dyn CatalogSource>,
    cache: Arc<dyn ModelCache>,
    pool: IoPool,
    settings: ModelSettings,
    snapshot: RwLock<Option<Arc<ModelSnapshot>>>,
    state: RwLock<ModelState>,
    retraining: AtomicBool,
    last_failure: Mutex<Option<Instant>>,
}

impl ModelManager {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        cache: Arc<dyn ModelCache>,
        pool: IoPool,
        settings: ModelSettings,
    ) -> Self {
        Self {
            catalog,
            cache,
            pool,
            settings,
            snapshot: RwLock::new(None),
            state: RwLock::new(ModelState::Uninitialized),
            retraining: AtomicBool::new(false),
            last_failure: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ModelState {
        *self.state.read()
    }

    pub fn is_retraining(&self) -> bool {
        self.retraining.load(Ordering::SeqCst)
    }

    /// Latest published snapshot, expired or not
    pub fn peek(&self) -> Option<Arc<ModelSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Load both models from cache, or train them when the cache cannot serve
    pub async fn initialize(&self) -> Result<()> {
        *self.state.write() = ModelState::Loading;

        if let Some(snapshot) = self.load_from_cache().await {
            info!(
                tracks = snapshot.content.len(),
                users = snapshot.collaborative.user_ids().len(),
                trained_at = %snapshot.trained_at,
                "Loaded models from cache"
            );
            self.publish(snapshot);
            return Ok(());
        }

        let result = self.retrain_now().await;
        // nothing published: another build is still running, or this one failed
        self.reset_if_unpublished();
        result.map(|_| ())
    }

    fn reset_if_unpublished(&self) {
        let mut state = self.state.write();
        if self.snapshot.read().is_none() {
            *state = ModelState::Uninitialized;
        }
    }

    /// Snapshot usable for serving. A missing or expired snapshot schedules
    /// a rebuild and is reported as absent.
    pub fn current(self: &Arc<Self>) -> Option<Arc<ModelSnapshot>> {
        let snapshot = self.peek();
        match snapshot {
            Some(snapshot) if !snapshot.is_expired(Utc::now()) => Some(snapshot),
            Some(snapshot) => {
                info!(expired_at = %snapshot.expires_at, "Model snapshot expired, scheduling rebuild");
                self.schedule_rebuild();
                None
            }
            None => {
                self.schedule_rebuild();
                None
            }
        }
    }

    /// Serving-path rebuild, skipped while the last failure is within the cooldown
    fn schedule_rebuild(self: &Arc<Self>) {
        if let Some(failed_at) = *self.last_failure.lock() {
            let since = failed_at.elapsed();
            if since < self.settings.retrain_cooldown {
                debug!(
                    since_failure_ms = since.as_millis() as u64,
                    "Model rebuild cooling down after failure"
                );
                return;
            }
        }
        self.trigger_retrain();
    }

    /// Start a background rebuild. Returns false when one is already running.
    pub fn trigger_retrain(self: &Arc<Self>) -> bool {
        if !self.begin_training() {
            return false;
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = TrainingGuard(&manager.retraining);
            if let Err(e) = manager.build_and_publish().await {
                error!(error = %e, "Background model retraining failed");
            }
        });
        true
    }

    /// Rebuild in the caller's task. `Ok(None)` means another build was running.
    pub async fn retrain_now(&self) -> Result<Option<Arc<ModelSnapshot>>> {
        if !self.begin_training() {
            info!("Model build already in progress");
            return Ok(None);
        }

        let _guard = TrainingGuard(&self.retraining);
        self.build_and_publish().await.map(Some)
    }

    fn begin_training(&self) -> bool {
        self.retraining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn publish(&self, snapshot: Arc<ModelSnapshot>) {
        *self.snapshot.write() = Some(snapshot);
        *self.state.write() = ModelState::Ready;
    }

    async fn build_and_publish(&self) -> Result<Arc<ModelSnapshot>> {
        let started = Instant::now();
        let result = self.build().await;
        metrics::record_training_duration(started.elapsed());

        match result {
            Ok(snapshot) => {
                metrics::record_training_run("success");
                *self.last_failure.lock() = None;
                info!(
                    tracks = snapshot.content.len(),
                    users = snapshot.collaborative.user_ids().len(),
                    rank = snapshot.collaborative.rank(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Models trained and published"
                );
                self.publish(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(e) => {
                metrics::record_training_run("error");
                *self.last_failure.lock() = Some(Instant::now());
                Err(e)
            }
        }
    }

    async fn build(&self) -> Result<Arc<ModelSnapshot>> {
        let window = self.settings.interaction_window_days;
        let budget = self.settings.training_timeout;
        let (tracks, interactions) = tokio::try_join!(
            self.pool
                .run_with_timeout("active_tracks", budget, self.catalog.active_tracks()),
            self.pool.run_with_timeout(
                "interaction_aggregates",
                budget,
                self.catalog.interaction_aggregates(window)
            ),
        )?;

        info!(
            tracks = tracks.len(),
            interactions = interactions.len(),
            "Training models"
        );

        let max_vocabulary = self.settings.max_vocabulary;
        let params = self.settings.factorization;
        let trained_at = Utc::now();
        let (content, collaborative, content_blob, collaborative_blob) =
            tokio::task::spawn_blocking(move || -> Result<_> {
                let features = FeatureBuilder::new(max_vocabulary).build(&tracks, trained_at)?;
                let content = ContentModel::build(&features)?;
                let collaborative = CollaborativeModel::build(&interactions, params);
                let content_blob = model_codec::encode_content(&content, trained_at)?;
                let collaborative_blob =
                    model_codec::encode_collaborative(&collaborative, trained_at)?;
                Ok((content, collaborative, content_blob, collaborative_blob))
            })
            .await??;

        if content.is_empty() || collaborative.is_empty() {
            warn!(
                tracks = content.len(),
                users = collaborative.user_ids().len(),
                "Trained an empty model; affected channels will return nothing"
            );
        }

        self.persist(content_blob, collaborative_blob).await;

        Ok(Arc::new(ModelSnapshot {
            content,
            collaborative,
            trained_at,
            expires_at: trained_at + self.ttl(),
            origin: SnapshotOrigin::Training,
        }))
    }

    /// Cache write failures are logged; the trained snapshot is still published
    async fn persist(&self, content_blob: Vec<u8>, collaborative_blob: Vec<u8>) {
        let ttl = self.settings.model_ttl;
        let budget = self.settings.training_timeout;
        let writes = [
            (CONTENT_MODEL_KEY, content_blob),
            (COLLABORATIVE_MODEL_KEY, collaborative_blob),
        ];

        for (key, blob) in writes {
            let bytes = blob.len();
            let result = self
                .pool
                .run_with_timeout("cache_set", budget, self.cache.set_ex(key, blob, ttl))
                .await;
            if let Err(e) = result {
                warn!(key, error = %e, "Failed to cache trained model");
            } else {
                info!(key, bytes, "Cached trained model");
            }
        }
    }

    async fn load_from_cache(&self) -> Option<Arc<ModelSnapshot>> {
        let budget = self.settings.training_timeout;
        let (content_blob, collaborative_blob) = match tokio::try_join!(
            self.pool
                .run_with_timeout("cache_get", budget, self.cache.get(CONTENT_MODEL_KEY)),
            self.pool.run_with_timeout(
                "cache_get",
                budget,
                self.cache.get(COLLABORATIVE_MODEL_KEY)
            ),
        ) {
            Ok((Some(content), Some(collaborative))) => (content, collaborative),
            Ok(_) => {
                metrics::record_model_load("miss");
                info!("Model cache miss");
                return None;
            }
            Err(e) => {
                metrics::record_model_load("miss");
                warn!(error = %e, "Model cache unavailable");
                return None;
            }
        };

        match self.decode_snapshot(&content_blob, &collaborative_blob) {
            Ok(snapshot) if snapshot.is_expired(Utc::now()) => {
                metrics::record_model_load("miss");
                info!(expired_at = %snapshot.expires_at, "Cached models expired");
                None
            }
            Ok(snapshot) => {
                metrics::record_model_load("hit");
                Some(Arc::new(snapshot))
            }
            Err(e) => {
                metrics::record_model_load("rejected");
                warn!(error = %e, "Cached models rejected, retraining");
                None
            }
        }
    }

    fn decode_snapshot(&self, content: &[u8], collaborative: &[u8]) -> Result<ModelSnapshot> {
        let content = model_codec::decode_content(content)?;
        let collaborative = model_codec::decode_collaborative(collaborative)?;
        // the older of the two decides expiry
        let trained_at = content.trained_at.min(collaborative.trained_at);

        Ok(ModelSnapshot {
            content: content.model,
            collaborative: collaborative.model,
            trained_at,
            expires_at: trained_at + self.ttl(),
            origin: SnapshotOrigin::Cache,
        })
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.settings.model_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365))
    }
}
