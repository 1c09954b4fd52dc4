use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::services::hybrid_ranker::HybridWeights;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    // Feature building
    pub max_vocabulary: usize,

    // Collaborative factorization
    pub svd_rank: usize,
    pub svd_iterations: usize,
    pub svd_seed: u64,

    // Query windows
    pub interaction_window_days: i32,
    pub trending_window_days: i32,
    pub seed_window_days: i32,
    pub seed_limit: i64,

    // Blend weights
    pub content_weight: f64,
    pub collaborative_weight: f64,
    pub trending_weight: f64,

    // Request limits
    pub default_recommendations: usize,
    pub default_similar: usize,
    pub max_results: usize,

    // Cache lifetimes
    pub model_ttl_secs: u64,
    pub preference_cap: usize,
    pub preference_ttl_secs: u64,

    // I/O pool
    pub io_pool_size: usize,
    pub io_timeout_ms: u64,
    pub request_timeout_ms: u64,

    // Model builds
    /// Budget for each snapshot load and model cache call made while training
    pub training_timeout_ms: u64,
    /// 0 disables the periodic retrain job
    pub retrain_interval_secs: u64,
    /// Minimum gap after a failed build before serving triggers another one
    pub retrain_cooldown_secs: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_vocabulary: 5000,
            svd_rank: 100,
            svd_iterations: 5,
            svd_seed: 42,
            interaction_window_days: 90,
            trending_window_days: 7,
            seed_window_days: 30,
            seed_limit: 50,
            content_weight: 0.4,
            collaborative_weight: 0.5,
            trending_weight: 0.1,
            default_recommendations: 20,
            default_similar: 10,
            max_results: 100,
            model_ttl_secs: 86_400, // 24 hours
            preference_cap: 1000,
            preference_ttl_secs: 2_592_000, // 30 days
            io_pool_size: 4,
            io_timeout_ms: 2000,
            request_timeout_ms: 5000,
            training_timeout_ms: 300_000, // 5 minutes
            retrain_interval_secs: 0,
            retrain_cooldown_secs: 60,
        }
    }
}

impl RecommendationConfig {
    pub fn weights(&self) -> HybridWeights {
        HybridWeights {
            content: self.content_weight,
            collaborative: self.collaborative_weight,
            trending: self.trending_weight,
        }
    }

    pub fn model_ttl(&self) -> Duration {
        Duration::from_secs(self.model_ttl_secs)
    }

    pub fn preference_ttl(&self) -> Duration {
        Duration::from_secs(self.preference_ttl_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn training_timeout(&self) -> Duration {
        Duration::from_millis(self.training_timeout_ms)
    }

    pub fn retrain_cooldown(&self) -> Duration {
        Duration::from_secs(self.retrain_cooldown_secs)
    }

    /// Clamp a requested result count into `1..=max_results`
    pub fn clamp_limit(&self, requested: usize) -> usize {
        requested.min(self.max_results).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_vocabulary == 0 {
            return Err(anyhow!("Max vocabulary must be greater than 0"));
        }

        if self.svd_rank == 0 {
            return Err(anyhow!("SVD rank must be greater than 0"));
        }

        if self.interaction_window_days <= 0
            || self.trending_window_days <= 0
            || self.seed_window_days <= 0
        {
            return Err(anyhow!("Query windows must be positive"));
        }

        let weights = [
            self.content_weight,
            self.collaborative_weight,
            self.trending_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(anyhow!("Blend weights must be finite and non-negative"));
        }

        if self.max_results == 0 || self.max_results > 1000 {
            return Err(anyhow!("Max results must be between 1 and 1000"));
        }

        if self.io_pool_size == 0 {
            return Err(anyhow!("I/O pool size must be greater than 0"));
        }

        if self.io_timeout_ms == 0
            || self.request_timeout_ms == 0
            || self.training_timeout_ms == 0
        {
            return Err(anyhow!("Timeouts must be greater than 0"));
        }

        if self.model_ttl_secs == 0 || self.preference_ttl_secs == 0 {
            return Err(anyhow!("Cache TTLs must be greater than 0"));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from defaults, `.env` and `SECTION__KEY` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let d = RecommendationConfig::default();
        let config = config::Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("database.url", "postgres://localhost/music")?
            .set_default("database.max_connections", 10)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("recommendation.max_vocabulary", d.max_vocabulary as i64)?
            .set_default("recommendation.svd_rank", d.svd_rank as i64)?
            .set_default("recommendation.svd_iterations", d.svd_iterations as i64)?
            .set_default("recommendation.svd_seed", d.svd_seed as i64)?
            .set_default(
                "recommendation.interaction_window_days",
                d.interaction_window_days as i64,
            )?
            .set_default(
                "recommendation.trending_window_days",
                d.trending_window_days as i64,
            )?
            .set_default("recommendation.seed_window_days", d.seed_window_days as i64)?
            .set_default("recommendation.seed_limit", d.seed_limit)?
            .set_default("recommendation.content_weight", d.content_weight)?
            .set_default("recommendation.collaborative_weight", d.collaborative_weight)?
            .set_default("recommendation.trending_weight", d.trending_weight)?
            .set_default(
                "recommendation.default_recommendations",
                d.default_recommendations as i64,
            )?
            .set_default("recommendation.default_similar", d.default_similar as i64)?
            .set_default("recommendation.max_results", d.max_results as i64)?
            .set_default("recommendation.model_ttl_secs", d.model_ttl_secs as i64)?
            .set_default("recommendation.preference_cap", d.preference_cap as i64)?
            .set_default(
                "recommendation.preference_ttl_secs",
                d.preference_ttl_secs as i64,
            )?
            .set_default("recommendation.io_pool_size", d.io_pool_size as i64)?
            .set_default("recommendation.io_timeout_ms", d.io_timeout_ms as i64)?
            .set_default(
                "recommendation.request_timeout_ms",
                d.request_timeout_ms as i64,
            )?
            .set_default(
                "recommendation.training_timeout_ms",
                d.training_timeout_ms as i64,
            )?
            .set_default(
                "recommendation.retrain_interval_secs",
                d.retrain_interval_secs as i64,
            )?
            .set_default(
                "recommendation.retrain_cooldown_secs",
                d.retrain_cooldown_secs as i64,
            )?
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.app.port == 0 {
            return Err(anyhow!("HTTP port must be greater than 0"));
        }

        if self.database.url.is_empty() {
            return Err(anyhow!("Database URL is required"));
        }

        if self.redis.url.is_empty() {
            return Err(anyhow!("Redis URL is required"));
        }

        self.recommendation.validate()
    }
}
