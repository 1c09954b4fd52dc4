use std::sync::Arc;
use tracing::debug;

use crate::db::CatalogSource;
use crate::error::Result;
use crate::models::{ChannelItem, ReasonTag};
use crate::services::worker_pool::IoPool;

/// Popularity ranking over recently created tracks
///
/// Stateless and independent of model state; also the last-resort fallback.
#[derive(Clone)]
pub struct TrendingSource {
    catalog: Arc<dyn CatalogSource>,
    pool: IoPool,
    window_days: i32,
}

impl TrendingSource {
    pub fn new(catalog: Arc<dyn CatalogSource>, pool: IoPool, window_days: i32) -> Self {
        Self {
            catalog,
            pool,
            window_days,
        }
    }

    pub async fn top(&self, limit: usize) -> Result<Vec<ChannelItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let catalog = Arc::clone(&self.catalog);
        let window_days = self.window_days;
        let tracks = self
            .pool
            .run("trending_tracks", async move {
                catalog.trending_tracks(window_days, limit as i64).await
            })
            .await?;

        debug!(count = tracks.len(), window_days, "Loaded trending tracks");

        Ok(tracks
            .into_iter()
            .take(limit)
            .map(|track| ChannelItem {
                score: track.popularity_score(),
                track_id: track.id,
                reason: ReasonTag::Trending,
            })
            .collect())
    }
}
