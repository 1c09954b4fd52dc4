pub mod catalog_repo;

pub use catalog_repo::PgCatalogRepository;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Interaction, Track, TrackId};

/// Read side of the system of record
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Every active track in the catalog
    async fn active_tracks(&self) -> Result<Vec<Track>>;

    /// Per (user, track) play aggregates over the last `window_days`
    async fn interaction_aggregates(&self, window_days: i32) -> Result<Vec<Interaction>>;

    /// Active tracks created in the last `window_days`, most popular first
    async fn trending_tracks(&self, window_days: i32, limit: i64) -> Result<Vec<Track>>;

    /// Distinct tracks the user played in the last `window_days`, most recent first
    async fn recent_user_tracks(
        &self,
        user_id: &str,
        window_days: i32,
        limit: i64,
    ) -> Result<Vec<TrackId>>;
}
