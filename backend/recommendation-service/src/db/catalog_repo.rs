/// Catalog Repository
///
/// PostgreSQL queries over `tracks` and `user_play_history`
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::CatalogSource;
use crate::error::{AppError, Result};
use crate::models::{Interaction, Track, TrackId};

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for PgCatalogRepository {
    async fn active_tracks(&self) -> Result<Vec<Track>> {
        sqlx::query_as::<_, Track>(
            r#"
            SELECT
                id::TEXT AS id,
                title,
                artist_name,
                album_name,
                genre,
                duration_ms::BIGINT AS duration_ms,
                COALESCE(play_count, 0)::BIGINT AS play_count,
                COALESCE(like_count, 0)::BIGINT AS like_count,
                created_at::TIMESTAMPTZ AS created_at
            FROM tracks
            WHERE is_active = true
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load active tracks: {}", e);
            AppError::DataAccess(e.to_string())
        })
    }

    async fn interaction_aggregates(&self, window_days: i32) -> Result<Vec<Interaction>> {
        sqlx::query_as::<_, Interaction>(
            r#"
            SELECT
                user_id::TEXT AS user_id,
                track_id::TEXT AS track_id,
                COUNT(*)::BIGINT AS play_count,
                MAX(played_at)::TIMESTAMPTZ AS last_played_at
            FROM user_play_history
            WHERE played_at >= NOW() - make_interval(days => $1)
            GROUP BY user_id, track_id
            "#,
        )
        .bind(window_days)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load interaction aggregates: {}", e);
            AppError::DataAccess(e.to_string())
        })
    }

    async fn trending_tracks(&self, window_days: i32, limit: i64) -> Result<Vec<Track>> {
        sqlx::query_as::<_, Track>(
            r#"
            SELECT
                id::TEXT AS id,
                title,
                artist_name,
                album_name,
                genre,
                duration_ms::BIGINT AS duration_ms,
                COALESCE(play_count, 0)::BIGINT AS play_count,
                COALESCE(like_count, 0)::BIGINT AS like_count,
                created_at::TIMESTAMPTZ AS created_at
            FROM tracks
            WHERE is_active = true
                AND created_at >= NOW() - make_interval(days => $1)
            ORDER BY (COALESCE(play_count, 0) * 0.7 + COALESCE(like_count, 0) * 0.3) DESC, id ASC
            LIMIT $2
            "#,
        )
        .bind(window_days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load trending tracks: {}", e);
            AppError::DataAccess(e.to_string())
        })
    }

    async fn recent_user_tracks(
        &self,
        user_id: &str,
        window_days: i32,
        limit: i64,
    ) -> Result<Vec<TrackId>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT track_id::TEXT
            FROM user_play_history
            WHERE user_id::TEXT = $1
                AND played_at >= NOW() - make_interval(days => $2)
            GROUP BY track_id
            ORDER BY MAX(played_at) DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(window_days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(user_id = %user_id, "Failed to load recent user tracks: {}", e);
            AppError::DataAccess(e.to_string())
        })
    }
}
