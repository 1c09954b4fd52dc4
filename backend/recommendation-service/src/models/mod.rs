use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

pub type TrackId = String;
pub type UserId = String;

/// Active catalog track as loaded from the system of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub genre: Option<String>,
    pub duration_ms: Option<i64>,
    pub play_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Track {
    pub fn popularity_score(&self) -> f64 {
        0.7 * self.play_count as f64 + 0.3 * self.like_count as f64
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms.unwrap_or(0) as f64 / 60_000.0
    }

    /// Whole days elapsed since the track was created
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_days() as f64
    }

    /// Title, artist, album and genre joined by spaces; missing parts are empty
    pub fn text_blob(&self) -> String {
        [
            self.title.as_str(),
            self.artist_name.as_deref().unwrap_or(""),
            self.album_name.as_deref().unwrap_or(""),
            self.genre.as_deref().unwrap_or(""),
        ]
        .join(" ")
    }
}

/// Aggregated plays of one track by one user inside the interaction window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub play_count: i64,
    pub last_played_at: DateTime<Utc>,
}

/// Channel that contributed to a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    ContentBased,
    CollaborativeFiltering,
    Trending,
}

impl ReasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentBased => "content_based",
            Self::CollaborativeFiltering => "collaborative_filtering",
            Self::Trending => "trending",
        }
    }
}

impl std::fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ranked entry produced by a single channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelItem {
    pub track_id: TrackId,
    pub score: f64,
    pub reason: ReasonTag,
}

/// Final blended recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub track_id: TrackId,
    pub total_score: f64,
    pub reasons: Vec<ReasonTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarTrack {
    pub track_id: TrackId,
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Play,
    Like,
    Skip,
    Share,
}

impl InteractionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Like => "like",
            Self::Skip => "skip",
            Self::Share => "share",
        }
    }
}

impl std::fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Self::Play),
            "like" => Ok(Self::Like),
            "skip" => Ok(Self::Skip),
            "share" => Ok(Self::Share),
            other => Err(AppError::Validation(format!(
                "Unsupported interaction action: {}",
                other
            ))),
        }
    }
}

/// Entry appended to a user's preference log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEvent {
    pub track_id: TrackId,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
}
