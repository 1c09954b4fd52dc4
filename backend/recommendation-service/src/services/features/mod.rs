//! Feature Builder
//!
//! Turns the active catalog into one vector per track: the TF-IDF text
//! vector followed by the standardized numeric features
//! (duration_minutes, popularity_score, age_days).

pub mod scaler;
pub mod stopwords;
pub mod tfidf;

use chrono::{DateTime, Utc};
use ndarray::{concatenate, Array2, Axis};

use crate::error::{AppError, Result};
use crate::models::{Track, TrackId};
use scaler::StandardScaler;
use tfidf::TfidfVectorizer;

pub const NUMERIC_FEATURES: usize = 3;

/// Row `i` of `matrix` belongs to `track_ids[i]`
#[derive(Debug, Clone)]
pub struct TrackFeatures {
    pub track_ids: Vec<TrackId>,
    pub matrix: Array2<f64>,
    pub vocabulary_len: usize,
}

pub struct FeatureBuilder {
    max_vocabulary: usize,
}

impl FeatureBuilder {
    pub fn new(max_vocabulary: usize) -> Self {
        Self { max_vocabulary }
    }

    pub fn build(&self, tracks: &[Track], now: DateTime<Utc>) -> Result<TrackFeatures> {
        let texts: Vec<String> = tracks.iter().map(Track::text_blob).collect();
        let mut vectorizer = TfidfVectorizer::new(self.max_vocabulary);
        let text = vectorizer.fit_transform(&texts);

        let mut numeric = Array2::<f64>::zeros((tracks.len(), NUMERIC_FEATURES));
        for (row, track) in tracks.iter().enumerate() {
            numeric[[row, 0]] = track.duration_minutes();
            numeric[[row, 1]] = track.popularity_score();
            numeric[[row, 2]] = track.age_days(now);
        }
        let numeric = StandardScaler::fit_transform(&numeric);

        let matrix = concatenate(Axis(1), &[text.view(), numeric.view()]).map_err(|e| {
            AppError::Internal(format!(
                "text features {:?} and numeric features {:?} do not align: {}",
                text.dim(),
                numeric.dim(),
                e
            ))
        })?;

        Ok(TrackFeatures {
            track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
            matrix,
            vocabulary_len: vectorizer.vocabulary_len(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::models::Track;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn track(id: &str, title: &str, artist: &str, genre: &str, plays: i64) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            artist_name: Some(artist.to_string()),
            album_name: None,
            genre: Some(genre.to_string()),
            duration_ms: Some(180_000 + plays * 1000),
            play_count: plays,
            like_count: plays / 10,
            created_at: now() - Duration::days(plays % 30),
        }
    }
}
