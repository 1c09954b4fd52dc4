//! Content-Based Similarity Model
//!
//! Dense track-to-track cosine similarity over the concatenated feature
//! vectors. Memory is O(N²) in the catalog size, stored as `f32`.

use ndarray::{Array2, Axis};
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{ChannelItem, ReasonTag, SimilarTrack, TrackId};
use crate::services::features::TrackFeatures;
use crate::utils::top_k;

#[derive(Debug, Clone)]
pub struct ContentModel {
    track_ids: Vec<TrackId>,
    index: HashMap<TrackId, usize>,
    similarity: Array2<f32>,
}

impl ContentModel {
    pub fn empty() -> Self {
        Self {
            track_ids: Vec::new(),
            index: HashMap::new(),
            similarity: Array2::zeros((0, 0)),
        }
    }

    /// Fails when the feature rows cannot form a valid model (e.g. duplicate ids)
    pub fn build(features: &TrackFeatures) -> Result<Self> {
        let n = features.track_ids.len();
        let mut normalized = features.matrix.clone();
        for mut row in normalized.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 && norm.is_finite() {
                row.mapv_inplace(|v| v / norm);
            } else {
                row.fill(0.0);
            }
        }

        let dense = normalized.dot(&normalized.t());
        let mut similarity = Array2::<f32>::zeros((n, n));
        for i in 0..n {
            similarity[[i, i]] = 1.0;
            for j in (i + 1)..n {
                let value = dense[[i, j]].clamp(-1.0, 1.0) as f32;
                similarity[[i, j]] = value;
                similarity[[j, i]] = value;
            }
        }

        Self::from_parts(features.track_ids.clone(), similarity)
    }

    /// Assemble a model from a mapping and an N×N matrix
    pub fn from_parts(track_ids: Vec<TrackId>, similarity: Array2<f32>) -> Result<Self> {
        let n = track_ids.len();
        if similarity.dim() != (n, n) {
            return Err(AppError::ModelFormat(format!(
                "similarity matrix is {:?}, expected {}x{}",
                similarity.dim(),
                n,
                n
            )));
        }

        let index: HashMap<TrackId, usize> = track_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        if index.len() != n {
            return Err(AppError::ModelFormat(
                "duplicate track ids in content mapping".to_string(),
            ));
        }

        Ok(Self {
            track_ids,
            index,
            similarity,
        })
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    pub fn track_ids(&self) -> &[TrackId] {
        &self.track_ids
    }

    pub fn similarity(&self) -> &Array2<f32> {
        &self.similarity
    }

    /// Top `k` neighbours of row `idx`, excluding the row itself
    fn neighbours(&self, idx: usize, k: usize) -> Vec<(usize, f64)> {
        let row = self.similarity.row(idx);
        top_k(
            row.iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .map(|(j, v)| (j, *v as f64)),
            k,
        )
    }

    /// Tracks similar to any of the seeds, max score per track, best first
    pub fn similar_for_seeds(&self, seeds: &[TrackId], k: usize) -> Vec<ChannelItem> {
        let mut best: HashMap<usize, f64> = HashMap::new();
        for seed in seeds {
            let Some(&idx) = self.index.get(seed) else {
                continue;
            };
            for (j, score) in self.neighbours(idx, k) {
                best.entry(j)
                    .and_modify(|s| *s = s.max(score))
                    .or_insert(score);
            }
        }

        top_k(best, k)
            .into_iter()
            .map(|(j, score)| ChannelItem {
                track_id: self.track_ids[j].clone(),
                score,
                reason: ReasonTag::ContentBased,
            })
            .collect()
    }

    /// Up to `k` other tracks most similar to `track_id`; empty when unknown
    pub fn similar_to(&self, track_id: &str, k: usize) -> Vec<SimilarTrack> {
        let Some(&idx) = self.index.get(track_id) else {
            return Vec::new();
        };

        self.neighbours(idx, k)
            .into_iter()
            .map(|(j, score)| SimilarTrack {
                track_id: self.track_ids[j].clone(),
                similarity_score: score,
            })
            .collect()
    }
}
