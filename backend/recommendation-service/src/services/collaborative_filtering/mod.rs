//! Collaborative Filtering Model
//!
//! User × track play counts, mean-centered per user and factorized with a
//! truncated SVD. Predicted affinity is
//! `user_factors[u] · item_factors[:, t] + user_means[u]`.

pub mod svd;

use ndarray::{Array1, Array2};
use std::collections::{BTreeSet, HashMap};

use crate::error::{AppError, Result};
use crate::models::{ChannelItem, Interaction, ReasonTag, TrackId, UserId};
use crate::utils::top_k;
use svd::randomized_svd;

#[derive(Debug, Clone, Copy)]
pub struct FactorizationParams {
    pub rank: usize,
    pub n_iter: usize,
    pub seed: u64,
}

impl Default for FactorizationParams {
    fn default() -> Self {
        Self {
            rank: 100,
            n_iter: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollaborativeModel {
    user_ids: Vec<UserId>,
    track_ids: Vec<TrackId>,
    user_index: HashMap<UserId, usize>,
    track_index: HashMap<TrackId, usize>,
    /// users × rank
    user_factors: Array2<f64>,
    /// rank × tracks
    item_factors: Array2<f64>,
    user_means: Array1<f64>,
}

impl CollaborativeModel {
    pub fn empty() -> Self {
        Self {
            user_ids: Vec::new(),
            track_ids: Vec::new(),
            user_index: HashMap::new(),
            track_index: HashMap::new(),
            user_factors: Array2::zeros((0, 0)),
            item_factors: Array2::zeros((0, 0)),
            user_means: Array1::zeros(0),
        }
    }

    pub fn build(interactions: &[Interaction], params: FactorizationParams) -> Self {
        if interactions.is_empty() {
            return Self::empty();
        }

        let user_ids: Vec<UserId> = interactions
            .iter()
            .map(|i| i.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let track_ids: Vec<TrackId> = interactions
            .iter()
            .map(|i| i.track_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let user_index = index_of(&user_ids);
        let track_index = index_of(&track_ids);

        let mut counts = Array2::<f64>::zeros((user_ids.len(), track_ids.len()));
        for interaction in interactions {
            let u = user_index[&interaction.user_id];
            let t = track_index[&interaction.track_id];
            // duplicate keys are summed
            counts[[u, t]] += interaction.play_count as f64;
        }

        let user_means = counts
            .mean_axis(ndarray::Axis(1))
            .unwrap_or_else(|| Array1::zeros(user_ids.len()));
        let centered = &counts - &user_means.view().insert_axis(ndarray::Axis(1));

        let svd = randomized_svd(&centered, params.rank, params.n_iter, params.seed);
        let user_factors = &svd.u * &svd.singular_values;

        Self {
            user_ids,
            track_ids,
            user_index,
            track_index,
            user_factors,
            item_factors: svd.vt,
            user_means,
        }
    }

    /// Assemble a model from decoded parts, validating every dimension
    pub fn from_parts(
        user_ids: Vec<UserId>,
        track_ids: Vec<TrackId>,
        user_factors: Array2<f64>,
        item_factors: Array2<f64>,
        user_means: Array1<f64>,
    ) -> Result<Self> {
        let (users, rank) = user_factors.dim();
        if users != user_ids.len() || user_means.len() != user_ids.len() {
            return Err(AppError::ModelFormat(format!(
                "user factors cover {} users, mapping has {}",
                users,
                user_ids.len()
            )));
        }
        if item_factors.dim() != (rank, track_ids.len()) {
            return Err(AppError::ModelFormat(format!(
                "item factors are {:?}, expected ({}, {})",
                item_factors.dim(),
                rank,
                track_ids.len()
            )));
        }

        let user_index = index_of(&user_ids);
        let track_index = index_of(&track_ids);
        if user_index.len() != user_ids.len() || track_index.len() != track_ids.len() {
            return Err(AppError::ModelFormat(
                "duplicate ids in collaborative mapping".to_string(),
            ));
        }

        Ok(Self {
            user_ids,
            track_ids,
            user_index,
            track_index,
            user_factors,
            item_factors,
            user_means,
        })
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn track_ids(&self) -> &[TrackId] {
        &self.track_ids
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }

    pub fn user_means(&self) -> &Array1<f64> {
        &self.user_means
    }

    pub fn rank(&self) -> usize {
        self.user_factors.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }

    /// Predicted affinity for one (user, track) pair
    pub fn predict(&self, user_id: &str, track_id: &str) -> Result<f64> {
        let u = *self
            .user_index
            .get(user_id)
            .ok_or_else(|| AppError::ModelUnavailable(format!("unknown user {}", user_id)))?;
        let t = *self
            .track_index
            .get(track_id)
            .ok_or_else(|| AppError::ModelUnavailable(format!("unknown track {}", track_id)))?;

        Ok(self.user_factors.row(u).dot(&self.item_factors.column(t)) + self.user_means[u])
    }

    /// Top `k` tracks by predicted affinity; empty for unknown users
    pub fn recommend(&self, user_id: &str, k: usize) -> Vec<ChannelItem> {
        let Some(&u) = self.user_index.get(user_id) else {
            return Vec::new();
        };

        let mean = self.user_means[u];
        let predicted = self.user_factors.row(u).dot(&self.item_factors);

        top_k(predicted.iter().map(|p| p + mean).enumerate(), k)
            .into_iter()
            .map(|(t, score)| ChannelItem {
                track_id: self.track_ids[t].clone(),
                score,
                reason: ReasonTag::CollaborativeFiltering,
            })
            .collect()
    }
}

fn index_of(ids: &[String]) -> HashMap<String, usize> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect()
}
