//! Hybrid Ranker
//!
//! Blends per-channel ranked lists by position. An item at position `i` of a
//! list of length `L` earns `weight * (L - i) / L`; contributions and reason
//! tags accumulate per track.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{ChannelItem, ReasonTag, Recommendation, TrackId};

/// Per-channel blend weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    pub content: f64,
    pub collaborative: f64,
    pub trending: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            content: 0.4,
            collaborative: 0.5,
            trending: 0.1,
        }
    }
}

impl HybridWeights {
    pub fn for_reason(&self, reason: ReasonTag) -> f64 {
        match reason {
            ReasonTag::ContentBased => self.content,
            ReasonTag::CollaborativeFiltering => self.collaborative,
            ReasonTag::Trending => self.trending,
        }
    }
}

/// Results of the three channels for one request
#[derive(Debug, Clone, Default)]
pub struct ChannelResults {
    pub content: Vec<ChannelItem>,
    pub collaborative: Vec<ChannelItem>,
    pub trending: Vec<ChannelItem>,
}

pub struct HybridRanker {
    weights: HybridWeights,
}

impl HybridRanker {
    pub fn new(weights: HybridWeights) -> Self {
        Self { weights }
    }

    /// Merge channel lists into at most `limit` unique recommendations.
    ///
    /// Ties keep first-seen order: content, then collaborative, then trending.
    pub fn combine(&self, channels: &ChannelResults, limit: usize) -> Result<Vec<Recommendation>> {
        let mut order: Vec<TrackId> = Vec::new();
        let mut merged: HashMap<TrackId, Recommendation> = HashMap::new();

        for (reason, items) in [
            (ReasonTag::ContentBased, &channels.content),
            (ReasonTag::CollaborativeFiltering, &channels.collaborative),
            (ReasonTag::Trending, &channels.trending),
        ] {
            let weight = self.weights.for_reason(reason);
            let len = items.len() as f64;

            for (position, item) in items.iter().enumerate() {
                let contribution = weight * (len - position as f64) / len;
                if !contribution.is_finite() {
                    return Err(AppError::PipelineFailure(format!(
                        "non-finite contribution for track {} from {}",
                        item.track_id, reason
                    )));
                }

                let entry = merged.entry(item.track_id.clone()).or_insert_with(|| {
                    order.push(item.track_id.clone());
                    Recommendation {
                        track_id: item.track_id.clone(),
                        total_score: 0.0,
                        reasons: Vec::new(),
                    }
                });
                entry.total_score += contribution;
                if !entry.reasons.contains(&reason) {
                    entry.reasons.push(reason);
                }
            }
        }

        let mut ranked: Vec<Recommendation> = order
            .into_iter()
            .filter_map(|id| merged.remove(&id))
            .collect();
        // stable sort keeps first-seen order on ties
        ranked.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        ranked.truncate(limit);

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str], reason: ReasonTag) -> Vec<ChannelItem> {
        ids.iter()
            .map(|id| ChannelItem {
                track_id: id.to_string(),
                score: 1.0,
                reason,
            })
            .collect()
    }

    fn ranker() -> HybridRanker {
        HybridRanker::new(HybridWeights::default())
    }

    #[test]
    fn test_position_weighted_blend() {
        let channels = ChannelResults {
            content: items(&["A", "B"], ReasonTag::ContentBased),
            collaborative: items(&["B", "A"], ReasonTag::CollaborativeFiltering),
            trending: items(&["C"], ReasonTag::Trending),
        };

        let recs = ranker().combine(&channels, 10).unwrap();
        let ids: Vec<&str> = recs.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);

        assert!((recs[0].total_score - 0.70).abs() < 1e-9);
        assert!((recs[1].total_score - 0.65).abs() < 1e-9);
        assert!((recs[2].total_score - 0.10).abs() < 1e-9);
        assert_eq!(
            recs[0].reasons,
            vec![ReasonTag::ContentBased, ReasonTag::CollaborativeFiltering]
        );
        assert_eq!(recs[2].reasons, vec![ReasonTag::Trending]);
    }

    #[test]
    fn test_top_of_every_channel_scores_one() {
        let channels = ChannelResults {
            content: items(&["X", "Y"], ReasonTag::ContentBased),
            collaborative: items(&["X"], ReasonTag::CollaborativeFiltering),
            trending: items(&["X", "Z", "W"], ReasonTag::Trending),
        };

        let recs = ranker().combine(&channels, 10).unwrap();
        assert_eq!(recs[0].track_id, "X");
        assert!((recs[0].total_score - 1.0).abs() < 1e-9);
        assert_eq!(recs[0].reasons.len(), 3);
    }

    #[test]
    fn test_result_is_unique_and_truncated() {
        let channels = ChannelResults {
            content: items(&["A", "B", "C"], ReasonTag::ContentBased),
            collaborative: items(&["C", "D"], ReasonTag::CollaborativeFiltering),
            trending: items(&["D", "E", "A"], ReasonTag::Trending),
        };

        let recs = ranker().combine(&channels, 3).unwrap();
        assert_eq!(recs.len(), 3);
        let mut ids: Vec<&str> = recs.iter().map(|r| r.track_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_ties_keep_channel_order() {
        let channels = ChannelResults {
            content: items(&["Q"], ReasonTag::ContentBased),
            collaborative: Vec::new(),
            trending: items(&["P"], ReasonTag::Trending),
        };
        let weights = HybridWeights {
            content: 0.1,
            collaborative: 0.5,
            trending: 0.1,
        };

        let recs = HybridRanker::new(weights).combine(&channels, 10).unwrap();
        let ids: Vec<&str> = recs.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["Q", "P"]);
    }

    #[test]
    fn test_empty_channels() {
        let recs = ranker().combine(&ChannelResults::default(), 5).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_non_finite_weight_fails_pipeline() {
        let weights = HybridWeights {
            content: f64::NAN,
            ..HybridWeights::default()
        };
        let channels = ChannelResults {
            content: items(&["A"], ReasonTag::ContentBased),
            ..ChannelResults::default()
        };

        let result = HybridRanker::new(weights).combine(&channels, 5);
        assert!(matches!(result, Err(AppError::PipelineFailure(_))));
    }
}
