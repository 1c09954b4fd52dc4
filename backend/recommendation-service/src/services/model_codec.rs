//! Versioned binary format for cached models
//!
//! Layout (bincode): magic `MREC`, format version, model kind, training
//! timestamp (ms), then the payload bytes. Payloads carry their dimensions,
//! mapping tables and flat row-major arrays. The header is decoded and
//! checked before the payload is touched.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{TrackId, UserId};
use crate::services::collaborative_filtering::CollaborativeModel;
use crate::services::content_based::ContentModel;

const MAGIC: [u8; 4] = *b"MREC";
pub const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Content,
    Collaborative,
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u16,
    kind: ModelKind,
    trained_at_ms: i64,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    header: Header,
    payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct ContentPayload {
    track_ids: Vec<TrackId>,
    similarity: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct CollaborativePayload {
    user_ids: Vec<UserId>,
    track_ids: Vec<TrackId>,
    rank: u64,
    user_factors: Vec<f64>,
    item_factors: Vec<f64>,
    user_means: Vec<f64>,
}

/// A decoded model together with the time it was trained
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub model: T,
    pub trained_at: DateTime<Utc>,
}

pub fn encode_content(model: &ContentModel, trained_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let payload = ContentPayload {
        track_ids: model.track_ids().to_vec(),
        similarity: model.similarity().iter().copied().collect(),
    };
    seal(ModelKind::Content, trained_at, &payload)
}

pub fn decode_content(bytes: &[u8]) -> Result<Decoded<ContentModel>> {
    let (payload, trained_at): (ContentPayload, _) = open(bytes, ModelKind::Content)?;
    let n = payload.track_ids.len();
    let similarity = Array2::from_shape_vec((n, n), payload.similarity)
        .map_err(|e| AppError::ModelFormat(format!("content similarity: {}", e)))?;

    Ok(Decoded {
        model: ContentModel::from_parts(payload.track_ids, similarity)?,
        trained_at,
    })
}

pub fn encode_collaborative(
    model: &CollaborativeModel,
    trained_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let payload = CollaborativePayload {
        user_ids: model.user_ids().to_vec(),
        track_ids: model.track_ids().to_vec(),
        rank: model.rank() as u64,
        user_factors: model.user_factors().iter().copied().collect(),
        item_factors: model.item_factors().iter().copied().collect(),
        user_means: model.user_means().to_vec(),
    };
    seal(ModelKind::Collaborative, trained_at, &payload)
}

pub fn decode_collaborative(bytes: &[u8]) -> Result<Decoded<CollaborativeModel>> {
    let (payload, trained_at): (CollaborativePayload, _) =
        open(bytes, ModelKind::Collaborative)?;
    let rank = payload.rank as usize;
    let users = payload.user_ids.len();
    let tracks = payload.track_ids.len();

    let user_factors = Array2::from_shape_vec((users, rank), payload.user_factors)
        .map_err(|e| AppError::ModelFormat(format!("user factors: {}", e)))?;
    let item_factors = Array2::from_shape_vec((rank, tracks), payload.item_factors)
        .map_err(|e| AppError::ModelFormat(format!("item factors: {}", e)))?;
    let user_means = Array1::from_vec(payload.user_means);

    Ok(Decoded {
        model: CollaborativeModel::from_parts(
            payload.user_ids,
            payload.track_ids,
            user_factors,
            item_factors,
            user_means,
        )?,
        trained_at,
    })
}

fn seal<P: Serialize>(kind: ModelKind, trained_at: DateTime<Utc>, payload: &P) -> Result<Vec<u8>> {
    let envelope = Envelope {
        header: Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            kind,
            trained_at_ms: trained_at.timestamp_millis(),
        },
        payload: bincode::serialize(payload)?,
    };
    Ok(bincode::serialize(&envelope)?)
}

fn open<P>(bytes: &[u8], expected: ModelKind) -> Result<(P, DateTime<Utc>)>
where
    P: for<'de> Deserialize<'de>,
{
    // trailing bytes are allowed, so the header decodes on its own
    let header: Header = bincode::deserialize(bytes)?;
    if header.magic != MAGIC {
        return Err(AppError::ModelFormat("bad magic".to_string()));
    }
    if header.version != FORMAT_VERSION {
        return Err(AppError::ModelFormat(format!(
            "unsupported format version {} (expected {})",
            header.version, FORMAT_VERSION
        )));
    }
    if header.kind != expected {
        return Err(AppError::ModelFormat(format!(
            "expected {:?} model, found {:?}",
            expected, header.kind
        )));
    }

    let trained_at = Utc
        .timestamp_millis_opt(header.trained_at_ms)
        .single()
        .ok_or_else(|| AppError::ModelFormat("invalid training timestamp".to_string()))?;

    let envelope: Envelope = bincode::deserialize(bytes)?;
    let payload: P = bincode::deserialize(&envelope.payload)?;
    Ok((payload, trained_at))
}
