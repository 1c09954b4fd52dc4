#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use recommendation_service::cache::ModelCache;
use recommendation_service::config::RecommendationConfig;
use recommendation_service::db::CatalogSource;
use recommendation_service::models::{Interaction, Track, TrackId};
use recommendation_service::{AppError, Result};

pub fn track(id: &str, title: &str, artist: &str, genre: &str, plays: i64, age_days: i64) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist_name: Some(artist.to_string()),
        album_name: None,
        genre: Some(genre.to_string()),
        duration_ms: Some(200_000),
        play_count: plays,
        like_count: plays / 5,
        created_at: Utc::now() - ChronoDuration::days(age_days),
    }
}

pub fn interaction(user: &str, track: &str, plays: i64) -> Interaction {
    Interaction {
        user_id: user.to_string(),
        track_id: track.to_string(),
        play_count: plays,
        last_played_at: Utc::now(),
    }
}

/// Small catalog: two jazz tracks, two metal tracks, one fresh pop hit
pub fn sample_catalog() -> FakeCatalog {
    let catalog = FakeCatalog::new(
        vec![
            track("jazz-1", "Midnight Train", "Blue Lines", "jazz", 30, 40),
            track("jazz-2", "Midnight Train Reprise", "Blue Lines", "jazz", 25, 35),
            track("metal-1", "Thunder Road", "Iron Wolves", "metal", 80, 2),
            track("metal-2", "Steel Thunder", "Iron Wolves", "metal", 60, 3),
            track("pop-1", "Summer Lights", "Neon Hearts", "pop", 500, 1),
        ],
        vec![
            interaction("alice", "jazz-1", 6),
            interaction("alice", "metal-1", 1),
            interaction("bob", "metal-1", 5),
            interaction("bob", "metal-2", 4),
            interaction("carol", "jazz-2", 3),
            interaction("carol", "pop-1", 2),
        ],
    );
    catalog.set_recent("alice", vec!["jazz-1"]);
    catalog
}

pub fn test_config() -> RecommendationConfig {
    RecommendationConfig {
        io_timeout_ms: 500,
        request_timeout_ms: 2000,
        training_timeout_ms: 5000,
        retrain_cooldown_secs: 0,
        ..RecommendationConfig::default()
    }
}

/// In-memory system of record
pub struct FakeCatalog {
    tracks: Vec<Track>,
    interactions: Vec<Interaction>,
    recent: Mutex<HashMap<String, Vec<TrackId>>>,
    pub fail_trending: AtomicBool,
    pub fail_training: AtomicBool,
    pub active_track_loads: AtomicUsize,
    /// Delay applied to each training snapshot load
    pub load_delay_ms: AtomicU64,
}

impl FakeCatalog {
    pub fn new(tracks: Vec<Track>, interactions: Vec<Interaction>) -> Self {
        Self {
            tracks,
            interactions,
            recent: Mutex::new(HashMap::new()),
            fail_trending: AtomicBool::new(false),
            fail_training: AtomicBool::new(false),
            active_track_loads: AtomicUsize::new(0),
            load_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn set_recent(&self, user_id: &str, tracks: Vec<&str>) {
        self.recent.lock().insert(
            user_id.to_string(),
            tracks.into_iter().map(str::to_string).collect(),
        );
    }

    pub fn loads(&self) -> usize {
        self.active_track_loads.load(Ordering::SeqCst)
    }

    async fn load_delay(&self) {
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn active_tracks(&self) -> Result<Vec<Track>> {
        self.active_track_loads.fetch_add(1, Ordering::SeqCst);
        self.load_delay().await;
        if self.fail_training.load(Ordering::SeqCst) {
            return Err(AppError::DataAccess("catalog offline".to_string()));
        }
        Ok(self.tracks.clone())
    }

    async fn interaction_aggregates(&self, _window_days: i32) -> Result<Vec<Interaction>> {
        self.load_delay().await;
        if self.fail_training.load(Ordering::SeqCst) {
            return Err(AppError::DataAccess("catalog offline".to_string()));
        }
        Ok(self.interactions.clone())
    }

    async fn trending_tracks(&self, window_days: i32, limit: i64) -> Result<Vec<Track>> {
        if self.fail_trending.load(Ordering::SeqCst) {
            return Err(AppError::DataAccess("trending offline".to_string()));
        }

        let cutoff: DateTime<Utc> = Utc::now() - ChronoDuration::days(window_days as i64);
        let mut recent: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| t.created_at >= cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| {
            b.popularity_score()
                .total_cmp(&a.popularity_score())
                .then_with(|| a.id.cmp(&b.id))
        });
        recent.truncate(limit.max(0) as usize);
        Ok(recent)
    }

    async fn recent_user_tracks(
        &self,
        user_id: &str,
        _window_days: i32,
        limit: i64,
    ) -> Result<Vec<TrackId>> {
        let mut tracks = self.recent.lock().get(user_id).cloned().unwrap_or_default();
        tracks.truncate(limit.max(0) as usize);
        Ok(tracks)
    }
}

/// In-memory cache honouring TTLs
#[derive(Default)]
pub struct FakeCache {
    values: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    lists: Mutex<HashMap<String, (VecDeque<Vec<u8>>, Instant)>>,
}

impl FakeCache {
    pub fn list(&self, key: &str) -> Vec<Vec<u8>> {
        self.lists
            .lock()
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(items, _)| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list_ttl(&self, key: &str) -> Option<Duration> {
        self.lists
            .lock()
            .get(key)
            .map(|(_, expires)| expires.saturating_duration_since(Instant::now()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .get(key)
            .map(|(_, expires)| *expires > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ModelCache for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .values
            .lock()
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.values
            .lock()
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn push_capped(
        &self,
        key: &str,
        value: Vec<u8>,
        cap: usize,
        ttl: Duration,
    ) -> Result<()> {
        let mut lists = self.lists.lock();
        let entry = lists
            .entry(key.to_string())
            .or_insert_with(|| (VecDeque::new(), Instant::now()));
        entry.0.push_front(value);
        entry.0.truncate(cap);
        entry.1 = Instant::now() + ttl;
        Ok(())
    }
}

/// Poll until no model build is running
pub async fn wait_for_build(engine: &recommendation_service::RecommendationEngine) {
    for _ in 0..200 {
        if !engine.models().is_retraining() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("model build did not finish");
}
