/// Recommendation API Handlers
///
/// HTTP endpoints for hybrid recommendations, similar tracks, interaction
/// capture and model retraining
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::RecommendationConfig;
use crate::error::{AppError, Result};
use crate::models::{InteractionAction, Recommendation, SimilarTrack};
use crate::services::RecommendationEngine;

/// Request body for POST /recommendations
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,

    /// Number of recommendations to return; the configured default when absent
    #[serde(default)]
    pub num_recommendations: Option<usize>,
}

/// Request body for POST /similar-tracks
#[derive(Debug, Deserialize)]
pub struct SimilarTracksRequest {
    pub track_id: String,

    /// Number of similar tracks to return; the configured default when absent
    #[serde(default)]
    pub num_similar: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UserInteractionRequest {
    pub user_id: String,
    pub track_id: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub status: &'static str,
    pub data: Vec<Recommendation>,
    pub user_id: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SimilarTracksResponse {
    pub status: &'static str,
    pub data: Vec<SimilarTrack>,
    pub track_id: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Handler state for the recommendation endpoints
pub struct RecommendationHandlerState {
    pub engine: Arc<RecommendationEngine>,
    /// Request defaults and the result cap
    pub config: RecommendationConfig,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// POST /recommendations
#[post("/recommendations")]
pub async fn get_recommendations(
    body: web::Json<RecommendationRequest>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    require("user_id", &body.user_id)?;
    let limit = state.config.clamp_limit(
        body.num_recommendations.unwrap_or(state.config.default_recommendations),
    );

    debug!(user_id = %body.user_id, limit, "Getting recommendations");

    let data = state.engine.recommend(&body.user_id, limit).await?;
    let count = data.len();
    Ok(HttpResponse::Ok().json(RecommendationResponse {
        status: "success",
        data,
        user_id: body.into_inner().user_id,
        count,
    }))
}

/// POST /similar-tracks
#[post("/similar-tracks")]
pub async fn get_similar_tracks(
    body: web::Json<SimilarTracksRequest>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    require("track_id", &body.track_id)?;
    let limit = state
        .config
        .clamp_limit(body.num_similar.unwrap_or(state.config.default_similar));

    let data = state.engine.similar_tracks(&body.track_id, limit);
    let count = data.len();
    Ok(HttpResponse::Ok().json(SimilarTracksResponse {
        status: "success",
        data,
        track_id: body.into_inner().track_id,
        count,
    }))
}

/// POST /user-interaction
#[post("/user-interaction")]
pub async fn record_user_interaction(
    body: web::Json<UserInteractionRequest>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    require("user_id", &body.user_id)?;
    require("track_id", &body.track_id)?;
    let action: InteractionAction = body.action.parse()?;

    // acknowledged without waiting for the cache write
    state
        .engine
        .record_interaction(&body.user_id, &body.track_id, action);

    Ok(HttpResponse::Ok().json(MessageResponse {
        status: "success",
        message: "Interaction recorded successfully",
    }))
}

/// POST /retrain-models
/// Acknowledged immediately; training runs in the background
#[post("/retrain-models")]
pub async fn retrain_models(state: web::Data<RecommendationHandlerState>) -> HttpResponse {
    let message = if state.engine.trigger_retrain() {
        "Model retraining started"
    } else {
        "Model retraining already in progress"
    };

    HttpResponse::Ok().json(MessageResponse {
        status: "success",
        message,
    })
}

/// GET /health
#[get("/health")]
pub async fn health(state: web::Data<RecommendationHandlerState>) -> HttpResponse {
    let health = state.engine.health();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "model_state": health.model_state,
        "retraining": health.retraining,
        "trained_at": health.trained_at,
        "expires_at": health.expires_at,
        "tracks": health.tracks,
        "users": health.users,
    }))
}

/// GET /metrics
#[get("/metrics")]
pub async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(crate::metrics::render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockModelCache;
    use crate::db::MockCatalogSource;
    use crate::services::features::test_support::track;
    use actix_web::{test, App};

    fn state(catalog: MockCatalogSource, cache: MockModelCache) -> web::Data<RecommendationHandlerState> {
        state_with(catalog, cache, RecommendationConfig::default())
    }

    fn state_with(
        catalog: MockCatalogSource,
        cache: MockModelCache,
        config: RecommendationConfig,
    ) -> web::Data<RecommendationHandlerState> {
        web::Data::new(RecommendationHandlerState {
            engine: Arc::new(RecommendationEngine::new(
                Arc::new(catalog),
                Arc::new(cache),
                &config,
            )),
            config,
        })
    }

    fn trending_catalog() -> MockCatalogSource {
        let mut catalog = MockCatalogSource::new();
        catalog.expect_trending_tracks().returning(|_, limit| {
            Ok((0..limit.min(3))
                .map(|i| track(&format!("t{}", i), "Song", "Artist", "pop", 50 - i))
                .collect())
        });
        catalog.expect_active_tracks().returning(|| Ok(Vec::new()));
        catalog
            .expect_interaction_aggregates()
            .returning(|_| Ok(Vec::new()));
        catalog
    }

    fn quiet_cache() -> MockModelCache {
        let mut cache = MockModelCache::new();
        cache.expect_set_ex().returning(|_, _, _| Ok(()));
        cache.expect_push_capped().returning(|_, _, _, _| Ok(()));
        cache
    }

    #[actix_web::test]
    async fn test_recommendations_response_shape() {
        let app = test::init_service(
            App::new()
                .app_data(state(trending_catalog(), quiet_cache()))
                .service(get_recommendations),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({"user_id": "u1", "num_recommendations": 2}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["track_id"], "t0");
        assert_eq!(body["data"][0]["reasons"][0], "trending");
    }

    #[actix_web::test]
    async fn test_configured_default_count_applies() {
        let config = RecommendationConfig {
            default_recommendations: 2,
            ..RecommendationConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(state_with(trending_catalog(), quiet_cache(), config))
                .service(get_recommendations),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({"user_id": "u1"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);
    }

    #[actix_web::test]
    async fn test_requested_count_is_capped() {
        let config = RecommendationConfig {
            max_results: 1,
            ..RecommendationConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(state_with(trending_catalog(), quiet_cache(), config))
                .service(get_recommendations),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({"user_id": "u1", "num_recommendations": 50}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
    }

    #[actix_web::test]
    async fn test_similar_tracks_unknown_track_is_empty() {
        let app = test::init_service(
            App::new()
                .app_data(state(trending_catalog(), quiet_cache()))
                .service(get_similar_tracks),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/similar-tracks")
            .set_json(serde_json::json!({"track_id": "missing"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["count"], 0);
        assert_eq!(body["track_id"], "missing");
    }

    #[actix_web::test]
    async fn test_unknown_action_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockCatalogSource::new(), MockModelCache::new()))
                .service(record_user_interaction),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/user-interaction")
            .set_json(serde_json::json!({"user_id": "u1", "track_id": "t1", "action": "hate"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_interaction_is_acknowledged() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockCatalogSource::new(), quiet_cache()))
                .service(record_user_interaction),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/user-interaction")
            .set_json(serde_json::json!({"user_id": "u1", "track_id": "t1", "action": "like"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Interaction recorded successfully");
    }

    #[actix_web::test]
    async fn test_empty_user_id_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockCatalogSource::new(), MockModelCache::new()))
                .service(get_recommendations),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({"user_id": "  "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_reports_model_state() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockCatalogSource::new(), MockModelCache::new()))
                .service(health),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_state"], "uninitialized");
        assert_eq!(body["retraining"], false);
    }
}
