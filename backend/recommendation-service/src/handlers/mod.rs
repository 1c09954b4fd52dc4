pub mod recommendation;

// Re-export handlers for convenience
pub use recommendation::{
    get_recommendations, get_similar_tracks, health, metrics, record_user_interaction,
    retrain_models, RecommendationHandlerState, RecommendationRequest, SimilarTracksRequest,
    UserInteractionRequest,
};

use actix_web::web;

/// Register every endpoint of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_recommendations)
        .service(get_similar_tracks)
        .service(record_user_interaction)
        .service(retrain_models)
        .service(health)
        .service(metrics);
}
