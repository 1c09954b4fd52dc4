use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommendation_service::cache::{ModelCache, RedisModelCache};
use recommendation_service::config::Config;
use recommendation_service::db::{CatalogSource, PgCatalogRepository};
use recommendation_service::handlers::{self, RecommendationHandlerState};
use recommendation_service::jobs::{start_model_refresh, ModelRefreshConfig};
use recommendation_service::services::RecommendationEngine;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.app.env,
        "Starting music-recommendation-service"
    );

    // Initialize database
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to create database pool")?;

    let cache = RedisModelCache::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    if let Err(e) = cache.ping().await {
        tracing::warn!(error = %e, "Redis not reachable at startup");
    }

    let catalog: Arc<dyn CatalogSource> = Arc::new(PgCatalogRepository::new(db_pool));
    let cache: Arc<dyn ModelCache> = Arc::new(cache);
    let engine = Arc::new(RecommendationEngine::new(
        catalog,
        cache,
        &config.recommendation,
    ));

    // Trending is still served while models are missing; later accesses retry
    // once the failure cooldown has passed
    if let Err(e) = engine.initialize().await {
        tracing::error!(error = %e, "Initial model build failed, serving trending only");
    }

    tokio::spawn(start_model_refresh(
        Arc::clone(engine.models()),
        ModelRefreshConfig::from_secs(config.recommendation.retrain_interval_secs),
    ));

    let state = web::Data::new(RecommendationHandlerState {
        engine,
        config: config.recommendation.clone(),
    });

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!(addr = %bind_addr, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                recommendation_service::AppError::Validation(message).into()
            }))
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
