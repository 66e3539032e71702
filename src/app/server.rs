use crate::app::handlers;
use crate::config::toml_config::ServerConfig;
use crate::core::InferenceService;
use crate::utils::error::{Result, ServiceError};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: InferenceService,
    pub max_upload_bytes: usize,
}

/// Only the configured origin may call the API.
fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin).map_err(|e| ServiceError::InvalidConfigValue {
        field: "server.allowed_origin".to_string(),
        value: allowed_origin.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn build_router(service: InferenceService, config: &ServerConfig) -> Result<Router> {
    let state = AppState {
        service,
        max_upload_bytes: config.max_upload_bytes,
    };

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/forecast/donations", get(handlers::forecast_donations))
        .route("/forecast/requests", get(handlers::forecast_requests))
        .route("/predict_duration", post(handlers::predict_duration))
        .route("/compute_satisfaction", post(handlers::compute_satisfaction))
        .route("/forecast_food_demand", post(handlers::forecast_food_demand))
        .route("/predict_food_waste", post(handlers::predict_food_waste))
        .route("/waste-factors", get(handlers::waste_factors))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origin)?),
        )
        .with_state(state);

    Ok(router)
}

pub async fn start_server(router: Router, addr: &str) -> Result<()> {
    let listener = bind_listener(addr).await?;
    info!("🚀 Inference API listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    let listener = match addr.parse::<SocketAddr>() {
        Ok(socket_addr) => tokio::net::TcpListener::bind(socket_addr).await,
        Err(_) => tokio::net::TcpListener::bind(addr).await,
    };
    listener.map_err(|e| ServiceError::config(format!("failed to bind listener on {addr}: {e}")))
}
