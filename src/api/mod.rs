pub mod frontend;
pub mod health;
pub mod recommendations;

use crate::orchestration::RecommendationService;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(frontend::index))
        .route("/health", get(health::health))
        .route(
            "/api/recommendations",
            get(recommendations::get_recommendations),
        )
        .layer(cors)
        .with_state(state)
}
