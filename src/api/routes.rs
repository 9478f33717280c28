use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{health, settings, AppState};
use crate::ws;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws/events", get(ws::ws_handler))
        .route(
            "/api/devices/{device_id}/alert-settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
