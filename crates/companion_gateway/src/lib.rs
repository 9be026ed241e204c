pub mod http;
pub mod push_registry;
pub mod state;
pub mod tenant;
pub mod types;
pub mod ws;

pub use push_registry::PushRegistry;
pub use state::AppState;
pub use tenant::{InMemoryTenantDirectory, TenantDirectory, TenantLookupError};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(http::health))
        .route("/v1/events", post(http::post_events))
        .route("/v1/analytics/costs", get(http::get_costs))
        .route("/v1/realtime", get(ws::realtime_upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
