use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use middleware::{auth, provider_gate};
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    // Every invoice route requires an explicitly resolved provider.
    let invoice_routes = Router::new()
        .route("/api/status", get(routes::invoice::api_status))
        .route("/remote/info/:invoice_id", get(routes::invoice::remote_info))
        .route("/local/info/:invoice_id", get(routes::invoice::local_info))
        .route("/transaction/fetch/data", post(routes::invoice::transaction_fetch))
        .route("/declare", post(routes::invoice::declare))
        .route("/complete", put(routes::invoice::complete))
        .route_layer(axum_middleware::from_fn(provider_gate::require_provider));

    // The signature gate wraps everything except the health probe; the
    // provider gate above runs after it, once an identity is resolved.
    let authenticated = Router::new()
        .nest("/v1/invoice", invoice_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::signature_gate,
        ));

    Router::new()
        .route("/health/status", get(routes::health::status))
        .merge(authenticated)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
