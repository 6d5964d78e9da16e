//! API router.
//!
//! Returns a composable `Router`; routes are nested under `/api/`.

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::AppState;

/// Build the API router with CORS for the local frontend origin.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(state: AppState, cors_origin: &str) -> Router {
    let api = Router::new()
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/health", get(endpoints::health::check))
        .route("/standards/search", get(endpoints::standards::search))
        .route("/standards/:code", get(endpoints::standards::lookup))
        .route("/tolerances", get(endpoints::tolerances::capability))
        .route("/freecad/status", get(endpoints::freecad::status))
        .route(
            "/freecad/create-drawing",
            post(endpoints::freecad::create_drawing),
        )
        .with_state(state);

    Router::new().nest("/api", api).layer(cors_layer(cors_origin))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
