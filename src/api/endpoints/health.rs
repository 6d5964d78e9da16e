//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ollama: String,
    pub models_loaded: Vec<String>,
    pub freecad: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`: Ollama connectivity and loaded models, plus FreeCAD
/// reachability. `degraded` when Ollama is down or not configured.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, ollama, models_loaded) = match &state.ollama {
        Some(client) => match client.health_check().await {
            Ok(models) => ("healthy", "connected".to_string(), models),
            Err(e) => {
                tracing::warn!(error = %e, "Ollama health check failed");
                ("degraded", e.to_string(), Vec::new())
            }
        },
        None => ("degraded", "not configured".to_string(), Vec::new()),
    };

    let freecad = match &state.freecad {
        Some(client) => {
            if client.health_check().await {
                "connected"
            } else {
                "not available"
            }
        }
        None => "not configured",
    };

    Json(HealthResponse {
        status,
        ollama,
        models_loaded,
        freecad,
        version: crate::config::APP_VERSION,
    })
}
