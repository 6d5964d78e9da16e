//! Process capability lookup.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::pipeline::ToleranceRange;

#[derive(Debug, Deserialize)]
pub struct ToleranceParams {
    pub process: String,
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToleranceResponse {
    pub tolerances: Vec<ToleranceRange>,
}

/// `GET /api/tolerances?process=&material=`: capability rows for a process.
pub async fn capability(
    State(state): State<AppState>,
    Query(params): Query<ToleranceParams>,
) -> Result<Json<ToleranceResponse>, ApiError> {
    let tolerances = match &state.manufacturing {
        Some(lookup) => {
            lookup
                .process_capability(&params.process, params.material.as_deref())
                .await?
        }
        None => Vec::new(),
    };
    Ok(Json(ToleranceResponse { tolerances }))
}
