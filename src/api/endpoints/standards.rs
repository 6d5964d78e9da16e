//! Standards search and characteristic lookup.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::brain::CharacteristicRecord;
use crate::pipeline::StandardMatch;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<StandardMatch>,
}

/// `GET /api/standards/search?q=`: semantic match, empty when no matcher.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Some(matcher) = &state.matcher else {
        return Ok(Json(SearchResponse {
            results: Vec::new(),
        }));
    };
    let results = matcher
        .match_standards(&params.q, state.standards_top_k())
        .await?;
    Ok(Json(SearchResponse { results }))
}

/// `GET /api/standards/:code`: characteristic by symbol, id or name.
pub async fn lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CharacteristicRecord>, ApiError> {
    let brain = state
        .brain
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Brain database not available".into()))?;
    brain
        .lookup_standard(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Standard '{code}' not found")))
}
