use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::cad::techdraw;
use crate::models::{DatumScheme, FeatureRecord, GdtCallout};

#[derive(Debug, Serialize)]
pub struct FreecadStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub mock: bool,
}

/// `GET /api/freecad/status`
pub async fn status(State(state): State<AppState>) -> Json<FreecadStatus> {
    let Some(client) = &state.freecad else {
        return Json(FreecadStatus {
            connected: false,
            reason: Some("FreeCAD client not configured"),
            mock: false,
        });
    };
    Json(FreecadStatus {
        connected: client.health_check().await,
        reason: None,
        mock: client.is_mock(),
    })
}

fn default_document() -> String {
    "Unnamed".to_string()
}

/// Results of a finished analysis to lay out on a drawing.
#[derive(Debug, Deserialize)]
pub struct CreateDrawingRequest {
    #[serde(default = "default_document")]
    pub document_name: String,
    #[serde(default)]
    pub callouts: Vec<GdtCallout>,
    #[serde(default)]
    pub datum_scheme: DatumScheme,
    #[serde(default)]
    pub features: Option<FeatureRecord>,
}

/// `POST /api/freecad/create-drawing`
///
/// Needs a live FreeCAD: 503 when the client is missing or mocked.
pub async fn create_drawing(
    State(state): State<AppState>,
    Json(request): Json<CreateDrawingRequest>,
) -> Result<Json<Value>, ApiError> {
    let client = state
        .freecad
        .as_ref()
        .filter(|c| !c.is_mock())
        .ok_or_else(|| {
            ApiError::Unavailable("Drawing creation requires live FreeCAD connection".into())
        })?;

    let script = techdraw::generate_script(
        &request.document_name,
        &request.callouts,
        &request.datum_scheme,
        request.features.as_ref(),
    );
    let result = client.execute_python(&script).await?;
    tracing::info!(
        document = %request.document_name,
        callouts = request.callouts.len(),
        "TechDraw page created"
    );

    let mut body = Map::new();
    body.insert("status".into(), Value::from("created"));
    match result {
        Value::Object(fields) => body.extend(fields),
        other => {
            body.insert("page_name".into(), Value::from(techdraw::PAGE_NAME));
            body.insert("result".into(), other);
        }
    }
    Ok(Json(Value::Object(body)))
}
