//! `POST /api/analyze`: run one analysis and stream its events over SSE.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::pipeline::AnalysisRequest;

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description must not be empty".into()));
    }

    tracing::info!(
        compare = request.compare,
        has_image = request.image_base64.is_some(),
        has_cad = request.cad_context.is_some(),
        "Analysis requested"
    );

    let rx = state.pipeline.spawn(request);
    let stream = ReceiverStream::new(rx).filter_map(|event| match event.to_frame() {
        Ok(frame) => Some(Ok(Event::default().event(frame.event).data(frame.data))),
        Err(e) => {
            tracing::error!(event = event.event_type(), error = %e, "Failed to encode event");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
