//! Shared state for the API router.

use std::sync::Arc;

use crate::brain::{BrainLookup, ManufacturingLookup};
use crate::cad::FreecadClient;
use crate::inference::OllamaClient;
use crate::pipeline::{AnalysisPipeline, StandardsMatcher};

/// Everything the handlers reach for. Collaborators that failed to start
/// are `None`; their routes degrade instead of failing the whole server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub ollama: Option<Arc<OllamaClient>>,
    pub freecad: Option<Arc<FreecadClient>>,
    pub brain: Option<BrainLookup>,
    pub manufacturing: Option<ManufacturingLookup>,
    pub matcher: Option<Arc<dyn StandardsMatcher>>,
}

impl AppState {
    /// State with only the pipeline set.
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline,
            ollama: None,
            freecad: None,
            brain: None,
            manufacturing: None,
            matcher: None,
        }
    }

    pub fn standards_top_k(&self) -> usize {
        self.pipeline.settings().standards_top_k
    }
}
