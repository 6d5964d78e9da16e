//! GD&T analysis pipeline: stage orchestration and the pure rules it uses.
//!
//! extract (vision ‖ CAD) → merge → classify → derive datums →
//! (standards ‖ tolerances) → generate output → finalize

pub mod datum;
pub mod events;
pub mod merge;
pub mod orchestrator;
pub mod query;
pub mod resilience;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventEmitter, EventFrame, PipelineEvent};
pub use orchestrator::{AnalysisPipeline, Collaborators, PipelineSettings};
pub use traits::*;
pub use types::*;

use thiserror::Error;

/// Failure classes a collaborator call can report.
///
/// The retry wrapper branches on this tag: only `MalformedOutput` earns a
/// second attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("{0} is not reachable")]
    Unavailable(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl CollaboratorError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedOutput(_))
    }
}

/// Which collaborator category a fatal error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Vision,
    Classifier,
    Worker,
    Unknown,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Classifier => "classifier",
            Self::Worker => "worker",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end an analysis.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{layer} stage failed: {source}")]
    Collaborator {
        layer: Layer,
        #[source]
        source: CollaboratorError,
    },

    #[error("Pipeline error: {0}")]
    Internal(String),

    #[error("Event stream closed by client")]
    Cancelled,
}

impl PipelineError {
    pub fn at(layer: Layer, source: CollaboratorError) -> Self {
        Self::Collaborator { layer, source }
    }

    pub fn layer(&self) -> Layer {
        match self {
            Self::Collaborator { layer, .. } => *layer,
            Self::Internal(_) | Self::Cancelled => Layer::Unknown,
        }
    }
}
