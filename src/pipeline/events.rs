//! Typed analysis events and the ordered emitter that carries them.
//!
//! Every event serializes as `{type, payload}`. A stream ends with exactly
//! one terminal event: `analysis_complete` or `error`.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use super::types::StageTimings;
use super::{Layer, PipelineError};
use crate::models::{
    CadContext, CadMaterial, CadObject, CadSketch, Classification, DatumScheme, FeatureRecord,
    GdtCallout, WorkerResult,
};

pub const TOTAL_STEPS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    Progress(ProgressPayload),
    FeatureExtraction(FeatureExtractionPayload),
    CadContext(CadContextPayload),
    ClassificationComparison(ComparisonPayload),
    DatumRecommendation(DatumPayload),
    GdtCallouts(CalloutsPayload),
    Reasoning(ReasoningPayload),
    Warnings(WarningsPayload),
    AnalysisComplete(CompletePayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPayload {
    pub stage_name: String,
    pub message: String,
    pub step: u32,
    pub total_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureExtractionPayload {
    pub features: Vec<FeatureRecord>,
    pub material_detected: String,
    pub process_detected: String,
}

/// CAD data as seen by the client. `connected` is false and the lists are
/// empty when CAD was unavailable or reported an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CadContextPayload {
    pub connected: bool,
    pub document_name: Option<String>,
    pub objects: Vec<CadObject>,
    pub sketches: Vec<CadSketch>,
    pub materials: Vec<CadMaterial>,
    pub bounding_box: Option<Value>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finetuned_model: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatumPayload {
    pub datum_scheme: DatumScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalloutsPayload {
    pub callouts: Vec<GdtCallout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningPayload {
    pub summary: String,
    pub manufacturing_notes: String,
    pub standards_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningsPayload {
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingReport {
    #[serde(flatten)]
    pub stages: StageTimings,
    pub total_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionMetadata {
    pub inference_device: &'static str,
    pub total_latency_ms: u64,
    pub student_latency_ms: u64,
    pub classifier_latency_ms: u64,
    pub matcher_latency_ms: u64,
    /// Tolerance lookup shares the matcher fan-out, so it reports the same figure.
    pub brain_latency_ms: u64,
    pub worker_latency_ms: u64,
    pub cloud_calls: u32,
    pub connectivity_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletePayload {
    pub analysis_id: String,
    pub timings: TimingReport,
    pub metadata: CompletionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub layer: String,
}

/// An event rendered for the wire: SSE event name plus JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub event: &'static str,
    pub data: String,
}

impl PipelineEvent {
    pub fn progress(stage_name: &str, message: &str, step: u32) -> Self {
        Self::Progress(ProgressPayload {
            stage_name: stage_name.to_string(),
            message: message.to_string(),
            step,
            total_steps: TOTAL_STEPS,
        })
    }

    pub fn feature_extraction(features: &FeatureRecord) -> Self {
        Self::FeatureExtraction(FeatureExtractionPayload {
            features: vec![features.clone()],
            material_detected: features.material.clone(),
            process_detected: features.manufacturing_process.clone(),
        })
    }

    pub fn cad_context(cad: Option<&CadContext>) -> Self {
        let payload = match cad.filter(|c| c.is_usable()) {
            Some(ctx) => CadContextPayload {
                connected: true,
                document_name: ctx.document_name.clone(),
                objects: ctx.objects.clone(),
                sketches: ctx.sketches.clone(),
                materials: ctx.materials.clone(),
                bounding_box: ctx.bounding_box.clone(),
                source: ctx.source.clone(),
            },
            None => CadContextPayload {
                connected: false,
                document_name: None,
                objects: Vec::new(),
                sketches: Vec::new(),
                materials: Vec::new(),
                bounding_box: None,
                source: "freecad_rpc".to_string(),
            },
        };
        Self::CadContext(payload)
    }

    pub fn datum_recommendation(scheme: &DatumScheme) -> Self {
        Self::DatumRecommendation(DatumPayload {
            datum_scheme: scheme.clone(),
        })
    }

    /// The three events carrying output generation results, in emit order.
    pub fn from_worker_result(result: WorkerResult) -> [Self; 3] {
        [
            Self::GdtCallouts(CalloutsPayload {
                callouts: result.callouts,
            }),
            Self::Reasoning(ReasoningPayload {
                summary: result.summary,
                manufacturing_notes: result.manufacturing_notes,
                standards_references: result.standards_references,
            }),
            Self::Warnings(WarningsPayload {
                warnings: result.warnings,
            }),
        ]
    }

    pub fn analysis_complete(analysis_id: String, timings: StageTimings) -> Self {
        let total_ms = timings.total_ms();
        Self::AnalysisComplete(CompletePayload {
            analysis_id,
            timings: TimingReport {
                stages: timings,
                total_ms,
            },
            metadata: CompletionMetadata {
                inference_device: "local",
                total_latency_ms: total_ms,
                student_latency_ms: timings.student_ms,
                classifier_latency_ms: timings.classifier_ms,
                matcher_latency_ms: timings.matcher_ms,
                brain_latency_ms: timings.matcher_ms,
                worker_latency_ms: timings.worker_ms,
                cloud_calls: 0,
                connectivity_required: false,
            },
        })
    }

    pub fn error(message: impl Into<String>, layer: Layer) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            layer: layer.as_str().to_string(),
        })
    }

    /// Wire name of the event (`type` field).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::FeatureExtraction(_) => "feature_extraction",
            Self::CadContext(_) => "cad_context",
            Self::ClassificationComparison(_) => "classification_comparison",
            Self::DatumRecommendation(_) => "datum_recommendation",
            Self::GdtCallouts(_) => "gdt_callouts",
            Self::Reasoning(_) => "reasoning",
            Self::Warnings(_) => "warnings",
            Self::AnalysisComplete(_) => "analysis_complete",
            Self::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AnalysisComplete(_) | Self::Error(_))
    }

    /// Render as an SSE frame: the event name plus the payload alone.
    pub fn to_frame(&self) -> Result<EventFrame, serde_json::Error> {
        let data = match self {
            Self::Progress(p) => serde_json::to_string(p),
            Self::FeatureExtraction(p) => serde_json::to_string(p),
            Self::CadContext(p) => serde_json::to_string(p),
            Self::ClassificationComparison(p) => serde_json::to_string(p),
            Self::DatumRecommendation(p) => serde_json::to_string(p),
            Self::GdtCallouts(p) => serde_json::to_string(p),
            Self::Reasoning(p) => serde_json::to_string(p),
            Self::Warnings(p) => serde_json::to_string(p),
            Self::AnalysisComplete(p) => serde_json::to_string(p),
            Self::Error(p) => serde_json::to_string(p),
        }?;
        Ok(EventFrame {
            event: self.event_type(),
            data,
        })
    }
}

/// Ordered sink for one analysis' events.
///
/// Sending fails with [`PipelineError::Cancelled`] once the receiver is
/// gone; [`EventEmitter::disconnected`] observes the same thing between
/// sends.
/// Nothing may be emitted after a terminal event.
pub struct EventEmitter {
    tx: mpsc::Sender<PipelineEvent>,
    finished: bool,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            tx,
            finished: false,
        }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn emit(&mut self, event: PipelineEvent) -> Result<(), PipelineError> {
        if self.finished {
            return Err(PipelineError::Internal(format!(
                "{} emitted after stream end",
                event.event_type()
            )));
        }
        let terminal = event.is_terminal();
        tracing::debug!(event = event.event_type(), "Emitting pipeline event");
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::Cancelled)?;
        if terminal {
            self.finished = true;
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Resolves once the receiving client has gone away.
    pub fn disconnected(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let tx = self.tx.clone();
        async move { tx.closed().await }
    }

    /// Raw sender for reporting a failure the emitter's owner cannot.
    pub fn sender(&self) -> mpsc::Sender<PipelineEvent> {
        self.tx.clone()
    }
}
