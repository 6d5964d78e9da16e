//! Stage sequencing for one analysis.
//!
//! start → extract (vision ‖ CAD) → merge → classify → (compare) →
//! derive datums → (standards ‖ tolerances) → generate → finalize
//!
//! Vision, classification and output generation are load-bearing: their
//! failure ends the analysis with an `error` event. Everything else
//! degrades to an empty default.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;
use uuid::Uuid;

use super::events::{ComparisonPayload, EventEmitter, PipelineEvent};
use super::resilience::{call_degradable, call_with_retry};
use super::traits::{
    CadExtractor, Classifier, OutputGenerator, StandardsMatcher, ToleranceLookup, VisionExtractor,
};
use super::types::{
    AnalysisRequest, GenerationInput, Stage, StageTimings, StandardMatch, ToleranceData,
};
use super::{datum, merge, query, CollaboratorError, Layer, PipelineError};
use crate::models::{CadContext, FeatureRecord, FeatureType, UNSPECIFIED};

/// Prepended to the description when vision extraction is retried.
const STRICT_JSON_PREFIX: &str = "Return ONLY valid JSON. ";

/// Injected collaborator handles. `None` means not configured.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub vision: Option<Arc<dyn VisionExtractor>>,
    pub cad: Option<Arc<dyn CadExtractor>>,
    pub classifier: Option<Arc<dyn Classifier>>,
    pub matcher: Option<Arc<dyn StandardsMatcher>>,
    pub tolerances: Option<Arc<dyn ToleranceLookup>>,
    pub generator: Option<Arc<dyn OutputGenerator>>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model used for the primary classification.
    pub classifier_model: String,
    /// Model used for the comparison classification.
    pub baseline_model: String,
    pub standards_top_k: usize,
    /// Events buffered ahead of a slow client.
    pub event_buffer: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            classifier_model: "gemma3:1b".to_string(),
            baseline_model: "gemma3:1b".to_string(),
            standards_top_k: 5,
            event_buffer: 32,
        }
    }
}

/// Runs analyses. Cheap to clone; holds no per-analysis state.
#[derive(Clone)]
pub struct AnalysisPipeline {
    collaborators: Collaborators,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Start an analysis in the background and return its event stream.
    ///
    /// Dropping the receiver cancels the analysis at whatever it is awaiting.
    pub fn spawn(&self, request: AnalysisRequest) -> mpsc::Receiver<PipelineEvent> {
        let (emitter, rx) = EventEmitter::channel(self.settings.event_buffer);
        let last_resort = emitter.sender();
        let pipeline = self.clone();

        tokio::spawn(async move {
            let task = tokio::spawn(async move { pipeline.run(request, emitter).await });
            if let Err(e) = task.await {
                // The analysis task panicked before reaching a terminal event.
                tracing::error!(error = %e, "Analysis task aborted");
                let _ = last_resort
                    .send(PipelineEvent::error(
                        format!("Pipeline error: {e}"),
                        Layer::Unknown,
                    ))
                    .await;
            }
        });

        rx
    }

    /// Run one analysis to completion, emitting every event on `emitter`.
    ///
    /// On failure the `error` event has already been emitted (unless the
    /// client went away); the returned error is for the caller's logs.
    /// Returns the analysis id on success.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        mut emitter: EventEmitter,
    ) -> Result<String, PipelineError> {
        let analysis_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("analysis", analysis_id = %analysis_id);

        let started = Instant::now();
        let disconnected = emitter.disconnected();
        let result = tokio::select! {
            biased;
            result = self
                .execute(&request, &analysis_id, &mut emitter)
                .instrument(span.clone()) => result,
            _ = disconnected => Err(PipelineError::Cancelled),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    parent: &span,
                    wall_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete"
                );
                Ok(analysis_id)
            }
            Err(PipelineError::Cancelled) => {
                tracing::info!(parent: &span, "Client disconnected, analysis stopped");
                Err(PipelineError::Cancelled)
            }
            Err(e) => {
                tracing::error!(parent: &span, layer = %e.layer(), error = %e, "Analysis failed");
                if !emitter.is_finished() {
                    let message = match &e {
                        PipelineError::Collaborator { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    // A closed channel here just means nobody is listening.
                    let _ = emitter.emit(PipelineEvent::error(message, e.layer())).await;
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &AnalysisRequest,
        analysis_id: &str,
        emitter: &mut EventEmitter,
    ) -> Result<(), PipelineError> {
        let mut timings = StageTimings::default();

        // ── Layer 1: extract (vision ‖ CAD) ──
        emitter
            .emit(PipelineEvent::progress(
                Stage::Student.as_str(),
                "Extracting features with Gemma 3n...",
                1,
            ))
            .await?;
        let started = Instant::now();

        let vision_task = StageTask::spawn(extract_features(
            self.collaborators.vision.clone(),
            request.description.clone(),
            request.image_base64.clone(),
        ));

        let (vision, cad_context) = match request.cad_context.clone() {
            Some(supplied) => {
                tracing::debug!("Using client-supplied CAD context");
                (vision_task.await, Some(supplied))
            }
            None => {
                let cad_task = StageTask::spawn(extract_cad(
                    self.collaborators.cad.clone(),
                    request.description.clone(),
                ));
                let (vision, cad) = tokio::join!(vision_task, cad_task);
                let cad = cad.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "CAD extraction task failed");
                    None
                });
                (vision, cad)
            }
        };

        let mut vision = vision
            .map_err(task_failed)?
            .map_err(|e| PipelineError::at(Layer::Vision, e))?;
        let elapsed_ms = timings.record(Stage::Student, started.elapsed());
        tracing::info!(stage = "student", elapsed_ms, "Feature extraction complete");

        apply_request_hints(&mut vision, request);
        let features = merge::merge(&vision, cad_context.as_ref());

        emitter
            .emit(PipelineEvent::feature_extraction(&features))
            .await?;
        emitter
            .emit(PipelineEvent::cad_context(cad_context.as_ref()))
            .await?;

        // ── Layer 2: classify ──
        emitter
            .emit(PipelineEvent::progress(
                Stage::Classifier.as_str(),
                "Classifying GD&T controls...",
                2,
            ))
            .await?;
        let started = Instant::now();

        let classifier = self.collaborators.classifier.as_ref().ok_or_else(|| {
            PipelineError::at(Layer::Classifier, CollaboratorError::NotConfigured("classifier"))
        })?;
        let model = self.settings.classifier_model.as_str();
        let features_ref = &features;
        let mut classification = call_with_retry(
            Layer::Classifier,
            classifier.classify(features_ref, model),
            move || classifier.classify(features_ref, model),
        )
        .await
        .map_err(|e| PipelineError::at(Layer::Classifier, e))?;

        if classification.enforce_datum_rule() {
            tracing::warn!(
                control = %classification.primary_control,
                datum_required = classification.datum_required,
                "Classifier datum flag contradicted characteristic category, corrected"
            );
        }
        classification.clamp_confidence();

        let elapsed_ms = timings.record(Stage::Classifier, started.elapsed());
        tracing::info!(
            stage = "classifier",
            elapsed_ms,
            control = %classification.primary_control,
            "Classification complete"
        );

        if request.compare {
            let baseline = classifier
                .classify(&features, &self.settings.baseline_model)
                .await;
            let payload = match baseline {
                Ok(base) => ComparisonPayload {
                    base_model: Some(base),
                    error: None,
                    finetuned_model: classification.clone(),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Baseline classification failed");
                    ComparisonPayload {
                        base_model: None,
                        error: Some(format!("Base model comparison failed: {e}")),
                        finetuned_model: classification.clone(),
                    }
                }
            };
            emitter
                .emit(PipelineEvent::ClassificationComparison(payload))
                .await?;
        }

        // ── Datums ──
        let datum_scheme = datum::derive(&classification, &features);
        tracing::debug!(datums = ?datum_scheme.letters(), "Datum scheme derived");
        emitter
            .emit(PipelineEvent::datum_recommendation(&datum_scheme))
            .await?;

        // ── Layers 3+4: standards ‖ tolerances ──
        emitter
            .emit(PipelineEvent::progress(
                Stage::Matcher.as_str(),
                "Matching ASME Y14.5 standards...",
                3,
            ))
            .await?;
        let started = Instant::now();

        let matcher_query = query::build(&features, &classification);
        let standards_task = StageTask::spawn(match_standards(
            self.collaborators.matcher.clone(),
            matcher_query,
            self.settings.standards_top_k,
        ));
        let tolerance_task = StageTask::spawn(lookup_tolerances(
            self.collaborators.tolerances.clone(),
            features.manufacturing_process.clone(),
            features.material.clone(),
            features.feature_type,
        ));
        let (standards, tolerances) = tokio::join!(standards_task, tolerance_task);
        let standards = standards.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Standards matching task failed");
            Vec::new()
        });
        let tolerances = tolerances.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Tolerance lookup task failed");
            ToleranceData::default()
        });

        let elapsed_ms = timings.record(Stage::Matcher, started.elapsed());
        tracing::info!(
            stage = "matcher",
            elapsed_ms,
            standards = standards.len(),
            has_range = tolerances.tolerance_range.is_some(),
            "Standards and tolerances ready"
        );

        // ── Layer 5: generate output ──
        emitter
            .emit(PipelineEvent::progress(
                Stage::Worker.as_str(),
                "Generating GD&T callouts...",
                4,
            ))
            .await?;
        let started = Instant::now();

        let generator = self.collaborators.generator.as_ref().ok_or_else(|| {
            PipelineError::at(Layer::Worker, CollaboratorError::NotConfigured("output generator"))
        })?;
        let input = GenerationInput {
            features,
            classification,
            datum_scheme,
            standards,
            tolerances,
            strict: false,
        };
        let input_ref = &input;
        let worker_result = call_with_retry(
            Layer::Worker,
            generator.generate(input_ref),
            move || async move {
                let mut strict_input = input_ref.clone();
                strict_input.strict = true;
                generator.generate(&strict_input).await
            },
        )
        .await
        .map_err(|e| PipelineError::at(Layer::Worker, e))?;

        let elapsed_ms = timings.record(Stage::Worker, started.elapsed());
        tracing::info!(
            stage = "worker",
            elapsed_ms,
            callouts = worker_result.callouts.len(),
            "Output generation complete"
        );

        // ── Finalize ──
        emitter
            .emit(PipelineEvent::progress("finalize", "Finalizing results...", 5))
            .await?;
        for event in PipelineEvent::from_worker_result(worker_result) {
            emitter.emit(event).await?;
        }
        tracing::info!(total_ms = timings.total_ms(), "Stage timings summed");
        emitter
            .emit(PipelineEvent::analysis_complete(
                analysis_id.to_string(),
                timings,
            ))
            .await
    }
}

/// Spawned stage work that is aborted if the analysis stops awaiting it.
struct StageTask<T>(JoinHandle<T>);

impl<T: Send + 'static> StageTask<T> {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl<T> Future for StageTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for StageTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn task_failed(e: JoinError) -> PipelineError {
    PipelineError::Internal(format!("stage task failed: {e}"))
}

/// Fill "unspecified" material / process from the request's hints.
fn apply_request_hints(features: &mut FeatureRecord, request: &AnalysisRequest) {
    let hint = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if features.material == UNSPECIFIED {
        if let Some(material) = hint(&request.material) {
            features.material = material;
        }
    }
    if features.manufacturing_process == UNSPECIFIED {
        if let Some(process) = hint(&request.manufacturing_process) {
            features.manufacturing_process = process;
        }
    }
}

async fn extract_features(
    vision: Option<Arc<dyn VisionExtractor>>,
    text: String,
    image: Option<String>,
) -> Result<FeatureRecord, CollaboratorError> {
    let vision = vision.ok_or(CollaboratorError::NotConfigured("vision extractor"))?;
    let (extractor, text_ref, image_ref) = (&vision, text.as_str(), image.as_deref());
    call_with_retry(
        Layer::Vision,
        extractor.extract(text_ref, image_ref),
        move || async move {
            let strict = format!("{STRICT_JSON_PREFIX}{text_ref}");
            extractor.extract(&strict, image_ref).await
        },
    )
    .await
}

async fn extract_cad(cad: Option<Arc<dyn CadExtractor>>, hint: String) -> Option<CadContext> {
    let op = cad.map(|extractor| async move { extractor.extract(&hint).await.map(Some) });
    call_degradable("cad_extractor", op, None).await
}

async fn match_standards(
    matcher: Option<Arc<dyn StandardsMatcher>>,
    query: String,
    top_k: usize,
) -> Vec<StandardMatch> {
    let op = matcher.map(|m| async move { m.match_standards(&query, top_k).await });
    call_degradable("standards_matcher", op, Vec::new()).await
}

async fn lookup_tolerances(
    lookup: Option<Arc<dyn ToleranceLookup>>,
    process: String,
    material: String,
    feature_type: FeatureType,
) -> ToleranceData {
    let op = lookup.map(|l| async move {
        let tolerance_range = l.get_range(&process, &material, feature_type).await?;
        let material_properties = l.get_material_properties(&material).await?;
        Ok(ToleranceData {
            tolerance_range,
            material_properties,
        })
    });
    call_degradable("tolerance_lookup", op, ToleranceData::default()).await
}
