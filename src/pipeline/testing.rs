//! Scripted collaborators for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::events::PipelineEvent;
use super::orchestrator::Collaborators;
use super::traits::{
    CadExtractor, Classifier, OutputGenerator, StandardsMatcher, ToleranceLookup, VisionExtractor,
};
use super::types::{GenerationInput, MaterialProperties, StandardMatch, ToleranceRange};
use super::CollaboratorError;
use crate::models::{
    CadContext, Classification, FeatureRecord, FeatureType, GdtCharacteristic, WorkerResult,
};

type Outcome<T> = Result<T, CollaboratorError>;

/// Replays results in order; the last one repeats once the script runs out.
struct Script<T> {
    outcomes: Mutex<Vec<Outcome<T>>>,
    calls: AtomicUsize,
    panics: bool,
}

impl<T: Clone> Script<T> {
    fn new(outcomes: Vec<Outcome<T>>) -> Self {
        assert!(!outcomes.is_empty(), "script needs at least one outcome");
        Self {
            outcomes: Mutex::new(outcomes),
            calls: AtomicUsize::new(0),
            panics: false,
        }
    }

    fn panicking() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            panics: true,
        }
    }

    fn next(&self) -> Outcome<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("scripted collaborator panic");
        }
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes[0].clone()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn boss_features() -> FeatureRecord {
    let mut f = FeatureRecord::new(FeatureType::Boss);
    f.geometry.diameter = Some(12.0);
    f.geometry.height = Some(8.0);
    f.material = "AL6061-T6".into();
    f.manufacturing_process = "cnc_milling".into();
    f.mating_condition = Some("bearing_bore_concentric".into());
    f.parent_surface = Some("planar_mounting_face".into());
    f
}

pub fn perpendicularity() -> Classification {
    let mut c = Classification::for_characteristic(GdtCharacteristic::Perpendicularity);
    c.datum_required = true;
    c.tolerance_class = Some("medium".into());
    c.reasoning_key = "bearing_bore_perpendicular".into();
    c.confidence = 0.92;
    c
}

/// Every collaborator present and well-behaved.
pub fn happy_collaborators() -> Collaborators {
    Collaborators {
        vision: Some(Arc::new(MockVision::ok(boss_features()))),
        cad: None,
        classifier: Some(Arc::new(MockClassifier::ok(perpendicularity()))),
        matcher: Some(Arc::new(MockMatcher::ok(vec![StandardMatch {
            key: "perpendicularity".into(),
            score: 0.91,
        }]))),
        tolerances: Some(Arc::new(MockTolerances::ok())),
        generator: Some(Arc::new(MockGenerator::ok(WorkerResult {
            summary: "Perpendicularity to A".into(),
            warnings: vec!["Check bore depth".into()],
            ..Default::default()
        }))),
    }
}

/// Drain an analysis' events until the stream closes.
pub async fn collect(mut rx: mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

// ── Vision ──

pub struct MockVision {
    script: Script<FeatureRecord>,
    texts: Mutex<Vec<String>>,
}

impl MockVision {
    pub fn ok(features: FeatureRecord) -> Self {
        Self::scripted(vec![Ok(features)])
    }

    pub fn failing(errors: Vec<CollaboratorError>) -> Self {
        Self::scripted(errors.into_iter().map(Err).collect())
    }

    pub fn scripted(outcomes: Vec<Outcome<FeatureRecord>>) -> Self {
        Self {
            script: Script::new(outcomes),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn panicking() -> Self {
        Self {
            script: Script::panicking(),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionExtractor for MockVision {
    async fn extract(
        &self,
        text: &str,
        _image_base64: Option<&str>,
    ) -> Result<FeatureRecord, CollaboratorError> {
        self.texts.lock().unwrap().push(text.to_string());
        self.script.next()
    }
}

// ── CAD ──

pub struct MockCad {
    script: Script<CadContext>,
}

impl MockCad {
    pub fn ok(context: CadContext) -> Self {
        Self {
            script: Script::new(vec![Ok(context)]),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Script::new(vec![Err(CollaboratorError::Unavailable("FreeCAD".into()))]),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl CadExtractor for MockCad {
    async fn extract(&self, _hint: &str) -> Result<CadContext, CollaboratorError> {
        self.script.next()
    }
}

// ── Classifier ──

pub struct MockClassifier {
    script: Script<Classification>,
    models: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn ok(classification: Classification) -> Self {
        Self::scripted(vec![Ok(classification)])
    }

    pub fn failing(errors: Vec<CollaboratorError>) -> Self {
        Self::scripted(errors.into_iter().map(Err).collect())
    }

    pub fn scripted(outcomes: Vec<Outcome<Classification>>) -> Self {
        Self {
            script: Script::new(outcomes),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        _features: &FeatureRecord,
        model_id: &str,
    ) -> Result<Classification, CollaboratorError> {
        self.models.lock().unwrap().push(model_id.to_string());
        self.script.next()
    }
}

// ── Standards ──

pub struct MockMatcher {
    script: Script<Vec<StandardMatch>>,
}

impl MockMatcher {
    pub fn ok(matches: Vec<StandardMatch>) -> Self {
        Self {
            script: Script::new(vec![Ok(matches)]),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Script::new(vec![Err(CollaboratorError::Backend("index missing".into()))]),
        }
    }

    pub fn panicking() -> Self {
        Self {
            script: Script::panicking(),
        }
    }
}

#[async_trait]
impl StandardsMatcher for MockMatcher {
    async fn match_standards(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<StandardMatch>, CollaboratorError> {
        self.script
            .next()
            .map(|matches| matches.into_iter().take(top_k).collect())
    }
}

// ── Tolerances ──

pub struct MockTolerances;

impl MockTolerances {
    pub fn ok() -> Self {
        Self
    }
}

#[async_trait]
impl ToleranceLookup for MockTolerances {
    async fn get_range(
        &self,
        process: &str,
        material: &str,
        feature_type: FeatureType,
    ) -> Result<Option<ToleranceRange>, CollaboratorError> {
        Ok(Some(ToleranceRange {
            process: process.to_string(),
            material: material.to_string(),
            feature_type: feature_type.as_str().to_string(),
            min_mm: 0.025,
            max_mm: 0.1,
            achievable_best_mm: Some(0.01),
            notes: None,
        }))
    }

    async fn get_material_properties(
        &self,
        material: &str,
    ) -> Result<Option<MaterialProperties>, CollaboratorError> {
        Ok(Some(MaterialProperties {
            id: "al6061_t6".into(),
            name: material.to_string(),
            category: "aluminum".into(),
            common_processes: vec!["cnc_milling".into()],
            machinability: Some("excellent".into()),
            thermal_expansion_ppm_c: Some(23.6),
            density_g_cm3: Some(2.7),
            yield_strength_mpa: Some(276.0),
            hardness: Some("95 HB".into()),
            notes: None,
        }))
    }
}

// ── Output generation ──

pub struct MockGenerator {
    script: Script<WorkerResult>,
    inputs: Mutex<Vec<GenerationInput>>,
}

impl MockGenerator {
    pub fn ok(result: WorkerResult) -> Self {
        Self::scripted(vec![Ok(result)])
    }

    pub fn scripted(outcomes: Vec<Outcome<WorkerResult>>) -> Self {
        Self {
            script: Script::new(outcomes),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    pub fn strict_flags(&self) -> Vec<bool> {
        self.inputs.lock().unwrap().iter().map(|i| i.strict).collect()
    }

    pub fn last_input(&self) -> Option<GenerationInput> {
        self.inputs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OutputGenerator for MockGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<WorkerResult, CollaboratorError> {
        self.inputs.lock().unwrap().push(input.clone());
        self.script.next()
    }
}
