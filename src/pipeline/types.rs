use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{CadContext, Classification, DatumScheme, FeatureRecord};

/// One analysis request as received from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub description: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Process hint used when the model could not infer one.
    #[serde(default)]
    pub manufacturing_process: Option<String>,
    /// Material hint used when the model could not infer one.
    #[serde(default)]
    pub material: Option<String>,
    /// Also classify with the baseline model and report both.
    #[serde(default)]
    pub compare: bool,
    /// CAD data supplied by the client; skips live CAD extraction.
    #[serde(default)]
    pub cad_context: Option<CadContext>,
}

impl AnalysisRequest {
    pub fn from_description(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Default::default()
        }
    }
}

/// A standards section matched to the analysis query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMatch {
    pub key: String,
    pub score: f32,
}

/// Achievable tolerance for a process / material / feature combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceRange {
    pub process: String,
    pub material: String,
    pub feature_type: String,
    pub min_mm: f64,
    pub max_mm: f64,
    pub achievable_best_mm: Option<f64>,
    pub notes: Option<String>,
}

/// Material data relevant to tolerancing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub id: String,
    pub name: String,
    pub category: String,
    pub common_processes: Vec<String>,
    pub machinability: Option<String>,
    pub thermal_expansion_ppm_c: Option<f64>,
    pub density_g_cm3: Option<f64>,
    pub yield_strength_mpa: Option<f64>,
    pub hardness: Option<String>,
    pub notes: Option<String>,
}

/// Tolerance lookup result. Both halves are `None` when the lookup degraded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToleranceData {
    pub tolerance_range: Option<ToleranceRange>,
    pub material_properties: Option<MaterialProperties>,
}

/// Everything the output generator is given.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationInput {
    pub features: FeatureRecord,
    pub classification: Classification,
    pub datum_scheme: DatumScheme,
    pub standards: Vec<StandardMatch>,
    pub tolerances: ToleranceData,
    /// Set on the retry after malformed output: ask for bare JSON only.
    #[serde(skip)]
    pub strict: bool,
}

/// Timed pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Student,
    Classifier,
    Matcher,
    Worker,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Classifier => "classifier",
            Self::Matcher => "matcher",
            Self::Worker => "worker",
        }
    }
}

/// Per-stage elapsed milliseconds for one analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub student_ms: u64,
    pub classifier_ms: u64,
    pub matcher_ms: u64,
    pub worker_ms: u64,
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, elapsed: Duration) -> u64 {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match stage {
            Stage::Student => self.student_ms = ms,
            Stage::Classifier => self.classifier_ms = ms,
            Stage::Matcher => self.matcher_ms = ms,
            Stage::Worker => self.worker_ms = ms,
        }
        ms
    }

    pub fn total_ms(&self) -> u64 {
        self.student_ms
            .saturating_add(self.classifier_ms)
            .saturating_add(self.matcher_ms)
            .saturating_add(self.worker_ms)
    }
}
