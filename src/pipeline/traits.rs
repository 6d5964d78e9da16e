//! Collaborator contracts consumed by the orchestrator.
//!
//! Handles are injected as `Option<Arc<dyn Trait>>`; `None` means the
//! collaborator is not configured for this deployment.

use async_trait::async_trait;

use super::types::{GenerationInput, MaterialProperties, StandardMatch, ToleranceRange};
use super::CollaboratorError;
use crate::models::{CadContext, Classification, FeatureRecord, FeatureType, WorkerResult};

/// Layer 1: turns a description (and optional image) into a feature record.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract(
        &self,
        text: &str,
        image_base64: Option<&str>,
    ) -> Result<FeatureRecord, CollaboratorError>;
}

/// Pulls exact geometry from the user's open CAD document.
#[async_trait]
pub trait CadExtractor: Send + Sync {
    async fn extract(&self, hint: &str) -> Result<CadContext, CollaboratorError>;
}

/// Layer 2: picks the GD&T characteristic for a feature.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        features: &FeatureRecord,
        model_id: &str,
    ) -> Result<Classification, CollaboratorError>;
}

/// Layer 3: semantic lookup of relevant standards sections.
#[async_trait]
pub trait StandardsMatcher: Send + Sync {
    /// Results ordered by descending score.
    async fn match_standards(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<StandardMatch>, CollaboratorError>;
}

/// Layer 4: manufacturing process capability data.
#[async_trait]
pub trait ToleranceLookup: Send + Sync {
    async fn get_range(
        &self,
        process: &str,
        material: &str,
        feature_type: FeatureType,
    ) -> Result<Option<ToleranceRange>, CollaboratorError>;

    async fn get_material_properties(
        &self,
        material: &str,
    ) -> Result<Option<MaterialProperties>, CollaboratorError>;
}

/// Layer 5: writes the final callouts and reasoning.
#[async_trait]
pub trait OutputGenerator: Send + Sync {
    async fn generate(&self, input: &GenerationInput) -> Result<WorkerResult, CollaboratorError>;
}
