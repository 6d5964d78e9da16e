use serde::{Deserialize, Deserializer, Serialize};

fn default_unit() -> String {
    "mm".to_string()
}

/// A single feature control frame recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdtCallout {
    pub feature: String,
    pub symbol: String,
    #[serde(default)]
    pub symbol_name: String,
    pub tolerance_value: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub modifier_symbol: Option<String>,
    #[serde(default)]
    pub datum_references: Vec<String>,
    #[serde(default)]
    pub feature_control_frame: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Output-generation result: callouts plus the reasoning around them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    #[serde(default, deserialize_with = "lenient_callouts")]
    pub callouts: Vec<GdtCallout>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub manufacturing_notes: String,
    #[serde(default)]
    pub standards_references: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Parse callouts leniently: items that fail to deserialize are dropped
/// rather than failing the whole result.
fn lenient_callouts<'de, D>(deserializer: D) -> Result<Vec<GdtCallout>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(callout) => Some(callout),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed callout");
                None
            }
        })
        .collect())
}
