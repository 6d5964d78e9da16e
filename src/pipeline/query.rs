use crate::models::{Classification, FeatureRecord};

pub const FALLBACK_QUERY: &str = "geometric dimensioning and tolerancing";

/// Build the standards-matcher query for a classified feature.
///
/// Terms in order: feature type, mating condition, primary control, symbol
/// name. Blank terms are skipped.
pub fn build(features: &FeatureRecord, classification: &Classification) -> String {
    join_terms([
        Some(features.feature_type.as_str()),
        features.mating_condition.as_deref(),
        Some(classification.primary_control.as_str()),
        Some(classification.symbol_name.as_str()),
    ])
}

fn join_terms<'a>(terms: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let parts: Vec<&str> = terms
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if parts.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        parts.join(" ")
    }
}
