//! Rule-based datum reference frame derivation.

use crate::models::{Classification, DatumLevel, DatumScheme, FeatureRecord};

const DEFAULT_PRIMARY_SURFACE: &str = "primary mounting surface";
const SECONDARY_SURFACE: &str = "locating feature";
const PRIMARY_REASONING: &str =
    "Largest flat surface, primary assembly contact, maximum stability";
const SECONDARY_REASONING: &str =
    "Perpendicular to primary datum, constrains additional degrees of freedom";

/// Derive a datum scheme from the classifier's datum flag and the feature.
///
/// Locating features (holes, patterns, bosses, slots) also get a secondary
/// datum. Tertiary datums are never derived automatically.
pub fn derive(classification: &Classification, features: &FeatureRecord) -> DatumScheme {
    if !classification.datum_required {
        return DatumScheme::none();
    }

    let surface = if features.has_parent_surface() {
        features.parent_surface.clone().unwrap_or_default()
    } else {
        DEFAULT_PRIMARY_SURFACE.to_string()
    };

    let primary = DatumLevel {
        datum: "A".into(),
        surface,
        reasoning: PRIMARY_REASONING.into(),
    };

    let secondary = features.feature_type.is_locating().then(|| DatumLevel {
        datum: "B".into(),
        surface: SECONDARY_SURFACE.into(),
        reasoning: SECONDARY_REASONING.into(),
    });

    DatumScheme {
        primary: Some(primary),
        secondary,
        tertiary: None,
    }
}
