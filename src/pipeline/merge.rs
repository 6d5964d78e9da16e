//! Vision + CAD evidence merge.
//!
//! CAD geometry is exact and wins over the model's estimate. CAD cannot
//! express assembly intent, so `mating_condition` is left to vision.

use crate::models::{CadContext, FeatureRecord, CAD_DIMENSION_KEYS};

/// Merge CAD evidence into a vision feature record.
///
/// The vision record is never mutated; the result is an independent copy.
pub fn merge(vision: &FeatureRecord, cad: Option<&CadContext>) -> FeatureRecord {
    let mut merged = vision.clone();

    let Some(cad) = cad.filter(|c| c.is_usable()) else {
        return merged;
    };

    if let Some(object) = cad.first_dimensioned_object() {
        for key in CAD_DIMENSION_KEYS {
            if let Some(value) = object.dimensions.get(key) {
                merged.geometry.set_dimension(key, *value);
            }
        }

        if !merged.has_parent_surface() {
            if let Some(parent) = object.parent.as_deref().filter(|p| !p.is_empty()) {
                merged.parent_surface = Some(parent.to_string());
            }
        }
    }

    if let Some(material) = cad.materials.first().and_then(|m| m.material.as_deref()) {
        merged.material = material.to_string();
    }

    let constraints = cad.all_constraints();
    if !constraints.is_empty() {
        merged.cad_constraints = Some(constraints);
    }

    merged
}
