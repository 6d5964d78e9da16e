use serde::{Deserialize, Serialize};

use super::enums::FeatureType;

pub const UNSPECIFIED: &str = "unspecified";

/// Dimension keys a CAD object may override on a feature's geometry.
pub const CAD_DIMENSION_KEYS: [&str; 7] = [
    "diameter", "radius", "length", "width", "height", "depth", "angle",
];

fn default_unit() -> String {
    "mm".to_string()
}

fn unspecified() -> String {
    UNSPECIFIED.to_string()
}

/// Named numeric dimensions of a feature. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub angle: Option<f64>,
    /// Pitch circle diameter for patterns.
    #[serde(default)]
    pub pcd: Option<f64>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            diameter: None,
            radius: None,
            length: None,
            width: None,
            height: None,
            depth: None,
            angle: None,
            pcd: None,
            count: None,
            unit: default_unit(),
        }
    }
}

impl Geometry {
    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<f64>> {
        match key {
            "diameter" => Some(&mut self.diameter),
            "radius" => Some(&mut self.radius),
            "length" => Some(&mut self.length),
            "width" => Some(&mut self.width),
            "height" => Some(&mut self.height),
            "depth" => Some(&mut self.depth),
            "angle" => Some(&mut self.angle),
            _ => None,
        }
    }

    /// Overwrite a named dimension. Returns false for keys outside
    /// [`CAD_DIMENSION_KEYS`].
    pub fn set_dimension(&mut self, key: &str, value: f64) -> bool {
        match self.slot_mut(key) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }
}

/// One mechanical feature as understood by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature_type: FeatureType,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default = "unspecified", deserialize_with = "string_or_unspecified")]
    pub material: String,
    #[serde(default = "unspecified", deserialize_with = "string_or_unspecified")]
    pub manufacturing_process: String,
    #[serde(default)]
    pub mating_condition: Option<String>,
    #[serde(default)]
    pub parent_surface: Option<String>,
    /// Sketch constraints from CAD. Absent unless CAD supplied at least one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cad_constraints: Option<Vec<serde_json::Value>>,
}

impl FeatureRecord {
    pub fn new(feature_type: FeatureType) -> Self {
        Self {
            feature_type,
            geometry: Geometry::default(),
            material: unspecified(),
            manufacturing_process: unspecified(),
            mating_condition: None,
            parent_surface: None,
            cad_constraints: None,
        }
    }

    /// True when `parent_surface` holds a non-empty value.
    pub fn has_parent_surface(&self) -> bool {
        self.parent_surface
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Mating condition, if present and non-empty.
    pub fn mating_condition_str(&self) -> Option<&str> {
        self.mating_condition
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// Models sometimes emit `null` for string fields; treat that as unspecified.
fn string_or_unspecified<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => unspecified(),
    })
}
