use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_source() -> String {
    "freecad_rpc".to_string()
}

/// Structured data pulled from an open CAD document.
///
/// Produced once per analysis and never persisted. `error` being set means
/// the extraction failed as a whole and nothing else should be trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadContext {
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub objects: Vec<CadObject>,
    #[serde(default)]
    pub sketches: Vec<CadSketch>,
    #[serde(default)]
    pub materials: Vec<CadMaterial>,
    #[serde(default)]
    pub bounding_box: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
}

impl CadContext {
    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }

    /// First object carrying at least one dimension.
    pub fn first_dimensioned_object(&self) -> Option<&CadObject> {
        self.objects.iter().find(|o| !o.dimensions.is_empty())
    }

    /// All sketch constraints, in sketch order then constraint order.
    pub fn all_constraints(&self) -> Vec<Value> {
        self.sketches
            .iter()
            .flat_map(|s| s.constraints.iter().cloned())
            .collect()
    }
}

/// A solid or feature in the CAD tree. Extra fields (volume, bounding box,
/// shape type) are carried through untouched for the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, f64>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadSketch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub constraints: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body → material assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadMaterial {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rpc_payload_and_keeps_extra_fields() {
        let ctx: CadContext = serde_json::from_value(json!({
            "document_name": "bracket",
            "objects": [{
                "name": "Pad",
                "type": "PartDesign::Pad",
                "volume_mm3": 1200.5,
                "dimensions": {"diameter": 12.7},
                "parent": "Body"
            }],
            "materials": [{"body": "Body", "material": "Aluminum 6061-T6"}]
        }))
        .unwrap();

        assert_eq!(ctx.source, "freecad_rpc");
        let obj = &ctx.objects[0];
        assert_eq!(obj.kind.as_deref(), Some("PartDesign::Pad"));
        assert_eq!(obj.extra["volume_mm3"], json!(1200.5));
        assert_eq!(obj.dimensions["diameter"], 12.7);
        assert!(ctx.is_usable());
    }

    #[test]
    fn error_payload_is_not_usable() {
        let ctx: CadContext = serde_json::from_value(json!({"error": "No active document"})).unwrap();
        assert!(!ctx.is_usable());
        assert!(ctx.objects.is_empty());
    }

    #[test]
    fn first_dimensioned_object_skips_empty() {
        let ctx = CadContext {
            objects: vec![
                CadObject {
                    name: Some("Origin".into()),
                    ..Default::default()
                },
                CadObject {
                    name: Some("Pad".into()),
                    dimensions: BTreeMap::from([("height".to_string(), 8.0)]),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            ctx.first_dimensioned_object().and_then(|o| o.name.as_deref()),
            Some("Pad")
        );
    }

    #[test]
    fn constraints_concatenate_in_order() {
        let ctx = CadContext {
            sketches: vec![
                CadSketch {
                    constraints: vec![json!({"type": "Distance"}), json!({"type": "Radius"})],
                    ..Default::default()
                },
                CadSketch::default(),
                CadSketch {
                    constraints: vec![json!({"type": "Coincident"})],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let all = ctx.all_constraints();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2]["type"], "Coincident");
    }
}
