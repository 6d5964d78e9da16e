//! Canned CAD data for demos without a running FreeCAD.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde_json::{json, Map, Value};

use crate::models::{CadContext, CadMaterial, CadObject, CadSketch};

const LEG_RADIUS: f64 = 15.0;
const LEG_HEIGHT: f64 = 388.0;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn extras(pairs: Vec<(&str, Value)>) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn pad(name: &str, dimensions: &[(&str, f64)], extra: Map<String, Value>) -> CadObject {
    CadObject {
        name: Some(name.to_string()),
        label: Some(name.to_string()),
        kind: Some("PartDesign::Pad".to_string()),
        dimensions: dimensions
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
        parent: Some("Body".to_string()),
        extra,
    }
}

/// Desk model: 600x400x12 mm tabletop on four 30 mm x 388 mm legs inset
/// 40 mm from the corners.
pub fn desk_context() -> CadContext {
    let top = pad(
        "Tabletop",
        &[("length", 600.0), ("width", 400.0), ("height", 12.0)],
        extras(vec![
            ("shape_type", json!("Solid")),
            ("volume_mm3", json!(600.0 * 400.0 * 12.0)),
            (
                "surface_area_mm2",
                json!(2.0 * (600.0 * 400.0 + 600.0 * 12.0 + 400.0 * 12.0)),
            ),
            (
                "bounding_box",
                json!({"x_min": 0.0, "x_max": 600.0, "y_min": 0.0, "y_max": 400.0, "z_min": 388.0, "z_max": 400.0}),
            ),
        ]),
    );

    let leg_volume = round1(PI * LEG_RADIUS.powi(2) * LEG_HEIGHT);
    let leg_area = round1(2.0 * PI * LEG_RADIUS * LEG_HEIGHT + 2.0 * PI * LEG_RADIUS.powi(2));
    let legs = [
        ("Leg_FL", 40.0, 40.0),
        ("Leg_FR", 560.0, 40.0),
        ("Leg_BL", 40.0, 360.0),
        ("Leg_BR", 560.0, 360.0),
    ]
    .into_iter()
    .map(|(name, x, y)| {
        pad(
            name,
            &[("diameter", LEG_RADIUS * 2.0), ("height", LEG_HEIGHT)],
            extras(vec![
                ("shape_type", json!("Solid")),
                ("volume_mm3", json!(leg_volume)),
                ("surface_area_mm2", json!(leg_area)),
                (
                    "bounding_box",
                    json!({
                        "x_min": x - LEG_RADIUS, "x_max": x + LEG_RADIUS,
                        "y_min": y - LEG_RADIUS, "y_max": y + LEG_RADIUS,
                        "z_min": 0.0, "z_max": LEG_HEIGHT,
                    }),
                ),
            ]),
        )
    });

    let mut objects = vec![top];
    objects.extend(legs);

    let sketches = vec![
        CadSketch {
            name: Some("Sketch_Tabletop".into()),
            label: Some("Sketch_Tabletop".into()),
            constraints: vec![
                json!({"type": "Distance", "value": 600.0, "first": 0}),
                json!({"type": "Distance", "value": 400.0, "first": 1}),
                json!({"type": "Coincident", "first": 0, "second": 1}),
                json!({"type": "Coincident", "first": 2, "second": 3}),
            ],
            extra: extras(vec![
                ("constraint_count", json!(4)),
                (
                    "geometry",
                    json!([
                        {"type": "Line", "start": [0, 0], "end": [600, 0]},
                        {"type": "Line", "start": [600, 0], "end": [600, 400]},
                        {"type": "Line", "start": [600, 400], "end": [0, 400]},
                        {"type": "Line", "start": [0, 400], "end": [0, 0]},
                    ]),
                ),
            ]),
        },
        CadSketch {
            name: Some("Sketch_Leg".into()),
            label: Some("Sketch_Leg".into()),
            constraints: vec![json!({"type": "Radius", "value": LEG_RADIUS, "first": 0})],
            extra: extras(vec![
                ("constraint_count", json!(1)),
                (
                    "geometry",
                    json!([{"type": "Circle", "radius": LEG_RADIUS, "center": [40, 40]}]),
                ),
            ]),
        },
    ];

    CadContext {
        document_name: Some("Unnamed".into()),
        objects,
        sketches,
        materials: vec![CadMaterial {
            body: Some("Body".into()),
            material: Some("Birch Plywood".into()),
        }],
        bounding_box: Some(json!({
            "x_min": 0.0, "x_max": 600.0,
            "y_min": 0.0, "y_max": 400.0,
            "z_min": 0.0, "z_max": 400.0,
        })),
        error: None,
        source: "freecad_rpc".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureRecord, FeatureType};
    use crate::pipeline::merge::merge;

    #[test]
    fn desk_has_tabletop_and_four_legs() {
        let ctx = desk_context();
        assert_eq!(ctx.objects.len(), 5);
        assert!(ctx.is_usable());
        let legs: Vec<_> = ctx
            .objects
            .iter()
            .filter(|o| o.name.as_deref().is_some_and(|n| n.starts_with("Leg_")))
            .collect();
        assert_eq!(legs.len(), 4);
        assert!(legs.iter().all(|l| l.dimensions["diameter"] == 30.0));
    }

    #[test]
    fn desk_constraints_total_five() {
        assert_eq!(desk_context().all_constraints().len(), 5);
    }

    #[test]
    fn merging_desk_uses_tabletop_dimensions() {
        let mut vision = FeatureRecord::new(FeatureType::Surface);
        vision.geometry.length = Some(700.0);
        let merged = merge(&vision, Some(&desk_context()));
        assert_eq!(merged.geometry.length, Some(600.0));
        assert_eq!(merged.geometry.height, Some(12.0));
        assert_eq!(merged.material, "Birch Plywood");
        assert_eq!(merged.parent_surface.as_deref(), Some("Body"));
        assert_eq!(merged.cad_constraints.map(|c| c.len()), Some(5));
    }

    #[test]
    fn desk_round_trips_through_rpc_json() {
        let json = serde_json::to_value(desk_context()).unwrap();
        assert_eq!(json["objects"][0]["type"], "PartDesign::Pad");
        assert_eq!(json["objects"][0]["shape_type"], "Solid");
        let back: CadContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, desk_context());
    }
}
