//! TechDraw page generation.
//!
//! Builds a FreeCAD Python script that lays out a drawing page with the
//! analysis' feature control frames and datum flags. The script is a fixed
//! template; caller data only ever appears inside quoted string literals.

use crate::models::{DatumScheme, FeatureRecord, GdtCallout};

pub const PAGE_NAME: &str = "GDT_Drawing";

const TEMPLATE: &str = r#"import FreeCAD
import TechDraw

def _add_annotation(doc, page, fcf_text, feature_name, x, y):
    anno = doc.addObject("TechDraw::DrawRichAnno", "GDT_" + feature_name.replace(" ", "_"))
    anno.AnnoParent = page
    anno.AnnoText = fcf_text
    anno.X = x
    anno.Y = y
    return anno

def _add_datum(doc, page, letter, surface, x, y):
    anno = doc.addObject("TechDraw::DrawRichAnno", "Datum_" + letter)
    anno.AnnoParent = page
    anno.AnnoText = "[" + letter + "]"
    anno.X = x
    anno.Y = y
    return anno
"#;

const PAGE_SETUP: &str = r#"page = doc.addObject("TechDraw::DrawPage", "GDT_Drawing")
template = doc.addObject("TechDraw::DrawSVGTemplate", "GDT_Template")
template.Template = FreeCAD.getResourceDir() + "Mod/TechDraw/Templates/A4_LandscapeTD.svg"
page.Template = template

body = None
for obj in doc.Objects:
    if obj.TypeId == "PartDesign::Body":
        body = obj
        break

view = doc.addObject("TechDraw::DrawViewPart", "GDT_View")
page.addView(view)
if body is not None:
    view.Source = [body]
view.Direction = FreeCAD.Vector(0, 0, 1)
view.Scale = 0.5
view.X = 150.0
view.Y = 150.0
"#;

const FINALIZE: &str = r#"doc.recompute()
annotation_count = len([o for o in doc.Objects if o.TypeId == "TechDraw::DrawRichAnno"])
result = {"page_name": "GDT_Drawing", "annotation_count": annotation_count}
"#;

// Page coordinates in mm on an A4 landscape sheet.
const CALLOUT_X: f64 = 120.0;
const CALLOUT_Y: f64 = 60.0;
const CALLOUT_STEP: f64 = 30.0;
const DATUM_X: f64 = 50.0;
const DATUM_Y: f64 = 200.0;
const DATUM_STEP: f64 = 25.0;

/// Quote `value` as a Python string literal.
fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Script creating a TechDraw page in `document_name` with one annotation per
/// callout and one flag per datum. Callouts without a feature name are named
/// after `features`' type, or by index.
pub fn generate_script(
    document_name: &str,
    callouts: &[GdtCallout],
    datum_scheme: &DatumScheme,
    features: Option<&FeatureRecord>,
) -> String {
    let mut script = String::from(TEMPLATE);
    let doc = py_str(document_name);
    script.push_str(&format!(
        "\ndoc = FreeCAD.getDocument({doc})\nif doc is None:\n    raise RuntimeError(\"Document {{}} not found\".format({doc}))\n\n"
    ));
    script.push_str(PAGE_SETUP);
    script.push('\n');

    for (i, callout) in callouts.iter().enumerate() {
        let name = match callout.feature.trim() {
            "" => features
                .map(|f| format!("{}_{i}", f.feature_type))
                .unwrap_or_else(|| format!("Feature_{i}")),
            named => named.to_string(),
        };
        let y = CALLOUT_Y + i as f64 * CALLOUT_STEP;
        script.push_str(&format!(
            "_add_annotation(doc, page, {}, {}, {CALLOUT_X:.1}, {y:.1})\n",
            py_str(&callout.feature_control_frame),
            py_str(&name),
        ));
    }

    let levels = [
        &datum_scheme.primary,
        &datum_scheme.secondary,
        &datum_scheme.tertiary,
    ];
    for (i, level) in levels.into_iter().flatten().enumerate() {
        let y = DATUM_Y + i as f64 * DATUM_STEP;
        script.push_str(&format!(
            "_add_datum(doc, page, {}, {}, {DATUM_X:.1}, {y:.1})\n",
            py_str(&level.datum),
            py_str(&level.surface),
        ));
    }

    script.push('\n');
    script.push_str(FINALIZE);
    script
}
