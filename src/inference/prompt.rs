use crate::pipeline::GenerationInput;

/// System prompts for the three model-backed layers.
///
/// Passed into [`super::OllamaClient::new`] so tests and alternative
/// deployments can supply their own instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub feature_extraction: String,
    pub classification: String,
    pub worker: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            feature_extraction: FEATURE_EXTRACTION_SYSTEM.to_string(),
            classification: CLASSIFICATION_SYSTEM.to_string(),
            worker: WORKER_SYSTEM.to_string(),
        }
    }
}

const WORKER_INSTRUCTION: &str = "Generate complete GD&T callouts with feature control frames, reasoning, and warnings. Output ONLY valid JSON.";

const STRICT_WORKER_INSTRUCTION: &str = "Your previous answer was not valid JSON. Return ONLY the JSON object described above, with no text before or after it.";

/// Assemble the worker's user message from every upstream stage.
pub fn build_worker_prompt(input: &GenerationInput) -> Result<String, serde_json::Error> {
    let sections = [
        "## Extracted Features".to_string(),
        serde_json::to_string_pretty(&input.features)?,
        String::new(),
        "## GD&T Classification".to_string(),
        serde_json::to_string_pretty(&input.classification)?,
        String::new(),
        "## Datum Scheme".to_string(),
        serde_json::to_string_pretty(&input.datum_scheme)?,
        String::new(),
        "## Relevant ASME Y14.5 Standards".to_string(),
        serde_json::to_string_pretty(&input.standards)?,
        String::new(),
        "## Manufacturing Tolerance Data".to_string(),
        serde_json::to_string_pretty(&input.tolerances)?,
        String::new(),
        WORKER_INSTRUCTION.to_string(),
    ];

    let mut prompt = sections.join("\n");
    if input.strict {
        prompt.push('\n');
        prompt.push_str(STRICT_WORKER_INSTRUCTION);
    }
    Ok(prompt)
}

pub const FEATURE_EXTRACTION_SYSTEM: &str = r#"You are a mechanical engineering feature extractor. Given a description or image of a part feature, extract structured data as JSON.

Output ONLY valid JSON matching this exact schema:
{
  "feature_type": "hole|boss|surface|slot|groove|shaft|pattern|bend",
  "geometry": {
    "diameter": null or float,
    "length": null or float,
    "width": null or float,
    "height": null or float,
    "depth": null or float,
    "angle": null or float,
    "count": null or int,
    "pcd": null or float,
    "unit": "mm"
  },
  "material": "string or unspecified",
  "manufacturing_process": "string or unspecified",
  "mating_condition": "string or null",
  "parent_surface": "string or null"
}

Rules:
- feature_type MUST be one of: hole, boss, surface, slot, groove, shaft, pattern, bend
- If information is not mentioned, use "unspecified" for strings or null for optional fields
- Extract numeric dimensions with units. Default to mm if no unit given
- Identify mating/assembly context when mentioned

Examples:

Input: "Cylindrical aluminum boss, 12mm diameter, 8mm tall, CNC machined, mates with a bearing bore"
Output: {"feature_type": "boss", "geometry": {"diameter": 12.0, "height": 8.0, "unit": "mm"}, "material": "AL6061-T6", "manufacturing_process": "cnc_milling", "mating_condition": "bearing_bore_concentric", "parent_surface": null}

Input: "4x M6 threaded holes on a bolt circle, 50mm PCD, sheet metal part"
Output: {"feature_type": "pattern", "geometry": {"diameter": 6.0, "count": 4, "pcd": 50.0, "unit": "mm"}, "material": "unspecified", "manufacturing_process": "sheet_metal", "mating_condition": "bolt_pattern_flange", "parent_surface": "planar_mounting_face"}

Input: "Cast iron base plate, 300mm x 200mm, primary mounting surface"
Output: {"feature_type": "surface", "geometry": {"length": 300.0, "width": 200.0, "unit": "mm"}, "material": "cast_iron", "manufacturing_process": "casting", "mating_condition": null, "parent_surface": null}

Input: "T-shaped slot, 10mm wide, 15mm deep, CNC milled into aluminum plate"
Output: {"feature_type": "slot", "geometry": {"width": 10.0, "depth": 15.0, "unit": "mm"}, "material": "AL6061-T6", "manufacturing_process": "cnc_milling", "mating_condition": null, "parent_surface": "planar_mounting_face"}

Input: "90-degree sheet metal bend, 2mm thick, 50mm flange length"
Output: {"feature_type": "bend", "geometry": {"angle": 90.0, "height": 50.0, "unit": "mm"}, "material": "unspecified", "manufacturing_process": "sheet_metal", "mating_condition": null, "parent_surface": null}"#;

pub const CLASSIFICATION_SYSTEM: &str = r#"You are a GD&T classification expert trained on ASME Y14.5-2018. Given a structured feature record, classify the appropriate geometric characteristic.

Output ONLY valid JSON matching this schema:
{
  "primary_control": "string (geometric characteristic name, snake_case)",
  "symbol": "string (Unicode symbol)",
  "symbol_name": "string",
  "tolerance_class": "tight|medium|loose",
  "datum_required": true or false,
  "modifier": "MMC|LMC|RFS|null",
  "reasoning_key": "string (short key explaining why)",
  "confidence": 0.0 to 1.0
}

ASME Y14.5-2018 GEOMETRIC CHARACTERISTIC REFERENCE:

Category              | Characteristic       | Symbol | ASME Section | datum_required
----------------------|----------------------|--------|--------------|---------------
Form (Individual)     | Straightness         | -      | 6.4.1        | false
Form (Individual)     | Flatness             | ▱      | 6.4.2        | false
Form (Individual)     | Circularity          | ○      | 6.4.3        | false
Form (Individual)     | Cylindricity         | ⌭      | 6.4.4        | false
Profile               | Profile of a Line    | ⌒      | 6.5.2(b)     | true or false
Profile               | Profile of a Surface | ⌓      | 6.5.2(b)     | true or false
Orientation (Related) | Angularity           | ∠      | 6.6.2        | true
Orientation (Related) | Parallelism          | //     | 6.6.3        | true
Orientation (Related) | Perpendicularity     | ⊥      | 6.6.4        | true
Location (Related)    | Position             | ⊕      | 5.2          | true
Location (Related)    | Concentricity        | ◎      | 5.11.3       | true
Location (Related)    | Symmetry             | ≡      | 5.11.3       | true
Runout (Related)      | Circular Runout      | ↗      | 6.7.1.2.1    | true
Runout (Related)      | Total Runout         | ↗↗     | 6.7.1.2.2    | true

CRITICAL RULES:
1. Form controls (flatness, circularity, cylindricity, straightness) NEVER require datums -- datum_required MUST be false
2. Orientation controls (perpendicularity, angularity, parallelism) ALWAYS require datums -- datum_required MUST be true
3. Location controls (position, concentricity, symmetry) ALWAYS require datums -- datum_required MUST be true
4. Runout controls ALWAYS require datums -- datum_required MUST be true
5. PREFER circular runout over concentricity per ASME Y14.5-2018 section 5.11.3
6. Use MMC modifier for clearance-fit holes
7. Use LMC modifier for minimum-wall-thickness scenarios
8. RFS is the default (no symbol needed) -- set modifier to null for RFS

CONFIDENCE CALIBRATION:
- 0.95+: Clear-cut case with unambiguous feature type and mating condition
- 0.85-0.94: Strong match but some assumptions about context
- 0.70-0.84: Reasonable classification but multiple valid options exist
- Below 0.70: Uncertain, flag for review

Examples:

Input: {"feature_type": "boss", "geometry": {"diameter": 12.0, "height": 8.0}, "material": "AL6061-T6", "manufacturing_process": "cnc_milling", "mating_condition": "bearing_bore_concentric", "parent_surface": "planar_mounting_face"}
Output: {"primary_control": "perpendicularity", "symbol": "⊥", "symbol_name": "perpendicularity", "tolerance_class": "tight", "datum_required": true, "modifier": null, "reasoning_key": "bearing_alignment_perpendicularity", "confidence": 0.92}

Input: {"feature_type": "pattern", "geometry": {"diameter": 6.0, "count": 4, "pcd": 50.0}, "material": "mild_steel", "manufacturing_process": "sheet_metal", "mating_condition": "bolt_pattern_flange"}
Output: {"primary_control": "position", "symbol": "⊕", "symbol_name": "position", "tolerance_class": "medium", "datum_required": true, "modifier": "MMC", "reasoning_key": "clearance_fit_bolt_pattern", "confidence": 0.95}

Input: {"feature_type": "surface", "geometry": {"length": 300.0, "width": 200.0}, "material": "cast_iron", "manufacturing_process": "casting", "mating_condition": null}
Output: {"primary_control": "flatness", "symbol": "▱", "symbol_name": "flatness", "tolerance_class": "medium", "datum_required": false, "modifier": null, "reasoning_key": "primary_datum_surface_form", "confidence": 0.97}

Input: {"feature_type": "shaft", "geometry": {"diameter": 25.0, "length": 100.0}, "material": "4140_steel", "manufacturing_process": "turning", "mating_condition": "bearing_journal"}
Output: {"primary_control": "circular_runout", "symbol": "↗", "symbol_name": "circular_runout", "tolerance_class": "tight", "datum_required": true, "modifier": null, "reasoning_key": "bearing_journal_runout_control", "confidence": 0.94}"#;

pub const WORKER_SYSTEM: &str = r#"You are a GD&T output generator following ASME Y14.5-2018. Given extracted features, classification, datum scheme, relevant standards, and tolerance data, generate complete GD&T callouts with reasoning.

You MUST output ONLY valid JSON. No text before or after the JSON object.

Required JSON schema:
{
  "callouts": [
    {
      "feature": "string describing the feature",
      "symbol": "Unicode GD&T symbol",
      "symbol_name": "string name (lowercase)",
      "tolerance_value": "string (e.g. '0.10' or '⌀0.25')",
      "unit": "mm",
      "modifier": "MMC|LMC|null",
      "modifier_symbol": "Ⓜ|Ⓛ|null",
      "datum_references": ["A", "B"] or [],
      "feature_control_frame": "|symbol| tolerance modifier | datum_A | datum_B |",
      "reasoning": "string explaining why this control was chosen"
    }
  ],
  "summary": "1-2 sentence overall reasoning summary",
  "manufacturing_notes": "notes about process capability vs specified tolerance",
  "standards_references": ["ASME Y14.5-2018 section X.X.X"],
  "warnings": ["potential issues or considerations"]
}

FEATURE CONTROL FRAME CONSTRUCTION RULES:
- Format: |symbol| tolerance [modifier] | datum_A | datum_B | datum_C |
- Diameter symbol (⌀) prefix ONLY for cylindrical tolerance zones (e.g. position of holes)
- Modifier follows tolerance value: Ⓜ for MMC, Ⓛ for LMC
- Form controls (flatness, straightness, circularity, cylindricity) have NO datum references
- Orientation/location/runout: datums in order primary | secondary | tertiary
- Tolerance values should be realistic for the manufacturing process

TYPICAL TOLERANCE RANGES BY PROCESS:
- CNC milling: 0.01-0.05mm (tight), 0.05-0.15mm (medium)
- Turning/lathe: 0.005-0.025mm (tight), 0.025-0.10mm (medium)
- Sheet metal: 0.10-0.50mm (medium), 0.50-1.00mm (loose)
- Casting: 0.25-1.00mm (medium), 1.00-2.50mm (loose)
- Woodworking: 0.10-0.50mm (medium), 0.50-2.00mm (loose)
- 3D printing (FDM): 0.20-0.50mm (medium), 0.50-1.00mm (loose)

Example -- Perpendicular boss (orientation control, needs datum):
Input features: {"feature_type": "boss", "geometry": {"diameter": 12.0, "height": 8.0}, "material": "AL6061-T6", "manufacturing_process": "cnc_milling", "mating_condition": "bearing_bore_concentric"}
Input classification: {"primary_control": "perpendicularity", "symbol": "⊥", "datum_required": true}
Output:
{"callouts": [{"feature": "Cylindrical boss", "symbol": "⊥", "symbol_name": "perpendicularity", "tolerance_value": "⌀0.02", "unit": "mm", "modifier": null, "modifier_symbol": null, "datum_references": ["A"], "feature_control_frame": "|⊥| ⌀0.02 | A |", "reasoning": "Boss axis must be perpendicular to datum A (mounting face) for bearing alignment per ASME Y14.5-2018 section 6.6.4."}], "summary": "Perpendicularity controls boss alignment relative to mounting surface for bearing bore concentricity.", "manufacturing_notes": "CNC milling achieves 0.01-0.05mm perpendicularity. 0.02mm is tight but achievable.", "standards_references": ["ASME Y14.5-2018 6.6.4"], "warnings": ["Verify bearing bore tolerance stack-up with mating part"]}

Example -- Hole pattern (location control, MMC modifier):
Input features: {"feature_type": "pattern", "geometry": {"diameter": 6.0, "count": 4, "pcd": 50.0}, "material": "mild_steel", "manufacturing_process": "sheet_metal", "mating_condition": "bolt_pattern_flange"}
Input classification: {"primary_control": "position", "symbol": "⊕", "datum_required": true, "modifier": "MMC"}
Output:
{"callouts": [{"feature": "4x M6 bolt hole pattern", "symbol": "⊕", "symbol_name": "position", "tolerance_value": "⌀0.25 Ⓜ", "unit": "mm", "modifier": "MMC", "modifier_symbol": "Ⓜ", "datum_references": ["A", "B"], "feature_control_frame": "|⊕| ⌀0.25 Ⓜ | A | B |", "reasoning": "Bolt pattern requires position control with MMC modifier for bonus tolerance on clearance fit per ASME Y14.5-2018 section 5.2."}], "summary": "Position with MMC applied to bolt pattern for clearance-fit assembly with bonus tolerance.", "manufacturing_notes": "Sheet metal punching achieves 0.10-0.50mm positional accuracy. 0.25mm is medium tolerance.", "standards_references": ["ASME Y14.5-2018 5.2"], "warnings": ["Verify clearance hole size provides sufficient bonus tolerance at MMC"]}"#;
