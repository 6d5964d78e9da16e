use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::OllamaError;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

static BRACED_JSON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Pull a JSON object out of raw model output.
///
/// Tries, in order: the whole text, a ```json fenced block, then the span
/// from the first `{` to the last `}`.
pub fn extract_json(raw: &str) -> Result<Value, OllamaError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    if let Some(block) = FENCED_JSON.captures(raw).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(block.as_str()) {
            return Ok(value);
        }
    }

    if let Some(braced) = BRACED_JSON.find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(braced.as_str()) {
            return Ok(value);
        }
    }

    Err(OllamaError::MalformedResponse(format!(
        "Cannot extract JSON from model output: {}",
        preview(raw)
    )))
}

/// Extract JSON and deserialize it into `T`. Schema mismatches count as
/// malformed output.
pub fn parse_model_output<T: DeserializeOwned>(raw: &str) -> Result<T, OllamaError> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| OllamaError::JsonParsing(e.to_string()))
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, FeatureRecord, FeatureType, GdtCharacteristic};

    #[test]
    fn parses_bare_json() {
        let v = extract_json(r#"{"feature_type": "hole"}"#).unwrap();
        assert_eq!(v["feature_type"], "hole");
    }

    #[test]
    fn parses_fenced_block_with_prose() {
        let raw = "Here is the result:\n```json\n{\"feature_type\": \"slot\"}\n```\nDone.";
        assert_eq!(extract_json(raw).unwrap()["feature_type"], "slot");
    }

    #[test]
    fn parses_braces_inside_prose() {
        let raw = "Sure! {\"primary_control\": \"flatness\"} Hope that helps.";
        assert_eq!(extract_json(raw).unwrap()["primary_control"], "flatness");
    }

    #[test]
    fn rejects_text_without_json() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn rejects_truncated_json() {
        let err = extract_json(r#"{"callouts": [{"feature": "boss""#).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn typed_parse_of_feature_record() {
        let f: FeatureRecord =
            parse_model_output(r#"```json {"feature_type": "pattern", "geometry": {"count": 4}} ```"#)
                .unwrap();
        assert_eq!(f.feature_type, FeatureType::Pattern);
        assert_eq!(f.geometry.count, Some(4));
    }

    #[test]
    fn schema_mismatch_is_parse_error() {
        let err = parse_model_output::<Classification>(r#"{"primary_control": "wobble"}"#)
            .unwrap_err();
        assert!(matches!(err, OllamaError::JsonParsing(_)));
    }

    #[test]
    fn typed_parse_of_classification() {
        let c: Classification = parse_model_output(
            r#"{"primary_control": "circular_runout", "datum_required": true, "modifier": null, "confidence": 0.94}"#,
        )
        .unwrap();
        assert_eq!(c.primary_control, GdtCharacteristic::CircularRunout);
    }
}
