use serde::{Deserialize, Deserializer, Serialize};

use super::enums::{CharacteristicCategory, DatumRule, GdtCharacteristic, MaterialModifier};

/// GD&T classification of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub primary_control: GdtCharacteristic,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub symbol_name: String,
    #[serde(default)]
    pub tolerance_class: Option<String>,
    #[serde(default)]
    pub datum_required: bool,
    #[serde(default, deserialize_with = "modifier_or_rfs")]
    pub modifier: Option<MaterialModifier>,
    #[serde(default)]
    pub reasoning_key: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Classification {
    /// Minimal classification for a characteristic, with symbol and the
    /// category's datum requirement filled in.
    pub fn for_characteristic(primary_control: GdtCharacteristic) -> Self {
        Self {
            primary_control,
            symbol: primary_control.symbol().to_string(),
            symbol_name: primary_control.as_str().to_string(),
            tolerance_class: None,
            datum_required: primary_control.category().datum_rule() == DatumRule::Required,
            modifier: None,
            reasoning_key: String::new(),
            confidence: 0.0,
        }
    }

    pub fn category(&self) -> CharacteristicCategory {
        self.primary_control.category()
    }

    /// Enforce the category datum rule on the classifier's own flag.
    ///
    /// Form controls never carry datums; orientation, location and runout
    /// always do. Profile controls keep whatever the classifier said.
    /// Returns true if the flag was corrected.
    pub fn enforce_datum_rule(&mut self) -> bool {
        let expected = match self.category().datum_rule() {
            DatumRule::Never => false,
            DatumRule::Required => true,
            DatumRule::Optional => return false,
        };
        if self.datum_required != expected {
            self.datum_required = expected;
            return true;
        }
        false
    }

    /// Clamp confidence into 0.0–1.0.
    pub fn clamp_confidence(&mut self) {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
    }
}

/// Models emit "RFS", "null" or "" for regardless-of-feature-size, which has
/// no modifier symbol.
fn modifier_or_rfs<'de, D>(deserializer: D) -> Result<Option<MaterialModifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.trim().to_ascii_uppercase().as_str() {
        "MMC" => Some(MaterialModifier::Mmc),
        "LMC" => Some(MaterialModifier::Lmc),
        _ => None,
    }))
}
