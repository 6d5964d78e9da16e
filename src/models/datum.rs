use serde::{Deserialize, Serialize};

/// One level of a datum reference frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatumLevel {
    pub datum: String,
    pub surface: String,
    pub reasoning: String,
}

/// Primary / secondary / tertiary datum references.
///
/// A scheme never has a secondary or tertiary without a primary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatumScheme {
    pub primary: Option<DatumLevel>,
    pub secondary: Option<DatumLevel>,
    pub tertiary: Option<DatumLevel>,
}

impl DatumScheme {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }

    /// Datum letters in precedence order.
    pub fn letters(&self) -> Vec<&str> {
        [&self.primary, &self.secondary, &self.tertiary]
            .into_iter()
            .flatten()
            .map(|level| level.datum.as_str())
            .collect()
    }

    pub fn is_well_formed(&self) -> bool {
        self.primary.is_some() || (self.secondary.is_none() && self.tertiary.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(letter: &str) -> DatumLevel {
        DatumLevel {
            datum: letter.into(),
            surface: "face".into(),
            reasoning: "test".into(),
        }
    }

    #[test]
    fn empty_scheme_serializes_explicit_nulls() {
        let json = serde_json::to_value(DatumScheme::none()).unwrap();
        assert!(json["primary"].is_null());
        assert!(json["secondary"].is_null());
        assert!(json["tertiary"].is_null());
    }

    #[test]
    fn letters_follow_precedence() {
        let scheme = DatumScheme {
            primary: Some(level("A")),
            secondary: Some(level("B")),
            tertiary: None,
        };
        assert_eq!(scheme.letters(), vec!["A", "B"]);
        assert!(scheme.is_well_formed());
    }

    #[test]
    fn secondary_without_primary_is_malformed() {
        let scheme = DatumScheme {
            primary: None,
            secondary: Some(level("B")),
            tertiary: None,
        };
        assert!(!scheme.is_well_formed());
    }
}
