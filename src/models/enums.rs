use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The literal is also the serde wire name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(FeatureType {
    Hole => "hole",
    Boss => "boss",
    Surface => "surface",
    Slot => "slot",
    Groove => "groove",
    Shaft => "shaft",
    Pattern => "pattern",
    Bend => "bend",
});

impl FeatureType {
    /// Features that locate other geometry and therefore take a secondary datum.
    pub fn is_locating(&self) -> bool {
        matches!(self, Self::Hole | Self::Pattern | Self::Boss | Self::Slot)
    }
}

str_enum!(GdtCharacteristic {
    Straightness => "straightness",
    Flatness => "flatness",
    Circularity => "circularity",
    Cylindricity => "cylindricity",
    ProfileOfALine => "profile_of_a_line",
    ProfileOfASurface => "profile_of_a_surface",
    Angularity => "angularity",
    Parallelism => "parallelism",
    Perpendicularity => "perpendicularity",
    Position => "position",
    Concentricity => "concentricity",
    Symmetry => "symmetry",
    CircularRunout => "circular_runout",
    TotalRunout => "total_runout",
});

str_enum!(CharacteristicCategory {
    Form => "form",
    Profile => "profile",
    Orientation => "orientation",
    Location => "location",
    Runout => "runout",
});

/// ASME Y14.5 datum requirement for a characteristic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumRule {
    Never,
    Optional,
    Required,
}

impl CharacteristicCategory {
    pub fn datum_rule(&self) -> DatumRule {
        match self {
            Self::Form => DatumRule::Never,
            Self::Profile => DatumRule::Optional,
            Self::Orientation | Self::Location | Self::Runout => DatumRule::Required,
        }
    }
}

impl GdtCharacteristic {
    pub const ALL: [GdtCharacteristic; 14] = [
        Self::Straightness,
        Self::Flatness,
        Self::Circularity,
        Self::Cylindricity,
        Self::ProfileOfALine,
        Self::ProfileOfASurface,
        Self::Angularity,
        Self::Parallelism,
        Self::Perpendicularity,
        Self::Position,
        Self::Concentricity,
        Self::Symmetry,
        Self::CircularRunout,
        Self::TotalRunout,
    ];

    pub fn category(&self) -> CharacteristicCategory {
        match self {
            Self::Straightness | Self::Flatness | Self::Circularity | Self::Cylindricity => {
                CharacteristicCategory::Form
            }
            Self::ProfileOfALine | Self::ProfileOfASurface => CharacteristicCategory::Profile,
            Self::Angularity | Self::Parallelism | Self::Perpendicularity => {
                CharacteristicCategory::Orientation
            }
            Self::Position | Self::Concentricity | Self::Symmetry => {
                CharacteristicCategory::Location
            }
            Self::CircularRunout | Self::TotalRunout => CharacteristicCategory::Runout,
        }
    }

    /// Unicode symbol used in feature control frames.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Straightness => "-",
            Self::Flatness => "\u{25b1}",
            Self::Circularity => "\u{25cb}",
            Self::Cylindricity => "\u{232d}",
            Self::ProfileOfALine => "\u{2312}",
            Self::ProfileOfASurface => "\u{2313}",
            Self::Angularity => "\u{2220}",
            Self::Parallelism => "//",
            Self::Perpendicularity => "\u{22a5}",
            Self::Position => "\u{2295}",
            Self::Concentricity => "\u{25ce}",
            Self::Symmetry => "\u{2261}",
            Self::CircularRunout => "\u{2197}",
            Self::TotalRunout => "\u{2197}\u{2197}",
        }
    }

    /// ASME Y14.5-2018 section reference.
    pub fn asme_section(&self) -> &'static str {
        match self {
            Self::Straightness => "6.4.1",
            Self::Flatness => "6.4.2",
            Self::Circularity => "6.4.3",
            Self::Cylindricity => "6.4.4",
            Self::ProfileOfALine | Self::ProfileOfASurface => "6.5.2(b)",
            Self::Angularity => "6.6.2",
            Self::Parallelism => "6.6.3",
            Self::Perpendicularity => "6.6.4",
            Self::Position => "5.2",
            Self::Concentricity | Self::Symmetry => "5.11.3",
            Self::CircularRunout => "6.7.1.2.1",
            Self::TotalRunout => "6.7.1.2.2",
        }
    }

    /// Human-readable name ("Profile of a Surface").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Straightness => "Straightness",
            Self::Flatness => "Flatness",
            Self::Circularity => "Circularity",
            Self::Cylindricity => "Cylindricity",
            Self::ProfileOfALine => "Profile of a Line",
            Self::ProfileOfASurface => "Profile of a Surface",
            Self::Angularity => "Angularity",
            Self::Parallelism => "Parallelism",
            Self::Perpendicularity => "Perpendicularity",
            Self::Position => "Position",
            Self::Concentricity => "Concentricity",
            Self::Symmetry => "Symmetry",
            Self::CircularRunout => "Circular Runout",
            Self::TotalRunout => "Total Runout",
        }
    }
}

str_enum!(MaterialModifier {
    Mmc => "MMC",
    Lmc => "LMC",
});

str_enum!(ToleranceClass {
    Tight => "tight",
    Medium => "medium",
    Loose => "loose",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn feature_type_round_trips_through_str() {
        for s in ["hole", "boss", "surface", "slot", "groove", "shaft", "pattern", "bend"] {
            let ft = FeatureType::from_str(s).unwrap();
            assert_eq!(ft.as_str(), s);
        }
    }

    #[test]
    fn feature_type_rejects_unknown() {
        let err = FeatureType::from_str("flange").unwrap_err();
        assert!(err.to_string().contains("flange"));
    }

    #[test]
    fn feature_type_serializes_lowercase() {
        let json = serde_json::to_string(&FeatureType::Pattern).unwrap();
        assert_eq!(json, "\"pattern\"");
    }

    #[test]
    fn locating_features() {
        assert!(FeatureType::Hole.is_locating());
        assert!(FeatureType::Pattern.is_locating());
        assert!(FeatureType::Boss.is_locating());
        assert!(FeatureType::Slot.is_locating());
        assert!(!FeatureType::Surface.is_locating());
        assert!(!FeatureType::Shaft.is_locating());
        assert!(!FeatureType::Groove.is_locating());
        assert!(!FeatureType::Bend.is_locating());
    }

    #[test]
    fn fourteen_characteristics() {
        assert_eq!(GdtCharacteristic::ALL.len(), 14);
    }

    #[test]
    fn form_controls_never_take_datums() {
        for c in GdtCharacteristic::ALL {
            if c.category() == CharacteristicCategory::Form {
                assert_eq!(c.category().datum_rule(), DatumRule::Never, "{c}");
            }
        }
    }

    #[test]
    fn related_controls_require_datums() {
        for c in [
            GdtCharacteristic::Perpendicularity,
            GdtCharacteristic::Position,
            GdtCharacteristic::TotalRunout,
            GdtCharacteristic::Symmetry,
        ] {
            assert_eq!(c.category().datum_rule(), DatumRule::Required, "{c}");
        }
    }

    #[test]
    fn modifier_wire_names_are_uppercase() {
        let m: MaterialModifier = serde_json::from_str("\"MMC\"").unwrap();
        assert_eq!(m, MaterialModifier::Mmc);
        assert_eq!(MaterialModifier::Lmc.as_str(), "LMC");
    }
}
