use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a request parameter does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
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
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
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

str_enum!(Gender {
    Male => "male",
    Female => "female",
});

str_enum!(Classification {
    Normal => "normal",
    Low => "low",
    High => "high",
});

str_enum!(UrineTestType {
    Rapid => "rapid",
    Complete => "complete",
    Culture => "culture",
    TwentyFourHour => "24-hour",
    Pregnancy => "pregnancy",
    Full => "full",
});

impl Gender {
    /// Lenient request parsing: case-insensitive, missing or unknown values fall back to male.
    pub fn from_request(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Male;
        };
        let lower = raw.trim().to_lowercase();
        lower.parse().unwrap_or_else(|_| {
            tracing::warn!(gender = %lower, "Unrecognized gender, using male reference ranges");
            Self::Male
        })
    }
}

impl Default for Gender {
    fn default() -> Self {
        Self::Male
    }
}

impl Classification {
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl UrineTestType {
    /// Lenient request parsing: anything unrecognized runs the full integration.
    pub fn from_request(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Full;
        };
        let lower = raw.trim().to_lowercase();
        lower.parse().unwrap_or_else(|_| {
            tracing::warn!(test_type = %lower, "Unrecognized urine test type, running full analysis");
            Self::Full
        })
    }
}

impl Default for UrineTestType {
    fn default() -> Self {
        Self::Full
    }
}
