use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an [`Urgency`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrgencyError {
    #[error("unknown urgency '{0}' (expected low, mild, medium, moderate, high, severe or emergency)")]
    Unknown(String),
}

/// Ordinal triage classification of a disease.
///
/// Variants are declared from least to most urgent, so the derived `Ord` gives
/// `Low < Mild < Medium < Moderate < High < Severe < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Urgency {
    Low,
    Mild,
    Medium,
    Moderate,
    High,
    Severe,
    Emergency,
}

impl Urgency {
    pub const ALL: [Urgency; 7] = [
        Urgency::Low,
        Urgency::Mild,
        Urgency::Medium,
        Urgency::Moderate,
        Urgency::High,
        Urgency::Severe,
        Urgency::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Mild => "mild",
            Urgency::Medium => "medium",
            Urgency::Moderate => "moderate",
            Urgency::High => "high",
            Urgency::Severe => "severe",
            Urgency::Emergency => "emergency",
        }
    }

    /// `high`, `severe` and `emergency`: the classes a safety-excluded disease must keep.
    pub fn is_emergency_class(&self) -> bool {
        *self >= Urgency::High
    }

    /// `low`, `mild` and `medium`: the classes an emergency-class disease must never reach.
    pub fn is_routine_class(&self) -> bool {
        *self <= Urgency::Medium
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = UrgencyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let folded = input.trim().to_lowercase();
        Urgency::ALL
            .into_iter()
            .find(|u| u.as_str() == folded)
            .ok_or_else(|| UrgencyError::Unknown(input.trim().to_owned()))
    }
}

impl serde::Serialize for Urgency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Urgency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
