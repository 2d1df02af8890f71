use std::fmt;

/// Errors that can occur when creating a [`DiseaseName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The input was empty or contained only whitespace
    #[error("disease name cannot be empty")]
    Empty,
}

/// A disease label that is guaranteed to be non-empty.
///
/// The display form keeps the original capitalisation (trimmed, inner whitespace collapsed).
/// A lower-cased copy is kept alongside it so keyword checks and case-insensitive ordering do
/// not allocate on every comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiseaseName {
    display: String,
    folded: String,
}

impl DiseaseName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, NameError> {
        let display = input.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        if display.is_empty() {
            return Err(NameError::Empty);
        }
        let folded = display.to_lowercase();
        Ok(Self { display, folded })
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lower-cased form used for keyword matching and de-duplication.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Total order: case-insensitive first, then byte-wise on the display form.
    pub fn cmp_for_ranking(&self, other: &Self) -> std::cmp::Ordering {
        self.folded
            .cmp(&other.folded)
            .then_with(|| self.display.cmp(&other.display))
    }
}

impl fmt::Display for DiseaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl AsRef<str> for DiseaseName {
    fn as_ref(&self) -> &str {
        &self.display
    }
}

impl serde::Serialize for DiseaseName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> serde::Deserialize<'de> for DiseaseName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DiseaseName::new(&s).map_err(serde::de::Error::custom)
    }
}
