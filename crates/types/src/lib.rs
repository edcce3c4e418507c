//! Small validated value types shared across the MME crates.
//!
//! - [`NonEmptyText`]: trimmed text guaranteed to hold at least one non-whitespace character
//! - [`PatientId`]: federation-unique patient identifier, used as both `id` and storage `_id`
//! - [`Informational`]: wrapper for derived, display-only values that must never take part in
//!   equality or identity decisions

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Federation-unique patient identifier.
///
/// Unlike [`NonEmptyText`] the value is kept exactly as received: identifiers are opaque to
/// this node and are compared byte-for-byte with what partners send back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(String);

impl PatientId {
    /// Wraps an identifier, rejecting empty or whitespace-only input.
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let value = input.into();
        if value.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::new(s).map_err(serde::de::Error::custom)
    }
}

/// A derived, display-only value.
///
/// Two `Informational` values always compare equal and hash identically, so a struct that
/// embeds one keeps the same equality and identity as if the value were absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Informational<T>(pub T);

impl<T> Informational<T> {
    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> PartialEq for Informational<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Informational<T> {}

impl<T> std::hash::Hash for Informational<T> {
    fn hash<H: std::hash::Hasher>(&self, _state: &mut H) {}
}

impl<T: serde::Serialize> serde::Serialize for Informational<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Informational<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Informational)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  LIMS2 ").expect("valid text");
        assert_eq!(text.as_str(), "LIMS2");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn patient_id_keeps_value_verbatim() {
        let id = PatientId::new(" patient_1").expect("valid id");
        assert_eq!(id.as_str(), " patient_1");
        assert!(PatientId::new("").is_err());
    }

    #[test]
    fn patient_id_deserialize_rejects_empty() {
        let err = serde_json::from_str::<PatientId>("\"\"").expect_err("empty id");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn informational_never_affects_equality() {
        #[derive(PartialEq, Debug)]
        struct Gene {
            id: String,
            name: Informational<Option<String>>,
        }

        let a = Gene {
            id: "ENSG00000072163".into(),
            name: Informational(Some("LIMS2".into())),
        };
        let b = Gene {
            id: "ENSG00000072163".into(),
            name: Informational(None),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn informational_serializes_transparently() {
        let value = Informational("LIMS2".to_string());
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"LIMS2\"");
    }
}
