//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for DICOM identifiers and relay topics.
//! Each type ensures type safety and provides validation for format compliance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a DICOM UID
pub const MAX_UID_LENGTH: usize = 64;

/// Checks the characters and length of a DICOM UID
///
/// # Examples
///
/// ```
/// use studyhub::domain::ids::validate_uid;
///
/// assert!(validate_uid("1.2.840.10008.5.1.4.1.1.4").is_ok());
/// assert!(validate_uid("1.2.abc").is_err());
/// ```
pub fn validate_uid(uid: &str) -> Result<(), String> {
    if uid.is_empty() {
        return Err("UID cannot be empty".to_string());
    }
    if uid.len() > MAX_UID_LENGTH {
        return Err(format!(
            "UID string too long (max {MAX_UID_LENGTH} characters)."
        ));
    }
    if !uid.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err("Invalid character in UID.".to_string());
    }
    Ok(())
}

/// Study Instance UID newtype wrapper
///
/// # Examples
///
/// ```
/// use studyhub::domain::ids::StudyUid;
/// use std::str::FromStr;
///
/// let study_uid = StudyUid::from_str("1.2.840.113619.2.55.3").unwrap();
/// assert_eq!(study_uid.as_str(), "1.2.840.113619.2.55.3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyUid(String);

impl StudyUid {
    /// Creates a new StudyUid from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(StudyUid)` if the UID is valid, `Err` otherwise
    pub fn new(uid: impl Into<String>) -> Result<Self, String> {
        let uid = uid.into();
        validate_uid(&uid)?;
        Ok(Self(uid))
    }

    /// Returns the UID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StudyUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyUid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for StudyUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Series Instance UID newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesUid(String);

impl SeriesUid {
    /// Creates a new SeriesUid from a string
    pub fn new(uid: impl Into<String>) -> Result<Self, String> {
        let uid = uid.into();
        validate_uid(&uid)?;
        Ok(Self(uid))
    }

    /// Returns the UID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SeriesUid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SeriesUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Relay topic newtype wrapper
///
/// A topic travels as a single newline-terminated line on the wire, so it
/// must be non-empty and free of line breaks.
///
/// # Examples
///
/// ```
/// use studyhub::domain::ids::Topic;
///
/// let topic = Topic::new("STORE_SCU\\1.2.3").unwrap();
/// assert_eq!(topic.as_str(), "STORE_SCU\\1.2.3");
/// assert!(Topic::new("two\nlines").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Creates a new Topic from a string
    pub fn new(topic: impl Into<String>) -> Result<Self, String> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err("Topic cannot be empty".to_string());
        }
        if topic.contains('\n') || topic.contains('\r') {
            return Err(format!("Topic must be a single line, got: {topic:?}"));
        }
        Ok(Self(topic))
    }

    /// Returns the topic as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_uid_valid() {
        let uid = StudyUid::new("1.2.840.10008.5.1.4.1.1.4").unwrap();
        assert_eq!(uid.as_str(), "1.2.840.10008.5.1.4.1.1.4");
        assert_eq!(uid.to_string(), "1.2.840.10008.5.1.4.1.1.4");
    }

    #[test]
    fn test_study_uid_rejects_letters() {
        let result = StudyUid::new("invalid.uid.with.letters");
        assert_eq!(result.unwrap_err(), "Invalid character in UID.");
    }

    #[test]
    fn test_uid_length_limit() {
        let long = "1.".repeat(33);
        assert!(long.len() > MAX_UID_LENGTH);
        assert!(SeriesUid::new(long).is_err());
        assert!(SeriesUid::new("1".repeat(64)).is_ok());
    }

    #[test]
    fn test_uid_empty() {
        assert!(StudyUid::new("").is_err());
    }

    #[test]
    fn test_topic_validation() {
        assert!(Topic::new("foo").is_ok());
        assert!(Topic::new("").is_err());
        assert!(Topic::new("foo\r").is_err());
    }

    #[test]
    fn test_ids_serialization() {
        let topic = Topic::new("foo").unwrap();
        let json = serde_json::to_string(&topic).unwrap();
        assert_eq!(json, "\"foo\"");
        let back: Topic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, topic);
    }
}
