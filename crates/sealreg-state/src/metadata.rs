//! # Public Metadata
//!
//! Plaintext attributes attached to a record at creation and never changed.
//!
//! Limits: at most 32 entries; keys are 1–64 characters of
//! `[A-Za-z0-9_.-]`; values are at most 1024 characters. Keys starting with
//! `restricted.` are withheld from [`ReaderClass::Public`] readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Maximum number of entries.
pub const MAX_FIELDS: usize = 32;
/// Maximum key length in characters.
pub const MAX_KEY_LEN: usize = 64;
/// Maximum value length in characters.
pub const MAX_VALUE_LEN: usize = 1024;
/// Keys with this prefix are hidden from public readers.
pub const RESTRICTED_PREFIX: &str = "restricted.";

/// Metadata validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// More than [`MAX_FIELDS`] entries.
    #[error("metadata has {0} fields, at most {MAX_FIELDS} allowed")]
    TooManyFields(usize),

    /// Key is empty, too long, or uses a character outside `[A-Za-z0-9_.-]`.
    #[error("metadata key {key:?} is invalid: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Value longer than [`MAX_VALUE_LEN`] characters.
    #[error("metadata value for {key:?} has {len} characters, at most {MAX_VALUE_LEN} allowed")]
    ValueTooLong { key: String, len: usize },
}

/// Access level of a reader on the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderClass {
    /// Anonymous or unrelated reader.
    #[default]
    Public,
    /// The record's owner.
    Owner,
    /// Sees everything.
    Auditor,
}

impl ReaderClass {
    /// Whether restricted keys are visible to this class.
    pub fn sees_restricted(&self) -> bool {
        !matches!(self, Self::Public)
    }
}

impl std::fmt::Display for ReaderClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Owner => "owner",
            Self::Auditor => "auditor",
        })
    }
}

impl std::str::FromStr for ReaderClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "owner" => Ok(Self::Owner),
            "auditor" => Ok(Self::Auditor),
            other => Err(format!("unknown reader class {other:?}")),
        }
    }
}

/// Validated, ordered plaintext attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PublicMetadata(BTreeMap<String, String>);

impl PublicMetadata {
    /// Empty metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and wrap.
    pub fn new(fields: BTreeMap<String, String>) -> Result<Self, MetadataError> {
        if fields.len() > MAX_FIELDS {
            return Err(MetadataError::TooManyFields(fields.len()));
        }
        for (key, value) in &fields {
            check_key(key)?;
            let len = value.chars().count();
            if len > MAX_VALUE_LEN {
                return Err(MetadataError::ValueTooLong {
                    key: key.clone(),
                    len,
                });
            }
        }
        Ok(Self(fields))
    }

    /// Validate from any iterator of pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, MetadataError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value for `key`, unfiltered.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All entries, unfiltered.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The entries `reader` is allowed to see.
    pub fn visible_to(&self, reader: ReaderClass) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(k, _)| reader.sees_restricted() || !k.starts_with(RESTRICTED_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<'de> Deserialize<'de> for PublicMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = BTreeMap::<String, String>::deserialize(deserializer)?;
        Self::new(fields).map_err(serde::de::Error::custom)
    }
}

fn check_key(key: &str) -> Result<(), MetadataError> {
    let invalid = |reason: &str| MetadataError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(invalid("longer than 64 characters"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid("only [A-Za-z0-9_.-] allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_fields() {
        let m = PublicMetadata::from_pairs([("category", "loan"), ("restricted.branch", "north")])
            .unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("category"), Some("loan"));
    }

    #[test]
    fn rejects_bad_keys() {
        let long = "k".repeat(65);
        for key in ["", "has space", "slash/key", long.as_str()] {
            assert!(
                matches!(
                    PublicMetadata::from_pairs([(key, "v")]),
                    Err(MetadataError::InvalidKey { .. })
                ),
                "{key:?}"
            );
        }
        assert!(PublicMetadata::from_pairs([("k".repeat(64), "v")]).is_ok());
    }

    #[test]
    fn rejects_long_values_and_too_many_fields() {
        assert!(matches!(
            PublicMetadata::from_pairs([("k", "x".repeat(1025))]),
            Err(MetadataError::ValueTooLong { len: 1025, .. })
        ));
        let many = (0..33).map(|i| (format!("k{i}"), String::new()));
        assert_eq!(
            PublicMetadata::from_pairs(many),
            Err(MetadataError::TooManyFields(33))
        );
    }

    #[test]
    fn restricted_keys_hidden_from_public() {
        let m = PublicMetadata::from_pairs([("a", "1"), ("restricted.b", "2")]).unwrap();
        assert_eq!(m.visible_to(ReaderClass::Public).len(), 1);
        assert_eq!(m.visible_to(ReaderClass::Owner).len(), 2);
        assert_eq!(m.visible_to(ReaderClass::Auditor).len(), 2);
    }

    #[test]
    fn deserialize_validates() {
        let ok: PublicMetadata = serde_json::from_str(r#"{"a":"1"}"#).unwrap();
        assert_eq!(ok.get("a"), Some("1"));
        assert!(serde_json::from_str::<PublicMetadata>(r#"{"bad key":"1"}"#).is_err());
    }

    #[test]
    fn reader_class_parse() {
        assert_eq!("owner".parse::<ReaderClass>(), Ok(ReaderClass::Owner));
        assert!("root".parse::<ReaderClass>().is_err());
        assert_eq!(ReaderClass::default(), ReaderClass::Public);
    }
}
