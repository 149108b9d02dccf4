//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier in the registry. You cannot pass a
//! `RecordId` where an `Identity` is expected.
//!
//! ## Security Invariant
//!
//! Handles are bound to `(RegistryId, Identity)` pairs. Keeping those two
//! namespaces distinct at the type level prevents a caller identity from
//! being substituted for a registry identifier in a binding statement.
//!
//! All three identifiers share one textual rule: 1–128 characters, no
//! whitespace, no control characters. Deserialization runs the same check as
//! the constructors.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Maximum length in bytes of any identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

fn check_identifier(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "must not exceed {MAX_IDENTIFIER_LEN} bytes, got {}",
            value.len()
        ));
    }
    if let Some(c) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("must not contain whitespace or control characters, found {c:?}"));
    }
    Ok(())
}

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                match check_identifier(&value) {
                    Ok(()) => Ok(Self(value)),
                    Err(reason) => Err(ValidationError::$variant { value, reason }),
                }
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_identifier!(
    /// Creator-chosen, globally unique key of a record.
    RecordId,
    RecordId
);

string_identifier!(
    /// Identity of a caller: an address or principal. Record owners are
    /// identities.
    Identity,
    Identity
);

string_identifier!(
    /// Identifier of one registry instance. Handles are bound to it.
    RegistryId,
    RegistryId
);
