//! Entity identifiers
//!
//! A GUID is a 32-character lowercase hexadecimal string, globally
//! unique across all entity types in a book. Generated identifiers use
//! UUID v7, which combines a high-resolution timestamp with random bits,
//! so identifiers created within one session never collide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BookError, BookResult};

/// A 32-character lowercase hexadecimal entity identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Parse an identifier, lowercasing any uppercase hex digits
    ///
    /// The XML writer always emits lowercase; lowercasing here keeps an
    /// entity created with mixed-case input equal to its on-disk form.
    pub fn parse(s: &str) -> BookResult<Self> {
        let trimmed = s.trim();
        if trimmed.len() != 32 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BookError::Parse(format!("not a 32-character hex GUID: {s:?}")));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Guid {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
