//! Package identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Errors that can occur when validating a [`PackageName`] from user input.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty or only whitespace.
    #[error("Package name is empty")]
    Empty,

    /// The name contains whitespace or a control character.
    #[error("Invalid character {ch:?} in package name '{name}'")]
    InvalidChar {
        /// The offending name as given.
        name: String,
        /// The first character that is not allowed.
        ch: char,
    },
}

/// An opaque package identifier, the unique key into the state table.
///
/// Names are kept exactly as the backend reports them; no case folding is
/// applied since the package manager treats them as case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Wrap a name without validation (for backend-reported data).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Validate a name supplied by a user.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] for an empty or blank name and
    /// [`NameError::InvalidChar`] if it contains whitespace or control
    /// characters.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(NameError::InvalidChar {
                name: name.to_string(),
                ch,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::ffi::OsStr> for PackageName {
    fn as_ref(&self) -> &std::ffi::OsStr {
        self.0.as_ref()
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
