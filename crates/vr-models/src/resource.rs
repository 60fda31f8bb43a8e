//! Identifier of a VR work on the upstream gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Opaque identifier naming one VR work in the upstream system.
///
/// The only invariant is that the code is non-empty; its contents are
/// passed to the gateway verbatim.
///
/// # Examples
///
/// ```
/// use vr_models::ResourceCode;
///
/// let code = ResourceCode::new("kv4Y7rB2").unwrap();
/// assert_eq!(code.as_str(), "kv4Y7rB2");
///
/// assert!(ResourceCode::new("  ").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceCode(String);

impl ResourceCode {
    /// Create a resource code, rejecting empty or whitespace-only input.
    pub fn new(code: &str) -> Result<Self, ModelError> {
        if code.trim().is_empty() {
            return Err(ModelError::EmptyResourceCode);
        }
        Ok(Self(code.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceCode {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.trim().is_empty() {
            return Err(ModelError::EmptyResourceCode);
        }
        Ok(Self(s))
    }
}

impl From<ResourceCode> for String {
    fn from(code: ResourceCode) -> Self {
        code.0
    }
}
