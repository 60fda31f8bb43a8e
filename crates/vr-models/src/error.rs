//! Error types for the `vr-models` crate.

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A resource code was empty or contained only whitespace.
    #[error("resource code must not be empty")]
    EmptyResourceCode,
}
