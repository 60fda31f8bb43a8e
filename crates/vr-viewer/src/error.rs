//! Viewer error types.

/// Errors surfaced by the viewer.
///
/// Payloads are plain strings so the error can be cloned into UI state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    /// Fetching VR data through the proxy failed. Raised to the error
    /// boundary; the message is shown to the user verbatim.
    #[error("{0}")]
    Fetch(String),

    /// The engine rejected a scene payload. Logged only.
    #[error("failed to load work data into engine: {0}")]
    EngineLoad(String),

    /// The external engine library could not be loaded.
    #[error("failed to load VR engine: {0}")]
    EngineRuntime(String),

    /// Releasing the engine failed.
    #[error("failed to dispose engine: {0}")]
    EngineDispose(String),
}

impl From<reqwest::Error> for ViewerError {
    fn from(e: reqwest::Error) -> Self {
        ViewerError::Fetch(e.to_string())
    }
}
