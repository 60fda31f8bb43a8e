//! Error boundary state for the viewer page.

use tracing::error;

use crate::error::ViewerError;

const FALLBACK_MESSAGE: &str = "An unexpected error occurred.";

/// Captures the first error raised below the boundary until the user
/// retries. `attempt` counts retries and is reported in the logs.
///
/// The page renders the fallback instead of the canvas while an error is
/// held, so clearing it with [`reset`](Self::reset) mounts a fresh canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBoundary {
    error: Option<String>,
    attempt: u32,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `err` unless an earlier error is already being shown.
    pub fn raise(&mut self, err: &ViewerError) {
        error!(error = %err, attempt = self.attempt, "VR Page Error");
        if self.error.is_none() {
            self.error = Some(err.to_string());
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn display_message(&self) -> &str {
        match self.error.as_deref() {
            Some(msg) if !msg.is_empty() => msg,
            _ => FALLBACK_MESSAGE,
        }
    }

    pub fn reset(&mut self) {
        self.error = None;
        self.attempt += 1;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
