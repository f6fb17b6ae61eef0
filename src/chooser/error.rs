use crate::render::RenderError;
use thiserror::Error;

/// Chooser failures
///
/// Rejected mutations (limit reached, unknown target) are not errors;
/// those operations report a boolean outcome instead.
#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Autocomplete failed: {0}")]
    Autocomplete(String),

    /// The chooser was loaded outside an async runtime
    #[error("No async runtime available: {0}")]
    Runtime(String),

    /// A finalize rule refused the selection
    #[error("Selection rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, ChooserError>;
