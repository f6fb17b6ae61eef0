//! Template rendering collaborator
//!
//! Presentation is out of scope for this crate; modules hand a template
//! name and its data to a [`Renderer`] and pass the resulting fragment on
//! untouched.

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("Failed to render '{template}': {reason}")]
    Failed { template: String, reason: String },
}

/// Turns a named template and its data into a fragment
pub trait Renderer: Send + Sync {
    /// # Errors
    ///
    /// Returns `RenderError` if the template is unknown or fails.
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;
}

/// Renders every template as a JSON document naming the template
///
/// Useful for headless clients and the command line, where the data is
/// what matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        serde_json::to_string(&json!({ "template": template, "data": data })).map_err(|e| {
            RenderError::Failed {
                template: template.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
