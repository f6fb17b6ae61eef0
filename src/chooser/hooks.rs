//! Chooser collaborators: rendering, extension points and suggestions

use super::Chooser;
use super::error::{ChooserError, Result};
use super::types::{ChooserArgs, Choice, Suggestion};
use crate::render::{RenderError, Renderer};
use crate::schema::Field;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Produces the chooser's presentational fragments
#[async_trait]
pub trait ChooserRenderer: Send + Sync {
    /// The chooser shell, rendered once on load
    async fn render_chooser(&self, args: ChooserArgs, field: &Field) -> std::result::Result<String, RenderError>;

    /// The current selection, rendered on every refresh
    async fn render_choices(&self, choices: &[Choice], field: &Field) -> std::result::Result<String, RenderError>;
}

/// Adapts a template [`Renderer`] to the chooser's two fragments
pub struct TemplateChooserRenderer {
    renderer: Arc<dyn Renderer>,
}

impl TemplateChooserRenderer {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl ChooserRenderer for TemplateChooserRenderer {
    async fn render_chooser(&self, args: ChooserArgs, field: &Field) -> std::result::Result<String, RenderError> {
        self.renderer.render(
            "chooser",
            &json!({ "browse": args.browse, "autocomplete": args.autocomplete, "field": field }),
        )
    }

    async fn render_choices(&self, choices: &[Choice], field: &Field) -> std::result::Result<String, RenderError> {
        self.renderer
            .render("chooserChoices", &json!({ "choices": choices, "field": field }))
    }
}

/// Business rules around a chooser's commit points
///
/// All methods default to no-ops.
#[async_trait]
#[allow(unused_variables)]
pub trait ChooserHooks: Send + Sync {
    /// Enforce rules before the selection is treated as committed. May
    /// mutate the selection through the chooser's public operations.
    async fn finalize(&self, chooser: &Chooser) -> Result<()> {
        Ok(())
    }

    /// After a picker committed into this chooser
    async fn after_manager_save(&self, chooser: &Chooser) {}

    /// After a picker opened from this chooser was discarded
    async fn after_manager_cancel(&self, chooser: &Chooser) {}
}

pub struct NoChooserHooks;

impl ChooserHooks for NoChooserHooks {}

/// Supplies autocomplete suggestions for a join field
#[async_trait]
pub trait AutocompleteSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ChooserError::Autocomplete` if the lookup fails.
    async fn suggest(&self, term: &str, field: &Field) -> Result<Vec<Suggestion>>;
}

/// Requires at least `min` choices when finalizing
pub struct MinimumChoices(pub usize);

#[async_trait]
impl ChooserHooks for MinimumChoices {
    async fn finalize(&self, chooser: &Chooser) -> Result<()> {
        let count = chooser.len();
        if count < self.0 {
            return Err(ChooserError::Rejected(format!(
                "at least {} choices are required, {count} selected",
                self.0
            )));
        }
        Ok(())
    }
}
