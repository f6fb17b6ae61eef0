//! Picker handshake
//!
//! Opening a picker clones the parent chooser into a working copy. All
//! picker edits land on the copy; committing replaces the parent's
//! selection with the copy's finalized selection, discarding drops the
//! copy without touching the parent.

use super::error::Result;
use crate::chooser::{Chooser, ChooserOverrides, Choice};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub struct PickerHandshake {
    parent: Arc<Chooser>,
    working: Chooser,
}

impl PickerHandshake {
    /// Clone `parent` into a loaded working copy with browsing and
    /// autocomplete turned off
    ///
    /// # Errors
    ///
    /// Returns `ChooserError` if the working copy fails to load.
    pub async fn open(parent: Arc<Chooser>) -> Result<Self> {
        let working = parent.clone_with(&ChooserOverrides::picker());
        working.load().await?;
        info!(field = %parent.field().name, selected = working.len(), "picker opened");
        Ok(Self { parent, working })
    }

    #[must_use]
    pub fn parent(&self) -> &Chooser {
        &self.parent
    }

    #[must_use]
    pub const fn working(&self) -> &Chooser {
        &self.working
    }

    /// List parameters the parent's field asks for, minus its limit
    #[must_use]
    pub fn hints(&self) -> Map<String, Value> {
        let mut hints = self.parent.field().hints.clone();
        hints.remove("limit");
        hints
    }

    /// Whether the working copy differs from the parent
    pub async fn is_dirty(&self) -> bool {
        self.working.get().await != self.parent.get().await
    }

    /// Move the working selection into the parent
    ///
    /// The parent is untouched if finalizing the working copy fails.
    ///
    /// # Errors
    ///
    /// Returns the finalize rule's `ChooserError`.
    pub async fn commit(self) -> Result<Vec<Choice>> {
        let choices = self.working.get_final().await?;
        self.parent.set(choices.clone());
        info!(field = %self.parent.field().name, selected = choices.len(), "picker saved");
        self.parent.after_manager_save().await;
        Ok(choices)
    }

    /// Drop the working copy
    pub async fn discard(self) {
        info!(field = %self.parent.field().name, "picker cancelled");
        self.parent.after_manager_cancel().await;
    }
}
