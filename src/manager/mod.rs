//! Bulk-browsing manager
//!
//! A [`Manager`] pages, filters and sorts a type's pieces through a
//! [`ListClient`]. Opened from a chooser it also carries a
//! [`PickerHandshake`]: its checkboxes mirror the working selection and
//! `save`/`cancel` reconcile that selection with the chooser that opened
//! it.

pub mod client;
pub mod error;
pub mod handshake;
pub mod registry;

pub use client::{ListClient, ModuleClient};
pub use error::{ClientError, ManagerError, Result};
pub use handshake::PickerHandshake;
pub use registry::ManagerRegistry;

use crate::api::PieceModule;
use crate::chooser::Choice;
use crate::filters::FilterDescriptor;
use crate::list::{ListRequest, ManagePage, TypeOptions};
use crate::store::SortSpec;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// What a manager needs to know about its type
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerOptions {
    pub type_options: TypeOptions,
    pub filters: Vec<FilterDescriptor>,
}

impl ManagerOptions {
    pub const fn new(type_options: TypeOptions, filters: Vec<FilterDescriptor>) -> Self {
        Self { type_options, filters }
    }

    #[must_use]
    pub fn from_module(module: &PieceModule) -> Self {
        Self::new(module.options().clone(), module.descriptors().filters.clone())
    }
}

pub struct Manager {
    options: ManagerOptions,
    client: Arc<dyn ListClient>,
    handshake: Option<PickerHandshake>,
    filters: Map<String, Value>,
    page: usize,
    sort: Option<SortSpec>,
    search: Option<String>,
    view: Option<String>,
    current: Option<ManagePage>,
    /// `(piece id, checked)` for each displayed piece
    checkboxes: Vec<(String, bool)>,
}

impl Manager {
    /// A standalone manager; filters start at their declared defaults
    pub fn new(options: ManagerOptions, client: Arc<dyn ListClient>) -> Self {
        let filters = options
            .filters
            .iter()
            .map(|filter| (filter.name.clone(), Value::String(filter.default_choice())))
            .collect();
        Self {
            options,
            client,
            handshake: None,
            filters,
            page: 1,
            sort: None,
            search: None,
            view: None,
            current: None,
            checkboxes: Vec::new(),
        }
    }

    /// A manager choosing for the handshake's parent chooser
    pub fn for_chooser(options: ManagerOptions, client: Arc<dyn ListClient>, handshake: PickerHandshake) -> Self {
        let mut manager = Self::new(options, client);
        manager.handshake = Some(handshake);
        manager
    }

    #[must_use]
    pub const fn options(&self) -> &ManagerOptions {
        &self.options
    }

    #[must_use]
    pub const fn handshake(&self) -> Option<&PickerHandshake> {
        self.handshake.as_ref()
    }

    #[must_use]
    pub const fn is_choosing(&self) -> bool {
        self.handshake.is_some()
    }

    #[must_use]
    pub const fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// The last page fetched
    #[must_use]
    pub const fn current(&self) -> Option<&ManagePage> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn checkboxes(&self) -> &[(String, bool)] {
        &self.checkboxes
    }

    #[must_use]
    pub fn is_checked(&self, id: &str) -> bool {
        self.checkboxes
            .iter()
            .any(|(candidate, checked)| candidate == id && *checked)
    }

    /// The list request the current state produces
    ///
    /// When choosing, the field's hints (minus `limit`) ride along and the
    /// request is flagged as coming from a chooser.
    #[must_use]
    pub fn request(&self) -> ListRequest {
        let mut request = ListRequest::new().page(self.page);
        for (name, value) in &self.filters {
            request.set(name.clone(), value.clone());
        }
        request.sort.clone_from(&self.sort);
        request.search.clone_from(&self.search);
        request.manage_view.clone_from(&self.view);
        if let Some(handshake) = &self.handshake {
            for (name, value) in handshake.hints() {
                request.set(name, value);
            }
            request.chooser = true;
        }
        request
    }

    /// Fetch the current page and re-sync the checkboxes
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn refresh(&mut self) -> Result<()> {
        let page = self.client.list(self.request()).await?;
        debug!(
            type_name = %self.options.type_options.name,
            page = self.page,
            shown = page.pieces.len(),
            "manager refreshed"
        );
        self.current = Some(page);
        self.reflect().await;
        Ok(())
    }

    /// Change a filter and go back to the first page
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn set_filter(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.filters.insert(name.into(), value);
        self.page = 1;
        self.refresh().await
    }

    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn set_page(&mut self, page: usize) -> Result<()> {
        self.page = page.max(1);
        self.refresh().await
    }

    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn set_sort(&mut self, sort: Option<SortSpec>) -> Result<()> {
        self.sort = sort;
        self.refresh().await
    }

    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn set_search(&mut self, search: Option<String>) -> Result<()> {
        self.search = search.filter(|term| !term.trim().is_empty());
        self.page = 1;
        self.refresh().await
    }

    /// # Errors
    ///
    /// Returns `ManagerError::Client` if the list request fails.
    pub async fn set_view(&mut self, view: impl Into<String>) -> Result<()> {
        self.view = Some(view.into());
        self.refresh().await
    }

    /// Check or uncheck a piece, adding it to or removing it from the
    /// working selection
    ///
    /// Returns whether the working selection accepted the change. A
    /// rejected change leaves the checkbox as it was.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::NotChoosing` for a standalone manager.
    pub fn toggle(&mut self, id: &str, checked: bool) -> Result<bool> {
        let handshake = self.handshake.as_ref().ok_or(ManagerError::NotChoosing)?;
        let prior = self.is_checked(id);
        let accepted = if checked {
            handshake.working().add(id)
        } else {
            handshake.working().remove(id)
        };
        if !accepted {
            debug!(id, "checkbox reverted, selection refused the change");
        }
        self.set_checkbox(id, if accepted { checked } else { prior });
        Ok(accepted)
    }

    /// Whether the working selection differs from the parent chooser's
    pub async fn has_unsaved_changes(&self) -> bool {
        match &self.handshake {
            Some(handshake) => handshake.is_dirty().await,
            None => false,
        }
    }

    #[must_use]
    pub fn confirm_cancel_text(&self) -> String {
        let plural = self.options.type_options.plural_label.to_lowercase();
        if self.is_choosing() {
            format!("Are you sure you want to discard unsaved changes to this selection of {plural}?")
        } else {
            format!("Are you sure you want to discard unsaved changes to these {plural}?")
        }
    }

    /// Commit the working selection into the parent chooser
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::NotChoosing` for a standalone manager, or the
    /// chooser's error if finalizing fails; the parent is then untouched.
    /// Either way the picker session is over.
    pub async fn save(self) -> Result<Vec<Choice>> {
        let handshake = self.handshake.ok_or(ManagerError::NotChoosing)?;
        handshake.commit().await
    }

    /// Close without touching the parent chooser
    pub async fn cancel(self) {
        if let Some(handshake) = self.handshake {
            handshake.discard().await;
        }
    }

    async fn reflect(&mut self) {
        let (Some(handshake), Some(page)) = (&self.handshake, &self.current) else {
            self.checkboxes.clear();
            return;
        };
        let selection = handshake.working().get().await;
        let checkboxes = page
            .pieces
            .iter()
            .map(|id| (id.clone(), selection.iter().any(|choice| &choice.value == id)))
            .collect();
        self.checkboxes = checkboxes;
    }

    fn set_checkbox(&mut self, id: &str, checked: bool) {
        match self.checkboxes.iter_mut().find(|(candidate, _)| candidate == id) {
            Some(entry) => entry.1 = checked,
            None => self.checkboxes.push((id.to_string(), checked)),
        }
    }
}
