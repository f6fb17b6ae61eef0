//! The list API as the manager sees it

use super::error::ClientError;
use crate::api::{ListOutcome, PieceModule, RequestContext};
use crate::chooser::{AutocompleteSource, ChooserError, Suggestion};
use crate::list::{ListRequest, ManagePage};
use crate::schema::Field;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Source of manage pages
#[async_trait]
pub trait ListClient: Send + Sync {
    /// Fetch one manage page for `request`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the server fails or answers unexpectedly.
    async fn list(&self, request: ListRequest) -> Result<ManagePage, ClientError>;
}

/// In-process client calling a [`PieceModule`] directly
pub struct ModuleClient {
    module: Arc<PieceModule>,
    ctx: RequestContext,
}

impl ModuleClient {
    pub const fn new(module: Arc<PieceModule>, ctx: RequestContext) -> Self {
        Self { module, ctx }
    }

    #[must_use]
    pub fn module(&self) -> &PieceModule {
        &self.module
    }
}

#[async_trait]
impl ListClient for ModuleClient {
    async fn list(&self, request: ListRequest) -> Result<ManagePage, ClientError> {
        debug!(type_name = self.module.name(), chooser = request.chooser, "manager list request");
        match self.module.list(&self.ctx, request.manage_page()).await {
            Ok(ListOutcome::Page(page)) => Ok(page),
            Ok(ListOutcome::Results(_)) => Err(ClientError::UnexpectedResponse(
                "raw results instead of a manage page".into(),
            )),
            Err(e) => Err(ClientError::Status(e.status())),
        }
    }
}

#[async_trait]
impl AutocompleteSource for ModuleClient {
    async fn suggest(&self, term: &str, _field: &Field) -> Result<Vec<Suggestion>, ChooserError> {
        self.module
            .autocomplete(&self.ctx, term)
            .await
            .map_err(|e| ChooserError::Autocomplete(e.status().to_string()))
    }
}
