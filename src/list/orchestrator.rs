//! Listing orchestration on top of the storage collaborator

use super::types::{ListRequest, ListResults, ManagePage, TypeOptions};
use crate::Piece;
use crate::filters::{ColumnDescriptor, Descriptors, FilterDescriptor, SortDescriptor};
use crate::render::{RenderError, Renderer};
use crate::schema::Schema;
use crate::store::{Criteria, PageInfo, PieceStore, StoreError, Tristate};
use heck::ToUpperCamelCase;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Key of the relationship cardinality hint choosers send along
const CHOOSER_LIMIT_HINT: &str = "limit";

/// Turns listing requests into result envelopes for one piece type
pub struct ListOrchestrator {
    options: TypeOptions,
    descriptors: Descriptors,
    store: Arc<dyn PieceStore>,
}

impl ListOrchestrator {
    pub fn new(options: TypeOptions, descriptors: Descriptors, store: Arc<dyn PieceStore>) -> Self {
        Self {
            options,
            descriptors,
            store,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &TypeOptions {
        &self.options
    }

    #[must_use]
    pub const fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    /// Build the immutable query snapshot for a request
    ///
    /// Published state defaults to unconstrained and trash to excluded;
    /// either may be overridden with `"1"`, `"0"` or `"any"`. In chooser
    /// context the `limit` hint is dropped so it never reaches the pager.
    #[must_use]
    pub fn criteria(&self, request: &ListRequest) -> Criteria {
        let mut criteria = Criteria::for_type(&self.options.name)
            .per_page(self.options.per_page)
            .page(request.page.unwrap_or(1));

        if let Some(published) = request.published.as_ref().and_then(Tristate::from_value) {
            criteria = criteria.published(published);
        }
        if let Some(trash) = request.trash.as_ref().and_then(Tristate::from_value) {
            criteria = criteria.trash(trash);
        }
        if let Some(search) = request.search.as_deref().filter(|s| !s.trim().is_empty()) {
            criteria = criteria.search(search);
        }
        if let Some(sort) = request.sort.clone().filter(|sort| !sort.is_empty()) {
            criteria = criteria.sort(sort);
        }

        for (name, value) in &request.filters {
            if request.chooser && name == CHOOSER_LIMIT_HINT {
                continue;
            }
            criteria = criteria.filter(name.clone(), value.clone());
        }
        criteria
    }

    /// Fetch one page and the total count from the same snapshot
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either query fails.
    pub async fn list(&self, request: &ListRequest) -> Result<ListResults, StoreError> {
        let criteria = self.criteria(request);
        let (total, pieces) = tokio::try_join!(self.store.count(&criteria), self.store.find_page(&criteria))?;
        let page_info = criteria.page_info(total);

        debug!(
            type_name = %self.options.name,
            total,
            page = page_info.page,
            returned = pieces.len(),
            "listed pieces"
        );
        Ok(ListResults {
            pieces,
            page_info,
            criteria,
        })
    }

    /// Render the manage view fragments for a completed listing
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if a fragment fails to render.
    pub fn manage_page(
        &self,
        request: &ListRequest,
        results: &ListResults,
        schema: &Schema,
        renderer: &dyn Renderer,
    ) -> Result<ManagePage, RenderError> {
        let view = self.options.resolve_view(request.manage_view.as_deref());
        let sort = self
            .descriptors
            .active_sort(&results.criteria.effective_sort())
            .map(str::to_string);

        let data = ManageData {
            options: ManageOptions {
                type_options: &self.options,
                current_view: view,
            },
            schema,
            filters: ManageFilters {
                options: self.descriptors.visible_filters(request.chooser).collect(),
                choices: request.choices(),
                q: request.search.as_deref(),
            },
            columns: &self.descriptors.columns,
            sorts: &self.descriptors.sorts,
            sort: sort.as_deref(),
            pieces: &results.pieces,
            page_info: results.page_info,
        };
        let data = serde_json::to_value(&data).map_err(|e| RenderError::Failed {
            template: "manageFilters".into(),
            reason: e.to_string(),
        })?;

        let view_template = format!("manage{}View", view.to_upper_camel_case());
        Ok(ManagePage {
            filters: renderer.render("manageFilters", &data)?,
            view: renderer.render(&view_template, &data)?,
            pager: renderer.render("pager", &data)?,
            pieces: results.pieces.iter().map(|piece| piece.id.clone()).collect(),
            page_info: results.page_info,
            sort,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManageOptions<'a> {
    #[serde(flatten)]
    type_options: &'a TypeOptions,
    current_view: &'a str,
}

#[derive(Serialize)]
struct ManageFilters<'a> {
    options: Vec<&'a FilterDescriptor>,
    choices: Map<String, Value>,
    q: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManageData<'a> {
    options: ManageOptions<'a>,
    schema: &'a Schema,
    filters: ManageFilters<'a>,
    columns: &'a [ColumnDescriptor],
    sorts: &'a [SortDescriptor],
    sort: Option<&'a str>,
    pieces: &'a [Piece],
    #[serde(flatten)]
    page_info: PageInfo,
}
