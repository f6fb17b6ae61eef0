//! Per-type JSON API
//!
//! A [`PieceModule`] owns one piece type's composed configuration and its
//! collaborators, and answers the type's routes. Each route maps to a
//! typed method; [`PieceModule::dispatch`] wraps them in the response
//! envelope for transports that speak raw JSON bodies.

pub mod builder;
pub mod context;
pub mod response;

pub use builder::ModuleBuilder;
pub use context::{ADMIN, Permissions, RequestContext, User, UserPermissions, edit_permission};
pub use response::{ApiResponse, Reply};

use crate::Piece;
use crate::chooser::Suggestion;
use crate::filters::Descriptors;
use crate::list::{ListFormat, ListRequest, ListResults, ManagePage, TypeOptions};
use crate::pipeline::{HookPipeline, PieceError, Status};
use crate::render::Renderer;
use crate::schema::Schema;
use crate::store::{Criteria, SortSpec, Tristate};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Maximum number of autocomplete suggestions
pub const AUTOCOMPLETE_LIMIT: usize = 10;

/// Routes every piece type answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Insert,
    Retrieve,
    List,
    Update,
    Publish,
    Trash,
    Rescue,
    ManagerModal,
    ChooserModal,
    EditorModal,
    CreateModal,
    Autocomplete,
}

impl Route {
    pub const ALL: [Self; 12] = [
        Self::Insert,
        Self::Retrieve,
        Self::List,
        Self::Update,
        Self::Publish,
        Self::Trash,
        Self::Rescue,
        Self::ManagerModal,
        Self::ChooserModal,
        Self::EditorModal,
        Self::CreateModal,
        Self::Autocomplete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Retrieve => "retrieve",
            Self::List => "list",
            Self::Update => "update",
            Self::Publish => "publish",
            Self::Trash => "trash",
            Self::Rescue => "rescue",
            Self::ManagerModal => "manager-modal",
            Self::ChooserModal => "chooser-modal",
            Self::EditorModal => "editor-modal",
            Self::CreateModal => "create-modal",
            Self::Autocomplete => "autocomplete",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown route '{0}'")]
pub struct UnknownRoute(pub String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|route| route.as_str() == s)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

/// Result of the list route
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListOutcome {
    Results(ListResults),
    Page(ManagePage),
}

/// One piece type's routes
pub struct PieceModule {
    pipeline: HookPipeline,
    renderer: Arc<dyn Renderer>,
    permissions: Arc<dyn Permissions>,
}

impl PieceModule {
    pub fn new(pipeline: HookPipeline, renderer: Arc<dyn Renderer>, permissions: Arc<dyn Permissions>) -> Self {
        Self {
            pipeline,
            renderer,
            permissions,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.pipeline.type_name()
    }

    #[must_use]
    pub const fn options(&self) -> &TypeOptions {
        self.pipeline.lister().options()
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        self.pipeline.schema()
    }

    #[must_use]
    pub const fn descriptors(&self) -> &Descriptors {
        self.pipeline.lister().descriptors()
    }

    #[must_use]
    pub const fn pipeline(&self) -> &HookPipeline {
        &self.pipeline
    }

    /// Whether the requester may edit pieces of this type
    #[must_use]
    pub fn can_edit(&self, ctx: &RequestContext) -> bool {
        self.permissions.can(ctx, &edit_permission(self.name()))
    }

    /// The schema minus fields the requester lacks permission for
    #[must_use]
    pub fn allowed_schema(&self, ctx: &RequestContext) -> Schema {
        self.schema().allowed(|permission| self.permissions.can(ctx, permission))
    }

    /// Answer a route with a raw body
    pub async fn dispatch(&self, route: Route, ctx: &RequestContext, body: Map<String, Value>) -> Reply {
        match route {
            Route::Insert => Reply::Json(ApiResponse::from_result(self.insert(ctx, &body).await)),
            Route::Retrieve => Reply::Json(ApiResponse::from_result(self.retrieve(ctx, &body).await)),
            Route::Update => Reply::Json(ApiResponse::from_result(self.update(ctx, &body).await)),
            Route::Publish => Reply::Json(ApiResponse::from_result(self.publish(ctx, &body).await)),
            Route::List => match serde_json::from_value::<ListRequest>(Value::Object(body)) {
                Ok(request) => Reply::Json(ApiResponse::from_result(self.list(ctx, request).await)),
                Err(e) => {
                    warn!(type_name = self.name(), error = %e, "rejected list request");
                    Reply::Json(ApiResponse::status(Status::Validation))
                }
            },
            Route::Trash => Reply::Json(status_only(self.trash(ctx, &body).await)),
            Route::Rescue => Reply::Json(status_only(self.rescue(ctx, &body).await)),
            Route::ManagerModal => fragment(self.manager_modal(ctx)),
            Route::ChooserModal => fragment(self.chooser_modal(ctx)),
            Route::EditorModal => fragment(self.editor_modal(ctx)),
            Route::CreateModal => fragment(self.create_modal(ctx)),
            Route::Autocomplete => {
                let term = body.get("term").and_then(Value::as_str).unwrap_or_default();
                Reply::Json(ApiResponse::from_result(self.autocomplete(ctx, term).await))
            }
        }
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, otherwise the pipeline's error.
    pub async fn insert(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<Piece, PieceError> {
        self.require_editor(ctx)?;
        self.pipeline.create(ctx, body).await
    }

    /// # Errors
    ///
    /// `NotFound` or `Forbidden` per [`PieceModule::require_piece`].
    pub async fn retrieve(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<Piece, PieceError> {
        self.require_piece(ctx, body).await
    }

    /// # Errors
    ///
    /// `NotFound` or `Forbidden` per [`PieceModule::require_piece`],
    /// otherwise the pipeline's error.
    pub async fn update(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<Piece, PieceError> {
        let piece = self.require_piece(ctx, body).await?;
        self.pipeline.update(ctx, piece, body).await
    }

    /// # Errors
    ///
    /// Same as [`PieceModule::update`].
    pub async fn publish(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<Piece, PieceError> {
        let piece = self.require_piece(ctx, body).await?;
        self.pipeline.publish(ctx, piece, body).await
    }

    /// List pieces; requesters who cannot edit only see published ones
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error, or `Render` if the manage page fails.
    pub async fn list(&self, ctx: &RequestContext, mut request: ListRequest) -> Result<ListOutcome, PieceError> {
        if !self.can_edit(ctx) {
            request.published = Some(json!("1"));
            request.trash = None;
        }
        let (request, results) = self.pipeline.list(ctx, request).await?;
        match request.format {
            ListFormat::Raw => Ok(ListOutcome::Results(results)),
            ListFormat::ManagePage => {
                let page = self.pipeline.lister().manage_page(
                    &request,
                    &results,
                    self.schema(),
                    self.renderer.as_ref(),
                )?;
                Ok(ListOutcome::Page(page))
            }
        }
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `NotFound` for an unknown id.
    pub async fn trash(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<(), PieceError> {
        self.require_editor(ctx)?;
        self.pipeline.trash(ctx, body_id(body)?).await
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `NotFound` for an unknown id.
    pub async fn rescue(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<(), PieceError> {
        self.require_editor(ctx)?;
        self.pipeline.rescue(ctx, body_id(body)?).await
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `Render` on template failure.
    pub fn manager_modal(&self, ctx: &RequestContext) -> Result<String, PieceError> {
        self.require_editor(ctx)?;
        self.render_modal("managerModal", self.schema(), false)
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `Render` on template failure.
    pub fn chooser_modal(&self, ctx: &RequestContext) -> Result<String, PieceError> {
        self.require_editor(ctx)?;
        self.render_modal("chooserModal", self.schema(), true)
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `Render` on template failure.
    pub fn editor_modal(&self, ctx: &RequestContext) -> Result<String, PieceError> {
        self.require_editor(ctx)?;
        self.render_modal("editorModal", &self.allowed_schema(ctx), false)
    }

    /// # Errors
    ///
    /// `Forbidden` without edit permission, `Render` on template failure.
    pub fn create_modal(&self, ctx: &RequestContext) -> Result<String, PieceError> {
        self.require_editor(ctx)?;
        self.render_modal("createModal", &self.allowed_schema(ctx), false)
    }

    /// Title matches for a chooser's autocomplete input
    ///
    /// # Errors
    ///
    /// Returns `Store` if the search fails.
    pub async fn autocomplete(&self, ctx: &RequestContext, term: &str) -> Result<Vec<Suggestion>, PieceError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let published = if self.can_edit(ctx) { Tristate::Any } else { Tristate::Yes };
        let criteria = Criteria::for_type(self.name())
            .published(published)
            .search(term)
            .sort(SortSpec::ascending("title"))
            .per_page(AUTOCOMPLETE_LIMIT);

        let pieces = self.pipeline.store().find_page(&criteria).await?;
        Ok(pieces
            .into_iter()
            .map(|piece| Suggestion {
                label: piece.title,
                value: piece.id,
            })
            .collect())
    }

    /// The requester must hold edit permission for this type
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` otherwise.
    pub fn require_editor(&self, ctx: &RequestContext) -> Result<(), PieceError> {
        if ctx.user.is_none() || !self.can_edit(ctx) {
            return Err(PieceError::Forbidden);
        }
        Ok(())
    }

    /// The non-trashed piece named by the body's `_id`, in any published
    /// state, if the requester may edit it
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist, `Forbidden` if it may not
    /// be edited.
    pub async fn require_piece(&self, ctx: &RequestContext, body: &Map<String, Value>) -> Result<Piece, PieceError> {
        let id = body_id(body)?;
        let criteria = Criteria::for_type(self.name()).with_id(id);
        let piece = self
            .pipeline
            .store()
            .find_one(&criteria)
            .await?
            .ok_or(PieceError::NotFound)?;
        if !self.can_edit(ctx) {
            return Err(PieceError::Forbidden);
        }
        Ok(piece)
    }

    fn render_modal(&self, template: &str, schema: &Schema, chooser: bool) -> Result<String, PieceError> {
        let mut data = json!({ "options": self.options(), "schema": schema });
        if chooser {
            data["chooser"] = Value::Bool(true);
        }
        Ok(self.renderer.render(template, &data)?)
    }
}

fn body_id(body: &Map<String, Value>) -> Result<&str, PieceError> {
    body.get("_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(PieceError::NotFound)
}

fn status_only(result: Result<(), PieceError>) -> ApiResponse {
    match result {
        Ok(()) => ApiResponse::status(Status::Ok),
        Err(err) => ApiResponse::failure(&err),
    }
}

fn fragment(result: Result<String, PieceError>) -> Reply {
    match result {
        Ok(html) => Reply::Fragment(html),
        Err(err) => Reply::Json(ApiResponse::failure(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};
    use crate::testing::TestDb;

    fn module(db: &TestDb) -> PieceModule {
        let schema = Schema::base().refine(
            &[
                Field::new("title", FieldType::String).required(),
                Field::new("notes", FieldType::String).permission("admin"),
            ],
            &[],
        );
        ModuleBuilder::new("article").schema(schema).build(db.store())
    }

    fn editor() -> RequestContext {
        RequestContext::for_user(User::new("u1", "Editor").with_permission("edit-article"))
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_route_names_round_trip() {
        for route in Route::ALL {
            assert_eq!(route.as_str().parse::<Route>().unwrap(), route);
        }
        assert!("delete".parse::<Route>().is_err());
    }

    #[tokio::test]
    async fn test_insert_requires_editor() {
        let db = TestDb::new();
        let module = module(&db);
        let reply = module
            .dispatch(Route::Insert, &RequestContext::anonymous(), body(json!({"title": "x"})))
            .await;
        assert_eq!(reply.status(), Status::Forbidden);

        let reply = module
            .dispatch(Route::Insert, &editor(), body(json!({"title": "Hello"})))
            .await;
        let response = reply.into_json().unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.data.unwrap()["slug"], "hello");
    }

    #[tokio::test]
    async fn test_update_missing_piece_is_notfound() {
        let db = TestDb::new();
        let module = module(&db);
        let reply = module
            .dispatch(Route::Update, &editor(), body(json!({"_id": "nope", "title": "x"})))
            .await;
        assert_eq!(reply.status(), Status::NotFound);

        let reply = module.dispatch(Route::Update, &editor(), Map::new()).await;
        assert_eq!(reply.status(), Status::NotFound);
    }

    #[tokio::test]
    async fn test_update_without_permission_is_forbidden() {
        let db = TestDb::new();
        let module = module(&db);
        let created = module.insert(&editor(), &body(json!({"title": "Mine"}))).await.unwrap();

        let outsider = RequestContext::for_user(User::new("u2", "Outsider"));
        let result = module
            .update(&outsider, &body(json!({"_id": created.id, "title": "Theirs"})))
            .await;
        assert!(matches!(result, Err(PieceError::Forbidden)));
    }

    #[tokio::test]
    async fn test_trash_and_rescue_envelopes() {
        let db = TestDb::new();
        let module = module(&db);
        let created = module.insert(&editor(), &body(json!({"title": "Temp"}))).await.unwrap();
        let target = body(json!({"_id": created.id}));

        let reply = module.dispatch(Route::Trash, &editor(), target.clone()).await;
        assert_eq!(reply.into_json(), Some(ApiResponse::status(Status::Ok)));

        let retrieved = module.dispatch(Route::Retrieve, &editor(), target.clone()).await;
        assert_eq!(retrieved.status(), Status::NotFound);

        let reply = module.dispatch(Route::Rescue, &editor(), target.clone()).await;
        assert_eq!(reply.status(), Status::Ok);
        let retrieved = module.dispatch(Route::Retrieve, &editor(), target).await;
        assert_eq!(retrieved.status(), Status::Ok);

        let reply = module
            .dispatch(Route::Trash, &editor(), body(json!({"_id": "ghost"})))
            .await;
        assert_eq!(reply.status(), Status::NotFound);
    }

    #[tokio::test]
    async fn test_anonymous_list_sees_only_published() {
        let db = TestDb::new();
        db.seed_articles(2, true).await;
        db.seed_articles(3, false).await;
        let module = module(&db);

        let ListOutcome::Results(public) = module.list(&RequestContext::anonymous(), ListRequest::new()).await.unwrap()
        else {
            panic!("expected raw results");
        };
        assert_eq!(public.page_info.total, 2);

        let ListOutcome::Results(all) = module.list(&editor(), ListRequest::new()).await.unwrap() else {
            panic!("expected raw results");
        };
        assert_eq!(all.page_info.total, 5);
    }

    #[tokio::test]
    async fn test_modals_render_and_filter_schema() {
        let db = TestDb::new();
        let module = module(&db);

        let Reply::Fragment(html) = module.dispatch(Route::EditorModal, &editor(), Map::new()).await else {
            panic!("expected a fragment");
        };
        let rendered: Value = serde_json::from_str(&html).unwrap();
        assert_eq!(rendered["template"], "editorModal");
        let names: Vec<_> = rendered["data"]["schema"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        assert!(!names.contains(&"notes".to_string()));

        let Reply::Fragment(html) = module
            .dispatch(Route::ChooserModal, &RequestContext::local_admin(), Map::new())
            .await
        else {
            panic!("expected a fragment");
        };
        let rendered: Value = serde_json::from_str(&html).unwrap();
        assert_eq!(rendered["data"]["chooser"], true);

        let reply = module
            .dispatch(Route::ManagerModal, &RequestContext::anonymous(), Map::new())
            .await;
        assert_eq!(reply.status(), Status::Forbidden);
    }

    #[tokio::test]
    async fn test_autocomplete_matches_titles() {
        let db = TestDb::new();
        let module = module(&db);
        for title in ["Rust in Action", "Rusty Nails", "Go Tour"] {
            module.insert(&editor(), &body(json!({"title": title}))).await.unwrap();
        }

        let suggestions = module.autocomplete(&editor(), "rust").await.unwrap();
        let labels: Vec<_> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Rust in Action", "Rusty Nails"]);
        assert!(module.autocomplete(&editor(), "  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_list_body_is_validation() {
        let db = TestDb::new();
        let module = module(&db);
        let reply = module
            .dispatch(Route::List, &editor(), body(json!({"sort": {"title": 5}})))
            .await;
        assert_eq!(reply.status(), Status::Validation);
    }

    #[tokio::test]
    async fn test_list_page_far_past_the_end_is_empty() {
        let db = TestDb::new();
        db.seed_articles(3, true).await;
        let module = module(&db);

        for format in ["raw", "managePage"] {
            let reply = module
                .dispatch(Route::List, &editor(), body(json!({"page": u64::MAX, "format": format})))
                .await;
            let response = reply.into_json().unwrap();
            assert_eq!(response.status, Status::Ok);
            let data = response.data.unwrap();
            assert!(data["pieces"].as_array().unwrap().is_empty());
            assert_eq!(data["totalPages"], 1);
        }
    }
}
