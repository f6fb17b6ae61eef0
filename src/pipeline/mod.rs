//! Lifecycle pipeline for piece operations
//!
//! Each operation kind runs a fixed table of steps strictly in order. The
//! first failing step aborts the rest and its error reaches the caller
//! unchanged. Extension points are the [`PieceHooks`] methods, which all
//! default to no-ops.
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | create    | convert, afterConvert, beforeCreate, beforeSave, insert, afterCreate, afterSave, refetch |
//! | update    | convert, afterConvert, beforeUpdate, beforeSave, update, afterUpdate, afterSave, refetch |
//! | publish   | as update, with a publish step after afterConvert |
//! | trash     | beforeTrash, trash, afterTrash |
//! | rescue    | beforeRescue, rescue, afterRescue |
//! | list      | beforeList, query, afterList |

pub mod error;
pub mod hooks;

pub use error::{PieceError, Status};
pub use hooks::{NoHooks, PieceHooks};

use crate::Piece;
use crate::api::RequestContext;
use crate::list::{ListOrchestrator, ListRequest, ListResults};
use crate::schema::{FormConverter, Schema, SchemaConverter};
use crate::store::{Criteria, PieceStore};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Steps of the create, update and publish sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Convert,
    AfterConvert,
    Publish,
    BeforeCreate,
    BeforeUpdate,
    BeforeSave,
    Insert,
    Update,
    AfterCreate,
    AfterUpdate,
    AfterSave,
    Refetch,
}

/// Steps of the trash and rescue sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStep {
    Before,
    Flip,
    After,
}

/// Steps of the list sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStep {
    BeforeList,
    Query,
    AfterList,
}

/// Which trash flag transition a flag sequence performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Trash,
    Rescue,
}

pub const CREATE: &[WriteStep] = &[
    WriteStep::Convert,
    WriteStep::AfterConvert,
    WriteStep::BeforeCreate,
    WriteStep::BeforeSave,
    WriteStep::Insert,
    WriteStep::AfterCreate,
    WriteStep::AfterSave,
    WriteStep::Refetch,
];

pub const UPDATE: &[WriteStep] = &[
    WriteStep::Convert,
    WriteStep::AfterConvert,
    WriteStep::BeforeUpdate,
    WriteStep::BeforeSave,
    WriteStep::Update,
    WriteStep::AfterUpdate,
    WriteStep::AfterSave,
    WriteStep::Refetch,
];

pub const PUBLISH: &[WriteStep] = &[
    WriteStep::Convert,
    WriteStep::AfterConvert,
    WriteStep::Publish,
    WriteStep::BeforeUpdate,
    WriteStep::BeforeSave,
    WriteStep::Update,
    WriteStep::AfterUpdate,
    WriteStep::AfterSave,
    WriteStep::Refetch,
];

pub const FLAG: &[FlagStep] = &[FlagStep::Before, FlagStep::Flip, FlagStep::After];

pub const LIST: &[ListStep] = &[ListStep::BeforeList, ListStep::Query, ListStep::AfterList];

/// Runs the lifecycle sequences for one piece type
pub struct HookPipeline {
    schema: Schema,
    store: Arc<dyn PieceStore>,
    converter: Arc<dyn SchemaConverter>,
    hooks: Arc<dyn PieceHooks>,
    lister: ListOrchestrator,
}

impl HookPipeline {
    /// A pipeline with the form converter and no hooks
    pub fn new(schema: Schema, store: Arc<dyn PieceStore>, lister: ListOrchestrator) -> Self {
        Self {
            schema,
            store,
            converter: Arc::new(FormConverter),
            hooks: Arc::new(NoHooks),
            lister,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn PieceHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn SchemaConverter>) -> Self {
        self.converter = converter;
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.lister.options().name
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PieceStore> {
        &self.store
    }

    #[must_use]
    pub const fn lister(&self) -> &ListOrchestrator {
        &self.lister
    }

    /// Create a piece from raw input
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn create(&self, ctx: &RequestContext, input: &Map<String, Value>) -> Result<Piece, PieceError> {
        let piece = self.run_write(ctx, CREATE, input, Piece::new(self.type_name())).await?;
        info!(type_name = self.type_name(), id = %piece.id, "created piece");
        Ok(piece)
    }

    /// Apply raw input to an existing piece
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; `Vanished` if the piece is
    /// gone by the time it is re-fetched.
    pub async fn update(&self, ctx: &RequestContext, piece: Piece, input: &Map<String, Value>) -> Result<Piece, PieceError> {
        let piece = self.run_write(ctx, UPDATE, input, piece).await?;
        info!(type_name = self.type_name(), id = %piece.id, "updated piece");
        Ok(piece)
    }

    /// Update and set the published flag
    ///
    /// # Errors
    ///
    /// Same as [`HookPipeline::update`].
    pub async fn publish(&self, ctx: &RequestContext, piece: Piece, input: &Map<String, Value>) -> Result<Piece, PieceError> {
        let piece = self.run_write(ctx, PUBLISH, input, piece).await?;
        info!(type_name = self.type_name(), id = %piece.id, "published piece");
        Ok(piece)
    }

    /// Move a piece to the trash
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no piece has this id, or the first failing
    /// hook's error.
    pub async fn trash(&self, ctx: &RequestContext, id: &str) -> Result<(), PieceError> {
        self.run_flag(ctx, Flag::Trash, id).await?;
        info!(type_name = self.type_name(), id, "trashed piece");
        Ok(())
    }

    /// Restore a piece from the trash
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no piece has this id, or the first failing
    /// hook's error.
    pub async fn rescue(&self, ctx: &RequestContext, id: &str) -> Result<(), PieceError> {
        self.run_flag(ctx, Flag::Rescue, id).await?;
        info!(type_name = self.type_name(), id, "rescued piece");
        Ok(())
    }

    /// List pieces, returning the request as hooks left it with the results
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn list(&self, ctx: &RequestContext, mut request: ListRequest) -> Result<(ListRequest, ListResults), PieceError> {
        let mut results = None;
        for &step in LIST {
            debug!(type_name = self.type_name(), ?step, "list step");
            let outcome = match step {
                ListStep::BeforeList => self.hooks.before_list(ctx, &mut request).await,
                ListStep::Query => match self.lister.list(&request).await {
                    Ok(found) => {
                        results = Some(found);
                        Ok(())
                    }
                    Err(err) => Err(err.into()),
                },
                ListStep::AfterList => match results.as_mut() {
                    Some(found) => self.hooks.after_list(ctx, found).await,
                    None => Ok(()),
                },
            };
            if let Err(err) = outcome {
                warn!(type_name = self.type_name(), ?step, error = %err, "list aborted");
                return Err(err);
            }
        }
        let results = results.ok_or_else(|| PieceError::Hook("list sequence ran no query".into()))?;
        Ok((request, results))
    }

    async fn run_write(
        &self,
        ctx: &RequestContext,
        steps: &[WriteStep],
        input: &Map<String, Value>,
        mut piece: Piece,
    ) -> Result<Piece, PieceError> {
        for &step in steps {
            debug!(type_name = self.type_name(), id = %piece.id, ?step, "write step");
            if let Err(err) = self.write_step(ctx, step, input, &mut piece).await {
                warn!(type_name = self.type_name(), id = %piece.id, ?step, error = %err, "operation aborted");
                return Err(err);
            }
        }
        Ok(piece)
    }

    async fn write_step(
        &self,
        ctx: &RequestContext,
        step: WriteStep,
        input: &Map<String, Value>,
        piece: &mut Piece,
    ) -> Result<(), PieceError> {
        match step {
            WriteStep::Convert => Ok(self.converter.convert(&self.schema, input, piece).await?),
            WriteStep::AfterConvert => self.hooks.after_convert(ctx, piece).await,
            WriteStep::Publish => {
                piece.published = true;
                Ok(())
            }
            WriteStep::BeforeCreate => self.hooks.before_create(ctx, piece).await,
            WriteStep::BeforeUpdate => self.hooks.before_update(ctx, piece).await,
            WriteStep::BeforeSave => self.hooks.before_save(ctx, piece).await,
            WriteStep::Insert => {
                piece.type_name = self.type_name().to_string();
                Ok(self.store.insert(piece).await?)
            }
            WriteStep::Update => {
                piece.type_name = self.type_name().to_string();
                Ok(self.store.update(piece).await?)
            }
            WriteStep::AfterCreate => self.hooks.after_create(ctx, piece).await,
            WriteStep::AfterUpdate => self.hooks.after_update(ctx, piece).await,
            WriteStep::AfterSave => self.hooks.after_save(ctx, piece).await,
            WriteStep::Refetch => {
                let id = piece.id.clone();
                let criteria = Criteria::for_type(self.type_name()).with_id(&id);
                match self.store.find_one(&criteria).await? {
                    Some(canonical) => {
                        *piece = canonical;
                        Ok(())
                    }
                    None => Err(PieceError::Vanished(id)),
                }
            }
        }
    }

    async fn run_flag(&self, ctx: &RequestContext, flag: Flag, id: &str) -> Result<(), PieceError> {
        for &step in FLAG {
            debug!(type_name = self.type_name(), id, ?flag, ?step, "flag step");
            let outcome = match (flag, step) {
                (Flag::Trash, FlagStep::Before) => self.hooks.before_trash(ctx, id).await,
                (Flag::Rescue, FlagStep::Before) => self.hooks.before_rescue(ctx, id).await,
                (Flag::Trash, FlagStep::After) => self.hooks.after_trash(ctx, id).await,
                (Flag::Rescue, FlagStep::After) => self.hooks.after_rescue(ctx, id).await,
                (_, FlagStep::Flip) => self.flip(flag, id).await,
            };
            if let Err(err) = outcome {
                warn!(type_name = self.type_name(), id, ?flag, ?step, error = %err, "operation aborted");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Flip the trash flag of a piece of this type
    ///
    /// A piece already in the requested state counts as applied.
    async fn flip(&self, flag: Flag, id: &str) -> Result<(), PieceError> {
        let criteria = Criteria::for_type(self.type_name())
            .with_id(id)
            .trash(crate::store::Tristate::Any);
        if self.store.find_one(&criteria).await?.is_none() {
            return Err(PieceError::NotFound);
        }
        let found = match flag {
            Flag::Trash => self.store.trash(id).await?,
            Flag::Rescue => self.store.rescue(id).await?,
        };
        if found { Ok(()) } else { Err(PieceError::NotFound) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Descriptors;
    use crate::list::TypeOptions;
    use crate::schema::{Field, FieldType, SchemaError};
    use crate::store::Tristate;
    use crate::testing::TestDb;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every hook call and fails at one named hook
    #[derive(Default)]
    struct RecordingHooks {
        calls: Mutex<Vec<&'static str>>,
        fail_at: Option<&'static str>,
    }

    impl RecordingHooks {
        fn failing_at(name: &'static str) -> Self {
            Self {
                fail_at: Some(name),
                ..Self::default()
            }
        }

        fn record(&self, name: &'static str) -> Result<(), PieceError> {
            self.calls.lock().push(name);
            if self.fail_at == Some(name) {
                return Err(PieceError::Hook(format!("{name} refused")));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl PieceHooks for RecordingHooks {
        async fn after_convert(&self, _: &RequestContext, _: &mut Piece) -> Result<(), PieceError> {
            self.record("afterConvert")
        }
        async fn before_create(&self, _: &RequestContext, _: &mut Piece) -> Result<(), PieceError> {
            self.record("beforeCreate")
        }
        async fn before_save(&self, _: &RequestContext, _: &mut Piece) -> Result<(), PieceError> {
            self.record("beforeSave")
        }
        async fn after_create(&self, _: &RequestContext, _: &Piece) -> Result<(), PieceError> {
            self.record("afterCreate")
        }
        async fn after_save(&self, _: &RequestContext, _: &Piece) -> Result<(), PieceError> {
            self.record("afterSave")
        }
        async fn before_update(&self, _: &RequestContext, _: &mut Piece) -> Result<(), PieceError> {
            self.record("beforeUpdate")
        }
        async fn after_update(&self, _: &RequestContext, _: &Piece) -> Result<(), PieceError> {
            self.record("afterUpdate")
        }
        async fn before_trash(&self, _: &RequestContext, _: &str) -> Result<(), PieceError> {
            self.record("beforeTrash")
        }
        async fn after_trash(&self, _: &RequestContext, _: &str) -> Result<(), PieceError> {
            self.record("afterTrash")
        }
        async fn before_list(&self, _: &RequestContext, request: &mut ListRequest) -> Result<(), PieceError> {
            request.published = Some(json!("1"));
            self.record("beforeList")
        }
        async fn after_list(&self, _: &RequestContext, _: &mut ListResults) -> Result<(), PieceError> {
            self.record("afterList")
        }
    }

    fn pipeline(db: &TestDb, hooks: Arc<RecordingHooks>) -> HookPipeline {
        let schema = Schema::base().refine(
            &[
                Field::new("title", FieldType::String).required(),
                Field::new("rank", FieldType::Integer),
            ],
            &[],
        );
        let lister = ListOrchestrator::new(TypeOptions::new("article"), Descriptors::base(), db.store());
        HookPipeline::new(schema, db.store(), lister).with_hooks(hooks)
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_runs_hooks_in_order_and_refetches() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());

        let piece = pipeline
            .create(&RequestContext::local_admin(), &body(json!({"title": "Hello World", "rank": "4"})))
            .await
            .unwrap();

        assert_eq!(
            hooks.calls(),
            vec!["afterConvert", "beforeCreate", "beforeSave", "afterCreate", "afterSave"]
        );
        assert_eq!(piece.slug.as_deref(), Some("hello-world"));
        assert!(piece.updated_at.is_some());
        assert_eq!(piece.field("rank"), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_failing_hook_aborts_remaining_steps() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::failing_at("beforeCreate"));
        let pipeline = pipeline(&db, hooks.clone());

        let result = pipeline
            .create(&RequestContext::local_admin(), &body(json!({"title": "Nope"})))
            .await;

        assert!(matches!(result, Err(PieceError::Hook(ref msg)) if msg == "beforeCreate refused"));
        assert_eq!(hooks.calls(), vec!["afterConvert", "beforeCreate"]);
        assert!(db.db().is_empty());
    }

    #[tokio::test]
    async fn test_conversion_failure_is_validation() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());

        let result = pipeline.create(&RequestContext::local_admin(), &Map::new()).await;

        match result {
            Err(err @ PieceError::Validation(SchemaError::Required(_))) => {
                assert_eq!(err.status(), Status::Validation);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(hooks.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_publish_sequences() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());
        let ctx = RequestContext::local_admin();

        let created = pipeline.create(&ctx, &body(json!({"title": "Draft"}))).await.unwrap();
        hooks.calls.lock().clear();

        let updated = pipeline
            .update(&ctx, created, &body(json!({"title": "Renamed"})))
            .await
            .unwrap();
        assert_eq!(
            hooks.calls(),
            vec!["afterConvert", "beforeUpdate", "beforeSave", "afterUpdate", "afterSave"]
        );
        assert_eq!(updated.slug.as_deref(), Some("renamed"));
        assert!(!updated.published);

        let published = pipeline.publish(&ctx, updated, &Map::new()).await.unwrap();
        assert!(published.published);
        assert_eq!(published.title, "Renamed");
    }

    #[tokio::test]
    async fn test_trash_missing_piece_is_notfound() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());

        let result = pipeline.trash(&RequestContext::local_admin(), "missing").await;
        assert!(matches!(result, Err(PieceError::NotFound)));
        assert_eq!(hooks.calls(), vec!["beforeTrash"]);
    }

    #[tokio::test]
    async fn test_trash_is_idempotent_and_rescue_restores() {
        let db = TestDb::new();
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());
        let ctx = RequestContext::local_admin();
        let piece = pipeline.create(&ctx, &body(json!({"title": "Bin me"}))).await.unwrap();

        pipeline.trash(&ctx, &piece.id).await.unwrap();
        pipeline.trash(&ctx, &piece.id).await.unwrap();
        assert!(db.db().get(&piece.id).unwrap().unwrap().trashed);

        pipeline.rescue(&ctx, &piece.id).await.unwrap();
        assert!(!db.db().get(&piece.id).unwrap().unwrap().trashed);
    }

    #[tokio::test]
    async fn test_list_hooks_can_rewrite_request() {
        let db = TestDb::new();
        db.seed_articles(2, true).await;
        db.seed_articles(3, false).await;
        let hooks = Arc::new(RecordingHooks::default());
        let pipeline = pipeline(&db, hooks.clone());

        let (request, results) = pipeline
            .list(&RequestContext::anonymous(), ListRequest::new())
            .await
            .unwrap();

        assert_eq!(hooks.calls(), vec!["beforeList", "afterList"]);
        assert_eq!(request.published, Some(json!("1")));
        assert_eq!(results.page_info.total, 2);
        assert_eq!(results.criteria.published, Tristate::Yes);
    }
}
