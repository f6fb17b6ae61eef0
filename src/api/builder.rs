//! Assembly of a [`PieceModule`] from its parts or from configuration

use super::PieceModule;
use super::context::{Permissions, UserPermissions};
use crate::config::PieceTypeConfig;
use crate::filters::Descriptors;
use crate::list::{ListOrchestrator, TypeOptions};
use crate::pipeline::{HookPipeline, NoHooks, PieceHooks};
use crate::render::{JsonRenderer, Renderer};
use crate::schema::{FormConverter, Schema, SchemaConverter};
use crate::store::PieceStore;
use std::sync::Arc;
use tracing::debug;

/// Builder for one type's module
///
/// # Examples
///
/// ```
/// use pieces::api::ModuleBuilder;
/// use pieces::db::Database;
/// use std::sync::Arc;
///
/// let store = Arc::new(Database::open_temporary().unwrap());
/// let module = ModuleBuilder::new("article").per_page(20).build(store);
/// assert_eq!(module.options().per_page, 20);
/// ```
pub struct ModuleBuilder {
    options: TypeOptions,
    schema: Schema,
    descriptors: Descriptors,
    hooks: Arc<dyn PieceHooks>,
    converter: Arc<dyn SchemaConverter>,
    renderer: Arc<dyn Renderer>,
    permissions: Arc<dyn Permissions>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            options: TypeOptions::new(name),
            schema: Schema::base(),
            descriptors: Descriptors::base(),
            hooks: Arc::new(NoHooks),
            converter: Arc::new(FormConverter),
            renderer: Arc::new(JsonRenderer),
            permissions: Arc::new(UserPermissions),
        }
    }

    /// Start from a `[types.<name>]` configuration table
    #[must_use]
    pub fn from_config(name: &str, config: &PieceTypeConfig, default_per_page: usize) -> Self {
        let mut builder = Self::new(name);
        builder.options = config.options(name, default_per_page);
        builder.schema = config.schema();
        builder.descriptors = config.descriptors();
        builder
    }

    #[must_use]
    pub fn options(mut self, options: TypeOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn per_page(mut self, per_page: usize) -> Self {
        self.options.per_page = per_page;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn descriptors(mut self, descriptors: Descriptors) -> Self {
        self.descriptors = descriptors;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn PieceHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn SchemaConverter>) -> Self {
        self.converter = converter;
        self
    }

    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn build(self, store: Arc<dyn PieceStore>) -> PieceModule {
        debug!(
            type_name = %self.options.name,
            fields = self.schema.fields().len(),
            filters = self.descriptors.filters.len(),
            "building piece module"
        );
        let lister = ListOrchestrator::new(self.options, self.descriptors, store.clone());
        let pipeline = HookPipeline::new(self.schema, store, lister)
            .with_hooks(self.hooks)
            .with_converter(self.converter);
        PieceModule::new(pipeline, self.renderer, self.permissions)
    }
}
