//! Lookup of managers by piece type
//!
//! Choosers find the manager for their field's target type here instead
//! of broadcasting for one.

use super::client::{ListClient, ModuleClient};
use super::error::{ManagerError, Result};
use super::handshake::PickerHandshake;
use super::{Manager, ManagerOptions};
use crate::api::{PieceModule, RequestContext};
use crate::chooser::Chooser;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

struct Entry {
    options: ManagerOptions,
    client: Arc<dyn ListClient>,
}

#[derive(Default)]
pub struct ManagerRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ManagerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a later registration for the same type wins
    pub fn register(&mut self, options: ManagerOptions, client: Arc<dyn ListClient>) {
        let name = options.type_options.name.clone();
        debug!(type_name = %name, "manager registered");
        self.entries.insert(name, Entry { options, client });
    }

    /// Register a module, listing through it in-process as `ctx`
    pub fn register_module(&mut self, module: Arc<PieceModule>, ctx: RequestContext) {
        let options = ManagerOptions::from_module(&module);
        self.register(options, Arc::new(ModuleClient::new(module, ctx)));
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// A standalone manager for `type_name`, showing its first page
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::UnknownType` for an unregistered type, or
    /// the first page's list error.
    pub async fn manager(&self, type_name: &str) -> Result<Manager> {
        let entry = self.entry(type_name)?;
        let mut manager = Manager::new(entry.options.clone(), Arc::clone(&entry.client));
        manager.refresh().await?;
        Ok(manager)
    }

    /// Open a picker for `chooser`'s target type
    ///
    /// # Errors
    ///
    /// Returns `ManagerError` if the chooser cannot browse, its target type
    /// is unregistered, or the working copy or first page fails to load.
    pub async fn browse(&self, chooser: Arc<Chooser>) -> Result<Manager> {
        let field = chooser.field();
        if !chooser.options().browse {
            return Err(ManagerError::BrowseDisabled(field.name.clone()));
        }
        let target = field
            .with_type
            .clone()
            .ok_or_else(|| ManagerError::NoTargetType(field.name.clone()))?;
        let entry = self.entry(&target)?;

        let handshake = PickerHandshake::open(chooser).await?;
        let mut manager = Manager::for_chooser(entry.options.clone(), Arc::clone(&entry.client), handshake);
        manager.refresh().await?;
        Ok(manager)
    }

    fn entry(&self, type_name: &str) -> Result<&Entry> {
        self.entries
            .get(type_name)
            .ok_or_else(|| ManagerError::UnknownType(type_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::{ChooserOptions, ChooserOverrides};
    use crate::schema::{Field, FieldType};
    use crate::testing::{RecordingChooserRenderer, related_field};

    fn chooser(field: Field) -> Chooser {
        Chooser::builder(ChooserOptions::new(field), RecordingChooserRenderer::new()).build()
    }

    #[tokio::test]
    async fn test_browse_requires_registered_target() {
        let registry = ManagerRegistry::new();
        let result = registry.browse(Arc::new(chooser(related_field(None)))).await;
        assert!(matches!(result, Err(ManagerError::UnknownType(name)) if name == "article"));

        let untargeted = chooser(Field::new("_loose", FieldType::JoinByArray));
        let result = registry.browse(Arc::new(untargeted)).await;
        assert!(matches!(result, Err(ManagerError::NoTargetType(_))));
    }

    #[tokio::test]
    async fn test_picker_copies_cannot_browse() {
        let registry = ManagerRegistry::new();
        let picker = chooser(related_field(None)).clone_with(&ChooserOverrides::picker());
        let result = registry.browse(Arc::new(picker)).await;
        assert!(matches!(result, Err(ManagerError::BrowseDisabled(_))));
    }

    #[tokio::test]
    async fn test_manager_for_unknown_type() {
        let registry = ManagerRegistry::new();
        assert!(!registry.contains("event"));
        assert!(matches!(registry.manager("event").await, Err(ManagerError::UnknownType(_))));
    }
}
