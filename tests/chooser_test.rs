//! Picker handshake tests
//!
//! A chooser opens a manager over a real piece module, the manager edits a
//! working copy, and save or cancel reconciles it with the chooser.

use async_trait::async_trait;
use pieces::{
    api::{ModuleBuilder, RequestContext, Route},
    chooser::{Chooser, ChooserError, ChooserHooks, ChooserOptions, Choice, TemplateChooserRenderer},
    db::Database,
    manager::{ManagerError, ManagerRegistry, ModuleClient},
    render::JsonRenderer,
    schema::{Field, FieldType},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Counts commit-point signals and optionally refuses to finalize
#[derive(Default)]
struct CountingHooks {
    saves: AtomicUsize,
    cancels: AtomicUsize,
    refuse: bool,
}

#[async_trait]
impl ChooserHooks for CountingHooks {
    async fn finalize(&self, _chooser: &Chooser) -> Result<(), ChooserError> {
        if self.refuse {
            return Err(ChooserError::Rejected("refused".into()));
        }
        Ok(())
    }

    async fn after_manager_save(&self, _chooser: &Chooser) {
        self.saves.fetch_add(1, Ordering::SeqCst);
    }

    async fn after_manager_cancel(&self, _chooser: &Chooser) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    registry: ManagerRegistry,
    ids: Vec<String>,
    _dir: TempDir,
}

/// Articles "a".."e" behind a registered module
async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(dir.path().join("db")).unwrap());
    let module = Arc::new(ModuleBuilder::new("article").build(db));
    let admin = RequestContext::local_admin();

    let mut ids = Vec::new();
    for title in ["a", "b", "c", "d", "e"] {
        let body = json!({"title": title, "published": "1"}).as_object().cloned().unwrap();
        let reply = module.dispatch(Route::Insert, &admin, body).await;
        let data = reply.into_json().unwrap().data.unwrap();
        ids.push(data["_id"].as_str().unwrap().to_string());
    }

    let mut registry = ManagerRegistry::new();
    registry.register_module(module, admin);
    Fixture {
        registry,
        ids,
        _dir: dir,
    }
}

async fn chooser(limit: usize, initial: &[&str], hooks: Arc<CountingHooks>) -> Arc<Chooser> {
    let field = Field::join("_related", FieldType::JoinByArray, "article").limit(limit);
    let renderer = Arc::new(TemplateChooserRenderer::new(Arc::new(JsonRenderer)));
    let chooser = Chooser::builder(ChooserOptions::new(field), renderer).hooks(hooks).build();
    chooser.set(initial.iter().map(|id| Choice::new(*id)).collect());
    chooser.load().await.unwrap();
    Arc::new(chooser)
}

fn values(choices: &[Choice]) -> Vec<&str> {
    choices.iter().map(|choice| choice.value.as_str()).collect()
}

#[tokio::test]
async fn test_commit_appends_in_interaction_order() {
    let fx = fixture().await;
    let hooks = Arc::new(CountingHooks::default());
    let (a, b, c) = (fx.ids[0].as_str(), fx.ids[1].as_str(), fx.ids[2].as_str());
    let parent = chooser(3, &[a], hooks.clone()).await;

    let mut manager = fx.registry.browse(parent.clone()).await.unwrap();
    assert!(manager.is_checked(a));
    assert!(manager.toggle(b, true).unwrap());
    assert!(manager.toggle(c, true).unwrap());
    assert_eq!(values(&parent.get().await), vec![a]);

    manager.save().await.unwrap();
    assert_eq!(values(&parent.get().await), vec![a, b, c]);
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.cancels.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_leaves_parent_untouched() {
    let fx = fixture().await;
    let hooks = Arc::new(CountingHooks::default());
    let (a, b) = (fx.ids[0].as_str(), fx.ids[1].as_str());
    let parent = chooser(3, &[a], hooks.clone()).await;

    let mut manager = fx.registry.browse(parent.clone()).await.unwrap();
    assert!(manager.toggle(b, true).unwrap());
    assert!(manager.has_unsaved_changes().await);
    manager.cancel().await;

    assert_eq!(values(&parent.get().await), vec![a]);
    assert_eq!(hooks.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_commit_keeps_parent_and_reports() {
    let fx = fixture().await;
    let hooks = Arc::new(CountingHooks {
        refuse: true,
        ..CountingHooks::default()
    });
    let (a, b) = (fx.ids[0].as_str(), fx.ids[1].as_str());
    let parent = chooser(3, &[a], hooks.clone()).await;

    let mut manager = fx.registry.browse(parent.clone()).await.unwrap();
    manager.toggle(b, true).unwrap();

    let result = manager.save().await;
    assert!(matches!(result, Err(ManagerError::Chooser(ChooserError::Rejected(_)))));
    assert_eq!(values(&parent.get().await), vec![a]);
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_limit_reverts_checkbox_across_pages() {
    let fx = fixture().await;
    let hooks = Arc::new(CountingHooks::default());
    let ids: Vec<&str> = fx.ids.iter().map(String::as_str).collect();
    let parent = chooser(2, &[ids[0]], hooks).await;

    let mut manager = fx.registry.browse(parent.clone()).await.unwrap();
    assert!(manager.toggle(ids[1], true).unwrap());
    assert!(!manager.toggle(ids[2], true).unwrap());
    assert!(!manager.is_checked(ids[2]));

    manager.set_filter("published", Value::String("any".into())).await.unwrap();
    assert!(manager.is_checked(ids[1]));
    assert!(!manager.is_checked(ids[2]));

    let saved = manager.save().await.unwrap();
    assert_eq!(values(&saved), vec![ids[0], ids[1]]);
    assert!(parent.is_full());
}

#[tokio::test]
async fn test_autocomplete_through_module_client() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(dir.path().join("db")).unwrap());
    let module = Arc::new(ModuleBuilder::new("article").build(db));
    let admin = RequestContext::local_admin();
    for title in ["Rust Weekly", "Rustacean Station", "Go Time"] {
        let body = json!({"title": title}).as_object().cloned().unwrap();
        module.dispatch(Route::Insert, &admin, body).await;
    }

    let client = Arc::new(ModuleClient::new(module, admin));
    let field = Field::join("_related", FieldType::JoinByArray, "article");
    let renderer = Arc::new(TemplateChooserRenderer::new(Arc::new(JsonRenderer)));
    let chooser = Chooser::builder(ChooserOptions::new(field), renderer)
        .autocomplete(client)
        .build();
    chooser.load().await.unwrap();

    let suggestions = chooser.autocomplete("rust").await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert!(chooser.select_suggestion(&suggestions[0]));

    let remaining = chooser.autocomplete("rust").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0].value, suggestions[0].value);
}
