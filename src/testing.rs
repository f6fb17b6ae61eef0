//! Testing utilities for pieces
//!
//! This module provides helper types and functions for writing tests:
//! a `TestDb` wrapper over a temporary sled database, a chooser renderer
//! that records renders and can hold them in flight, and fixtures.
//!
//! Only available when compiled with `cfg(test)`.

use crate::Piece;
use crate::chooser::{AutocompleteSource, ChooserArgs, ChooserRenderer, Choice, Result as ChooserResult, Suggestion};
use crate::db::Database;
use crate::render::RenderError;
use crate::schema::{Field, FieldType};
use crate::store::PieceStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::watch;

/// Wrapper for a temporary test database that cleans up on drop
///
/// The database lives in its own temporary directory, so parallel tests
/// never collide.
pub struct TestDb {
    db: Arc<Database>,
    _dir: TempDir,
}

impl TestDb {
    /// # Panics
    /// Panics if the temporary directory or database cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let db = Database::open(dir.path().join("db")).expect("Failed to open test database");
        Self {
            db: Arc::new(db),
            _dir: dir,
        }
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The database as a shared store
    #[must_use]
    pub fn store(&self) -> Arc<dyn PieceStore> {
        self.db.clone()
    }

    /// Insert `count` articles titled "Article N"
    ///
    /// # Panics
    /// Panics if an insert fails.
    pub async fn seed_articles(&self, count: usize, published: bool) -> Vec<Piece> {
        let mut seeded = Vec::with_capacity(count);
        for i in 0..count {
            let mut piece = Piece::new("article");
            piece.title = format!("Article {i}");
            piece.published = published;
            self.db.insert(&piece).await.expect("Failed to seed article");
            seeded.push(piece);
        }
        seeded
    }
}

/// An unbounded or limited `joinByArray` field targeting articles
#[must_use]
pub fn related_field(limit: Option<usize>) -> Field {
    let field = Field::join("_related", FieldType::JoinByArray, "article");
    match limit {
        Some(limit) => field.limit(limit),
        None => field,
    }
}

/// Chooser renderer that records every selection it renders
///
/// `hold` keeps renders waiting until `release`, which lets a test pile up
/// mutations while a refresh is in flight.
pub struct RecordingChooserRenderer {
    shells: AtomicUsize,
    renders: Mutex<Vec<Vec<String>>>,
    gate: watch::Sender<bool>,
    fail: AtomicBool,
}

impl RecordingChooserRenderer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (gate, _) = watch::channel(true);
        Arc::new(Self {
            shells: AtomicUsize::new(0),
            renders: Mutex::new(Vec::new()),
            gate,
            fail: AtomicBool::new(false),
        })
    }

    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail_renders(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn shell_count(&self) -> usize {
        self.shells.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    #[must_use]
    pub fn last_render(&self) -> Option<Vec<String>> {
        self.renders.lock().last().cloned()
    }
}

#[async_trait]
impl ChooserRenderer for RecordingChooserRenderer {
    async fn render_chooser(&self, args: ChooserArgs, field: &Field) -> Result<String, RenderError> {
        self.shells.fetch_add(1, Ordering::SeqCst);
        Ok(format!("chooser:{}:{}:{}", field.name, args.browse, args.autocomplete))
    }

    async fn render_choices(&self, choices: &[Choice], field: &Field) -> Result<String, RenderError> {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let values: Vec<String> = choices.iter().map(|choice| choice.value.clone()).collect();
        self.renders.lock().push(values.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Failed {
                template: "chooserChoices".into(),
                reason: "render refused by test".into(),
            });
        }
        Ok(format!("{}:{}", field.name, values.join(",")))
    }
}

/// Autocomplete source over a fixed `(id, label)` list, matching labels
/// case-insensitively
pub struct StaticSuggestions {
    entries: Vec<Suggestion>,
}

impl StaticSuggestions {
    #[must_use]
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(value, label)| Suggestion {
                    label: (*label).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AutocompleteSource for StaticSuggestions {
    async fn suggest(&self, term: &str, _field: &Field) -> ChooserResult<Vec<Suggestion>> {
        let term = term.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.label.to_lowercase().contains(&term))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_seeds_articles() {
        let test_db = TestDb::new();
        let seeded = test_db.seed_articles(3, true).await;

        assert_eq!(seeded.len(), 3);
        assert_eq!(test_db.db().len(), 3);
        assert!(test_db.db().get(&seeded[0].id).unwrap().unwrap().published);
    }

    #[test]
    fn test_dbs_are_isolated() {
        let first = TestDb::new();
        let second = TestDb::new();
        first.db().insert_piece(&Piece::new("article")).unwrap();

        assert_eq!(first.db().len(), 1);
        assert!(second.db().is_empty());
    }
}
