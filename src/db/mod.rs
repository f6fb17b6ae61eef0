//! Database wrapper module for pieces
//!
//! Provides the reference [`PieceStore`] implementation using sled as the
//! embedded database backend.
//!
//! Uses multiple sled trees for efficient indexing:
//! - `pieces`: Main tree mapping piece ids to encoded records
//! - `types`: Reverse index mapping type names to piece ids

use crate::Piece;
use crate::store::{Criteria, PieceStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use heck::ToKebabCase;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, trace};

pub mod error;
pub mod query;
pub mod types;

pub use error::DbError;
pub use types::{PieceKey, PieceRecord};

/// Database wrapper that encapsulates all database operations
///
/// Uses two trees for efficient lookups:
/// - `pieces` tree: `id` -> `PieceRecord`
/// - `types` tree: type name -> Vec<`id`>
pub struct Database {
    db: Db,
    pieces: Tree, // id -> record
    types: Tree,  // type -> ids reverse index
}

impl Database {
    /// Opens or creates a database at the specified path
    ///
    /// # Examples
    /// ```no_run
    /// use pieces::db::Database;
    /// let db = Database::open("my_db").unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the database cannot be opened or if the internal trees cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Opens a database that lives only as long as this value
    ///
    /// # Errors
    ///
    /// Returns `DbError` if sled cannot create the temporary database.
    pub fn open_temporary() -> Result<Self, DbError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, DbError> {
        let pieces = db.open_tree("pieces")?;
        let types = db.open_tree("types")?;
        Ok(Self { db, pieces, types })
    }

    /// Insert a new piece, computing its derived fields
    ///
    /// # Errors
    ///
    /// Returns `DbError::DuplicateId` if the id is taken, or a storage or
    /// encoding error.
    pub fn insert_piece(&self, piece: &Piece) -> Result<Piece, DbError> {
        let mut stored = piece.clone();
        materialize(&mut stored, true);

        let key = PieceKey::new(&stored.id);
        let value = PieceRecord::try_from(&stored)?.to_bytes()?;
        if self
            .pieces
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(value))?
            .is_err()
        {
            return Err(DbError::DuplicateId(stored.id));
        }

        self.add_to_type_index(&stored.type_name, &stored.id)?;
        debug!(id = %stored.id, type_name = %stored.type_name, "inserted piece");
        Ok(stored)
    }

    /// Replace an existing piece, recomputing its derived fields
    ///
    /// The stored creation time and trash flag are kept; trash state only
    /// changes through [`Database::set_trashed`].
    ///
    /// # Errors
    ///
    /// Returns `DbError::PieceNotFound` if no piece has this id.
    pub fn update_piece(&self, piece: &Piece) -> Result<Piece, DbError> {
        let Some((existing, stored)) = self.rewrite(&piece.id, |existing| {
            let mut stored = piece.clone();
            stored.created_at = existing.created_at;
            stored.trashed = existing.trashed;
            materialize(&mut stored, false);
            Some(stored)
        })?
        else {
            return Err(DbError::PieceNotFound(piece.id.clone()));
        };

        if existing.type_name != stored.type_name {
            self.remove_from_type_index(&existing.type_name, &stored.id)?;
            self.add_to_type_index(&stored.type_name, &stored.id)?;
        }
        debug!(id = %stored.id, "updated piece");
        Ok(stored)
    }

    /// Get a piece by id, regardless of its trash state
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or decoding errors occur.
    pub fn get(&self, id: &str) -> Result<Option<Piece>, DbError> {
        match self.pieces.get(PieceKey::new(id))? {
            Some(value) => Ok(Some(Piece::try_from(PieceRecord::from_bytes(&value)?)?)),
            None => Ok(None),
        }
    }

    /// Flip the trash flag of a piece
    ///
    /// Returns `false` if no piece has this id. Setting the flag to its
    /// current value succeeds without rewriting the record.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or encoding errors occur.
    pub fn set_trashed(&self, id: &str, trashed: bool) -> Result<bool, DbError> {
        let outcome = self.rewrite(id, |existing| {
            (existing.trashed != trashed).then(|| {
                let mut piece = existing.clone();
                piece.trashed = trashed;
                piece.updated_at = Some(Utc::now());
                piece
            })
        })?;
        let Some((previous, _)) = outcome else {
            return Ok(false);
        };
        if previous.trashed != trashed {
            debug!(id, trashed, "changed trash state");
        }
        Ok(true)
    }

    /// All pieces of one type, unfiltered and unsorted
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the index or a record cannot be read.
    pub fn list_type(&self, type_name: &str) -> Result<Vec<Piece>, DbError> {
        self.type_ids(type_name)?
            .iter()
            .filter_map(|id| self.get(id).transpose())
            .collect()
    }

    /// All pieces in the database
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database iteration fails or decoding errors occur.
    pub fn list_all(&self) -> Result<Vec<Piece>, DbError> {
        let mut pieces = Vec::new();
        for result in &self.pieces {
            let (_, value) = result?;
            pieces.push(Piece::try_from(PieceRecord::from_bytes(&value)?)?);
        }
        Ok(pieces)
    }

    /// Every type name with at least one piece, sorted
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database iteration fails.
    pub fn list_types(&self) -> Result<Vec<String>, DbError> {
        let mut names = Vec::new();
        for result in &self.types {
            let (key, _) = result?;
            names.push(PieceKey::from_bytes(&key)?.0);
        }
        names.sort();
        Ok(names)
    }

    /// Get the number of pieces in the database
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Remove every piece and index entry
    ///
    /// # Errors
    ///
    /// Returns `DbError` if clearing either tree fails.
    pub fn clear(&self) -> Result<(), DbError> {
        self.pieces.clear()?;
        self.types.clear()?;
        Ok(())
    }

    /// Flush all pending writes to disk
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the flush operation fails.
    pub fn flush(&self) -> Result<(), DbError> {
        self.db.flush()?;
        Ok(())
    }

    fn candidates(&self, criteria: &Criteria) -> Result<Vec<Piece>, DbError> {
        if let Some(id) = &criteria.id {
            return Ok(self.get(id)?.into_iter().collect());
        }
        match &criteria.type_name {
            Some(type_name) => self.list_type(type_name),
            None => self.list_all(),
        }
    }

    /// Rewrite one stored piece with compare-and-swap
    ///
    /// `change` sees the current record and returns the piece to store, or
    /// `None` to leave it as is. When another writer lands first the record
    /// is re-read and `change` runs again. Returns `None` if no piece has
    /// this id, otherwise the record seen and the record now stored.
    fn rewrite<F>(&self, id: &str, mut change: F) -> Result<Option<(Piece, Piece)>, DbError>
    where
        F: FnMut(&Piece) -> Option<Piece>,
    {
        let key = PieceKey::new(id);
        loop {
            let Some(current) = self.pieces.get(&key)? else {
                return Ok(None);
            };
            let existing = Piece::try_from(PieceRecord::from_bytes(&current)?)?;
            let Some(next) = change(&existing) else {
                return Ok(Some((existing.clone(), existing)));
            };
            let value = PieceRecord::try_from(&next)?.to_bytes()?;
            if self.pieces.compare_and_swap(&key, Some(current), Some(value))?.is_ok() {
                return Ok(Some((existing, next)));
            }
            trace!(id, "record changed underneath, retrying");
        }
    }

    fn type_ids(&self, type_name: &str) -> Result<Vec<String>, DbError> {
        match self.types.get(type_name.as_bytes())? {
            Some(value) => decode_ids(&value),
            None => Ok(Vec::new()),
        }
    }

    fn add_to_type_index(&self, type_name: &str, id: &str) -> Result<(), DbError> {
        self.edit_type_index(type_name, |ids| {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        })
    }

    fn remove_from_type_index(&self, type_name: &str, id: &str) -> Result<(), DbError> {
        self.edit_type_index(type_name, |ids| ids.retain(|existing| existing != id))
    }

    /// Apply `edit` to a type's id list as one atomic sled update
    ///
    /// An empty list removes the index entry.
    fn edit_type_index<F>(&self, type_name: &str, mut edit: F) -> Result<(), DbError>
    where
        F: FnMut(&mut Vec<String>),
    {
        let mut failure = None;
        self.types.update_and_fetch(type_name.as_bytes(), |current| {
            failure = None;
            let mut ids = match current.map(decode_ids).transpose() {
                Ok(ids) => ids.unwrap_or_default(),
                Err(err) => {
                    failure = Some(err);
                    return current.map(<[u8]>::to_vec);
                }
            };
            edit(&mut ids);
            if ids.is_empty() {
                return None;
            }
            match bincode::encode_to_vec(&ids, bincode::config::standard()) {
                Ok(value) => Some(value),
                Err(err) => {
                    failure = Some(err.into());
                    current.map(<[u8]>::to_vec)
                }
            }
        })?;
        failure.map_or(Ok(()), Err)
    }
}

fn decode_ids(bytes: &[u8]) -> Result<Vec<String>, DbError> {
    let (ids, _): (Vec<String>, usize) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(ids)
}

/// Compute the fields the store owns: slug and timestamps
fn materialize(piece: &mut Piece, created: bool) {
    let now = Utc::now();
    let slug = piece.title.to_kebab_case();
    piece.slug = (!slug.is_empty()).then_some(slug);
    if created || piece.created_at.is_none() {
        piece.created_at = Some(now);
    }
    piece.updated_at = Some(now);
}

#[async_trait]
impl PieceStore for Database {
    async fn find_one(&self, criteria: &Criteria) -> Result<Option<Piece>, StoreError> {
        let selected = query::select(self.candidates(criteria)?, criteria)?;
        Ok(selected.into_iter().next())
    }

    async fn find_page(&self, criteria: &Criteria) -> Result<Vec<Piece>, StoreError> {
        let selected = query::select(self.candidates(criteria)?, criteria)?;
        Ok(query::paginate(selected, criteria))
    }

    async fn count(&self, criteria: &Criteria) -> Result<usize, StoreError> {
        Ok(query::select(self.candidates(criteria)?, criteria)?.len())
    }

    async fn insert(&self, piece: &Piece) -> Result<(), StoreError> {
        self.insert_piece(piece)?;
        Ok(())
    }

    async fn update(&self, piece: &Piece) -> Result<(), StoreError> {
        self.update_piece(piece)?;
        Ok(())
    }

    async fn trash(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.set_trashed(id, true)?)
    }

    async fn rescue(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.set_trashed(id, false)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Tristate;
    use crate::testing::TestDb;
    use serde_json::json;

    fn article(title: &str) -> Piece {
        let mut piece = Piece::new("article");
        piece.title = title.into();
        piece
    }

    #[test]
    fn test_insert_materializes_derived_fields() {
        let db = TestDb::new();
        let stored = db.db().insert_piece(&article("Hello World")).unwrap();

        assert_eq!(stored.slug.as_deref(), Some("hello-world"));
        assert!(stored.created_at.is_some());
        assert!(stored.updated_at.is_some());
        assert_eq!(db.db().get(&stored.id).unwrap(), Some(stored));
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let db = TestDb::new();
        let piece = article("One");
        db.db().insert_piece(&piece).unwrap();

        let result = db.db().insert_piece(&piece);
        assert!(matches!(result, Err(DbError::DuplicateId(_))));
    }

    #[test]
    fn test_update_missing_piece() {
        let db = TestDb::new();
        let result = db.db().update_piece(&article("Ghost"));
        assert!(matches!(result, Err(DbError::PieceNotFound(_))));
    }

    #[test]
    fn test_update_keeps_trash_state_and_creation_time() {
        let db = TestDb::new();
        let stored = db.db().insert_piece(&article("One")).unwrap();
        db.db().set_trashed(&stored.id, true).unwrap();

        let mut edited = stored.clone();
        edited.title = "One Edited".into();
        edited.trashed = false;
        let updated = db.db().update_piece(&edited).unwrap();

        assert!(updated.trashed);
        assert_eq!(updated.created_at, stored.created_at);
        assert_eq!(updated.slug.as_deref(), Some("one-edited"));
    }

    #[test]
    fn test_set_trashed_reports_missing() {
        let db = TestDb::new();
        assert!(!db.db().set_trashed("nope", true).unwrap());
    }

    #[test]
    fn test_type_index() {
        let db = TestDb::new();
        db.db().insert_piece(&article("A")).unwrap();
        db.db().insert_piece(&article("B")).unwrap();
        db.db().insert_piece(&Piece::new("event")).unwrap();

        assert_eq!(db.db().list_type("article").unwrap().len(), 2);
        assert_eq!(db.db().list_types().unwrap(), vec!["article".to_string(), "event".to_string()]);
        assert_eq!(db.db().len(), 3);
    }

    #[test]
    fn test_concurrent_inserts_keep_every_index_entry() {
        let db = TestDb::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        db.db().insert_piece(&Piece::new("article")).unwrap();
                    }
                });
            }
        });

        assert_eq!(db.db().len(), 800);
        assert_eq!(db.db().list_type("article").unwrap().len(), 800);
    }

    #[test]
    fn test_stale_update_never_undoes_concurrent_trash() {
        let db = TestDb::new();
        let stored: Vec<Piece> = (0..100)
            .map(|i| db.db().insert_piece(&article(&format!("Piece {i}"))).unwrap())
            .collect();

        for piece in &stored {
            let mut stale = piece.clone();
            stale.title = format!("{} edited", piece.title);
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    for _ in 0..20 {
                        db.db().update_piece(&stale).unwrap();
                    }
                });
                scope.spawn(|| assert!(db.db().set_trashed(&piece.id, true).unwrap()));
            });

            let current = db.db().get(&piece.id).unwrap().unwrap();
            assert!(current.trashed, "trash of {} was rolled back", piece.id);
            assert_eq!(current.created_at, piece.created_at);
        }
    }

    #[test]
    fn test_type_change_moves_index_entry() {
        let db = TestDb::new();
        let stored = db.db().insert_piece(&article("Moving")).unwrap();

        let mut moved = stored.clone();
        moved.type_name = "event".into();
        db.db().update_piece(&moved).unwrap();

        assert!(db.db().list_type("article").unwrap().is_empty());
        assert_eq!(db.db().list_type("event").unwrap().len(), 1);
        assert_eq!(db.db().list_types().unwrap(), vec!["event".to_string()]);
    }

    #[tokio::test]
    async fn test_store_count_and_page_share_criteria() {
        let db = TestDb::new();
        for i in 0..5 {
            let mut piece = article(&format!("Piece {i}"));
            piece.set_field("rank", json!(i));
            piece.published = i % 2 == 0;
            db.db().insert_piece(&piece).unwrap();
        }

        let criteria = Criteria::for_type("article")
            .published(Tristate::Yes)
            .per_page(2);
        let (count, page) = tokio::try_join!(db.db().count(&criteria), db.db().find_page(&criteria)).unwrap();

        assert_eq!(count, 3);
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|p| p.published));
    }

    #[tokio::test]
    async fn test_find_one_ignores_trashed_by_default() {
        let db = TestDb::new();
        let stored = db.db().insert_piece(&article("Gone")).unwrap();
        db.db().trash(&stored.id).await.unwrap();

        let criteria = Criteria::for_type("article").with_id(&stored.id);
        assert!(db.db().find_one(&criteria).await.unwrap().is_none());
        let any = criteria.trash(Tristate::Any);
        assert!(db.db().find_one(&any).await.unwrap().is_some());
    }
}
