//! Storage collaborator contract
//!
//! The lifecycle pipeline and the list orchestrator never touch a storage
//! engine directly. They describe what they want with an immutable
//! [`Criteria`] snapshot and hand it to a [`PieceStore`]. The sled-backed
//! [`crate::db::Database`] is the implementation shipped with the crate.

pub mod criteria;

pub use criteria::{Criteria, PageInfo, SortDirection, SortKey, SortSpec, Tristate};

use crate::Piece;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend itself failed
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// An insert collided with an existing identifier
    #[error("Piece '{0}' already exists")]
    Duplicate(String),

    /// A write targeted a piece that does not exist
    #[error("Piece '{0}' does not exist")]
    Missing(String),
}

impl From<crate::db::DbError> for StoreError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::DuplicateId(id) => Self::Duplicate(id),
            crate::db::DbError::PieceNotFound(id) => Self::Missing(id),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Query and persistence operations the core consumes
///
/// Reads take a [`Criteria`] snapshot. `count` ignores paging while
/// `find_page` applies it, so both can be issued concurrently against the
/// same snapshot.
#[async_trait]
pub trait PieceStore: Send + Sync {
    /// First piece matching the criteria, ignoring paging
    async fn find_one(&self, criteria: &Criteria) -> Result<Option<Piece>, StoreError>;

    /// The page of pieces selected by the criteria, sorted
    async fn find_page(&self, criteria: &Criteria) -> Result<Vec<Piece>, StoreError>;

    /// Number of pieces matching the criteria, ignoring paging
    async fn count(&self, criteria: &Criteria) -> Result<usize, StoreError>;

    /// Persist a new piece; derived fields are computed by the store
    async fn insert(&self, piece: &Piece) -> Result<(), StoreError>;

    /// Replace an existing piece; derived fields are recomputed
    async fn update(&self, piece: &Piece) -> Result<(), StoreError>;

    /// Set the trash flag. Returns `false` if no piece has this id.
    async fn trash(&self, id: &str) -> Result<bool, StoreError>;

    /// Clear the trash flag. Returns `false` if no piece has this id.
    async fn rescue(&self, id: &str) -> Result<bool, StoreError>;
}
