//! Record types for database keys and values
//!
//! Pieces carry arbitrary schema-defined fields, which bincode cannot
//! describe on its own. A [`PieceRecord`] keeps the built-in attributes as
//! native bincode fields and the schema fields as a JSON string.
//!
//! # Types
//!
//! - **`PieceKey`**: Wrapper for a piece id used as a `pieces` tree key
//! - **`PieceRecord`**: The encoded value stored under that key

use super::error::DbError;
use crate::Piece;
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Wrapper for a piece id that can be converted to a database key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceKey(pub String);

impl PieceKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// # Errors
    ///
    /// Returns `DbError` if the key bytes are not valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DbError> {
        String::from_utf8(bytes.to_vec())
            .map(Self)
            .map_err(|_| DbError::SerializeError("Invalid UTF-8 in piece key".into()))
    }
}

impl AsRef<[u8]> for PieceKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Stored form of a [`Piece`]
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct PieceRecord {
    pub id: String,
    pub type_name: String,
    pub title: String,
    pub slug: Option<String>,
    pub published: bool,
    pub trashed: bool,
    /// Milliseconds since the Unix epoch
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    /// Schema fields as a JSON object
    pub fields: String,
}

impl PieceRecord {
    /// # Errors
    ///
    /// Returns `DbError` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DbError> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the bytes are not a valid record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DbError> {
        let (record, _): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(record)
    }
}

impl TryFrom<&Piece> for PieceRecord {
    type Error = DbError;

    fn try_from(piece: &Piece) -> Result<Self, Self::Error> {
        Ok(Self {
            id: piece.id.clone(),
            type_name: piece.type_name.clone(),
            title: piece.title.clone(),
            slug: piece.slug.clone(),
            published: piece.published,
            trashed: piece.trashed,
            created_at: piece.created_at.map(|t| t.timestamp_millis()),
            updated_at: piece.updated_at.map(|t| t.timestamp_millis()),
            fields: serde_json::to_string(&piece.fields)?,
        })
    }
}

impl TryFrom<PieceRecord> for Piece {
    type Error = DbError;

    fn try_from(record: PieceRecord) -> Result<Self, Self::Error> {
        let fields: Map<String, Value> = serde_json::from_str(&record.fields)?;
        Ok(Self {
            id: record.id,
            type_name: record.type_name,
            title: record.title,
            slug: record.slug,
            published: record.published,
            trashed: record.trashed,
            created_at: record.created_at.and_then(DateTime::<Utc>::from_timestamp_millis),
            updated_at: record.updated_at.and_then(DateTime::<Utc>::from_timestamp_millis),
            fields,
        })
    }
}
