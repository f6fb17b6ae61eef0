use crate::render::RenderError;
use crate::schema::SchemaError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of a lifecycle operation
#[derive(Debug, Error)]
pub enum PieceError {
    /// The requester may not perform the operation
    #[error("Permission denied")]
    Forbidden,

    /// The target piece is missing or not visible
    #[error("Piece not found")]
    NotFound,

    /// Input was rejected by the schema
    #[error("Validation failed: {0}")]
    Validation(#[from] SchemaError),

    /// The piece disappeared between the write and the re-fetch
    #[error("Piece '{0}' vanished before it could be re-fetched")]
    Vanished(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// An extension hook failed with its own message
    #[error("Hook failed: {0}")]
    Hook(String),
}

impl PieceError {
    /// The client-facing kind of this failure
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Forbidden => Status::Forbidden,
            Self::NotFound => Status::NotFound,
            Self::Validation(_) => Status::Validation,
            Self::Vanished(_) => Status::Vanished,
            Self::Store(_) | Self::Render(_) | Self::Hook(_) => Status::Error,
        }
    }
}

/// Response status strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Forbidden,
    NotFound,
    Validation,
    Vanished,
    Error,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Forbidden => "forbidden",
            Self::NotFound => "notfound",
            Self::Validation => "validation",
            Self::Vanished => "vanished",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
