//! Pieces - typed content documents with a hook-driven lifecycle
//!
//! This library manages "pieces" (documents of a declared type) through
//! creation, editing, listing, trashing and rescuing, and provides the
//! client-side chooser used to relate one piece to a bounded, ordered set
//! of others.
//!
//! The server side is the [`pipeline`] (fail-fast extension hooks around
//! each operation) and the [`list`] orchestrator, exposed per type through
//! [`api::PieceModule`]. The client side is the [`chooser::Chooser`] and the
//! bulk-picker [`manager::Manager`] that reconciles into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod api;
pub mod chooser;
pub mod cli;
pub mod config;
pub mod db;
pub mod filters;
pub mod list;
pub mod manager;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod store;

#[cfg(test)]
pub mod testing;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum PiecesError {
    /// Database error
    #[error("Database error: {0}")]
    DbError(#[from] db::DbError),
    /// Lifecycle operation error
    #[error("Operation failed: {0}")]
    PieceError(#[from] pipeline::PieceError),
    /// Chooser error
    #[error("Chooser error: {0}")]
    ChooserError(#[from] chooser::ChooserError),
    /// Manager error
    #[error("Manager error: {0}")]
    ManagerError(#[from] manager::ManagerError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// JSON encoding error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// A route answered with a failure status
    #[error("Request failed with status '{0}'")]
    RequestFailed(pipeline::Status),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A typed content document
///
/// Built-in attributes are explicit; everything the type's schema declares
/// lives in `fields` and is flattened into the JSON representation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    /// Opaque identifier, immutable once assigned
    #[serde(rename = "_id")]
    pub id: String,
    /// Type tag naming the module that owns this piece
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub title: String,
    /// Derived from the title by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, rename = "trash")]
    pub trashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Schema-defined fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Piece {
    /// Create a fresh, unpublished piece of the given type with a new id
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            type_name: type_name.into(),
            title: String::new(),
            slug: None,
            published: false,
            trashed: false,
            created_at: None,
            updated_at: None,
            fields: Map::new(),
        }
    }

    /// Look up a field by its JSON name, built-in attributes included
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "_id" => Some(Value::String(self.id.clone())),
            "type" => Some(Value::String(self.type_name.clone())),
            "title" => Some(Value::String(self.title.clone())),
            "slug" => self.slug.clone().map(Value::String),
            "published" => Some(Value::Bool(self.published)),
            "trash" => Some(Value::Bool(self.trashed)),
            "createdAt" => self.created_at.map(|t| Value::String(t.to_rfc3339())),
            "updatedAt" => self.updated_at.map(|t| Value::String(t.to_rfc3339())),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// Set a schema-defined field
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}
