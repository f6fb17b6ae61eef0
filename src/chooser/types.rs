//! Selection and chooser configuration types

use crate::schema::{Field, FieldType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One reference to a target piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Target piece id
    pub value: String,

    /// Per-pair data of a many-to-many join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Map<String, Value>>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            relationship: None,
        }
    }
}

/// Direction of a reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the front of the selection
    Raise,
    /// Towards the back of the selection
    Lower,
}

/// An autocomplete match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    /// Target piece id
    pub value: String,
}

/// Chooser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChooserOptions {
    /// The join field being edited
    pub field: Field,
    /// Offer the browse button that opens a picker
    #[serde(default = "default_true")]
    pub browse: bool,
    /// Offer the autocomplete input
    #[serde(default = "default_true")]
    pub autocomplete: bool,
}

const fn default_true() -> bool {
    true
}

impl ChooserOptions {
    pub const fn new(field: Field) -> Self {
        Self {
            field,
            browse: true,
            autocomplete: true,
        }
    }

    /// Maximum selection size
    ///
    /// `joinByOne` holds one reference; other joins take the `limit` hint,
    /// then the field's own limit.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        if self.field.field_type == FieldType::JoinByOne {
            return Some(1);
        }
        self.field.hinted_limit().or(self.field.limit)
    }

    /// A copy with the overrides applied
    #[must_use]
    pub fn merged(&self, overrides: &ChooserOverrides) -> Self {
        let mut options = self.clone();
        if let Some(browse) = overrides.browse {
            options.browse = browse;
        }
        if let Some(autocomplete) = overrides.autocomplete {
            options.autocomplete = autocomplete;
        }
        for (name, value) in &overrides.hints {
            options.field.hints.insert(name.clone(), value.clone());
        }
        options
    }
}

/// Settings replaced when cloning a chooser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChooserOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<bool>,
    /// Merged over the field's hints
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub hints: Map<String, Value>,
}

impl ChooserOverrides {
    /// Overrides for the working copy inside a picker: no nested browsing
    /// and no autocomplete
    #[must_use]
    pub fn picker() -> Self {
        Self {
            browse: Some(false),
            autocomplete: Some(false),
            hints: Map::new(),
        }
    }
}

/// Flags the chooser fragment is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooserArgs {
    pub browse: bool,
    pub autocomplete: bool,
}

/// Fired when a refresh settles on a selection that differs from the last
/// one announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub choices: Vec<Choice>,
    pub full: bool,
}
