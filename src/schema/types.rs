//! Field and schema declarations
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Types refine the base
//! document schema with added and removed fields at setup time; after that
//! the schema is read-only.

use crate::filters::{Named, compose};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Select,
    Tags,
    /// Reference to exactly one piece of `with_type`
    JoinByOne,
    /// Ordered references to pieces of `with_type`
    JoinByArray,
}

impl FieldType {
    #[must_use]
    pub const fn is_join(self) -> bool {
        matches!(self, Self::JoinByOne | Self::JoinByArray)
    }
}

/// One value a select field accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectChoice {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

/// A schema field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Accepted values of a select field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<SelectChoice>,

    /// Target type of a join
    #[serde(default, alias = "with_type", skip_serializing_if = "Option::is_none")]
    pub with_type: Option<String>,

    /// Maximum number of references a join may hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Extra list parameters a chooser sends when browsing for this join
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub hints: Map<String, Value>,

    /// Permission a user needs to see and edit the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,

    /// Per-pair fields of a many-to-many join
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationship: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            required: false,
            choices: Vec::new(),
            with_type: None,
            limit: None,
            hints: Map::new(),
            permission: None,
            relationship: Vec::new(),
        }
    }

    /// A join field targeting pieces of `with_type`
    pub fn join(name: impl Into<String>, field_type: FieldType, with_type: impl Into<String>) -> Self {
        let mut field = Self::new(name, field_type);
        field.with_type = Some(with_type.into());
        field
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn hint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.hints.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    #[must_use]
    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = values
            .into_iter()
            .map(|value| {
                let value = value.into();
                SelectChoice { label: value.clone(), value }
            })
            .collect();
        self
    }

    #[must_use]
    pub fn relationship(mut self, fields: Vec<Self>) -> Self {
        self.relationship = fields;
        self
    }

    /// The `limit` entry of the hints, if it is a non-negative integer
    #[must_use]
    pub fn hinted_limit(&self) -> Option<usize> {
        self.hints
            .get("limit")
            .and_then(Value::as_u64)
            .and_then(|limit| usize::try_from(limit).ok())
    }
}

impl Named for Field {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered field declarations for one piece type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    #[must_use]
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Fields every piece type starts from
    #[must_use]
    pub fn base() -> Self {
        Self::new(vec![
            Field::new("title", FieldType::String).label("Title"),
            Field::new("published", FieldType::Boolean).label("Published"),
        ])
    }

    /// Refine this schema: added fields replace same-named ones, then
    /// removed names are dropped
    #[must_use]
    pub fn refine(&self, add: &[Field], remove: &[String]) -> Self {
        Self::new(compose(&self.fields, add, remove))
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The subset of fields whose permission, if any, `can` grants
    #[must_use]
    pub fn allowed(&self, can: impl Fn(&str) -> bool) -> Self {
        Self::new(
            self.fields
                .iter()
                .filter(|field| field.permission.as_deref().is_none_or(&can))
                .cloned()
                .collect(),
        )
    }
}
