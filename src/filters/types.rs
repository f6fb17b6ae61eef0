//! Listing descriptor types
//!
//! This module defines the static configuration a piece type exposes to
//! its manage view:
//! - `FilterDescriptor`: a named filter with a default and optional choices
//! - `ColumnDescriptor`: a column of the manage list view
//! - `SortDescriptor`: a named sort preset

use crate::store::SortSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Items keyed by name for add/remove composition
pub trait Named {
    fn name(&self) -> &str;
}

/// One value a filter can take in the manage view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChoice {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

/// A filter offered by the manage view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub name: String,

    #[serde(default)]
    pub label: String,

    /// Initial value; missing means "any"
    #[serde(default, rename = "def", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Whether the filter is shown when the manager was opened by a chooser
    #[serde(default = "default_true", alias = "allowed_in_chooser")]
    pub allowed_in_chooser: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<FilterChoice>,
}

const fn default_true() -> bool {
    true
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            default: None,
            allowed_in_chooser: true,
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub const fn not_in_chooser(mut self) -> Self {
        self.allowed_in_chooser = false;
        self
    }

    #[must_use]
    pub fn choice(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.choices.push(FilterChoice {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    /// The default in the string form list requests carry
    ///
    /// Strings pass through, a missing or null default is `"any"`, and
    /// anything else collapses to `"1"` when truthy and `"0"` otherwise.
    #[must_use]
    pub fn default_choice(&self) -> String {
        match &self.default {
            None | Some(Value::Null) => "any".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => (if truthy(other) { "1" } else { "0" }).to_string(),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A column of the manage list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// Template fragment used to render cells of this column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            partial: None,
        }
    }
}

/// A named sort preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub sort: SortSpec,
}

impl SortDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, sort: SortSpec) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            sort,
        }
    }
}

impl Named for FilterDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ColumnDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for SortDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_choice_stringifies() {
        assert_eq!(FilterDescriptor::new("color").default_choice(), "any");
        assert_eq!(
            FilterDescriptor::new("color").default_value(json!("red")).default_choice(),
            "red"
        );
        assert_eq!(
            FilterDescriptor::new("published").default_value(json!(true)).default_choice(),
            "1"
        );
        assert_eq!(
            FilterDescriptor::new("trash").default_value(json!(false)).default_choice(),
            "0"
        );
        assert_eq!(
            FilterDescriptor::new("x").default_value(Value::Null).default_choice(),
            "any"
        );
    }

    #[test]
    fn test_filter_descriptor_config_shape() {
        let filter: FilterDescriptor = serde_json::from_value(json!({
            "name": "trash",
            "def": false,
            "allowedInChooser": false
        }))
        .unwrap();
        assert!(!filter.allowed_in_chooser);
        assert_eq!(filter.default, Some(json!(false)));

        let filter: FilterDescriptor = serde_json::from_value(json!({"name": "color"})).unwrap();
        assert!(filter.allowed_in_chooser);
    }
}
