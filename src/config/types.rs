//! Per-type configuration
//!
//! A `[types.<name>]` table refines the base descriptors and schema of one
//! piece type. Full lists (`filters`, `columns`, `sorts`) replace the base
//! set; `add_*`/`remove_*` lists are then composed over it.

use crate::filters::{ColumnDescriptor, Descriptors, FilterDescriptor, SortDescriptor, compose};
use crate::list::TypeOptions;
use crate::schema::{Field, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceTypeConfig {
    pub label: Option<String>,
    pub plural_label: Option<String>,
    pub per_page: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manage_views: Vec<String>,

    pub filters: Option<Vec<FilterDescriptor>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_filters: Vec<FilterDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_filters: Vec<String>,

    pub columns: Option<Vec<ColumnDescriptor>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_columns: Vec<ColumnDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_columns: Vec<String>,

    pub sorts: Option<Vec<SortDescriptor>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_fields: Vec<String>,
}

impl PieceTypeConfig {
    /// Presentation options, falling back to names derived from `name`
    #[must_use]
    pub fn options(&self, name: &str, default_per_page: usize) -> TypeOptions {
        let mut options = TypeOptions::new(name);
        if let Some(label) = &self.label {
            options.label.clone_from(label);
            options.plural_label = format!("{label}s");
        }
        if let Some(plural) = &self.plural_label {
            options.plural_label.clone_from(plural);
        }
        if !self.manage_views.is_empty() {
            options.manage_views.clone_from(&self.manage_views);
        }
        options.per_page = self.per_page.unwrap_or(default_per_page);
        options
    }

    /// Composed filter, column and sort descriptors
    #[must_use]
    pub fn descriptors(&self) -> Descriptors {
        let base = Descriptors::base();
        Descriptors {
            filters: compose(
                self.filters.as_deref().unwrap_or(&base.filters),
                &self.add_filters,
                &self.remove_filters,
            ),
            columns: compose(
                self.columns.as_deref().unwrap_or(&base.columns),
                &self.add_columns,
                &self.remove_columns,
            ),
            sorts: self.sorts.clone().unwrap_or(base.sorts),
        }
    }

    /// The base document schema refined by this type's fields
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::base().refine(&self.add_fields, &self.remove_fields)
    }
}
