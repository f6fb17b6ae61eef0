//! Name-keyed descriptor composition
//!
//! Filters, columns and schema fields are all refined the same way at
//! setup: start from a base list, apply additions (last write wins on a
//! name collision, the winner moves to the end), then apply removals.

use super::types::{ColumnDescriptor, FilterDescriptor, Named, SortDescriptor};
use crate::store::SortSpec;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Compose `base` with `add` and `remove`
#[must_use]
pub fn compose<T: Named + Clone>(base: &[T], add: &[T], remove: &[String]) -> Vec<T> {
    let mut composed = base.to_vec();
    for item in add {
        composed.retain(|existing| existing.name() != item.name());
        composed.push(item.clone());
    }
    composed.retain(|item| !remove.iter().any(|name| name == item.name()));
    composed
}

/// The composed listing configuration of one piece type
///
/// Built once when the type's module is constructed and read-only after.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Descriptors {
    pub filters: Vec<FilterDescriptor>,
    pub columns: Vec<ColumnDescriptor>,
    pub sorts: Vec<SortDescriptor>,
}

impl Descriptors {
    /// Descriptors every type starts from
    #[must_use]
    pub fn base() -> Self {
        Self {
            filters: vec![
                FilterDescriptor::new("published")
                    .label("Published")
                    .default_value(json!(true))
                    .choice("1", "Published")
                    .choice("0", "Draft")
                    .choice("any", "Both"),
                FilterDescriptor::new("trash")
                    .label("Trash")
                    .default_value(json!(false))
                    .not_in_chooser()
                    .choice("0", "Live")
                    .choice("1", "Trash"),
            ],
            columns: vec![
                ColumnDescriptor::new("title", "Title"),
                ColumnDescriptor::new("updatedAt", "Last Updated"),
                ColumnDescriptor::new("published", "Published"),
            ],
            sorts: vec![
                SortDescriptor::new("updatedAt", "Last Updated", SortSpec::default_order()),
                SortDescriptor::new("title", "Title", SortSpec::ascending("title")),
            ],
        }
    }

    /// Filters to offer, honouring `allowed_in_chooser` in chooser context
    pub fn visible_filters(&self, chooser: bool) -> impl Iterator<Item = &FilterDescriptor> {
        self.filters
            .iter()
            .filter(move |filter| !chooser || filter.allowed_in_chooser)
    }

    /// Name of the first sort preset structurally equal to `active`
    #[must_use]
    pub fn active_sort(&self, active: &SortSpec) -> Option<&str> {
        self.sorts
            .iter()
            .find(|preset| preset.sort.structurally_eq(active))
            .map(|preset| preset.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortDirection;

    fn names<T: Named>(items: &[T]) -> Vec<&str> {
        items.iter().map(Named::name).collect()
    }

    #[test]
    fn test_compose_last_write_wins_and_moves_to_end() {
        let base = vec![
            ColumnDescriptor::new("title", "Title"),
            ColumnDescriptor::new("updatedAt", "Updated"),
        ];
        let add = vec![
            ColumnDescriptor::new("title", "Headline"),
            ColumnDescriptor::new("color", "Color"),
            ColumnDescriptor::new("color", "Colour"),
        ];
        let composed = compose(&base, &add, &[]);

        assert_eq!(names(&composed), vec!["updatedAt", "title", "color"]);
        assert_eq!(composed[1].label, "Headline");
        assert_eq!(composed[2].label, "Colour");
    }

    #[test]
    fn test_compose_removes_after_adding() {
        let base = vec![ColumnDescriptor::new("title", "Title")];
        let add = vec![ColumnDescriptor::new("color", "Color")];
        let composed = compose(&base, &add, &["color".to_string(), "missing".to_string()]);
        assert_eq!(names(&composed), vec!["title"]);
    }

    #[test]
    fn test_visible_filters_in_chooser() {
        let descriptors = Descriptors::base();
        let all: Vec<_> = descriptors.visible_filters(false).map(|f| f.name.as_str()).collect();
        let chooser: Vec<_> = descriptors.visible_filters(true).map(|f| f.name.as_str()).collect();
        assert_eq!(all, vec!["published", "trash"]);
        assert_eq!(chooser, vec!["published"]);
    }

    #[test]
    fn test_active_sort_first_structural_match() {
        let mut descriptors = Descriptors::base();
        descriptors.sorts.push(SortDescriptor::new(
            "titleAgain",
            "Title",
            SortSpec::ascending("title"),
        ));
        descriptors.sorts.push(SortDescriptor::new(
            "mixed",
            "Mixed",
            SortSpec::ascending("title").then("updatedAt", SortDirection::Descending),
        ));

        assert_eq!(descriptors.active_sort(&SortSpec::ascending("title")), Some("title"));
        let reordered = SortSpec::descending("updatedAt").then("title", SortDirection::Ascending);
        assert_eq!(descriptors.active_sort(&reordered), Some("mixed"));
        assert_eq!(descriptors.active_sort(&SortSpec::descending("title")), None);
    }
}
