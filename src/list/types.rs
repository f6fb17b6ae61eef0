//! Listing request and result shapes

use crate::Piece;
use crate::store::{Criteria, PageInfo, SortSpec};
use heck::ToTitleCase;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Presentation options of one piece type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeOptions {
    pub name: String,
    pub label: String,
    pub plural_label: String,
    /// Views the manage modal can switch between; the first is the default
    pub manage_views: Vec<String>,
    pub per_page: usize,
}

impl TypeOptions {
    /// Options derived from the type name alone
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = name.to_title_case();
        Self {
            plural_label: format!("{label}s"),
            label,
            name,
            manage_views: vec!["list".to_string()],
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// The requested view if this type offers it, otherwise the default
    #[must_use]
    pub fn resolve_view<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|view| self.manage_views.iter().any(|v| v == view))
            .or_else(|| self.manage_views.first().map(String::as_str))
            .unwrap_or("list")
    }
}

/// Page size used when a type does not configure one
pub const DEFAULT_PER_PAGE: usize = 10;

/// Requested response format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListFormat {
    /// Pieces plus paging metadata
    #[default]
    Raw,
    /// Rendered filters, view and pager fragments
    ManagePage,
}

/// A listing request body
///
/// Reserved keys are parsed into fields; every other key is a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default, deserialize_with = "lenient_page", skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Set when a chooser-hosted manager is asking
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub chooser: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_view: Option<String>,

    #[serde(default)]
    pub format: ListFormat,

    /// Published state override, `"1"`, `"0"` or `"any"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<Value>,

    /// Trash state override, `"1"`, `"0"` or `"any"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash: Option<Value>,

    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl ListRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name.into(), value);
        self
    }

    #[must_use]
    pub const fn manage_page(mut self) -> Self {
        self.format = ListFormat::ManagePage;
        self
    }

    /// Set any key, routing reserved names to their fields
    pub fn set(&mut self, name: String, value: Value) {
        match name.as_str() {
            "published" => self.published = Some(value),
            "trash" => self.trash = Some(value),
            "search" => self.search = value.as_str().map(str::to_string),
            "chooser" => self.chooser = value.as_bool().unwrap_or(false),
            "page" => self.page = page_from_value(&value),
            "manageView" => self.manage_view = value.as_str().map(str::to_string),
            _ => {
                self.filters.insert(name, value);
            }
        }
    }

    /// Every choice the request makes, as the manage view echoes them
    #[must_use]
    pub fn choices(&self) -> Map<String, Value> {
        let mut choices = self.filters.clone();
        if let Some(published) = &self.published {
            choices.insert("published".into(), published.clone());
        }
        if let Some(trash) = &self.trash {
            choices.insert("trash".into(), trash.clone());
        }
        if let Some(page) = self.page {
            choices.insert("page".into(), Value::from(page));
        }
        choices
    }
}

fn page_from_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(page_from_value))
}

/// Result envelope of a raw listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResults {
    pub pieces: Vec<Piece>,

    #[serde(flatten)]
    pub page_info: PageInfo,

    /// The snapshot the page and count were computed from
    #[serde(skip)]
    pub criteria: Criteria,
}

/// Rendered manage view, returned for `format: "managePage"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagePage {
    pub filters: String,
    pub view: String,
    pub pager: String,

    /// Ids of the pieces on the rendered page, in display order
    pub pieces: Vec<String>,

    #[serde(flatten)]
    pub page_info: PageInfo,

    /// Name of the active sort preset, if one matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_splits_reserved_keys_from_filters() {
        let request: ListRequest = serde_json::from_value(json!({
            "page": "2",
            "chooser": true,
            "format": "managePage",
            "published": "1",
            "search": "rust",
            "sort": {"title": 1},
            "color": "red",
            "limit": 3
        }))
        .unwrap();

        assert_eq!(request.page, Some(2));
        assert!(request.chooser);
        assert_eq!(request.format, ListFormat::ManagePage);
        assert_eq!(request.published, Some(json!("1")));
        assert_eq!(request.search.as_deref(), Some("rust"));
        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters["color"], json!("red"));
    }

    #[test]
    fn test_resolve_view_falls_back_to_first() {
        let mut options = TypeOptions::new("blog-post");
        options.manage_views = vec!["list".into(), "grid".into()];
        assert_eq!(options.label, "Blog Post");
        assert_eq!(options.resolve_view(Some("grid")), "grid");
        assert_eq!(options.resolve_view(Some("calendar")), "list");
        assert_eq!(options.resolve_view(None), "list");
    }

    #[test]
    fn test_set_routes_reserved_names() {
        let mut request = ListRequest::new();
        request.set("trash".into(), json!("any"));
        request.set("page".into(), json!(3));
        request.set("color".into(), json!("blue"));

        assert_eq!(request.trash, Some(json!("any")));
        assert_eq!(request.page, Some(3));
        assert_eq!(request.choices()["color"], json!("blue"));
        assert_eq!(request.choices()["page"], json!(3));
    }
}
