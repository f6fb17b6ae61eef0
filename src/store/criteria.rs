//! Query criteria, sort specifications and paging metadata
//!
//! A [`Criteria`] is built once per request and only read afterwards, so a
//! count and a page fetch derived from the same value always agree on the
//! filter state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Three-way flag filter (`published`, `trash`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    /// Unconstrained
    #[default]
    Any,
    /// Flag must be set
    Yes,
    /// Flag must be clear
    No,
}

impl Tristate {
    /// Parse a request value. Accepts booleans, `"1"`/`"0"`,
    /// `"true"`/`"false"`, `"any"` and null.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Any),
            Value::Bool(true) => Some(Self::Yes),
            Value::Bool(false) => Some(Self::No),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Self::Yes),
                Some(0) => Some(Self::No),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "any" | "" => Some(Self::Any),
                "1" | "true" | "yes" => Some(Self::Yes),
                "0" | "false" | "no" => Some(Self::No),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub const fn matches(self, flag: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Yes => flag,
            Self::No => !flag,
        }
    }
}

/// Direction of one sort key, `1` or `-1` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// One `(field, direction)` pair of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered sort specification, `{"title": 1, "updatedAt": -1}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new().then(field, SortDirection::Ascending)
    }

    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self::new().then(field, SortDirection::Descending)
    }

    /// Append a key; a repeated field replaces its earlier direction
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let field = field.into();
        self.0.retain(|key| key.field != field);
        self.0.push(SortKey { field, direction });
        self
    }

    /// The order used when a request names none: most recently updated first
    #[must_use]
    pub fn default_order() -> Self {
        Self::descending("updatedAt")
    }

    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Structural equality: same keys with the same directions, in any
    /// order. Used to recognise which named preset a cursor is using.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|key| other.0.contains(key))
    }
}

impl TryFrom<Map<String, Value>> for SortSpec {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut spec = Self::new();
        for (field, value) in map {
            let direction = match value.as_i64() {
                Some(1) => SortDirection::Ascending,
                Some(-1) => SortDirection::Descending,
                _ => return Err(format!("sort direction for '{field}' must be 1 or -1")),
            };
            spec = spec.then(field, direction);
        }
        Ok(spec)
    }
}

impl From<SortSpec> for Map<String, Value> {
    fn from(spec: SortSpec) -> Self {
        spec.0
            .into_iter()
            .map(|key| (key.field, Value::from(key.direction.as_i64())))
            .collect()
    }
}

/// Paging metadata computed from a total count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub per_page: usize,
    pub skip: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Immutable query snapshot handed to a [`super::PieceStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub type_name: Option<String>,
    pub id: Option<String>,
    pub published: Tristate,
    pub trash: Tristate,
    /// Equality constraints on piece fields
    pub filters: Map<String, Value>,
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
    /// 1-based page number
    pub page: usize,
    /// `None` disables paging
    pub per_page: Option<usize>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            type_name: None,
            id: None,
            published: Tristate::Any,
            trash: Tristate::No,
            filters: Map::new(),
            search: None,
            sort: None,
            page: 1,
            per_page: None,
        }
    }
}

impl Criteria {
    #[must_use]
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub const fn published(mut self, published: Tristate) -> Self {
        self.published = published;
        self
    }

    #[must_use]
    pub const fn trash(mut self, trash: Tristate) -> Self {
        self.trash = trash;
        self
    }

    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.filters.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: usize) -> Self {
        self.page = if page == 0 { 1 } else { page };
        self
    }

    #[must_use]
    pub const fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// The sort actually applied: the requested one or the default order
    #[must_use]
    pub fn effective_sort(&self) -> SortSpec {
        self.sort.clone().unwrap_or_else(SortSpec::default_order)
    }

    /// Pieces before this page; saturates for pages past any real total
    #[must_use]
    pub const fn skip(&self) -> usize {
        match self.per_page {
            Some(per_page) => self.page.saturating_sub(1).saturating_mul(per_page),
            None => 0,
        }
    }

    /// Paging metadata for `total` matches under this snapshot
    #[must_use]
    pub const fn page_info(&self, total: usize) -> PageInfo {
        let per_page = match self.per_page {
            Some(per_page) if per_page > 0 => per_page,
            _ => total,
        };
        let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        PageInfo {
            page: self.page,
            per_page,
            skip: self.skip(),
            limit: per_page,
            total,
            total_pages,
        }
    }
}
