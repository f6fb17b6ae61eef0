//! Criteria evaluation over stored pieces
//!
//! The sled store keeps no secondary indices beyond the type index, so
//! filtering, searching, sorting and paging happen here on the candidate
//! set the index yields.

use crate::Piece;
use crate::db::DbError;
use crate::store::{Criteria, SortDirection, SortSpec, Tristate};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;

/// Filter and sort candidates according to `criteria`, without paging
///
/// # Errors
///
/// Returns `DbError::InvalidInput` if the search term cannot be compiled.
pub fn select(candidates: Vec<Piece>, criteria: &Criteria) -> Result<Vec<Piece>, DbError> {
    let search = criteria.search.as_deref().map(search_pattern).transpose()?;

    let mut matched: Vec<Piece> = candidates
        .into_iter()
        .filter(|piece| matches(piece, criteria, search.as_ref()))
        .collect();

    let sort = criteria.effective_sort();
    matched.sort_by(|a, b| compare_pieces(a, b, &sort));
    Ok(matched)
}

/// Apply the criteria's page window to an already sorted list
#[must_use]
pub fn paginate(sorted: Vec<Piece>, criteria: &Criteria) -> Vec<Piece> {
    let skip = criteria.skip();
    match criteria.per_page {
        Some(per_page) => sorted.into_iter().skip(skip).take(per_page).collect(),
        None => sorted,
    }
}

fn search_pattern(term: &str) -> Result<Regex, DbError> {
    RegexBuilder::new(&regex::escape(term.trim()))
        .case_insensitive(true)
        .build()
        .map_err(|e| DbError::InvalidInput(format!("Invalid search term: {e}")))
}

/// Whether a piece satisfies every constraint of the criteria
#[must_use]
pub fn matches(piece: &Piece, criteria: &Criteria, search: Option<&Regex>) -> bool {
    if let Some(type_name) = &criteria.type_name
        && &piece.type_name != type_name
    {
        return false;
    }
    if let Some(id) = &criteria.id
        && &piece.id != id
    {
        return false;
    }
    if !criteria.published.matches(piece.published) || !criteria.trash.matches(piece.trashed) {
        return false;
    }
    let filters_hold = criteria
        .filters
        .iter()
        .all(|(name, wanted)| value_matches(piece.field(name).as_ref(), wanted));
    if !filters_hold {
        return false;
    }
    search.is_none_or(|pattern| search_matches(piece, pattern))
}

fn search_matches(piece: &Piece, pattern: &Regex) -> bool {
    if pattern.is_match(&piece.title) {
        return true;
    }
    piece.fields.values().any(|value| match value {
        Value::String(s) => pattern.is_match(s),
        Value::Array(items) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| pattern.is_match(s))),
        _ => false,
    })
}

/// Equality with the loose coercions list requests rely on
///
/// `"any"` and null are unconstrained, array fields match by membership,
/// array filter values match any of their members.
fn value_matches(actual: Option<&Value>, wanted: &Value) -> bool {
    match wanted {
        Value::Null => return true,
        Value::String(s) if s == "any" => return true,
        Value::Array(options) => {
            return options.iter().any(|option| value_matches(actual, option));
        }
        _ => {}
    }
    match actual {
        None => false,
        Some(Value::Array(items)) => items.iter().any(|item| scalar_eq(item, wanted)),
        Some(actual) => scalar_eq(actual, wanted),
    }
}

fn scalar_eq(actual: &Value, wanted: &Value) -> bool {
    if actual == wanted {
        return true;
    }
    match (actual, wanted) {
        (Value::Bool(flag), _) => Tristate::from_value(wanted)
            .is_some_and(|state| state != Tristate::Any && state.matches(*flag)),
        (Value::Number(n), Value::String(s)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        _ => false,
    }
}

/// Order two pieces by a sort specification, breaking ties by id
#[must_use]
pub fn compare_pieces(a: &Piece, b: &Piece, sort: &SortSpec) -> Ordering {
    for key in sort.keys() {
        let ordering = compare_values(a.field(&key.field).as_ref(), b.field(&key.field).as_ref());
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id.cmp(&b.id)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

const fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
