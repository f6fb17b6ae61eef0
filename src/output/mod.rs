//! Output formatting for CLI display
//!
//! This module provides utilities for formatting pieces, pages and status
//! envelopes on the terminal.

use crate::Piece;
use crate::pipeline::Status;
use crate::store::PageInfo;
use colored::Colorize;
use serde_json::Value;

/// Format a piece as one list line
#[must_use]
pub fn piece_line(piece: &Piece, quiet: bool) -> String {
    if quiet {
        return piece.id.clone();
    }
    let title = if piece.title.is_empty() { "(untitled)" } else { piece.title.as_str() };
    let state = if piece.trashed {
        "trash".red()
    } else if piece.published {
        "published".green()
    } else {
        "draft".yellow()
    };
    format!("  {} [{state}] {}", title.bold(), piece.id.dimmed())
}

/// Format a piece with all of its fields
#[must_use]
pub fn piece_detail(piece: &Piece) -> String {
    let mut lines = vec![piece_line(piece, false)];
    lines.push(format!("    type: {}", piece.type_name));
    if let Some(slug) = &piece.slug {
        lines.push(format!("    slug: {slug}"));
    }
    if let Some(updated) = piece.updated_at {
        lines.push(format!("    updated: {}", updated.format("%Y-%m-%d %H:%M:%S")));
    }
    for (name, value) in &piece.fields {
        lines.push(format!("    {name}: {}", field_value(value)));
    }
    lines.join("\n")
}

fn field_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(field_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Page position line
#[must_use]
pub fn page_footer(info: &PageInfo) -> String {
    let noun = if info.total == 1 { "piece" } else { "pieces" };
    format!(
        "Page {} of {} ({} {noun})",
        info.page,
        info.total_pages.max(1),
        info.total
    )
}

/// Format a type with its stored piece count
#[must_use]
pub fn type_with_count(name: &str, count: usize, quiet: bool) -> String {
    if quiet {
        name.to_string()
    } else {
        format!("  {name} ({count} piece(s))")
    }
}

/// Color a status by outcome
#[must_use]
pub fn colorize_status(status: Status) -> String {
    match status {
        Status::Ok => status.as_str().green().to_string(),
        Status::Validation | Status::NotFound => status.as_str().yellow().to_string(),
        Status::Forbidden | Status::Vanished | Status::Error => status.as_str().red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn piece() -> Piece {
        let mut piece = Piece::new("article");
        piece.id = "abc".into();
        piece.title = "Hello".into();
        piece.set_field("tags", json!(["news", "rust"]));
        piece
    }

    #[test]
    fn test_quiet_line_is_id() {
        assert_eq!(piece_line(&piece(), true), "abc");
    }

    #[test]
    fn test_detail_lists_fields() {
        colored::control::set_override(false);
        let detail = piece_detail(&piece());
        assert!(detail.contains("Hello [draft] abc"));
        assert!(detail.contains("tags: news, rust"));
    }

    #[test]
    fn test_page_footer() {
        let info = PageInfo {
            page: 1,
            per_page: 10,
            skip: 0,
            limit: 10,
            total: 0,
            total_pages: 0,
        };
        assert_eq!(page_footer(&info), "Page 1 of 1 (0 pieces)");
    }

    #[test]
    fn test_type_with_count() {
        assert_eq!(type_with_count("article", 3, true), "article");
        assert_eq!(type_with_count("article", 3, false), "  article (3 piece(s))");
    }
}
