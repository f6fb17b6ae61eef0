//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for pieces using the `clap` crate.
//! Every command maps onto one route of a type's [`crate::api::PieceModule`]
//! and runs as the local administrator.
//!
//! # Commands
//!
//! - **insert**: Create a piece from `field=value` pairs
//! - **show**: Print one piece
//! - **update** / **publish**: Edit a piece, optionally publishing it
//! - **list**: Page through a type's pieces with filters, search and sort
//! - **trash** / **rescue**: Move a piece into or out of the trash
//! - **types**: Show configured and stored types
//!
//! # Examples
//!
//! ```
//! use pieces::cli::{Cli, Commands};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["pieces", "list", "article", "--page", "2"]);
//! assert!(matches!(cli.command, Commands::List { .. }));
//! ```

use crate::api::Route;
use crate::list::ListRequest;
use crate::store::{SortDirection, SortSpec};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// Main CLI structure for parsing command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pieces")]
#[command(about = "Typed content pieces with a hook-driven lifecycle", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database directory (overrides config)
    #[arg(long = "db", value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a piece
    #[command(visible_alias = "i")]
    Insert {
        /// Piece type
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Field values
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },

    /// Show one piece
    Show {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(value_name = "ID")]
        id: String,
    },

    /// Edit a piece
    #[command(visible_alias = "u")]
    Update {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(value_name = "ID")]
        id: String,

        /// Field values to change
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },

    /// Edit a piece and publish it
    Publish {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(value_name = "ID")]
        id: String,

        /// Field values to change
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },

    /// List pieces of a type
    #[command(visible_alias = "l")]
    List {
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Page to show, starting at 1
        #[arg(short = 'p', long = "page", default_value_t = 1)]
        page: usize,

        /// Free-text search
        #[arg(short = 's', long = "search")]
        search: Option<String>,

        /// Sort keys, `field` or `field:desc`
        #[arg(long = "sort", value_name = "FIELD[:desc]")]
        sort: Vec<String>,

        /// Filters as `name=value`
        #[arg(short = 'f', long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,

        /// Show drafts as well as published pieces
        #[arg(short = 'a', long = "all")]
        all: bool,

        /// Show trashed pieces instead
        #[arg(long = "trash")]
        trash: bool,
    },

    /// Move a piece to the trash
    #[command(visible_alias = "rm")]
    Trash {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(value_name = "ID")]
        id: String,
    },

    /// Restore a piece from the trash
    Rescue {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(value_name = "ID")]
        id: String,
    },

    /// Show configured and stored types
    Types,
}

impl Commands {
    /// The piece type the command works on
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Insert { type_name, .. }
            | Self::Show { type_name, .. }
            | Self::Update { type_name, .. }
            | Self::Publish { type_name, .. }
            | Self::List { type_name, .. }
            | Self::Trash { type_name, .. }
            | Self::Rescue { type_name, .. } => Some(type_name),
            Self::Types => None,
        }
    }

    /// The route the command dispatches to
    #[must_use]
    pub const fn route(&self) -> Option<Route> {
        match self {
            Self::Insert { .. } => Some(Route::Insert),
            Self::Show { .. } => Some(Route::Retrieve),
            Self::Update { .. } => Some(Route::Update),
            Self::Publish { .. } => Some(Route::Publish),
            Self::List { .. } => Some(Route::List),
            Self::Trash { .. } => Some(Route::Trash),
            Self::Rescue { .. } => Some(Route::Rescue),
            Self::Types => None,
        }
    }

    /// The request body for the command's route
    ///
    /// # Errors
    ///
    /// Returns a message naming the first malformed `name=value` pair or
    /// sort key.
    pub fn body(&self) -> Result<Map<String, Value>, String> {
        match self {
            Self::Insert { fields, .. } => parse_assignments(fields),
            Self::Update { id, fields, .. } | Self::Publish { id, fields, .. } => {
                let mut body = parse_assignments(fields)?;
                body.insert("_id".into(), Value::String(id.clone()));
                Ok(body)
            }
            Self::Show { id, .. } | Self::Trash { id, .. } | Self::Rescue { id, .. } => {
                let mut body = Map::new();
                body.insert("_id".into(), Value::String(id.clone()));
                Ok(body)
            }
            Self::List { .. } => match serde_json::to_value(self.list_request()?) {
                Ok(Value::Object(body)) => Ok(body),
                Ok(_) => Err("list request did not serialize to an object".into()),
                Err(e) => Err(e.to_string()),
            },
            Self::Types => Ok(Map::new()),
        }
    }

    /// The list request described by the `list` command's flags
    ///
    /// # Errors
    ///
    /// Returns a message for malformed filters or sort keys.
    pub fn list_request(&self) -> Result<ListRequest, String> {
        let Self::List {
            page,
            search,
            sort,
            filters,
            all,
            trash,
            ..
        } = self
        else {
            return Ok(ListRequest::new());
        };

        let mut request = ListRequest::new().page(*page);
        for (name, value) in parse_assignments(filters)? {
            request.set(name, value);
        }
        request.search.clone_from(search);
        if !sort.is_empty() {
            request.sort = Some(parse_sort(sort)?);
        }
        if *all {
            request.published = Some(json!("any"));
        }
        if *trash {
            request.trash = Some(json!("1"));
        }
        Ok(request)
    }
}

/// Parse `name=value` pairs into a body; values stay strings for the
/// schema converter to coerce
///
/// # Errors
///
/// Returns a message naming the first pair without `=` or with an empty
/// name.
pub fn parse_assignments(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut body = Map::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(format!("Expected NAME=VALUE, got '{pair}'"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Missing field name in '{pair}'"));
        }
        body.insert(name.to_string(), Value::String(value.to_string()));
    }
    Ok(body)
}

/// Parse `field` / `field:asc` / `field:desc` keys in order
///
/// # Errors
///
/// Returns a message for an unknown direction.
pub fn parse_sort(keys: &[String]) -> Result<SortSpec, String> {
    let mut spec = SortSpec::new();
    for key in keys {
        let (field, direction) = match key.split_once(':') {
            None => (key.as_str(), SortDirection::Ascending),
            Some((field, "asc")) => (field, SortDirection::Ascending),
            Some((field, "desc")) => (field, SortDirection::Descending),
            Some((_, other)) => return Err(format!("Unknown sort direction '{other}' in '{key}'")),
        };
        spec = spec.then(field, direction);
    }
    Ok(spec)
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The log filter implied by the flags, if they imply one
    #[must_use]
    pub const fn log_level(&self) -> Option<&'static str> {
        match (self.quiet, self.verbose) {
            (_, 1) => Some("debug"),
            (_, 2..) => Some("trace"),
            (true, 0) => Some("error"),
            (false, 0) => None,
        }
    }
}
