//! Field schemas and input conversion
//!
//! This module provides the declared shape of each piece type:
//! - **Fields**: named, typed declarations (`string`, `select`, `joinByArray`, ...)
//! - **Refinement**: per-type add/remove over the base document schema
//! - **Conversion**: mapping untrusted input onto a working copy
//!
//! # Examples
//!
//! ```
//! use pieces::schema::{Field, FieldType, Schema};
//!
//! let schema = Schema::base().refine(
//!     &[Field::join("_related", FieldType::JoinByArray, "article").limit(3)],
//!     &[],
//! );
//! assert!(schema.field("_related").is_some());
//! assert!(schema.field("title").is_some());
//! ```

pub mod convert;
pub mod error;
pub mod types;

pub use convert::{FormConverter, SchemaConverter, convert_field};
pub use error::{Result, SchemaError};
pub use types::{Field, FieldType, Schema, SelectChoice};
