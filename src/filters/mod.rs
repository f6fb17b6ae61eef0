//! Filter, column and sort descriptors
//!
//! Each piece type declares what its manage view can filter by, which
//! columns it shows and which sort presets it offers. Types refine the
//! base set through `add_*`/`remove_*` lists in their configuration.
//!
//! # Examples
//!
//! ```
//! use pieces::filters::{ColumnDescriptor, Descriptors, compose};
//!
//! let base = Descriptors::base();
//! let columns = compose(
//!     &base.columns,
//!     &[ColumnDescriptor::new("color", "Color")],
//!     &["published".to_string()],
//! );
//! assert_eq!(columns.last().map(|c| c.name.as_str()), Some("color"));
//! ```

pub mod operations;
pub mod types;

pub use operations::{Descriptors, compose};
pub use types::{ColumnDescriptor, FilterChoice, FilterDescriptor, Named, SortDescriptor};
