//! Listing orchestration
//!
//! Translates a listing request (filters, page, sort, search) into a
//! [`Criteria`](crate::store::Criteria) snapshot, runs the count and the
//! page fetch concurrently against it, and optionally renders the manage
//! view with the type's filter, column and sort descriptors.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ListOrchestrator;
pub use types::{DEFAULT_PER_PAGE, ListFormat, ListRequest, ListResults, ManagePage, TypeOptions};
