//! Typed ID definitions for all persisted entities.

pub use super::id::Id;

/// Marker type for extracted job postings.
pub struct FreelanceRequest;

/// Marker type for pipeline run records.
pub struct ParseLog;

/// Marker type for categories.
pub struct Category;

pub type RequestId = Id<FreelanceRequest>;
pub type ParseLogId = Id<ParseLog>;
pub type CategoryId = Id<Category>;
