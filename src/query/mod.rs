//! Query primitives shared by the reader and the service.
//!
//! - [`hierarchy`] - breadth-first hierarchy traversal with ambiguity detection
//! - [`counter`] - streaming occurrence counter for cast heuristics
//! - [`cancel`] - cooperative cancellation tokens

pub mod cancel;
pub mod counter;
pub mod hierarchy;

pub use cancel::{CancellationToken, CANCELLATION_CHECK_INTERVAL};
pub use counter::OccurrenceCounter;
pub use hierarchy::{traverse, HierarchyQuery, HierarchyResult, HierarchySource};
