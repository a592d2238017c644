//! # refindex - Compiled-Code Reference Index Service
//!
//! refindex answers "who references this symbol", "what directly extends
//! this class", "how often is this method called" and "what is this type
//! most often cast from" by querying a persistent inverted index written by
//! a build step, while the workspace keeps changing underneath it.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - On-disk store, index writer and the point-in-time reader
//! - [`query`] - Hierarchy traversal, occurrence counting, cancellation
//! - [`service`] - Reader lifecycle around build sessions, dirty scopes,
//!   language adapters and derived queries
//! - [`error`] - Storage, reader and service error types
//! - [`utils`] - Encoding helpers, app-data paths and configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use refindex::service::{AdapterRegistry, ReferenceService, SourceElement};
//! use refindex::utils::ServiceConfig;
//! use refindex::query::CancellationToken;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let service = ReferenceService::new(
//!     ServiceConfig::load(),
//!     Path::new("/work/project/out"),
//!     Arc::new(my_workspace),
//!     AdapterRegistry::new().with(FileKind::Java, Arc::new(my_java_adapter)),
//! );
//!
//! service.build_session_started(1);
//! // ... the build writes the index ...
//! service.build_session_finished(1, &affected_modules);
//!
//! let element = SourceElement::new("src/app/Base.java", 120);
//! match service.scope_with_references(&element, &CancellationToken::new()) {
//!     Ok(Some(scope)) => { /* search only files inside `scope` */ }
//!     Ok(None) => { /* unknown: search everything */ }
//!     Err(e) => { /* index unavailable, try later */ }
//! }
//! ```
//!
//! ## Consistency
//!
//! Results are only as fresh as the last build. Every file-set answer is
//! widened with the dirty scope (modules edited since that build, unsaved
//! documents, excluded files) and with file kinds the index does not
//! cover, so a reference is never missed, only over-approximated.

pub mod error;
pub mod index;
pub mod query;
pub mod service;
pub mod utils;

pub use error::{QueryError, QueryResult, UnavailableReason};
pub use service::ReferenceService;
