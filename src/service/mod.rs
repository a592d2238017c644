//! The reference service and its collaborators.
//!
//! - [`reference`] - [`ReferenceService`], reader lifecycle and derived queries
//! - [`dirty`] - dirty-scope tracking across build sessions
//! - [`adapter`] - per-language adapters and their registry
//! - [`scope`] - file-set predicates
//! - [`workspace`] - the host workspace boundary
//! - [`cache`] - epoch-invalidated derived-query caches

pub mod adapter;
pub mod cache;
pub mod dirty;
pub mod reference;
pub mod scope;
pub mod workspace;

pub use adapter::{AdapterRegistry, LanguageAdapter, SourceElement};
pub use dirty::{ChangeKind, DirtyScopeTracker, EventPhase, FileEvent};
pub use reference::{CastOperand, HierarchyInfo, ReferenceService, ServiceStatus};
pub use scope::Scope;
pub use workspace::{ModuleId, Workspace};
