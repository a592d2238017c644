//! Boundary to the host workspace (modules, open documents, lifetime).

use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque id of a compilation unit in the host workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// What the service needs to know about the live workspace.
///
/// Paths are relative to the workspace root, the same form the index
/// stores in its file table.
pub trait Workspace: Send + Sync {
    /// Module owning `path`, or `None` for library and unrelated files
    fn module_of(&self, path: &Path) -> Option<ModuleId>;

    /// `module` plus every module depending on it, transitively
    fn module_with_dependents(&self, module: ModuleId) -> Vec<ModuleId>;

    /// Documents edited in the editor but not yet written to disk
    fn unsaved_documents(&self) -> Vec<PathBuf>;

    /// Counter advanced by the host whenever any document changes
    fn modification_count(&self) -> u64;

    /// True once the workspace is shutting down
    fn is_disposed(&self) -> bool;
}
