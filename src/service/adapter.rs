//! Per-language adapters turning live source elements into index keys.

use crate::index::store::NameTable;
use crate::index::types::{CandidateId, FileKind, SymbolRef};
use crate::service::scope::Scope;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A live source element: a file plus an offset into it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceElement {
    pub file: PathBuf,
    pub offset: u32,
}

impl SourceElement {
    pub fn new(file: impl Into<PathBuf>, offset: u32) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }

    pub fn file_kind(&self) -> FileKind {
        FileKind::from_path(&self.file)
    }
}

impl fmt::Display for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.file.display(), self.offset)
    }
}

/// Language-specific capabilities used by the service.
///
/// Every method answers for live source only; none of them touch the index
/// other than through the read-only [`NameTable`].
pub trait LanguageAdapter: Send + Sync {
    /// Index keys for `element`, or `None` when it has no indexable shape
    /// (a local variable, an unresolved reference, a name unknown to the
    /// index).
    fn to_refs(&self, element: &SourceElement, names: &NameTable) -> Option<Vec<SymbolRef>>;

    /// Expand a reference declared in a library into the references of
    /// its overriders visible from `scope`
    fn hierarchy_in_library_scope(
        &self,
        r: &SymbolRef,
        element: &SourceElement,
        names: &NameTable,
        scope: &Scope,
    ) -> Vec<SymbolRef> {
        let _ = (element, names, scope);
        vec![*r]
    }

    fn is_class(&self, element: &SourceElement) -> bool;

    /// Constructors that can be invoked to instantiate the class `element`
    fn instantiable_constructors(&self, element: &SourceElement) -> Vec<SourceElement>;

    /// Whether `candidate` really extends or implements `base` in live source
    fn is_direct_inheritor(&self, candidate: &SourceElement, base: &SourceElement) -> bool;

    fn find_direct_inheritor_candidates_in_file(
        &self,
        ids: &[CandidateId],
        file: &Path,
    ) -> Vec<SourceElement>;

    fn find_functional_expressions_in_file(
        &self,
        ids: &[CandidateId],
        file: &Path,
    ) -> Vec<SourceElement>;
}

/// Registered adapters by file kind
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: FxHashMap<FileKind, Arc<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` for `kind`, replacing any previous one
    pub fn register(&mut self, kind: FileKind, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    pub fn with(mut self, kind: FileKind, adapter: Arc<dyn LanguageAdapter>) -> Self {
        self.register(kind, adapter);
        self
    }

    pub fn get(&self, kind: FileKind) -> Option<&Arc<dyn LanguageAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn for_element(&self, element: &SourceElement) -> Option<&Arc<dyn LanguageAdapter>> {
        self.get(element.file_kind())
    }

    pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn LanguageAdapter>> {
        self.get(FileKind::from_path(path))
    }

    /// File kinds covered by the index
    pub fn indexed_kinds(&self) -> FxHashSet<FileKind> {
        self.adapters.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.adapters.keys().collect();
        kinds.sort();
        f.debug_struct("AdapterRegistry").field("kinds", &kinds).finish()
    }
}
