//! File-set predicates used for search, dirty and excluded scopes.

use crate::index::types::FileKind;
use crate::service::workspace::{ModuleId, Workspace};
use globset::GlobSet;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// A predicate over workspace-relative paths.
///
/// Scopes are cheap to combine; [`Scope::union`] and friends fold the
/// trivial cases so `Everything` and `Empty` stay recognisable.
#[derive(Debug, Clone)]
pub enum Scope {
    Everything,
    Empty,
    /// Files owned by any of these modules
    Modules(FxHashSet<ModuleId>),
    /// Files owned by no module (libraries)
    Library,
    Files(FxHashSet<PathBuf>),
    FileKinds(FxHashSet<FileKind>),
    Globs(GlobSet),
    Union(Vec<Scope>),
    Intersect(Vec<Scope>),
    Not(Box<Scope>),
}

impl Scope {
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: FxHashSet<PathBuf> = paths.into_iter().map(Into::into).collect();
        if files.is_empty() {
            Scope::Empty
        } else {
            Scope::Files(files)
        }
    }

    pub fn modules(modules: impl IntoIterator<Item = ModuleId>) -> Self {
        let modules: FxHashSet<ModuleId> = modules.into_iter().collect();
        if modules.is_empty() {
            Scope::Empty
        } else {
            Scope::Modules(modules)
        }
    }

    /// Does the scope contain `path`?
    pub fn contains(&self, path: &Path, workspace: &dyn Workspace) -> bool {
        match self {
            Scope::Everything => true,
            Scope::Empty => false,
            Scope::Modules(modules) => workspace
                .module_of(path)
                .is_some_and(|module| modules.contains(&module)),
            Scope::Library => workspace.module_of(path).is_none(),
            Scope::Files(files) => files.contains(path),
            Scope::FileKinds(kinds) => kinds.contains(&FileKind::from_path(path)),
            Scope::Globs(globs) => globs.is_match(path),
            Scope::Union(parts) => parts.iter().any(|s| s.contains(path, workspace)),
            Scope::Intersect(parts) => parts.iter().all(|s| s.contains(path, workspace)),
            Scope::Not(inner) => !inner.contains(path, workspace),
        }
    }

    pub fn union(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::Everything, _) | (_, Scope::Everything) => Scope::Everything,
            (Scope::Empty, s) | (s, Scope::Empty) => s,
            (Scope::Union(mut a), Scope::Union(b)) => {
                a.extend(b);
                Scope::Union(a)
            }
            (Scope::Union(mut a), s) | (s, Scope::Union(mut a)) => {
                a.push(s);
                Scope::Union(a)
            }
            (a, b) => Scope::Union(vec![a, b]),
        }
    }

    pub fn intersect(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::Empty, _) | (_, Scope::Empty) => Scope::Empty,
            (Scope::Everything, s) | (s, Scope::Everything) => s,
            (Scope::Intersect(mut a), s) | (s, Scope::Intersect(mut a)) => {
                a.push(s);
                Scope::Intersect(a)
            }
            (a, b) => Scope::Intersect(vec![a, b]),
        }
    }

    /// Everything in `self` that is not in `other`
    pub fn minus(self, other: Scope) -> Scope {
        match other {
            Scope::Empty => self,
            Scope::Everything => Scope::Empty,
            Scope::Not(inner) => self.intersect(*inner),
            other => self.intersect(Scope::Not(Box::new(other))),
        }
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Scope::Everything)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scope::Empty)
    }
}
