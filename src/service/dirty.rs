//! Tracks which modules may be stale relative to the last built index.
//!
//! Two phases: idle between build sessions and compiling inside one. While
//! compiling nothing produced by the build can be trusted, so the dirty
//! scope is the whole workspace. Edits seen during compilation are parked
//! and folded in when the session ends.

use crate::index::types::FileKind;
use crate::service::scope::Scope;
use crate::service::workspace::{ModuleId, Workspace};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Kind of file change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File was created
    Created,
    /// File content was modified
    Modified,
    /// File was deleted
    Deleted,
    /// File was moved; the new location is the event's destination
    Renamed,
}

/// When an event is delivered relative to the change itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Before,
    After,
}

/// A single live-edit notification
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// Path of the changed file (relative to the workspace root)
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// New location for renames
    pub destination: Option<PathBuf>,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            destination: None,
        }
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            path: from.into(),
            kind: ChangeKind::Renamed,
            destination: Some(to.into()),
        }
    }

    /// The path whose module becomes dirty in `phase`, if any
    fn affected_path(&self, phase: EventPhase) -> Option<&Path> {
        match (phase, self.kind) {
            (EventPhase::Before, ChangeKind::Modified | ChangeKind::Deleted | ChangeKind::Renamed) => {
                Some(&self.path)
            }
            (EventPhase::After, ChangeKind::Created) => Some(&self.path),
            (EventPhase::After, ChangeKind::Renamed) => self.destination.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct DirtyState {
    compiling: bool,
    changed: FxHashSet<ModuleId>,
    changed_during_compilation: FxHashSet<ModuleId>,
    /// Exclusion rules as currently configured
    rules: Vec<String>,
    /// Rules in effect when the running session started
    session_snapshot: Vec<String>,
    /// Rules added while the running session was compiling
    session_deltas: Vec<String>,
    /// Rules the last finished build ran against
    compiled_rules: Vec<String>,
    excluded: Option<GlobSet>,
    modification_count: u64,
}

impl DirtyState {
    fn touch(&mut self) {
        self.modification_count += 1;
    }

    fn recompute_excluded(&mut self) {
        let mut patterns: Vec<&String> = self.compiled_rules.iter().chain(&self.rules).collect();
        patterns.sort();
        patterns.dedup();
        self.excluded = compile_rules(patterns);
    }
}

/// Dirty-scope bookkeeping shared between the service and live-edit hooks
pub struct DirtyScopeTracker {
    workspace: Arc<dyn Workspace>,
    indexed_kinds: FxHashSet<FileKind>,
    state: Mutex<DirtyState>,
    cached: Mutex<Option<(u64, Arc<Scope>)>>,
}

impl DirtyScopeTracker {
    pub fn new(workspace: Arc<dyn Workspace>, indexed_kinds: FxHashSet<FileKind>) -> Self {
        Self {
            workspace,
            indexed_kinds,
            state: Mutex::new(DirtyState::default()),
            cached: Mutex::new(None),
        }
    }

    pub(super) fn state(&self) -> MutexGuard<'_, DirtyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn compilation_started(&self) {
        let mut state = self.state();
        state.compiling = true;
        state.changed_during_compilation.clear();
        state.session_snapshot = state.rules.clone();
        state.session_deltas.clear();
        state.touch();
        debug!("dirty tracker: compilation started");
    }

    /// Leave the compiling phase.
    ///
    /// Edits recorded while compiling are folded in first, then every
    /// module in `affected` is cleared. An edit made during the build to a
    /// module the build compiled is therefore treated as incorporated by
    /// that build; only modules outside `affected` stay dirty.
    pub fn compilation_finished(&self, affected: &[ModuleId]) {
        let mut state = self.state();
        state.compiling = false;

        let during = std::mem::take(&mut state.changed_during_compilation);
        state.changed.extend(during);
        for module in affected {
            state.changed.remove(module);
        }

        let mut compiled = std::mem::take(&mut state.session_snapshot);
        compiled.extend(std::mem::take(&mut state.session_deltas));
        state.compiled_rules = compiled;
        state.recompute_excluded();
        state.touch();

        debug!(
            affected = affected.len(),
            dirty_modules = state.changed.len(),
            "dirty tracker: compilation finished"
        );
    }

    pub fn is_compiling(&self) -> bool {
        self.state().compiling
    }

    /// Feed one live-edit notification
    pub fn on_file_event(&self, phase: EventPhase, event: &FileEvent) {
        if let Some(path) = event.affected_path(phase) {
            self.mark_dirty(path);
        }
    }

    /// Record that `path` changed. Files of kinds the index does not cover
    /// or outside any module are ignored.
    pub fn mark_dirty(&self, path: &Path) {
        if !self.indexed_kinds.contains(&FileKind::from_path(path)) {
            return;
        }
        let Some(module) = self.workspace.module_of(path) else {
            return;
        };

        let mut state = self.state();
        let inserted = if state.compiling {
            state.changed_during_compilation.insert(module)
        } else {
            state.changed.insert(module)
        };
        if inserted {
            state.touch();
        }
    }

    /// Replace the exclusion rules (glob patterns, workspace relative)
    pub fn set_exclusion_rules<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut state = self.state();
        if state.compiling {
            let added: Vec<String> = patterns
                .iter()
                .filter(|p| !state.session_snapshot.contains(p))
                .cloned()
                .collect();
            state.session_deltas.extend(added);
        }
        state.rules = patterns;
        if !state.compiling {
            state.recompute_excluded();
        }
        state.touch();
    }

    /// A single exclusion rule was added
    pub fn exclusion_rule_added(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let mut state = self.state();
        if state.rules.contains(&pattern) {
            return;
        }
        if state.compiling {
            state.session_deltas.push(pattern.clone());
        }
        state.rules.push(pattern);
        if !state.compiling {
            state.recompute_excluded();
        }
        state.touch();
    }

    /// Advances on every tracker mutation and on every workspace change
    pub fn modification_count(&self) -> u64 {
        self.state().modification_count + self.workspace.modification_count()
    }

    /// Modules currently marked dirty (not including unsaved documents)
    pub fn dirty_modules(&self) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self.state().changed.iter().copied().collect();
        modules.sort();
        modules
    }

    /// Files whose indexed facts may not match live source
    pub fn dirty_scope(&self) -> Arc<Scope> {
        let (changed, excluded, epoch) = {
            let state = self.state();
            if state.compiling {
                return Arc::new(Scope::Everything);
            }
            let epoch = state.modification_count + self.workspace.modification_count();
            if let Some((cached_epoch, scope)) = self.cached().as_ref() {
                if *cached_epoch == epoch {
                    return scope.clone();
                }
            }
            (state.changed.clone(), state.excluded.clone(), epoch)
        };

        let unsaved = self
            .workspace
            .unsaved_documents()
            .into_iter()
            .filter(|path| self.indexed_kinds.contains(&FileKind::from_path(path)))
            .filter_map(|path| self.workspace.module_of(&path));

        let mut modules = FxHashSet::default();
        for module in changed.into_iter().chain(unsaved) {
            if modules.contains(&module) {
                continue;
            }
            modules.extend(self.workspace.module_with_dependents(module));
            modules.insert(module);
        }

        let mut scope = Scope::modules(modules);
        if let Some(globs) = excluded {
            scope = scope.union(Scope::Globs(globs));
        }
        let scope = Arc::new(scope);

        *self.cached() = Some((epoch, scope.clone()));
        scope
    }

    fn cached(&self) -> MutexGuard<'_, Option<(u64, Arc<Scope>)>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn compile_rules<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                count += 1;
            }
            Err(e) => warn!(pattern = %pattern, error = %e, "ignoring invalid exclusion rule"),
        }
    }
    if count == 0 {
        return None;
    }
    match builder.build() {
        Ok(set) => Some(set),
        Err(e) => {
            warn!(error = %e, "failed to compile exclusion rules");
            None
        }
    }
}
