//! The reference service: reader lifecycle around build sessions plus the
//! derived queries an editor asks for.
//!
//! All reads go through a non-blocking shared lock. If an open or close is
//! in progress the query fails soft with [`UnavailableReason::Busy`]
//! instead of waiting. Storage faults never leave this module: the reader
//! is torn down, the index optionally deleted, and the caller sees
//! [`UnavailableReason::StorageFault`].

use crate::error::{QueryError, QueryResult, ReaderError, StorageError, UnavailableReason};
use crate::index::reader::ReferenceReader;
use crate::index::stats::IndexStats;
use crate::index::store::NameTable;
use crate::index::types::{CandidateId, CandidateKind, FileKind, IndexKind, SignatureData, SymbolRef};
use crate::query::CancellationToken;
use crate::service::adapter::{AdapterRegistry, LanguageAdapter, SourceElement};
use crate::service::cache::{Epoch, EpochCache};
use crate::service::dirty::DirtyScopeTracker;
use crate::service::scope::Scope;
use crate::service::workspace::{ModuleId, Workspace};
use crate::utils::app_data::{get_index_dir, remove_index};
use crate::utils::config::ServiceConfig;
use roaring::RoaringBitmap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Reader state, only mutated under the exclusive lock
#[derive(Default)]
struct Lifecycle {
    reader: Option<ReferenceReader>,
    active_builds: usize,
    /// Bumped every time a reader is opened
    generation: u64,
    /// Modules compiled by the overlapping sessions still running
    session_affected: Vec<ModuleId>,
    /// The last reader was torn down after a storage fault
    faulted: bool,
    disposed: bool,
}

/// Statistics for the service
struct ServiceStats {
    start_time: Instant,
    queries_served: AtomicU64,
    storage_faults: AtomicU64,
}

impl ServiceStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            queries_served: AtomicU64::new(0),
            storage_faults: AtomicU64::new(0),
        }
    }
}

/// Snapshot of the service state
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub enabled: bool,
    /// A reader is open
    pub open: bool,
    /// A lifecycle transition held the lock while the status was taken
    pub busy: bool,
    pub active_builds: usize,
    /// Completed build sessions
    pub build_clock: u64,
    pub generation: u64,
    pub uptime_secs: u64,
    pub queries_served: u64,
    pub storage_faults: u64,
    /// Hit rate of the derived-query caches (0.0 - 1.0)
    pub cache_hit_rate: f32,
    pub index: Option<IndexStats>,
}

/// Direct-inheritor candidates plus the dirty scope they were computed
/// against. Candidates come only from clean files; anything inside
/// `dirty_scope` has to be searched in live source by the caller.
#[derive(Debug, Clone)]
pub struct HierarchyInfo {
    pub kind: CandidateKind,
    pub candidates: BTreeMap<PathBuf, Vec<CandidateId>>,
    pub dirty_scope: Arc<Scope>,
}

/// Most frequent operand of a cast, as estimated by the occurrence counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOperand {
    pub operand: SymbolRef,
    pub qualified_name: Option<String>,
    pub occurrences: u32,
}

/// Serves reference queries against the index of the last finished build
pub struct ReferenceService {
    config: ServiceConfig,
    index_dir: PathBuf,
    workspace: Arc<dyn Workspace>,
    adapters: AdapterRegistry,
    tracker: DirtyScopeTracker,
    lifecycle: RwLock<Lifecycle>,
    build_clock: AtomicU64,
    scope_cache: EpochCache<SourceElement, Option<Arc<Scope>>>,
    implicit_cache: EpochCache<SourceElement, Option<Arc<Scope>>>,
    stats: ServiceStats,
}

impl ReferenceService {
    /// Create a closed service for the index under `build_output`
    pub fn new(
        config: ServiceConfig,
        build_output: &Path,
        workspace: Arc<dyn Workspace>,
        adapters: AdapterRegistry,
    ) -> Self {
        let index_dir = get_index_dir(build_output, &config.index_dir_name);
        let tracker = DirtyScopeTracker::new(workspace.clone(), adapters.indexed_kinds());

        Self {
            scope_cache: EpochCache::new(config.cache_capacity),
            implicit_cache: EpochCache::new(config.cache_capacity),
            config,
            index_dir,
            workspace,
            adapters,
            tracker,
            lifecycle: RwLock::new(Lifecycle::default()),
            build_clock: AtomicU64::new(0),
            stats: ServiceStats::new(),
        }
    }

    /// Open an index left behind by an earlier build, if there is one.
    /// Returns whether a reader is open afterwards.
    pub fn initialize(&self) -> bool {
        self.try_open()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn tracker(&self) -> &DirtyScopeTracker {
        &self.tracker
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn dirty_scope(&self) -> Arc<Scope> {
        self.tracker.dirty_scope()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn epoch(&self) -> Epoch {
        (
            self.build_clock.load(Ordering::SeqCst),
            self.tracker.modification_count(),
        )
    }

    // ---- lifecycle ----

    /// A build session started: close the reader, nothing on disk can be
    /// trusted until the session finishes.
    ///
    /// The tracker changes phase inside the same critical section as the
    /// build count, so the two never disagree.
    pub fn build_session_started(&self, session: u64) {
        let (closed, active) = {
            let mut state = self.write_state();
            state.active_builds += 1;
            if state.active_builds == 1 {
                self.tracker.compilation_started();
            }
            (state.reader.take(), state.active_builds)
        };

        if closed.is_some() {
            info!(session, active_builds = active, "build started, reference index closed");
        } else {
            debug!(session, active_builds = active, "build started");
        }
    }

    /// A build session finished. The last of several overlapping sessions
    /// ends the compiling phase for all of them and reopens the index.
    pub fn build_session_finished(&self, session: u64, affected: &[ModuleId]) {
        let active = {
            let mut state = self.write_state();
            state.active_builds = state.active_builds.saturating_sub(1);
            state.session_affected.extend_from_slice(affected);
            if state.active_builds == 0 {
                let compiled = std::mem::take(&mut state.session_affected);
                self.tracker.compilation_finished(&compiled);
            }
            state.active_builds
        };
        self.build_clock.fetch_add(1, Ordering::SeqCst);

        debug!(session, active_builds = active, affected = affected.len(), "build finished");
        if active == 0 {
            self.try_open();
        }
    }

    /// Open a fresh reader if nothing prevents it. The store is opened
    /// without holding the lock; the swap happens only if no build started
    /// in the meantime.
    fn try_open(&self) -> bool {
        if !self.config.enabled || self.workspace.is_disposed() {
            return false;
        }
        {
            let state = self.read_state();
            if state.reader.is_some() {
                return true;
            }
            if state.disposed || state.active_builds > 0 {
                return false;
            }
        }

        match ReferenceReader::open(&self.index_dir) {
            Ok(reader) => {
                let files = reader.store().file_count();
                let mut state = self.write_state();
                if state.disposed || state.active_builds > 0 || state.reader.is_some() {
                    debug!("discarding reader opened while the lifecycle moved on");
                    return state.reader.is_some();
                }
                state.generation += 1;
                state.faulted = false;
                state.reader = Some(reader);
                info!(
                    generation = state.generation,
                    files,
                    path = %self.index_dir.display(),
                    "reference index opened"
                );
                true
            }
            Err(e) if e.is_absent() => {
                debug!(path = %self.index_dir.display(), reason = %e, "no usable reference index");
                false
            }
            Err(e) => {
                error!(path = %self.index_dir.display(), error = %e, "failed to open reference index");
                if self.config.delete_on_corruption {
                    let state = self.write_state();
                    // A build that started since may already be writing a new index
                    if state.active_builds == 0 && state.reader.is_none() {
                        self.discard_index();
                    }
                }
                false
            }
        }
    }

    /// Close the reader for good; later build sessions will not reopen it
    pub fn dispose(&self) {
        let closed = {
            let mut state = self.write_state();
            state.disposed = true;
            state.reader.take()
        };
        self.scope_cache.clear();
        self.implicit_cache.clear();
        if closed.is_some() {
            info!("reference service disposed, index closed");
        }
    }

    pub fn is_index_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.lifecycle.try_read() {
            Ok(state) => state.reader.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().reader.is_some(),
            Err(TryLockError::WouldBlock) => false,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        let hits = self.scope_cache.hits() + self.implicit_cache.hits();
        let misses = self.scope_cache.misses() + self.implicit_cache.misses();
        let cache_hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f32 / (hits + misses) as f32
        };

        let mut status = ServiceStatus {
            enabled: self.config.enabled,
            open: false,
            busy: false,
            active_builds: 0,
            build_clock: self.build_clock.load(Ordering::SeqCst),
            generation: 0,
            uptime_secs: self.stats.start_time.elapsed().as_secs(),
            queries_served: self.stats.queries_served.load(Ordering::Relaxed),
            storage_faults: self.stats.storage_faults.load(Ordering::Relaxed),
            cache_hit_rate,
            index: None,
        };

        let state = match self.lifecycle.try_read() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                status.busy = true;
                return status;
            }
        };
        status.open = state.reader.is_some();
        status.active_builds = state.active_builds;
        status.generation = state.generation;
        status.index = state.reader.as_ref().map(ReferenceReader::stats);
        status
    }

    // ---- read path ----

    /// Run `query` against the open reader under the shared lock
    fn with_reader<T>(
        &self,
        query: impl FnOnce(&ReferenceReader) -> Result<T, ReaderError>,
    ) -> QueryResult<T> {
        if !self.config.enabled {
            return Err(QueryError::Unavailable(UnavailableReason::Disabled));
        }

        let state = match self.lifecycle.try_read() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("reference index busy");
                return Err(QueryError::Unavailable(UnavailableReason::Busy));
            }
        };
        let Some(reader) = state.reader.as_ref() else {
            let reason = if state.faulted {
                UnavailableReason::StorageFault
            } else {
                UnavailableReason::Closed
            };
            return Err(QueryError::Unavailable(reason));
        };

        let generation = state.generation;
        self.stats.queries_served.fetch_add(1, Ordering::Relaxed);
        let result = query(reader);
        drop(state);

        result.map_err(|e| match e {
            ReaderError::Cancelled => QueryError::Cancelled,
            ReaderError::Storage(err) => {
                self.handle_storage_fault(generation, &err);
                QueryError::Unavailable(UnavailableReason::StorageFault)
            }
        })
    }

    /// Tear the reader of `generation` down. Concurrent queries hitting the
    /// same fault only report it once.
    ///
    /// The index is deleted before the lock is released: an open reader
    /// means no build is running, so the directory still holds the faulty
    /// index and no session can start writing a new one meanwhile.
    fn handle_storage_fault(&self, generation: u64, err: &StorageError) {
        {
            let mut state = self.write_state();
            if state.generation != generation || state.reader.is_none() {
                return;
            }
            state.faulted = true;
            drop(state.reader.take());

            error!(generation, error = %err, "reference index storage fault, closing index");
            if self.config.delete_on_corruption {
                self.discard_index();
            }
        }

        self.stats.storage_faults.fetch_add(1, Ordering::Relaxed);
        self.scope_cache.clear();
        self.implicit_cache.clear();
    }

    fn discard_index(&self) {
        match remove_index(&self.index_dir) {
            Ok(()) => info!(path = %self.index_dir.display(), "removed reference index"),
            Err(e) => warn!(path = %self.index_dir.display(), error = %e, "failed to remove reference index"),
        }
    }

    /// Index keys of `element`. Elements declared outside every module are
    /// library code, so their references are widened to the overriders the
    /// adapter can see.
    fn element_refs(
        &self,
        reader: &ReferenceReader,
        adapter: &dyn LanguageAdapter,
        element: &SourceElement,
    ) -> Option<Vec<SymbolRef>> {
        let refs = adapter.to_refs(element, reader.names())?;
        if self.workspace.module_of(&element.file).is_some() {
            return Some(refs);
        }

        Some(
            refs.iter()
                .flat_map(|r| {
                    adapter.hierarchy_in_library_scope(r, element, reader.names(), &Scope::Library)
                })
                .collect(),
        )
    }

    /// Files of kinds no adapter covers; they are never indexed
    fn untracked_scope(&self) -> Scope {
        Scope::Not(Box::new(Scope::FileKinds(self.adapters.indexed_kinds())))
    }

    /// Add everything the index cannot vouch for
    fn broaden(&self, scope: Scope) -> Scope {
        scope
            .union(Scope::clone(&self.tracker.dirty_scope()))
            .union(self.untracked_scope())
    }

    // ---- derived queries ----

    /// Files that may reference `element`: the indexed referent files plus
    /// the dirty and untracked files. `None` when the element has no index
    /// key or its hierarchy is ambiguous.
    pub fn scope_with_references(
        &self,
        element: &SourceElement,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<Arc<Scope>>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        let epoch = self.epoch();
        if let Some(scope) = self.scope_cache.get(element, epoch) {
            return Ok(scope);
        }

        let referents = self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };

            let mut files = RoaringBitmap::new();
            for r in &refs {
                match reader.find_referent_files(r, false, cancel)? {
                    Some(found) => files |= found,
                    None => {
                        debug!(element = %element, reference = %r, "ambiguous hierarchy");
                        return Ok(None);
                    }
                }
            }
            Ok(Some(files_scope(reader, &files, IndexKind::Usages)?))
        })?;

        let scope = referents.map(|files| Arc::new(self.broaden(files)));
        self.scope_cache.insert(element.clone(), epoch, scope.clone());
        Ok(scope)
    }

    /// Like [`Self::scope_with_references`] over implicit string coercions
    pub fn implicit_to_string_scope(&self, element: &SourceElement) -> QueryResult<Option<Arc<Scope>>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        let epoch = self.epoch();
        if let Some(scope) = self.implicit_cache.get(element, epoch) {
            return Ok(scope);
        }

        let files = self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };
            let mut files = RoaringBitmap::new();
            for r in &refs {
                files |= reader.find_files_with_implicit_to_string(r)?;
            }
            Ok(Some(files_scope(reader, &files, IndexKind::ImplicitToString)?))
        })?;

        let scope = files.map(|files| Arc::new(self.broaden(files)));
        self.implicit_cache.insert(element.clone(), epoch, scope.clone());
        Ok(scope)
    }

    /// Classes directly extending or implementing `element`, found in
    /// clean files of `file_kind` within `search_scope`
    pub fn direct_inheritors(
        &self,
        element: &SourceElement,
        search_scope: &Scope,
        file_kind: FileKind,
    ) -> QueryResult<Option<HierarchyInfo>> {
        self.direct_inheritor_info(element, search_scope, file_kind, CandidateKind::HierarchyElement)
    }

    /// Functional expressions implementing `element`
    pub fn functional_expressions(
        &self,
        element: &SourceElement,
        search_scope: &Scope,
        file_kind: FileKind,
    ) -> QueryResult<Option<HierarchyInfo>> {
        self.direct_inheritor_info(
            element,
            search_scope,
            file_kind,
            CandidateKind::FunctionalExpression,
        )
    }

    fn direct_inheritor_info(
        &self,
        element: &SourceElement,
        search_scope: &Scope,
        file_kind: FileKind,
        kind: CandidateKind,
    ) -> QueryResult<Option<HierarchyInfo>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        let dirty = self.tracker.dirty_scope();
        let workspace = self.workspace.as_ref();

        let candidates = self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };

            let mut candidates: BTreeMap<PathBuf, Vec<CandidateId>> = BTreeMap::new();
            for class in refs.iter().filter_map(SymbolRef::as_class_key) {
                let found = reader.get_direct_inheritor_candidates(
                    class,
                    |path| FileKind::from_path(path) == file_kind && search_scope.contains(path, workspace),
                    |path| dirty.contains(path, workspace),
                    kind,
                )?;
                for (path, ids) in found {
                    candidates.entry(path).or_default().extend(ids);
                }
            }
            Ok(Some(candidates))
        })?;

        Ok(candidates.map(|candidates| HierarchyInfo {
            kind,
            candidates,
            dirty_scope: dirty,
        }))
    }

    /// Map candidates back to live elements and keep the confirmed ones.
    /// Needs no index access.
    pub fn resolve_direct_inheritors(
        &self,
        info: &HierarchyInfo,
        base: &SourceElement,
    ) -> Vec<SourceElement> {
        let mut resolved = Vec::new();
        for (file, ids) in &info.candidates {
            let Some(adapter) = self.adapters.for_path(file) else {
                continue;
            };
            let elements = match info.kind {
                CandidateKind::HierarchyElement => {
                    adapter.find_direct_inheritor_candidates_in_file(ids, file)
                }
                CandidateKind::FunctionalExpression => {
                    adapter.find_functional_expressions_in_file(ids, file)
                }
            };
            resolved.extend(
                elements
                    .into_iter()
                    .filter(|candidate| adapter.is_direct_inheritor(candidate, base)),
            );
        }
        resolved
    }

    /// How often `element` is used.
    ///
    /// With `constructor_heuristic` a class counts the uses of its
    /// instantiable constructors plus its anonymous instantiations (the
    /// children recorded below a uniquely defined class). Constructors the
    /// index has no key for contribute nothing.
    ///
    /// `None` when the element is not indexable or its own file is dirty.
    pub fn occurrence_count(
        &self,
        element: &SourceElement,
        constructor_heuristic: bool,
    ) -> QueryResult<Option<u32>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        if self
            .tracker
            .dirty_scope()
            .contains(&element.file, self.workspace.as_ref())
        {
            return Ok(None);
        }

        let constructors = (constructor_heuristic && adapter.is_class(element))
            .then(|| adapter.instantiable_constructors(element));

        self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };

            let Some(constructors) = constructors else {
                let mut total = 0u32;
                for r in &refs {
                    total = total.saturating_add(reader.get_occurrence_count(r)?);
                }
                return Ok(Some(total));
            };

            let Some(class) = refs.iter().find_map(SymbolRef::as_class_key) else {
                return Ok(None);
            };
            let mut total = reader.get_anonymous_member_count(class, true)?.unwrap_or(0);
            for constructor in &constructors {
                let Some(refs) = self.element_refs(reader, &**adapter, constructor) else {
                    continue;
                };
                for r in &refs {
                    total = total.saturating_add(reader.get_occurrence_count(r)?);
                }
            }
            Ok(Some(total))
        })
    }

    /// The type most often cast from `element` (a class), counted over
    /// clean files only
    pub fn most_probable_cast_operand(
        &self,
        element: &SourceElement,
    ) -> QueryResult<Option<CastOperand>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        let dirty = self.tracker.dirty_scope();
        let workspace = self.workspace.as_ref();

        self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };
            let Some(cast_type) = refs.into_iter().find(|r| r.as_class_key().is_some()) else {
                return Ok(None);
            };

            let filter: Option<RoaringBitmap> = if dirty.is_empty() {
                None
            } else {
                Some(
                    reader
                        .all_file_ids()
                        .iter()
                        .filter(|&id| {
                            reader
                                .file_path(id)
                                .is_some_and(|path| !dirty.contains(path, workspace))
                        })
                        .collect(),
                )
            };

            let counter = reader.get_type_cast_operands(&cast_type, filter.as_ref())?;
            Ok(counter.best().map(|operand| CastOperand {
                operand: *operand,
                qualified_name: describe_ref(reader.names(), operand),
                occurrences: counter.best_occurrences(),
            }))
        })
    }

    /// Members recorded for a return/parameter type signature, described
    /// as `Owner#member`
    pub fn members_for_signature(
        &self,
        type_name: &str,
        iterator_kind: u8,
        is_generic: bool,
    ) -> QueryResult<Vec<String>> {
        self.with_reader(|reader| {
            let Some(type_id) = reader.names().enumerate(type_name) else {
                return Ok(Vec::new());
            };
            let sig = SignatureData::new(type_id, iterator_kind, is_generic);
            let members = reader.get_members_for_signature(sig)?;
            Ok(members
                .iter()
                .filter_map(|member| describe_ref(reader.names(), member))
                .collect())
        })
    }

    /// Qualified names of every class in the hierarchy below `element`,
    /// root first. Bounded by the configured hierarchy limit.
    pub fn class_hierarchy(
        &self,
        element: &SourceElement,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<Vec<String>>> {
        let Some(adapter) = self.adapters.for_element(element) else {
            return Ok(None);
        };
        let limit = self.config.hierarchy_limit;

        self.with_reader(|reader| {
            let Some(refs) = self.element_refs(reader, &**adapter, element) else {
                return Ok(None);
            };
            let Some(root) = refs.iter().find_map(SymbolRef::as_class_key) else {
                return Ok(None);
            };

            let Some(classes) = reader
                .get_hierarchy(root, false, true, limit, cancel)?
                .into_option()
            else {
                return Ok(None);
            };

            let names = classes
                .into_iter()
                .map(|class| {
                    reader
                        .names()
                        .name(class.name())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            StorageError::corrupted(
                                IndexKind::Hierarchy,
                                format!("unknown name id {}", class.name()),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(names))
        })
    }
}

/// Resolve a set of file ids into a file scope
fn files_scope(
    reader: &ReferenceReader,
    files: &RoaringBitmap,
    kind: IndexKind,
) -> Result<Scope, StorageError> {
    let mut paths = Vec::with_capacity(files.len() as usize);
    for id in files {
        let path = reader
            .file_path(id)
            .ok_or_else(|| StorageError::corrupted(kind, format!("unknown file id {}", id)))?;
        paths.push(path.to_path_buf());
    }
    Ok(Scope::files(paths))
}

/// Human-readable form of a reference, `None` if a name is missing
fn describe_ref(names: &NameTable, r: &SymbolRef) -> Option<String> {
    let name = |id| names.name(id);
    match *r {
        SymbolRef::Class { name: id } | SymbolRef::AnonymousClass { ordinal: id } => {
            name(id).map(str::to_string)
        }
        SymbolRef::Field { owner, name: field } => Some(format!("{}#{}", name(owner)?, name(field)?)),
        SymbolRef::Method {
            owner,
            name: method,
            params,
        } => Some(format!("{}#{}/{}", name(owner)?, name(method)?, params)),
        SymbolRef::FunctionalExpr { owner, ordinal } => {
            Some(format!("{}::lambda#{}", name(owner)?, ordinal))
        }
    }
}
