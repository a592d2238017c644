//! Point-in-time queries over one opened index.
//!
//! A [`ReferenceReader`] owns its [`IndexedStore`] and never mutates it.
//! Storage faults are returned to the caller untouched; deciding whether the
//! index must be torn down is the service's job.

use crate::error::{ReaderError, StorageError};
use crate::index::stats::IndexStats;
use crate::index::store::{IndexedStore, NameTable};
use crate::index::types::*;
use crate::query::{
    traverse, CancellationToken, HierarchyQuery, HierarchyResult, HierarchySource,
    OccurrenceCounter,
};
use roaring::RoaringBitmap;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

impl HierarchySource for IndexedStore {
    fn children(&self, node: ClassKey) -> Result<Vec<SymbolRef>, StorageError> {
        let entries = self.get(IndexKind::Hierarchy, node)?;
        Ok(entries
            .into_iter()
            .flat_map(|(_, value)| match value {
                IndexValue::Refs(refs) => refs,
                _ => Vec::new(),
            })
            .collect())
    }

    fn has_multiple_definitions(&self, node: ClassKey) -> Result<bool, StorageError> {
        self.has_multiple_values(IndexKind::ClassDefs, node)
    }
}

/// Query engine over one immutable index snapshot
pub struct ReferenceReader {
    store: IndexedStore,
}

impl ReferenceReader {
    /// Open the index stored in `index_path`
    pub fn open(index_path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            store: IndexedStore::open(index_path)?,
        })
    }

    pub fn store(&self) -> &IndexedStore {
        &self.store
    }

    pub fn names(&self) -> &NameTable {
        self.store.names()
    }

    pub fn file_path(&self, file_id: FileId) -> Option<&Path> {
        self.store.file_path(file_id)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(&self.store)
    }

    fn usage_files(&self, r: SymbolRef, into: &mut RoaringBitmap) -> Result<(), StorageError> {
        for (file_id, value) in self.store.get(IndexKind::Usages, r)? {
            if value.weight() > 0 {
                into.insert(file_id);
            }
        }
        Ok(())
    }

    /// Files that may reference `r`, following overrides through the owner's
    /// hierarchy for member references.
    ///
    /// `None` means the owner hierarchy is ambiguous: "don't know", not
    /// "no usages".
    pub fn find_referent_files(
        &self,
        r: &SymbolRef,
        check_ambiguity: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<RoaringBitmap>, ReaderError> {
        let hierarchy = match (r.as_class_key(), r.owner()) {
            (Some(class), _) => vec![class],
            (None, Some(owner)) => {
                let query = HierarchyQuery {
                    check_ambiguity,
                    include_anonymous: true,
                    interrupt_after: None,
                };
                match traverse(&self.store, ClassKey::Named(owner), &query, cancel)? {
                    HierarchyResult::Found(classes) => classes,
                    HierarchyResult::Ambiguous => return Ok(None),
                }
            }
            (None, None) => Vec::new(),
        };

        let mut files = RoaringBitmap::new();
        for class in hierarchy {
            let target = match r.as_class_key() {
                Some(_) => *r,
                None => r.override_owner(class.name()),
            };
            self.usage_files(target, &mut files)?;
        }
        Ok(Some(files))
    }

    /// Files with an implicit string coercion of `r` (no hierarchy expansion)
    pub fn find_files_with_implicit_to_string(
        &self,
        r: &SymbolRef,
    ) -> Result<RoaringBitmap, StorageError> {
        Ok(self
            .store
            .get(IndexKind::ImplicitToString, *r)?
            .into_iter()
            .map(|(file_id, _)| file_id)
            .collect())
    }

    /// Direct children of `class` grouped by the file declaring them,
    /// restricted to files accepted by `search` and not matched by `exclude`.
    ///
    /// Candidates must be re-verified against live source; an empty map is a
    /// valid answer.
    pub fn get_direct_inheritor_candidates(
        &self,
        class: ClassKey,
        search: impl Fn(&Path) -> bool,
        exclude: impl Fn(&Path) -> bool,
        kind: CandidateKind,
    ) -> Result<BTreeMap<PathBuf, Vec<CandidateId>>, StorageError> {
        let mut candidates: BTreeMap<PathBuf, Vec<CandidateId>> = BTreeMap::new();

        for (file_id, value) in self.store.get(IndexKind::Hierarchy, class)? {
            let children: Vec<&SymbolRef> =
                value.refs().iter().filter(|c| kind.matches(c)).collect();
            if children.is_empty() {
                continue;
            }

            let path = self.store.file_path(file_id).ok_or_else(|| {
                StorageError::corrupted(IndexKind::Hierarchy, format!("unknown file id {}", file_id))
            })?;
            if !search(path) || exclude(path) {
                continue;
            }

            let ids = children
                .into_iter()
                .map(|child| self.candidate_id(child))
                .collect::<Result<Vec<_>, _>>()?;
            candidates.entry(path.to_path_buf()).or_default().extend(ids);
        }

        Ok(candidates)
    }

    fn candidate_id(&self, child: &SymbolRef) -> Result<CandidateId, StorageError> {
        let name = |id: NameId| {
            self.names().name(id).map(str::to_string).ok_or_else(|| {
                StorageError::corrupted(IndexKind::Hierarchy, format!("unknown name id {}", id))
            })
        };

        match *child {
            SymbolRef::Class { name: id } => Ok(CandidateId::Named(name(id)?)),
            SymbolRef::AnonymousClass { ordinal } => Ok(CandidateId::Anonymous(name(ordinal)?)),
            SymbolRef::FunctionalExpr { ordinal, .. } => Ok(CandidateId::FunctionalExpr(ordinal)),
            other => Err(StorageError::corrupted(
                IndexKind::Hierarchy,
                format!("member {} stored as hierarchy child", other),
            )),
        }
    }

    /// Number of definition sites of a class
    pub fn definition_count(&self, class: ClassKey) -> Result<u32, StorageError> {
        Ok(self
            .store
            .get(IndexKind::ClassDefs, class)?
            .iter()
            .map(|(_, v)| v.weight())
            .sum())
    }

    /// Total number of children recorded below `class`.
    ///
    /// With `check_unique_definition`, classes with zero or several
    /// definitions yield `None`.
    pub fn get_anonymous_member_count(
        &self,
        class: ClassKey,
        check_unique_definition: bool,
    ) -> Result<Option<u32>, StorageError> {
        if check_unique_definition && self.definition_count(class)? != 1 {
            return Ok(None);
        }

        Ok(Some(
            self.store
                .get(IndexKind::Hierarchy, class)?
                .iter()
                .map(|(_, v)| v.weight())
                .sum(),
        ))
    }

    /// Sum of per-file occurrence counters of `r`
    pub fn get_occurrence_count(&self, r: &SymbolRef) -> Result<u32, StorageError> {
        Ok(self
            .store
            .get(IndexKind::Usages, *r)?
            .iter()
            .map(|(_, v)| v.weight())
            .sum())
    }

    /// Breadth-first hierarchy below `root` (see [`traverse`])
    pub fn get_hierarchy(
        &self,
        root: ClassKey,
        check_ambiguity: bool,
        include_anonymous: bool,
        interrupt_after: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<HierarchyResult, ReaderError> {
        let query = HierarchyQuery {
            check_ambiguity,
            include_anonymous,
            interrupt_after,
        };
        traverse(&self.store, root, &query, cancel)
    }

    /// Named classes directly below `class`
    pub fn get_direct_inheritors(&self, class: ClassKey) -> Result<BTreeSet<ClassKey>, StorageError> {
        Ok(self
            .store
            .children(class)?
            .into_iter()
            .filter_map(|child| match child {
                SymbolRef::Class { name } => Some(ClassKey::Named(name)),
                _ => None,
            })
            .collect())
    }

    /// Every member recorded for a signature, across files
    pub fn get_members_for_signature(&self, sig: SignatureData) -> Result<Vec<SymbolRef>, StorageError> {
        Ok(self
            .store
            .get(IndexKind::Signatures, sig)?
            .into_iter()
            .flat_map(|(_, value)| match value {
                IndexValue::Refs(refs) => refs,
                _ => Vec::new(),
            })
            .collect())
    }

    /// Files whose usage bucket for `r` is non-empty
    pub fn get_all_containing_file_ids(&self, r: &SymbolRef) -> Result<RoaringBitmap, StorageError> {
        let mut files = RoaringBitmap::new();
        self.usage_files(*r, &mut files)?;
        Ok(files)
    }

    /// Feed every operand type cast to `cast_type` into an occurrence
    /// counter, skipping files outside `file_filter` when one is given
    pub fn get_type_cast_operands(
        &self,
        cast_type: &SymbolRef,
        file_filter: Option<&RoaringBitmap>,
    ) -> Result<OccurrenceCounter<SymbolRef>, StorageError> {
        let mut counter = OccurrenceCounter::new();
        for (file_id, value) in self.store.get(IndexKind::Casts, *cast_type)? {
            if file_filter.is_some_and(|filter| !filter.contains(file_id)) {
                continue;
            }
            counter.extend(value.refs().iter().copied());
        }
        Ok(counter)
    }

    /// Every file id known to the index
    pub fn all_file_ids(&self) -> RoaringBitmap {
        (0..self.store.file_count() as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::IndexWriter;
    use tempfile::TempDir;

    /// Base <- Mid <- Leaf, plus an anonymous subclass of Mid and a lambda
    /// implementing Base. `run` is overridden in Mid and called in three files.
    struct Fixture {
        _tmp: TempDir,
        reader: ReferenceReader,
        base: NameId,
        mid: NameId,
        leaf: NameId,
        anon: NameId,
        run: NameId,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let mut w = IndexWriter::new(tmp.path());
        let base = w.intern("app.Base");
        let mid = w.intern("app.Mid");
        let leaf = w.intern("app.Leaf");
        let anon = w.intern("app.Main$1");
        let run = w.intern("run");
        let text = w.intern("java.lang.String");

        let f_base = w.add_file("src/Base.java");
        let f_mid = w.add_file("src/Mid.java");
        let f_leaf = w.add_file("src/Leaf.java");
        let f_main = w.add_file("src/Main.java");
        let f_other = w.add_file("src/Other.java");

        w.add_class_definition(f_base, ClassKey::Named(base));
        w.add_class_definition(f_mid, ClassKey::Named(mid));
        w.add_class_definition(f_leaf, ClassKey::Named(leaf));
        w.add_class_definition(f_main, ClassKey::Anonymous(anon));

        w.add_inheritor(f_mid, ClassKey::Named(base), SymbolRef::class(mid));
        w.add_inheritor(f_main, ClassKey::Named(base), SymbolRef::functional_expr(base, 0));
        w.add_inheritor(f_leaf, ClassKey::Named(mid), SymbolRef::class(leaf));
        w.add_inheritor(f_main, ClassKey::Named(mid), SymbolRef::anonymous(anon));

        w.add_usage(f_main, SymbolRef::method(base, run, 0));
        w.add_usages(f_other, SymbolRef::method(mid, run, 0), 3);
        w.add_usage(f_leaf, SymbolRef::method(leaf, run, 0));

        w.add_implicit_to_string(f_other, SymbolRef::class(leaf));
        w.add_signature_member(f_mid, SignatureData::new(text, 0, false), SymbolRef::method(mid, run, 0));

        w.add_cast(f_main, SymbolRef::class(leaf), SymbolRef::class(base));
        w.add_cast(f_other, SymbolRef::class(leaf), SymbolRef::class(mid));
        w.write().unwrap();

        let reader = ReferenceReader::open(tmp.path()).unwrap();
        Fixture {
            _tmp: tmp,
            reader,
            base,
            mid,
            leaf,
            anon,
            run,
        }
    }

    fn paths(reader: &ReferenceReader, files: &RoaringBitmap) -> Vec<String> {
        files
            .iter()
            .map(|id| reader.file_path(id).unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn test_member_usages_follow_hierarchy() {
        let f = fixture();
        let files = f
            .reader
            .find_referent_files(
                &SymbolRef::method(f.base, f.run, 0),
                false,
                &CancellationToken::new(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            paths(&f.reader, &files),
            vec!["src/Leaf.java", "src/Main.java", "src/Other.java"]
        );

        // Starting lower in the hierarchy does not see the Base call site
        let files = f
            .reader
            .find_referent_files(
                &SymbolRef::method(f.mid, f.run, 0),
                false,
                &CancellationToken::new(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(paths(&f.reader, &files), vec!["src/Leaf.java", "src/Other.java"]);
    }

    #[test]
    fn test_usage_union_matches_hierarchy() {
        let f = fixture();
        let method = SymbolRef::method(f.base, f.run, 0);
        let token = CancellationToken::new();

        let hierarchy = f
            .reader
            .get_hierarchy(ClassKey::Named(f.base), false, true, None, &token)
            .unwrap()
            .into_option()
            .unwrap();
        let mut expected = RoaringBitmap::new();
        for class in hierarchy {
            expected |= f
                .reader
                .get_all_containing_file_ids(&method.override_owner(class.name()))
                .unwrap();
        }

        let actual = f.reader.find_referent_files(&method, false, &token).unwrap();
        assert_eq!(actual, Some(expected));
    }

    #[test]
    fn test_ambiguous_hierarchy_propagates() {
        let tmp = TempDir::new().unwrap();
        let mut w = IndexWriter::new(tmp.path());
        let base = w.intern("Base");
        let child = w.intern("Child");
        let run = w.intern("run");
        let a = w.add_file("a/Child.java");
        let b = w.add_file("b/Child.java");
        w.add_class_definition(a, ClassKey::Named(child));
        w.add_class_definition(b, ClassKey::Named(child));
        w.add_inheritor(a, ClassKey::Named(base), SymbolRef::class(child));
        w.add_usage(a, SymbolRef::method(base, run, 0));
        w.write().unwrap();

        let reader = ReferenceReader::open(tmp.path()).unwrap();
        let token = CancellationToken::new();
        assert!(reader
            .get_hierarchy(ClassKey::Named(base), false, true, None, &token)
            .unwrap()
            .is_ambiguous());
        assert_eq!(
            reader
                .find_referent_files(&SymbolRef::method(base, run, 0), false, &token)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_class_reference_is_its_own_hierarchy() {
        let f = fixture();
        let files = f
            .reader
            .find_referent_files(&SymbolRef::class(f.mid), true, &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_direct_inheritors_are_named_only() {
        let f = fixture();
        let direct = f.reader.get_direct_inheritors(ClassKey::Named(f.mid)).unwrap();
        assert_eq!(direct, [ClassKey::Named(f.leaf)].into_iter().collect());

        let leaf_children = f.reader.get_direct_inheritors(ClassKey::Named(f.leaf)).unwrap();
        assert!(leaf_children.is_empty());
    }

    #[test]
    fn test_direct_inheritor_candidates_filtering() {
        let f = fixture();

        let classes = f
            .reader
            .get_direct_inheritor_candidates(
                ClassKey::Named(f.mid),
                |_| true,
                |_| false,
                CandidateKind::HierarchyElement,
            )
            .unwrap();
        assert_eq!(
            classes.get(Path::new("src/Leaf.java")),
            Some(&vec![CandidateId::Named("app.Leaf".to_string())])
        );
        assert_eq!(
            classes.get(Path::new("src/Main.java")),
            Some(&vec![CandidateId::Anonymous("app.Main$1".to_string())])
        );

        let excluded = f
            .reader
            .get_direct_inheritor_candidates(
                ClassKey::Named(f.mid),
                |_| true,
                |p| p.ends_with("Main.java"),
                CandidateKind::HierarchyElement,
            )
            .unwrap();
        assert_eq!(excluded.len(), 1);

        let lambdas = f
            .reader
            .get_direct_inheritor_candidates(
                ClassKey::Named(f.base),
                |_| true,
                |_| false,
                CandidateKind::FunctionalExpression,
            )
            .unwrap();
        assert_eq!(
            lambdas.get(Path::new("src/Main.java")),
            Some(&vec![CandidateId::FunctionalExpr(0)])
        );

        let outside = f
            .reader
            .get_direct_inheritor_candidates(
                ClassKey::Named(f.mid),
                |p| p.starts_with("test"),
                |_| false,
                CandidateKind::HierarchyElement,
            )
            .unwrap();
        assert!(outside.is_empty());
    }

    #[test]
    fn test_anonymous_member_count() {
        let f = fixture();
        assert_eq!(
            f.reader.get_anonymous_member_count(ClassKey::Named(f.mid), true).unwrap(),
            Some(2)
        );
        // No definition recorded for an unknown class
        assert_eq!(
            f.reader.get_anonymous_member_count(ClassKey::Named(9999), true).unwrap(),
            None
        );
        assert_eq!(
            f.reader.get_anonymous_member_count(ClassKey::Named(9999), false).unwrap(),
            Some(0)
        );
        assert_eq!(f.reader.definition_count(ClassKey::Anonymous(f.anon)).unwrap(), 1);
    }

    #[test]
    fn test_occurrence_count_sums_files() {
        let f = fixture();
        assert_eq!(
            f.reader.get_occurrence_count(&SymbolRef::method(f.mid, f.run, 0)).unwrap(),
            3
        );
        assert_eq!(
            f.reader.get_occurrence_count(&SymbolRef::method(f.leaf, 12345, 0)).unwrap(),
            0
        );
    }

    #[test]
    fn test_signature_and_implicit_to_string() {
        let f = fixture();
        let text = f.reader.names().enumerate("java.lang.String").unwrap();
        assert_eq!(
            f.reader.get_members_for_signature(SignatureData::new(text, 0, false)).unwrap(),
            vec![SymbolRef::method(f.mid, f.run, 0)]
        );

        let files = f
            .reader
            .find_files_with_implicit_to_string(&SymbolRef::class(f.leaf))
            .unwrap();
        assert_eq!(paths(&f.reader, &files), vec!["src/Other.java"]);
    }

    #[test]
    fn test_type_cast_operands_with_filter() {
        let f = fixture();
        let cast = SymbolRef::class(f.leaf);

        let all = f.reader.get_type_cast_operands(&cast, None).unwrap();
        // Files are scanned in id order, so Other.java's operand comes last
        assert_eq!(all.best(), Some(&SymbolRef::class(f.mid)));
        assert_eq!(all.best_occurrences(), 1);

        let main_only: RoaringBitmap = [3u32].into_iter().collect();
        let filtered = f.reader.get_type_cast_operands(&cast, Some(&main_only)).unwrap();
        assert_eq!(filtered.best(), Some(&SymbolRef::class(f.base)));

        let none = RoaringBitmap::new();
        assert!(f.reader.get_type_cast_operands(&cast, Some(&none)).unwrap().is_empty());
    }

    #[test]
    fn test_all_file_ids() {
        let f = fixture();
        assert_eq!(f.reader.all_file_ids().len(), 5);
    }
}
