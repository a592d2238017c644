//! Memory-mapped multi-map store produced by the build.
//!
//! Layout of an index directory:
//!
//! ```text
//! meta.json                 version, counts, creation time
//! files.bin                 FileId -> relative path
//! names.bin                 NameId -> name
//! <index>.dict              sorted key bytes -> (offset, length, file count)
//! <index>.postings          concatenated buckets (see `codec`)
//! ```

use crate::error::StorageError;
use crate::index::codec::{decode_bucket, IndexKey};
use crate::index::types::*;
use crate::utils::{read_str, read_u16_le, read_u32_le, read_u64_le, META_FILE};
use memmap2::Mmap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub const FILES_FILE: &str = "files.bin";
pub const NAMES_FILE: &str = "names.bin";

/// Dictionary entry of one index
struct DictEntry {
    key: Vec<u8>,
    offset: u64,
    length: u32,
    file_count: u32,
}

/// Sorted key dictionary
struct Dict {
    entries: Vec<DictEntry>,
}

impl Dict {
    fn lookup(&self, key: &[u8]) -> Option<&DictEntry> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }
}

/// One named multi-map: dictionary in memory, postings mapped
struct MultiMap {
    kind: IndexKind,
    dict: Dict,
    /// None when the index has no entries (empty files cannot be mapped everywhere)
    postings: Option<Mmap>,
}

impl MultiMap {
    fn open(index_path: &Path, kind: IndexKind) -> Result<Self, StorageError> {
        let dict = read_dict(index_path, kind)?;

        let postings_path = index_path.join(format!("{}.postings", kind.file_stem()));
        let postings = if dict.entries.is_empty() || !postings_path.exists() {
            None
        } else {
            let file = File::open(&postings_path)?;
            // SAFETY: the index directory is only rewritten by a build session,
            // and the service closes every reader before a build starts.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            kind,
            dict,
            postings,
        })
    }

    fn bucket(&self, entry: &DictEntry) -> Result<&[u8], StorageError> {
        bucket_slice(self.kind, self.postings.as_deref().unwrap_or(&[]), entry)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<(FileId, IndexValue)>, StorageError> {
        match self.dict.lookup(key) {
            Some(entry) => decode_bucket(self.kind, self.bucket(entry)?),
            None => Ok(Vec::new()),
        }
    }

    fn has_multiple_values(&self, key: &[u8]) -> Result<bool, StorageError> {
        match self.dict.lookup(key) {
            None => Ok(false),
            Some(entry) if entry.file_count > 1 => Ok(true),
            Some(entry) => {
                let entries = decode_bucket(self.kind, self.bucket(entry)?)?;
                Ok(entries.iter().map(|(_, v)| v.weight()).sum::<u32>() > 1)
            }
        }
    }
}

/// Read-only name enumerator of an open index.
///
/// Adapters use it to turn qualified names into [`NameId`]s. Names that
/// never made it into the index have no id, which simply means nothing in
/// the index refers to them.
#[derive(Debug, Default)]
pub struct NameTable {
    names: Vec<String>,
    ids: FxHashMap<String, NameId>,
}

impl NameTable {
    fn new(names: Vec<String>) -> Self {
        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as NameId))
            .collect();
        Self { names, ids }
    }

    /// Id of an already interned name
    pub fn enumerate(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// Name behind an id
    pub fn name(&self, id: NameId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The opened index directory
pub struct IndexedStore {
    index_path: PathBuf,
    pub meta: IndexMeta,
    files: Vec<PathBuf>,
    names: NameTable,
    /// Ordered as [`IndexKind::ALL`]
    maps: Vec<MultiMap>,
}

impl IndexedStore {
    /// Open an index directory, loading dictionaries in parallel.
    ///
    /// A missing directory or a version mismatch is reported through
    /// [`StorageError::is_absent`].
    pub fn open(index_path: &Path) -> Result<Self, StorageError> {
        let meta_path = index_path.join(META_FILE);
        if !meta_path.exists() {
            return Err(StorageError::Missing(index_path.to_path_buf()));
        }

        let meta: IndexMeta = serde_json::from_reader(BufReader::new(File::open(&meta_path)?))?;
        if meta.version != INDEX_VERSION {
            return Err(StorageError::VersionMismatch {
                found: meta.version,
                expected: INDEX_VERSION,
            });
        }

        let ((files, names), maps) = rayon::join(
            || {
                rayon::join(
                    || read_string_table(&index_path.join(FILES_FILE)),
                    || read_string_table(&index_path.join(NAMES_FILE)),
                )
            },
            || {
                IndexKind::ALL
                    .par_iter()
                    .map(|&kind| MultiMap::open(index_path, kind))
                    .collect::<Result<Vec<_>, _>>()
            },
        );

        let files = files?.into_iter().map(PathBuf::from).collect();
        let names = NameTable::new(names?);
        let maps = maps?;

        Ok(Self {
            index_path: index_path.to_path_buf(),
            meta,
            files,
            names,
            maps,
        })
    }

    fn map(&self, kind: IndexKind) -> &MultiMap {
        // maps is built from IndexKind::ALL, so every kind has a slot
        &self.maps[IndexKind::ALL.iter().position(|k| *k == kind).unwrap_or(0)]
    }

    /// All `(file, value)` entries of `key` in the `kind` index
    pub fn get(
        &self,
        kind: IndexKind,
        key: impl Into<IndexKey>,
    ) -> Result<Vec<(FileId, IndexValue)>, StorageError> {
        self.map(kind).get(&key.into().encode())
    }

    /// Whether `key` exists with more than one value (across or within files)
    pub fn has_multiple_values(
        &self,
        kind: IndexKind,
        key: impl Into<IndexKey>,
    ) -> Result<bool, StorageError> {
        self.map(kind).has_multiple_values(&key.into().encode())
    }

    /// Number of distinct keys in one index
    pub fn key_count(&self, kind: IndexKind) -> usize {
        self.map(kind).dict.entries.len()
    }

    /// Relative path of a file id
    pub fn file_path(&self, file_id: FileId) -> Option<&Path> {
        self.files.get(file_id as usize).map(PathBuf::as_path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

/// Read a count-prefixed table of strings (files.bin / names.bin)
fn read_string_table(path: &Path) -> Result<Vec<String>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut file = BufReader::new(File::open(path)?);
    let count = read_u32_le(&mut file)? as usize;

    let mut table = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        table.push(read_str(&mut file)?);
    }
    Ok(table)
}

/// Postings bytes of one dictionary entry
fn bucket_slice<'a>(
    kind: IndexKind,
    postings: &'a [u8],
    entry: &DictEntry,
) -> Result<&'a [u8], StorageError> {
    let range = usize::try_from(entry.offset)
        .ok()
        .and_then(|start| Some(start..start.checked_add(entry.length as usize)?));
    range
        .and_then(|range| postings.get(range))
        .ok_or_else(|| {
            StorageError::corrupted(
                kind,
                format!(
                    "bucket at offset {} (+{}) outside postings of {} bytes",
                    entry.offset,
                    entry.length,
                    postings.len()
                ),
            )
        })
}

/// Read the dictionary of one index
fn read_dict(index_path: &Path, kind: IndexKind) -> Result<Dict, StorageError> {
    let dict_path = index_path.join(format!("{}.dict", kind.file_stem()));

    if !dict_path.exists() {
        return Ok(Dict {
            entries: Vec::new(),
        });
    }

    parse_dict(kind, &mut BufReader::new(File::open(&dict_path)?))
}

fn parse_dict<R: Read>(kind: IndexKind, file: &mut R) -> Result<Dict, StorageError> {
    let count = read_u32_le(file)? as usize;

    let mut entries = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let key_len = read_u16_le(file)? as usize;
        let mut key = vec![0u8; key_len];
        file.read_exact(&mut key)?;

        let offset = read_u64_le(file)?;
        let length = read_u32_le(file)?;
        let file_count = read_u32_le(file)?;

        entries.push(DictEntry {
            key,
            offset,
            length,
            file_count,
        });
    }

    // Written from a BTreeMap, so already sorted; verify rather than trust
    if entries.windows(2).any(|w| w[0].key >= w[1].key) {
        return Err(StorageError::corrupted(kind, "dictionary keys out of order"));
    }

    Ok(Dict { entries })
}

/// Decode a `.dict` / `.postings` pair completely and return the number of
/// keys. Every bucket is located and decoded, so any corruption the store
/// would hit lazily is reported here up front.
pub fn verify_index(kind: IndexKind, dict: &[u8], postings: &[u8]) -> Result<usize, StorageError> {
    let dict = parse_dict(kind, &mut &dict[..])?;
    for entry in &dict.entries {
        decode_bucket(kind, bucket_slice(kind, postings, entry)?)?;
    }
    Ok(dict.entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::IndexWriter;
    use std::fs;
    use tempfile::TempDir;

    fn build_store(dir: &Path) -> IndexedStore {
        let mut writer = IndexWriter::new(dir);
        let base = writer.intern("com.example.Base");
        let child = writer.intern("com.example.Child");
        let a = writer.add_file("src/A.java");
        let b = writer.add_file("src/B.java");

        writer.add_class_definition(a, ClassKey::Named(base));
        writer.add_class_definition(b, ClassKey::Named(child));
        writer.add_inheritor(b, ClassKey::Named(base), SymbolRef::class(child));
        writer.add_usage(a, SymbolRef::class(child));
        writer.add_usage(a, SymbolRef::class(child));
        writer.add_usage(b, SymbolRef::class(child));
        writer.write().unwrap();

        IndexedStore::open(dir).unwrap()
    }

    #[test]
    fn test_open_and_lookup() {
        let tmp = TempDir::new().unwrap();
        let store = build_store(tmp.path());

        let base = store.names().enumerate("com.example.Base").unwrap();
        let child = store.names().enumerate("com.example.Child").unwrap();
        assert_eq!(store.names().name(child), Some("com.example.Child"));

        let usages = store.get(IndexKind::Usages, SymbolRef::class(child)).unwrap();
        assert_eq!(usages, vec![(0, IndexValue::Count(2)), (1, IndexValue::Count(1))]);

        let children = store.get(IndexKind::Hierarchy, ClassKey::Named(base)).unwrap();
        assert_eq!(
            children,
            vec![(1, IndexValue::Refs(vec![SymbolRef::class(child)]))]
        );

        assert_eq!(store.file_path(1), Some(Path::new("src/B.java")));
        assert_eq!(store.file_path(7), None);
        assert_eq!(store.file_count(), 2);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = build_store(tmp.path());
        assert!(store.get(IndexKind::Casts, SymbolRef::class(99)).unwrap().is_empty());
        assert!(!store.has_multiple_values(IndexKind::ClassDefs, ClassKey::Named(99)).unwrap());
    }

    #[test]
    fn test_missing_index_is_absent() {
        let tmp = TempDir::new().unwrap();
        let err = IndexedStore::open(&tmp.path().join("nothing")).err().unwrap();
        assert!(err.is_absent());
    }

    #[test]
    fn test_version_mismatch_is_absent() {
        let tmp = TempDir::new().unwrap();
        build_store(tmp.path());

        let meta = IndexMeta {
            version: INDEX_VERSION + 1,
            ..Default::default()
        };
        fs::write(
            tmp.path().join(META_FILE),
            serde_json::to_string(&meta).unwrap(),
        )
        .unwrap();

        let err = IndexedStore::open(tmp.path()).err().unwrap();
        assert!(matches!(err, StorageError::VersionMismatch { .. }));
        assert!(err.is_absent());
    }

    #[test]
    fn test_dict_offset_overflow_is_corruption() {
        let tmp = TempDir::new().unwrap();
        build_store(tmp.path());

        // usages.dict holds one key: count, key len, key, then the offset
        let dict_path = tmp.path().join("usages.dict");
        let mut dict = fs::read(&dict_path).unwrap();
        let key_len = u16::from_le_bytes([dict[4], dict[5]]) as usize;
        let offset_at = 6 + key_len;
        dict[offset_at..offset_at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        fs::write(&dict_path, &dict).unwrap();

        let store = IndexedStore::open(tmp.path()).unwrap();
        let child = store.names().enumerate("com.example.Child").unwrap();
        let err = store.get(IndexKind::Usages, SymbolRef::class(child)).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { index: IndexKind::Usages, .. }));

        let postings = fs::read(tmp.path().join("usages.postings")).unwrap();
        assert!(verify_index(IndexKind::Usages, &dict, &postings).is_err());
    }

    #[test]
    fn test_verify_index() {
        let tmp = TempDir::new().unwrap();
        build_store(tmp.path());
        let dict = fs::read(tmp.path().join("usages.dict")).unwrap();
        let postings = fs::read(tmp.path().join("usages.postings")).unwrap();

        assert_eq!(verify_index(IndexKind::Usages, &dict, &postings).unwrap(), 1);
        assert!(verify_index(IndexKind::Usages, &dict[..dict.len() - 1], &postings).is_err());
        assert!(verify_index(IndexKind::Usages, &dict, &[]).is_err());
        assert!(verify_index(IndexKind::Usages, &[], &[]).is_err());
    }

    #[test]
    fn test_truncated_postings_is_corruption() {
        let tmp = TempDir::new().unwrap();
        build_store(tmp.path());
        fs::write(tmp.path().join("usages.postings"), [0u8; 1]).unwrap();

        let store = IndexedStore::open(tmp.path()).unwrap();
        let child = store.names().enumerate("com.example.Child").unwrap();
        let err = store.get(IndexKind::Usages, SymbolRef::class(child)).unwrap_err();
        assert!(!err.is_absent());
    }
}
