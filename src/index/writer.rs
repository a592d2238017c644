use crate::index::codec::{encode_bucket, IndexKey};
use crate::index::types::*;
use crate::utils::{write_str, write_u16_le, write_u32_le, write_u64_le, META_FILE};
use crate::index::store::{FILES_FILE, NAMES_FILE};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Postings accumulated for one index: encoded key -> file -> value
type Postings = BTreeMap<Vec<u8>, BTreeMap<FileId, IndexValue>>;

/// Index writer used by the build pipeline integration to produce the
/// on-disk store that [`IndexedStore`](crate::index::IndexedStore) reads.
pub struct IndexWriter {
    index_path: PathBuf,
    files: Vec<PathBuf>,
    file_ids: FxHashMap<PathBuf, FileId>,
    names: Vec<String>,
    name_ids: FxHashMap<String, NameId>,
    /// Ordered as [`IndexKind::ALL`]
    postings: Vec<Postings>,
}

impl IndexWriter {
    /// Create a writer targeting an index directory
    pub fn new(index_path: &Path) -> Self {
        Self {
            index_path: index_path.to_path_buf(),
            files: Vec::new(),
            file_ids: FxHashMap::default(),
            names: Vec::new(),
            name_ids: FxHashMap::default(),
            postings: IndexKind::ALL.iter().map(|_| Postings::new()).collect(),
        }
    }

    /// Get or create the id of a name
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.name_ids.get(name) {
            return id;
        }

        let id = self.names.len() as NameId;
        self.names.push(name.to_string());
        self.name_ids.insert(name.to_string(), id);
        id
    }

    /// Get or create the id of a source file
    pub fn add_file(&mut self, rel_path: impl AsRef<Path>) -> FileId {
        let path = rel_path.as_ref();
        if let Some(&id) = self.file_ids.get(path) {
            return id;
        }

        let id = self.files.len() as FileId;
        self.files.push(path.to_path_buf());
        self.file_ids.insert(path.to_path_buf(), id);
        id
    }

    fn postings_mut(&mut self, kind: IndexKind) -> &mut Postings {
        let slot = IndexKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        &mut self.postings[slot]
    }

    fn add_count(&mut self, kind: IndexKind, file: FileId, key: IndexKey, count: u32) {
        let value = self
            .postings_mut(kind)
            .entry(key.encode())
            .or_default()
            .entry(file)
            .or_insert(IndexValue::Count(0));
        if let IndexValue::Count(n) = value {
            *n += count;
        }
    }

    fn add_ref(&mut self, kind: IndexKind, file: FileId, key: IndexKey, r: SymbolRef) {
        let value = self
            .postings_mut(kind)
            .entry(key.encode())
            .or_default()
            .entry(file)
            .or_insert_with(|| IndexValue::Refs(Vec::new()));
        if let IndexValue::Refs(refs) = value {
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
    }

    /// Record one occurrence of `r` in `file`
    pub fn add_usage(&mut self, file: FileId, r: SymbolRef) {
        self.add_usages(file, r, 1);
    }

    /// Record `count` occurrences of `r` in `file`
    pub fn add_usages(&mut self, file: FileId, r: SymbolRef, count: u32) {
        self.add_count(IndexKind::Usages, file, r.into(), count);
    }

    /// Record a definition site of a class
    pub fn add_class_definition(&mut self, file: FileId, class: ClassKey) {
        self.add_count(IndexKind::ClassDefs, file, class.into(), 1);
    }

    /// Record that `child` (a class or functional expression declared in
    /// `file`) directly extends or implements `parent`
    pub fn add_inheritor(&mut self, file: FileId, parent: ClassKey, child: SymbolRef) {
        self.add_ref(IndexKind::Hierarchy, file, parent.into(), child);
    }

    /// Record a member whose signature returns/consumes `sig`
    pub fn add_signature_member(&mut self, file: FileId, sig: SignatureData, member: SymbolRef) {
        self.add_ref(IndexKind::Signatures, file, sig.into(), member);
    }

    /// Record a cast to `cast_type` of an expression of type `operand`
    pub fn add_cast(&mut self, file: FileId, cast_type: SymbolRef, operand: SymbolRef) {
        self.add_ref(IndexKind::Casts, file, cast_type.into(), operand);
    }

    /// Record an implicit string coercion of `r` in `file`
    pub fn add_implicit_to_string(&mut self, file: FileId, r: SymbolRef) {
        self.postings_mut(IndexKind::ImplicitToString)
            .entry(IndexKey::from(r).encode())
            .or_default()
            .insert(file, IndexValue::Marker);
    }

    /// Write the index to disk. `meta.json` is written last so a partially
    /// written directory is never mistaken for an index.
    pub fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.index_path).with_context(|| {
            format!("Failed to create index dir {}", self.index_path.display())
        })?;

        let meta_path = self.index_path.join(META_FILE);
        if meta_path.exists() {
            fs::remove_file(&meta_path)?;
        }

        let files: Vec<String> = self
            .files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        write_string_table(&self.index_path.join(FILES_FILE), &files)?;
        write_string_table(&self.index_path.join(NAMES_FILE), &self.names)?;

        let mut key_counts = KeyCounts::default();
        for (kind, postings) in IndexKind::ALL.iter().zip(&self.postings) {
            self.write_index(*kind, postings)?;
            key_counts.set(*kind, postings.len() as u32);
        }

        self.write_meta(key_counts)
    }

    /// Write one index (dictionary + postings)
    fn write_index(&self, kind: IndexKind, postings: &Postings) -> Result<()> {
        let dict_path = self.index_path.join(format!("{}.dict", kind.file_stem()));
        let postings_path = self.index_path.join(format!("{}.postings", kind.file_stem()));

        let mut dict_file = BufWriter::new(File::create(&dict_path)?);
        let mut postings_file = BufWriter::new(File::create(&postings_path)?);

        write_u32_le(&mut dict_file, postings.len() as u32)?;

        let mut postings_offset: u64 = 0;

        for (key, per_file) in postings {
            let entries: Vec<(FileId, IndexValue)> =
                per_file.iter().map(|(&f, v)| (f, v.clone())).collect();

            let mut encoded = Vec::new();
            encode_bucket(&entries, &mut encoded);

            // Dictionary entry: key, offset, length, file count
            write_u16_le(&mut dict_file, key.len() as u16)?;
            dict_file.write_all(key)?;
            write_u64_le(&mut dict_file, postings_offset)?;
            write_u32_le(&mut dict_file, encoded.len() as u32)?;
            write_u32_le(&mut dict_file, entries.len() as u32)?;

            postings_file.write_all(&encoded)?;
            postings_offset += encoded.len() as u64;
        }

        dict_file.flush()?;
        postings_file.flush()?;
        Ok(())
    }

    /// Write metadata
    fn write_meta(&self, key_counts: KeyCounts) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let meta = IndexMeta {
            version: INDEX_VERSION,
            file_count: self.files.len() as u32,
            name_count: self.names.len() as u32,
            key_counts,
            created_at: now,
        };

        let file = File::create(self.index_path.join(META_FILE))?;
        serde_json::to_writer_pretty(file, &meta).context("Failed to write meta.json")?;

        Ok(())
    }

    /// Get current file count
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn write_string_table(path: &Path, table: &[String]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_u32_le(&mut file, table.len() as u32)?;
    for entry in table {
        write_str(&mut file, entry)?;
    }
    file.flush()?;
    Ok(())
}
