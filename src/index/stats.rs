use crate::index::store::IndexedStore;
use crate::index::types::{IndexKind, KeyCounts};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Summary of an open index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub index_path: PathBuf,
    pub version: u32,
    pub file_count: u32,
    pub name_count: u32,
    pub key_counts: KeyCounts,
    pub size_bytes: u64,
    pub created_at: u64,
}

impl IndexStats {
    pub fn collect(store: &IndexedStore) -> Self {
        let mut key_counts = KeyCounts::default();
        for kind in IndexKind::ALL {
            key_counts.set(kind, store.key_count(kind) as u32);
        }

        Self {
            index_path: store.index_path().to_path_buf(),
            version: store.meta.version,
            file_count: store.file_count() as u32,
            name_count: store.names().len() as u32,
            key_counts,
            size_bytes: dir_size(store.index_path()).unwrap_or(0),
            created_at: store.meta.created_at,
        }
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index location:   {}", self.index_path.display())?;
        writeln!(f, "Index version:    {}", self.version)?;
        writeln!(f, "Files:            {}", self.file_count)?;
        writeln!(f, "Names:            {}", self.name_count)?;
        for kind in IndexKind::ALL {
            writeln!(f, "  {:20} {} keys", kind.file_stem(), self.key_counts.get(kind))?;
        }
        write!(f, "Index size:       {}", format_size(self.size_bytes))
    }
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                size += entry.metadata()?.len();
            } else if path.is_dir() {
                size += dir_size(&path)?;
            }
        }
    }
    Ok(size)
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
