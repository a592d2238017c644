//! Byte encoding of index keys and postings buckets.
//!
//! Keys are a tag byte followed by varints, so that the byte order of keys
//! within one index is stable and the dictionary can be binary searched.
//!
//! A postings bucket holds every `(file, value)` entry of one key:
//!
//! ```text
//! varint entry_count
//! repeat entry_count:
//!     varint file_id_delta      (file ids ascending)
//!     payload                   (depends on the index value shape)
//! ```

use crate::error::StorageError;
use crate::index::types::*;
use crate::utils::{encode_varint, VarintCursor};

const SIGNATURE_TAG: u8 = 0xF0;

/// A key of one of the named indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    Ref(SymbolRef),
    Signature(SignatureData),
}

impl From<SymbolRef> for IndexKey {
    fn from(r: SymbolRef) -> Self {
        IndexKey::Ref(r)
    }
}

impl From<ClassKey> for IndexKey {
    fn from(key: ClassKey) -> Self {
        IndexKey::Ref(key.to_ref())
    }
}

impl From<SignatureData> for IndexKey {
    fn from(sig: SignatureData) -> Self {
        IndexKey::Signature(sig)
    }
}

impl IndexKey {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12);
        match self {
            IndexKey::Ref(r) => encode_ref(r, &mut buf),
            IndexKey::Signature(sig) => {
                buf.push(SIGNATURE_TAG);
                encode_varint(sig.type_name, &mut buf);
                buf.push(sig.iterator_kind);
                buf.push(sig.is_generic as u8);
            }
        }
        buf
    }
}

/// Append the encoding of a symbol reference
pub fn encode_ref(r: &SymbolRef, buf: &mut Vec<u8>) {
    buf.push(r.kind() as u8);
    match *r {
        SymbolRef::Class { name } => encode_varint(name, buf),
        SymbolRef::AnonymousClass { ordinal } => encode_varint(ordinal, buf),
        SymbolRef::Field { owner, name } => {
            encode_varint(owner, buf);
            encode_varint(name, buf);
        }
        SymbolRef::Method {
            owner,
            name,
            params,
        } => {
            encode_varint(owner, buf);
            encode_varint(name, buf);
            encode_varint(params, buf);
        }
        SymbolRef::FunctionalExpr { owner, ordinal } => {
            encode_varint(owner, buf);
            encode_varint(ordinal, buf);
        }
    }
}

fn decode_ref(cursor: &mut VarintCursor<'_>) -> Option<SymbolRef> {
    let kind = RefKind::from_tag(cursor.read_u8()?)?;
    let r = match kind {
        RefKind::Class => SymbolRef::Class {
            name: cursor.read_varint()?,
        },
        RefKind::AnonymousClass => SymbolRef::AnonymousClass {
            ordinal: cursor.read_varint()?,
        },
        RefKind::Field => SymbolRef::Field {
            owner: cursor.read_varint()?,
            name: cursor.read_varint()?,
        },
        RefKind::Method => SymbolRef::Method {
            owner: cursor.read_varint()?,
            name: cursor.read_varint()?,
            params: cursor.read_varint()?,
        },
        RefKind::FunctionalExpr => SymbolRef::FunctionalExpr {
            owner: cursor.read_varint()?,
            ordinal: cursor.read_varint()?,
        },
    };
    Some(r)
}

/// Encode one bucket. `entries` must be sorted by file id.
pub fn encode_bucket(entries: &[(FileId, IndexValue)], buf: &mut Vec<u8>) {
    encode_varint(entries.len() as u32, buf);
    let mut prev = 0u32;
    for (file_id, value) in entries {
        encode_varint(file_id - prev, buf);
        prev = *file_id;
        match value {
            IndexValue::Count(n) => encode_varint(*n, buf),
            IndexValue::Refs(refs) => {
                encode_varint(refs.len() as u32, buf);
                for r in refs {
                    encode_ref(r, buf);
                }
            }
            IndexValue::Marker => {}
        }
    }
}

/// Decode one bucket of the given index
pub fn decode_bucket(
    kind: IndexKind,
    bytes: &[u8],
) -> Result<Vec<(FileId, IndexValue)>, StorageError> {
    let truncated = || StorageError::corrupted(kind, "truncated postings bucket");

    let mut cursor = VarintCursor::new(bytes);
    let count = cursor.read_varint().ok_or_else(truncated)? as usize;
    // Each entry takes at least one byte, reject absurd counts before allocating
    if count > bytes.len() {
        return Err(StorageError::corrupted(
            kind,
            format!("entry count {} exceeds bucket size {}", count, bytes.len()),
        ));
    }

    let shape = kind.value_shape();
    let mut entries = Vec::with_capacity(count);
    let mut file_id = 0u32;

    for _ in 0..count {
        let delta = cursor.read_varint().ok_or_else(truncated)?;
        file_id = file_id
            .checked_add(delta)
            .ok_or_else(|| StorageError::corrupted(kind, "file id overflow"))?;

        let value = match shape {
            ValueShape::Count => IndexValue::Count(cursor.read_varint().ok_or_else(truncated)?),
            ValueShape::Refs => {
                let n = cursor.read_varint().ok_or_else(truncated)? as usize;
                let mut refs = Vec::with_capacity(n.min(bytes.len()));
                for _ in 0..n {
                    let r = decode_ref(&mut cursor).ok_or_else(|| {
                        StorageError::corrupted(
                            kind,
                            format!("bad symbol reference at byte {}", cursor.position()),
                        )
                    })?;
                    refs.push(r);
                }
                IndexValue::Refs(refs)
            }
            ValueShape::Marker => IndexValue::Marker,
        };
        entries.push((file_id, value));
    }

    if !cursor.is_exhausted() {
        return Err(StorageError::corrupted(kind, "trailing bytes after bucket"));
    }

    Ok(entries)
}
