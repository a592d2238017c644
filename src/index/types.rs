use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Interned name identifier (owned by the index name table)
pub type NameId = u32;

/// Identifier of a file that produced facts in the index
pub type FileId = u32;

/// Version tag of the on-disk layout. Indexes with a different tag are
/// treated as absent.
pub const INDEX_VERSION: u32 = 3;

/// Discriminant of a [`SymbolRef`], also used to filter hierarchy children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum RefKind {
    Class = 0,
    AnonymousClass = 1,
    Field = 2,
    Method = 3,
    FunctionalExpr = 4,
}

impl RefKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RefKind::Class),
            1 => Some(RefKind::AnonymousClass),
            2 => Some(RefKind::Field),
            3 => Some(RefKind::Method),
            4 => Some(RefKind::FunctionalExpr),
            _ => None,
        }
    }
}

/// Compact key identifying a class, member or functional-expression site.
///
/// Equality and hashing are purely structural over the integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolRef {
    Class { name: NameId },
    /// Anonymous classes carry an interned ordinal name within their enclosing file
    AnonymousClass { ordinal: NameId },
    Field { owner: NameId, name: NameId },
    Method { owner: NameId, name: NameId, params: u32 },
    FunctionalExpr { owner: NameId, ordinal: u32 },
}

impl SymbolRef {
    pub fn class(name: NameId) -> Self {
        SymbolRef::Class { name }
    }

    pub fn anonymous(ordinal: NameId) -> Self {
        SymbolRef::AnonymousClass { ordinal }
    }

    pub fn field(owner: NameId, name: NameId) -> Self {
        SymbolRef::Field { owner, name }
    }

    pub fn method(owner: NameId, name: NameId, params: u32) -> Self {
        SymbolRef::Method {
            owner,
            name,
            params,
        }
    }

    pub fn functional_expr(owner: NameId, ordinal: u32) -> Self {
        SymbolRef::FunctionalExpr { owner, ordinal }
    }

    pub fn kind(&self) -> RefKind {
        match self {
            SymbolRef::Class { .. } => RefKind::Class,
            SymbolRef::AnonymousClass { .. } => RefKind::AnonymousClass,
            SymbolRef::Field { .. } => RefKind::Field,
            SymbolRef::Method { .. } => RefKind::Method,
            SymbolRef::FunctionalExpr { .. } => RefKind::FunctionalExpr,
        }
    }

    /// Owner class name of a member reference
    pub fn owner(&self) -> Option<NameId> {
        match *self {
            SymbolRef::Field { owner, .. }
            | SymbolRef::Method { owner, .. }
            | SymbolRef::FunctionalExpr { owner, .. } => Some(owner),
            SymbolRef::Class { .. } | SymbolRef::AnonymousClass { .. } => None,
        }
    }

    /// Same member shape re-targeted onto another owner class.
    /// Class references have no owner and are returned unchanged.
    pub fn override_owner(&self, new_owner: NameId) -> SymbolRef {
        match *self {
            SymbolRef::Field { name, .. } => SymbolRef::Field {
                owner: new_owner,
                name,
            },
            SymbolRef::Method { name, params, .. } => SymbolRef::Method {
                owner: new_owner,
                name,
                params,
            },
            SymbolRef::FunctionalExpr { ordinal, .. } => SymbolRef::FunctionalExpr {
                owner: new_owner,
                ordinal,
            },
            other => other,
        }
    }

    /// The class-hierarchy key if this reference names a class directly
    pub fn as_class_key(&self) -> Option<ClassKey> {
        match *self {
            SymbolRef::Class { name } => Some(ClassKey::Named(name)),
            SymbolRef::AnonymousClass { ordinal } => Some(ClassKey::Anonymous(ordinal)),
            _ => None,
        }
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolRef::Class { name } => write!(f, "class#{}", name),
            SymbolRef::AnonymousClass { ordinal } => write!(f, "anonymous#{}", ordinal),
            SymbolRef::Field { owner, name } => write!(f, "field#{}.{}", owner, name),
            SymbolRef::Method {
                owner,
                name,
                params,
            } => write!(f, "method#{}.{}/{}", owner, name, params),
            SymbolRef::FunctionalExpr { owner, ordinal } => {
                write!(f, "lambda#{}@{}", owner, ordinal)
            }
        }
    }
}

/// A node of the class hierarchy: a named or an anonymous class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassKey {
    Named(NameId),
    Anonymous(NameId),
}

impl ClassKey {
    pub fn name(&self) -> NameId {
        match *self {
            ClassKey::Named(name) | ClassKey::Anonymous(name) => name,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, ClassKey::Anonymous(_))
    }

    pub fn to_ref(self) -> SymbolRef {
        match self {
            ClassKey::Named(name) => SymbolRef::Class { name },
            ClassKey::Anonymous(ordinal) => SymbolRef::AnonymousClass { ordinal },
        }
    }
}

/// Key for "members returning/consuming this type" lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureData {
    pub type_name: NameId,
    pub iterator_kind: u8,
    pub is_generic: bool,
}

impl SignatureData {
    pub fn new(type_name: NameId, iterator_kind: u8, is_generic: bool) -> Self {
        Self {
            type_name,
            iterator_kind,
            is_generic,
        }
    }
}

/// Which children of a hierarchy bucket a caller is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Named or anonymous classes
    HierarchyElement,
    /// Lambda / method-reference sites implementing the class
    FunctionalExpression,
}

impl CandidateKind {
    pub fn matches(&self, child: &SymbolRef) -> bool {
        match self {
            CandidateKind::HierarchyElement => child.as_class_key().is_some(),
            CandidateKind::FunctionalExpression => child.kind() == RefKind::FunctionalExpr,
        }
    }
}

/// Serializable id of a direct-inheritor candidate, resolved back to a live
/// source element by a language adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandidateId {
    /// Qualified class name
    Named(String),
    /// Anonymous class ordinal name within its file
    Anonymous(String),
    /// Functional expression ordinal within its file
    FunctionalExpr(u32),
}

/// The named multi-maps held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    /// ref -> per-file occurrence count
    Usages,
    /// class key -> per-file direct children
    Hierarchy,
    /// class key -> per-file definition count
    ClassDefs,
    /// signature -> per-file member refs
    Signatures,
    /// cast type -> per-file operand types
    Casts,
    /// ref -> per-file marker of implicit string coercion
    ImplicitToString,
}

impl IndexKind {
    pub const ALL: [IndexKind; 6] = [
        IndexKind::Usages,
        IndexKind::Hierarchy,
        IndexKind::ClassDefs,
        IndexKind::Signatures,
        IndexKind::Casts,
        IndexKind::ImplicitToString,
    ];

    /// File stem used for the `.dict` / `.postings` pair
    pub fn file_stem(&self) -> &'static str {
        match self {
            IndexKind::Usages => "usages",
            IndexKind::Hierarchy => "hierarchy",
            IndexKind::ClassDefs => "class-defs",
            IndexKind::Signatures => "signatures",
            IndexKind::Casts => "casts",
            IndexKind::ImplicitToString => "implicit-to-string",
        }
    }

    /// Shape of the per-file values stored in this index
    pub fn value_shape(&self) -> ValueShape {
        match self {
            IndexKind::Usages | IndexKind::ClassDefs => ValueShape::Count,
            IndexKind::Hierarchy | IndexKind::Signatures | IndexKind::Casts => ValueShape::Refs,
            IndexKind::ImplicitToString => ValueShape::Marker,
        }
    }

    fn position(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }
}

/// How the per-file payload of an index is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Count,
    Refs,
    Marker,
}

/// Decoded per-file payload of an index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Count(u32),
    Refs(Vec<SymbolRef>),
    Marker,
}

impl IndexValue {
    /// Number of facts the value contributes (occurrences, children, markers)
    pub fn weight(&self) -> u32 {
        match self {
            IndexValue::Count(n) => *n,
            IndexValue::Refs(refs) => refs.len() as u32,
            IndexValue::Marker => 1,
        }
    }

    pub fn refs(&self) -> &[SymbolRef] {
        match self {
            IndexValue::Refs(refs) => refs,
            _ => &[],
        }
    }
}

/// Per-index key counts, indexed by [`IndexKind`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCounts([u32; 6]);

impl KeyCounts {
    pub fn get(&self, kind: IndexKind) -> u32 {
        self.0[kind.position()]
    }

    pub fn set(&mut self, kind: IndexKind, count: u32) {
        self.0[kind.position()] = count;
    }
}

/// Source language / file kind, used for adapter lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[repr(u16)]
pub enum FileKind {
    #[default]
    Unknown = 0,
    Java = 1,
    Kotlin = 2,
    Groovy = 3,
    Scala = 4,
    Xml = 5,
    Properties = 6,
    JavaScript = 7,
    TypeScript = 8,
    Python = 9,
    Ruby = 10,
    Html = 11,
    Jsp = 12,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "java" => FileKind::Java,
            "kt" | "kts" => FileKind::Kotlin,
            "groovy" | "gvy" | "gradle" => FileKind::Groovy,
            "scala" | "sc" => FileKind::Scala,
            "xml" | "xsd" => FileKind::Xml,
            "properties" => FileKind::Properties,
            "js" | "mjs" | "cjs" | "jsx" => FileKind::JavaScript,
            "ts" | "mts" | "cts" | "tsx" => FileKind::TypeScript,
            "py" | "pyi" => FileKind::Python,
            "rb" | "rake" => FileKind::Ruby,
            "html" | "htm" => FileKind::Html,
            "jsp" | "jspx" => FileKind::Jsp,
            _ => FileKind::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }
}

/// Index metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub file_count: u32,
    pub name_count: u32,
    #[serde(default)]
    pub key_counts: KeyCounts,
    pub created_at: u64,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            file_count: 0,
            name_count: 0,
            key_counts: KeyCounts::default(),
            created_at: 0,
        }
    }
}
