//! Breadth-first traversal of the class-hierarchy adjacency index.
//!
//! A hierarchy is only usable if every node in it resolves to exactly one
//! definition. The root is exempt unless the caller opts in, and anonymous
//! classes are never checked (they cannot have competing definitions).

use crate::error::{ReaderError, StorageError};
use crate::index::types::{ClassKey, SymbolRef};
use crate::query::cancel::{CancellationToken, CANCELLATION_CHECK_INTERVAL};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Adjacency and definition lookups the traversal needs
pub trait HierarchySource {
    /// Direct children recorded for `node` (classes and functional expressions)
    fn children(&self, node: ClassKey) -> Result<Vec<SymbolRef>, StorageError>;

    /// Whether `node` has more than one definition site
    fn has_multiple_definitions(&self, node: ClassKey) -> Result<bool, StorageError>;
}

/// Outcome of a hierarchy query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyResult {
    /// Every visited class, root first, in breadth-first order
    Found(Vec<ClassKey>),
    /// Some node resolved to more than one definition
    Ambiguous,
}

impl HierarchyResult {
    pub fn into_option(self) -> Option<Vec<ClassKey>> {
        match self {
            HierarchyResult::Found(classes) => Some(classes),
            HierarchyResult::Ambiguous => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, HierarchyResult::Ambiguous)
    }
}

/// Traversal options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyQuery {
    /// Also require the root itself to be uniquely defined
    pub check_ambiguity: bool,
    /// Follow anonymous subclasses
    pub include_anonymous: bool,
    /// Stop once more than this many nodes were collected (soft cap)
    pub interrupt_after: Option<usize>,
}

impl Default for HierarchyQuery {
    fn default() -> Self {
        Self {
            check_ambiguity: false,
            include_anonymous: true,
            interrupt_after: None,
        }
    }
}

/// Collect the hierarchy below `root`
pub fn traverse<S: HierarchySource + ?Sized>(
    source: &S,
    root: ClassKey,
    query: &HierarchyQuery,
    cancel: &CancellationToken,
) -> Result<HierarchyResult, ReaderError> {
    let mut queue = VecDeque::from([root]);
    let mut seen: FxHashSet<ClassKey> = FxHashSet::default();
    let mut order = Vec::new();

    while let Some(node) = queue.pop_front() {
        if let Some(limit) = query.interrupt_after {
            if seen.len() > limit {
                break;
            }
        }

        if !seen.insert(node) {
            continue;
        }
        order.push(node);

        if seen.len() % CANCELLATION_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }

        if !node.is_anonymous()
            && (query.check_ambiguity || node != root)
            && source.has_multiple_definitions(node)?
        {
            return Ok(HierarchyResult::Ambiguous);
        }

        for child in source.children(node)? {
            if let Some(key) = child.as_class_key() {
                if query.include_anonymous || !key.is_anonymous() {
                    queue.push_back(key);
                }
            }
        }
    }

    Ok(HierarchyResult::Found(order))
}
