//! The data model shared by every pipeline stage (spec §3).
//!
//! `BufferId` is the front end's opaque handle; everything else the core
//! builds is keyed by it or by canonical path. Two plain mappings —
//! `path -> SourceNode` and `path -> set<path>` — are all the core ever
//! needs to represent the graph (spec §9's note on avoiding ownership
//! cycles), so `SourceNode` carries its own `dependencies` set rather than
//! living inside a cyclic node/edge object graph.

use indexmap::{IndexMap, IndexSet};
use std::path::PathBuf;

/// Opaque handle for a loaded buffer, as produced by the front end.
///
/// Equality and ordering are by the index the front end assigned when the
/// buffer was loaded; the core never constructs one of these, it only
/// receives and stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a user-listed input in the invocation's argument order, or
/// the sentinel meaning "discovered only via an include chain".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadOrder {
    Listed(u32),
    NotListed,
}

impl LoadOrder {
    pub fn precedes(&self, other: &LoadOrder) -> bool {
        match (self, other) {
            (LoadOrder::Listed(a), LoadOrder::Listed(b)) => a < b,
            _ => false,
        }
    }
}

/// Per-buffer preprocessor-level view (spec §3's `SourceNode` row).
///
/// Built once per buffer from front-end queries, then frozen before the
/// orderer runs; only the Graph Builder mutates `dependencies` afterward
/// (it appends the implicit macro edge, if any, it resolved for this node).
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub path: PathBuf,
    pub load_order: LoadOrder,
    /// Macro name -> offset of its first definition in this buffer.
    pub exported_macros: IndexMap<String, usize>,
    /// Macro name -> offset of its first usage, for macros used before any
    /// local definition of the same name.
    pub unresolved_macros: IndexMap<String, usize>,
    /// (included path, directive offset), in textual order.
    pub includes: Vec<(PathBuf, usize)>,
    /// Paths this buffer depends on; starts as includes + instance refs
    /// from the front end, gains the implicit macro edge during graph
    /// construction.
    pub dependencies: IndexSet<PathBuf>,
}

impl SourceNode {
    pub fn new(path: PathBuf, load_order: LoadOrder) -> Self {
        Self {
            path,
            load_order,
            exported_macros: IndexMap::new(),
            unresolved_macros: IndexMap::new(),
            includes: Vec::new(),
            dependencies: IndexSet::new(),
        }
    }
}

/// The canonical, absolute set of paths an invocation consulted (spec §3's
/// `InputFileSet` row). Built once by the Input Gatherer, then immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFileSet {
    pub paths: IndexSet<PathBuf>,
}

impl InputFileSet {
    pub fn insert(&mut self, path: PathBuf) {
        self.paths.insert(path);
    }

    pub fn contains(&self, path: &PathBuf) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
}

/// Per-buffer visitation state for one ordering pass (spec §3's
/// `VisitStatus` row). Reset at the start of every `TopologicalOrderer::order`
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub struct VisitStatus {
    pub visit: Visit,
    pub peer_deps_enqueued: bool,
}

impl Default for VisitStatus {
    fn default() -> Self {
        Self { visit: Visit::Unvisited, peer_deps_enqueued: false }
    }
}
