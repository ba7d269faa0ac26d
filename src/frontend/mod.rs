//! The Front-End Adapter (spec §4.3): the contract the core needs from the
//! SystemVerilog lexer/preprocessor/elaborator, which is itself out of
//! scope for this crate (spec §1). This module defines that contract as a
//! trait plus the data types it exchanges, and ships one concrete,
//! self-contained implementation, [`RegexFrontEnd`].
//!
//! A real binding (e.g. to a native `slang` FFI layer) implements [`FrontEnd`]
//! without the core needing to change; the trait is the seam.

pub mod regex_frontend;

pub use regex_frontend::RegexFrontEnd;

use crate::model::BufferId;
use std::path::{Path, PathBuf};

/// What kind of library tag a buffer carries, if any. `None` means the
/// buffer is not a library file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTag {
    pub name: Option<String>,
}

/// One instance in the elaborated hierarchy. Children are the instances
/// textually nested inside the module body that `definition_buffer` defines,
/// i.e. their "containing buffer" for edge purposes is this instance's own
/// `definition_buffer`.
#[derive(Debug, Clone)]
pub struct InstanceSymbol {
    pub definition_buffer: BufferId,
    pub children: Vec<InstanceSymbol>,
}

/// The elaborated design, as returned by [`FrontEnd::elaborate`].
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub top_instances: Vec<InstanceSymbol>,
}

/// The front end could not parse the sources (spec §7 `ParseFatal`).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FatalParseError(pub String);

/// The required capabilities of spec §4.3, expressed as a trait.
///
/// Implementations own all buffer storage and release it on scope exit
/// (spec §5); the core only ever borrows through this interface for the
/// duration of one run.
pub trait FrontEnd {
    /// Triggers the external parser. On failure the core aborts.
    fn parse_all(&mut self) -> Result<(), FatalParseError>;

    /// Runs elaboration, starting from the user-selected top module.
    /// `top_instances.len() == 1` is required by the core (checked by the
    /// caller, not the adapter).
    fn elaborate(&mut self, top_module: &str) -> Result<Root, FatalParseError>;

    /// The canonical filesystem path of a buffer, or empty if unnamed.
    fn full_path(&self, buffer: BufferId) -> PathBuf;

    /// Every buffer the front end has loaded.
    fn all_buffers(&self) -> Vec<BufferId>;

    /// Whether and how a buffer is tagged as a library file.
    fn library_tag(&self, buffer: BufferId) -> Option<LibraryTag>;

    /// The direct dependencies of a buffer: textual includes plus
    /// elaboration-discovered references (instance type resolutions) rooted
    /// in that buffer, in discovery order. This is the relation the
    /// Dependency Graph Builder augments with implicit macro edges — it does
    /// not need to re-derive include or instance edges itself.
    fn dependencies(&self, buffer: BufferId) -> Vec<BufferId>;

    /// Resolved include directives in textual order: (included buffer,
    /// directive offset in `buffer`). A finer-grained view of the include
    /// subset of [`FrontEnd::dependencies`], carrying the location data
    /// `SourceNode::includes` and `result_includes` classification need.
    fn includes(&self, buffer: BufferId) -> Vec<(BufferId, usize)>;

    /// Non-hierarchical referrals (package imports, interface ports,
    /// library defaults) that are not instance-tree children but must
    /// still appear in the output.
    fn peer_dependencies(&self, buffer: BufferId) -> Vec<BufferId>;

    /// Macro names defined in this buffer, each with the byte offset of its
    /// first definition, in the order first encountered.
    fn exported_macros(&self, buffer: BufferId) -> Vec<(String, usize)>;

    /// Macro-usage tokens in this buffer with their byte offset, in textual
    /// order. Includes uses that are satisfied by a local definition; the
    /// Graph Builder is responsible for filtering to unresolved ones.
    fn macro_usages(&self, buffer: BufferId) -> Vec<(String, usize)>;

    /// Finds the buffer a given canonical path was loaded into, if any.
    fn buffer_for_path(&self, path: &Path) -> Option<BufferId>;
}
