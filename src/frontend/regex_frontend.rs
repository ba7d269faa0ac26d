//! A native, self-contained [`FrontEnd`] implementation that scans source
//! text with regular expressions instead of binding to a real SystemVerilog
//! preprocessor/elaborator.
//!
//! This is the same fallback strategy `foundry-compilers` uses when it can't
//! get a full AST (see `SolData::parse`'s doc comment on falling back to
//! regex extraction): a plain-text scan over `` `define``/`` `include``,
//! backtick macro usages, and module/instance textual patterns. It is *not*
//! a full parser. In particular it does not understand:
//!
//! - generate blocks (an instance inside a `generate`/`endgenerate` region is
//!   still recorded as an edge, but conditional generate branches are not
//!   evaluated — every branch's instances are recorded);
//! - conditional compilation (`` `ifdef``/`` `ifndef``/`` `else``/`` `endif``);
//!   the scanner does not track nesting and treats every line as live;
//! - macro-argument expansion (`` `MACRO(a, b)`` is recorded as a use of
//!   `MACRO`, but its expansion is not substituted back into the buffer);
//! - peer dependencies: [`FrontEnd::peer_dependencies`] always returns
//!   empty here, since recognizing package imports, interface ports, and
//!   library defaults as non-hierarchical referrals needs the kind of
//!   type-level name resolution only a real elaborator performs.
//!
//! A real binding (e.g. to `slang` over FFI) implements [`FrontEnd`] without
//! any of these limitations, and the core does not need to change.

use super::{FatalParseError, FrontEnd, InstanceSymbol, LibraryTag, Root};
use crate::model::BufferId;
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directives that are not macro *uses*, even though they're spelled with a
/// leading backtick like one.
const DIRECTIVE_KEYWORDS: &[&str] = &[
    "define",
    "undef",
    "undefineall",
    "include",
    "ifdef",
    "ifndef",
    "else",
    "elsif",
    "endif",
    "timescale",
    "default_nettype",
    "resetall",
    "celldefine",
    "endcelldefine",
    "unconnected_drive",
    "nounconnected_drive",
    "line",
    "pragma",
    "__FILE__",
    "__LINE__",
];

/// SystemVerilog keywords that can precede a parenthesis without that being
/// a module instantiation, used to keep the instantiation heuristic from
/// firing on statements, declarations, and calls.
const NON_INSTANCE_LEADERS: &[&str] = &[
    "if", "else", "for", "while", "case", "casex", "casez", "function", "task", "begin", "end",
    "module", "endmodule", "interface", "endinterface", "package", "endpackage", "generate",
    "endgenerate", "always", "always_ff", "always_comb", "always_latch", "initial", "final",
    "assign", "assert", "cover", "property", "sequence", "wire", "reg", "logic", "parameter",
    "localparam", "typedef", "return", "fork", "join", "join_any", "join_none", "foreach",
    "repeat", "disable", "wait", "posedge", "negedge", "class", "endclass", "program",
    "endprogram", "modport", "import", "export", "bind",
];

static RE_DEFINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`define\s+([A-Za-z_][A-Za-z0-9_$]*)").unwrap());

static RE_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"`include\s*["<]([^">]+)[">]"#).unwrap());

static RE_BACKTICK_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([A-Za-z_][A-Za-z0-9_$]*)").unwrap());

static RE_MODULE_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:module|interface|macromodule)\s+([A-Za-z_][A-Za-z0-9_$]*)").unwrap()
});

/// `TYPE_NAME [#(params)] INSTANCE_NAME (` — intentionally liberal; an
/// instance array (`inst_name[3:0]`) and a bare parameter-less instance both
/// match, since both carry a `(` terminator. Multiple instances declared in
/// one statement (`foo a(), b();`) are not distinguished from one another;
/// each still contributes the same `containing -> definition` edge.
static RE_INSTANCE_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*([A-Za-z_][A-Za-z0-9_$]*)\s*(?:#\s*\([\s\S]*?\)\s*)?([A-Za-z_][A-Za-z0-9_$]*)\s*(?:\[[^\]]*\]\s*)?\(",
    )
    .unwrap()
});

#[derive(Debug, Clone)]
struct Buffer {
    path: PathBuf,
    content: String,
    library_tag: Option<LibraryTag>,
}

/// Scans source text directly instead of binding to an external SystemVerilog
/// toolchain. See the module docs for exactly what it does and does not
/// understand.
#[derive(Debug, Default)]
pub struct RegexFrontEnd {
    buffers: Vec<Buffer>,
    path_to_buffer: HashMap<PathBuf, BufferId>,
    incdirs: Vec<PathBuf>,

    module_defs: HashMap<String, BufferId>,
    dependencies: HashMap<BufferId, Vec<BufferId>>,
    includes: HashMap<BufferId, Vec<(BufferId, usize)>>,
    exported_macros: HashMap<BufferId, Vec<(String, usize)>>,
    macro_usages: HashMap<BufferId, Vec<(String, usize)>>,
    peer_dependencies: HashMap<BufferId, Vec<BufferId>>,

    /// Counts calls to `parse_all`. Exists so integration tests can assert a
    /// cache hit never reaches the parser (spec.md §8 scenario 6); not
    /// consulted by any pipeline logic.
    parse_calls: std::cell::Cell<u32>,
}

impl RegexFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_call_count(&self) -> u32 {
        self.parse_calls.get()
    }

    /// Registers a search directory consulted to resolve `` `include`` paths
    /// that don't resolve relative to the including buffer's own directory
    /// (spec.md's `+incdir+` surface).
    pub fn add_incdir(&mut self, dir: PathBuf) {
        self.incdirs.push(dir);
    }

    /// Loads `path` as a user-listed source, returning its buffer id. Loading
    /// the same canonical path twice returns the existing id.
    pub fn add_source(&mut self, path: &Path) -> std::io::Result<BufferId> {
        self.load(path, None)
    }

    /// Loads `path` as a library file, tagged with `library_name` if it came
    /// from a library map (`-y`/`-Y` libraries have no name; `` `uselib``
    /// entries do).
    pub fn add_library(
        &mut self,
        path: &Path,
        library_name: Option<String>,
    ) -> std::io::Result<BufferId> {
        self.load(path, Some(LibraryTag { name: library_name }))
    }

    fn load(
        &mut self,
        path: &Path,
        library_tag: Option<LibraryTag>,
    ) -> std::io::Result<BufferId> {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(&id) = self.path_to_buffer.get(&canonical) {
            return Ok(id);
        }
        let content = fs::read_to_string(&canonical)?;
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Buffer {
            path: canonical.clone(),
            content,
            library_tag,
        });
        self.path_to_buffer.insert(canonical, id);
        Ok(id)
    }

    fn resolve_include(&self, from: &Buffer, target: &str) -> Option<PathBuf> {
        let relative = from.path.parent().map(|dir| dir.join(target));
        if let Some(candidate) = &relative {
            if candidate.is_file() {
                return Some(candidate.clone());
            }
        }
        for dir in &self.incdirs {
            let candidate = dir.join(target);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Scans every currently-loaded buffer for `` `include`` directives,
    /// loading newly-discovered buffers and repeating until no new buffer is
    /// added, since a freshly-loaded header can itself `` `include`` a header
    /// not yet seen.
    fn discover_includes(&mut self) -> Result<(), FatalParseError> {
        let mut frontier: Vec<BufferId> = (0..self.buffers.len() as u32).map(BufferId).collect();
        while let Some(id) = frontier.pop() {
            if self.includes.contains_key(&id) {
                continue;
            }
            let buffer = self.buffers[id.0 as usize].clone();
            let mut resolved = Vec::new();
            for cap in RE_INCLUDE.captures_iter(&buffer.content) {
                let offset = cap.get(0).unwrap().start();
                let target = &cap[1];
                match self.resolve_include(&buffer, target) {
                    Some(path) => {
                        let included = self.load(&path, None).map_err(|e| {
                            FatalParseError(format!(
                                "{}: failed to read include target `{}`: {e}",
                                buffer.path.display(),
                                target
                            ))
                        })?;
                        resolved.push((included, offset));
                        frontier.push(included);
                    }
                    None => {
                        return Err(FatalParseError(format!(
                            "{}: could not resolve `include \"{}\"",
                            buffer.path.display(),
                            target
                        )));
                    }
                }
            }
            self.includes.insert(id, resolved);
        }
        Ok(())
    }

    fn scan_macros(&mut self) {
        for (i, buffer) in self.buffers.iter().enumerate() {
            let id = BufferId(i as u32);
            let mut defines: IndexMap<String, usize> = IndexMap::new();
            for cap in RE_DEFINE.captures_iter(&buffer.content) {
                let name = cap[1].to_string();
                let offset = cap.get(0).unwrap().start();
                defines.entry(name).or_insert(offset);
            }
            let mut uses: Vec<(String, usize)> = Vec::new();
            for cap in RE_BACKTICK_IDENT.captures_iter(&buffer.content) {
                let name = &cap[1];
                if DIRECTIVE_KEYWORDS.contains(&name) {
                    continue;
                }
                let offset = cap.get(0).unwrap().start();
                uses.push((name.to_string(), offset));
            }
            self.exported_macros
                .insert(id, defines.into_iter().collect());
            self.macro_usages.insert(id, uses);
        }
    }

    fn scan_module_defs(&mut self) {
        for (i, buffer) in self.buffers.iter().enumerate() {
            let id = BufferId(i as u32);
            for cap in RE_MODULE_DEF.captures_iter(&buffer.content) {
                let name = cap[1].to_string();
                self.module_defs.entry(name).or_insert(id);
            }
        }
    }

    fn scan_instances(&mut self) {
        if self.module_defs.is_empty() {
            for i in 0..self.buffers.len() {
                self.dependencies.insert(BufferId(i as u32), Vec::new());
            }
            return;
        }
        for (i, buffer) in self.buffers.iter().enumerate() {
            let id = BufferId(i as u32);
            let mut deps = IndexSet::new();
            for cap in RE_INSTANCE_CANDIDATE.captures_iter(&buffer.content) {
                let type_name = &cap[1];
                if NON_INSTANCE_LEADERS.contains(&type_name) {
                    continue;
                }
                if let Some(&target) = self.module_defs.get(type_name) {
                    if target != id {
                        deps.insert(target);
                    }
                }
            }
            self.dependencies.insert(id, deps.into_iter().collect());
        }
    }

    fn merge_includes_into_dependencies(&mut self) {
        for (id, includes) in self.includes.clone() {
            let entry = self.dependencies.entry(id).or_default();
            for (included, _offset) in includes {
                if !entry.contains(&included) {
                    entry.push(included);
                }
            }
        }
    }
}

impl FrontEnd for RegexFrontEnd {
    fn parse_all(&mut self) -> Result<(), FatalParseError> {
        self.parse_calls.set(self.parse_calls.get() + 1);
        if self.buffers.is_empty() {
            return Err(FatalParseError("no source buffers were loaded".into()));
        }
        self.discover_includes()?;
        self.scan_macros();
        self.scan_module_defs();
        self.scan_instances();
        self.merge_includes_into_dependencies();
        Ok(())
    }

    fn elaborate(&mut self, top_module: &str) -> Result<Root, FatalParseError> {
        let top_buffer = *self.module_defs.get(top_module).ok_or_else(|| {
            FatalParseError(format!("no module named `{top_module}` was found"))
        })?;

        fn build(
            front_end: &RegexFrontEnd,
            buffer: BufferId,
            stack: &mut Vec<BufferId>,
        ) -> InstanceSymbol {
            if stack.contains(&buffer) {
                return InstanceSymbol {
                    definition_buffer: buffer,
                    children: Vec::new(),
                };
            }
            stack.push(buffer);
            let children = front_end
                .dependencies
                .get(&buffer)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|child| front_end.module_defs.values().any(|b| b == child))
                .map(|child| build(front_end, child, stack))
                .collect();
            stack.pop();
            InstanceSymbol {
                definition_buffer: buffer,
                children,
            }
        }

        let mut stack = Vec::new();
        let top = build(self, top_buffer, &mut stack);
        Ok(Root {
            top_instances: vec![top],
        })
    }

    fn full_path(&self, buffer: BufferId) -> PathBuf {
        self.buffers
            .get(buffer.0 as usize)
            .map(|b| b.path.clone())
            .unwrap_or_default()
    }

    fn all_buffers(&self) -> Vec<BufferId> {
        (0..self.buffers.len() as u32).map(BufferId).collect()
    }

    fn library_tag(&self, buffer: BufferId) -> Option<LibraryTag> {
        self.buffers
            .get(buffer.0 as usize)
            .and_then(|b| b.library_tag.clone())
    }

    fn dependencies(&self, buffer: BufferId) -> Vec<BufferId> {
        self.dependencies.get(&buffer).cloned().unwrap_or_default()
    }

    fn includes(&self, buffer: BufferId) -> Vec<(BufferId, usize)> {
        self.includes.get(&buffer).cloned().unwrap_or_default()
    }

    fn peer_dependencies(&self, buffer: BufferId) -> Vec<BufferId> {
        self.peer_dependencies
            .get(&buffer)
            .cloned()
            .unwrap_or_default()
    }

    fn exported_macros(&self, buffer: BufferId) -> Vec<(String, usize)> {
        self.exported_macros
            .get(&buffer)
            .cloned()
            .unwrap_or_default()
    }

    fn macro_usages(&self, buffer: BufferId) -> Vec<(String, usize)> {
        self.macro_usages.get(&buffer).cloned().unwrap_or_default()
    }

    fn buffer_for_path(&self, path: &Path) -> Option<BufferId> {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.path_to_buffer.get(&canonical).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn discovers_include_chain() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "leaf.svh", "`define LEAF_WIDTH 8\n");
        let mid = write_file(&dir, "mid.svh", "`include \"leaf.svh\"\n");
        let top = write_file(
            &dir,
            "top.sv",
            "`include \"mid.svh\"\nmodule top; endmodule\n",
        );

        let mut fe = RegexFrontEnd::new();
        let top_id = fe.add_source(&top).unwrap();
        fe.parse_all().unwrap();

        let deps = fe.dependencies(top_id);
        assert_eq!(deps.len(), 1);
        let mid_id = deps[0];
        assert_eq!(fe.full_path(mid_id), dunce::canonicalize(&mid).unwrap());
        let leaf_deps = fe.dependencies(mid_id);
        assert_eq!(leaf_deps.len(), 1);
    }

    #[test]
    fn records_instance_edges_and_ignores_keywords() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "leaf.sv", "module leaf; endmodule\n");
        let top = write_file(
            &dir,
            "top.sv",
            "module top;\n  if (1) begin end\n  leaf u_leaf ();\nendmodule\n",
        );

        let mut fe = RegexFrontEnd::new();
        let leaf = write_file(&dir, "leaf2.sv", "module leaf; endmodule\n");
        let _ = leaf;
        let top_id = fe.add_source(&top).unwrap();
        fe.parse_all().unwrap();

        let deps = fe.dependencies(top_id);
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn macro_use_before_local_define_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let top = write_file(
            &dir,
            "top.sv",
            "module top;\n  logic [`WIDTH-1:0] x;\n`define WIDTH 8\nendmodule\n",
        );
        let mut fe = RegexFrontEnd::new();
        let id = fe.add_source(&top).unwrap();
        fe.parse_all().unwrap();

        let uses = fe.macro_usages(id);
        assert!(uses.iter().any(|(name, _)| name == "WIDTH"));
        let defines = fe.exported_macros(id);
        assert_eq!(defines, vec![("WIDTH".to_string(), defines[0].1)]);
    }

    #[test]
    fn unresolved_include_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let top = write_file(&dir, "top.sv", "`include \"missing.svh\"\n");
        let mut fe = RegexFrontEnd::new();
        fe.add_source(&top).unwrap();
        assert!(fe.parse_all().is_err());
    }
}
