//! Output sinks (spec.md §6): the plain path-list format and the flag-string
//! format, the latter switchable to a Verific-compatible subset.

use crate::classify::ClassifiedResult;
use crate::error::Result;
use indexmap::IndexSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Writes one canonical path per line: `result` (leaf-first), then
/// `result_includes`, then `result_library_files`.
pub fn write_plain(path: &Path, result: &ClassifiedResult) -> Result<()> {
    let mut out = String::new();
    for p in &result.result {
        writeln!(out, "{}", p.display()).ok();
    }
    for p in &result.result_includes {
        writeln!(out, "{}", p.display()).ok();
    }
    for p in &result.result_library_files {
        writeln!(out, "{}", p.display()).ok();
    }
    fs::write(path, out)?;
    Ok(())
}

/// Whether includes, library search directories, and extensions are emitted
/// with Verific-compatible flags (`+incdir+`/`+libext+`/`-f`) or the
/// traditional ones (`-y`/`-Y`/`-C`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagDialect {
    Standard,
    VerificCompat,
}

/// Per-buffer metadata the flags sink needs beyond the classified result:
/// include-search directories, library search directories with their
/// extensions, named library files, and macro definitions.
#[derive(Debug, Clone, Default)]
pub struct FlagMetadata {
    pub incdirs: IndexSet<std::path::PathBuf>,
    pub library_dirs: IndexSet<std::path::PathBuf>,
    pub library_exts: IndexSet<String>,
    pub named_library_files: Vec<(String, std::path::PathBuf)>,
    pub defines: Vec<(String, Option<String>)>,
}

pub fn write_flags(
    path: &Path,
    result: &ClassifiedResult,
    meta: &FlagMetadata,
    output_path_flag_target: &Path,
    dialect: FlagDialect,
) -> Result<()> {
    let mut flags: Vec<String> = Vec::new();

    for (name, value) in &meta.defines {
        match value {
            Some(v) => flags.push(format!("+define+{name}={v}")),
            None => flags.push(format!("+define+{name}")),
        }
    }

    for dir in &meta.incdirs {
        flags.push(format!("+incdir+{}", dir.display()));
    }

    match dialect {
        FlagDialect::VerificCompat => {
            for ext in &meta.library_exts {
                flags.push(format!("+libext+.{ext}"));
            }
        }
        FlagDialect::Standard => {
            for dir in &meta.library_dirs {
                flags.push(format!("-y {}", dir.display()));
            }
            for ext in &meta.library_exts {
                flags.push(format!("-Y .{ext}"));
            }
        }
    }

    for (name, file_path) in &meta.named_library_files {
        flags.push(format!("-v {name}={}", file_path.display()));
    }
    for lib in &result.result_library_files {
        if meta.named_library_files.iter().any(|(_, p)| p == lib) {
            continue;
        }
        flags.push(format!("-v {}", lib.display()));
    }

    // The pruned source list itself is not flattened into bare paths here;
    // it's carried by reference via the trailing -C/-f flag below, pointing
    // at the plain-format sibling file.
    match dialect {
        FlagDialect::VerificCompat => {
            flags.push(format!("-f {}", output_path_flag_target.display()));
        }
        FlagDialect::Standard => {
            flags.push(format!("-C {}", output_path_flag_target.display()));
        }
    }

    let mut seen = IndexSet::new();
    let deduped: Vec<&String> = flags.iter().filter(|f| seen.insert((*f).clone())).collect();
    let out = deduped.iter().map(|f| f.as_str()).collect::<Vec<_>>().join("\n") + "\n";
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_orders_result_then_includes_then_library_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let result = ClassifiedResult {
            result: vec!["/a.sv".into()],
            result_includes: vec!["/b.svh".into()],
            result_library_files: vec!["/c.v".into()],
        };
        write_plain(&out, &result).unwrap();
        let contents = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["/a.sv", "/b.svh", "/c.v"]);
    }

    #[test]
    fn verific_compat_uses_f_not_c() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.flags");
        let result = ClassifiedResult::default();
        let meta = FlagMetadata::default();
        write_flags(&out, &result, &meta, &out, FlagDialect::VerificCompat).unwrap();
        let contents = fs::read_to_string(&out).unwrap();
        assert!(contents.lines().any(|l| l.starts_with("-f ")));
        assert!(!contents.lines().any(|l| l.starts_with("-C ")));
    }
}
