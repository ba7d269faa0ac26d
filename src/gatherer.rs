//! Input Gatherer (spec.md §4.1): expands the raw argument surface into the
//! canonical [`InputFileSet`], loading every path into the front end along
//! the way. No parsing happens here beyond command-file expansion.

use crate::error::{Error, Result};
use crate::frontend::regex_frontend::RegexFrontEnd;
use crate::model::InputFileSet;
use std::path::{Path, PathBuf};

/// The raw, unexpanded argument surface the CLI hands the gatherer: source
/// files in listed order, `-v` library files (optionally `name=path`), `-y`
/// library search directories, `-Y`/`+libext+` extensions, `+incdir+`
/// directories, `+define+` macros, and `-f`/`-C` command files.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub sources: Vec<PathBuf>,
    pub library_files: Vec<(PathBuf, Option<String>)>,
    pub library_dirs: Vec<PathBuf>,
    pub library_exts: Vec<String>,
    pub incdirs: Vec<PathBuf>,
    pub defines: Vec<(String, Option<String>)>,
    pub command_files: Vec<PathBuf>,
}

impl RawInputs {
    fn extend_token(&mut self, token: &str, base_dir: &Path) -> Result<()> {
        if let Some(rest) = token.strip_prefix("+incdir+") {
            self.incdirs.push(base_dir.join(rest));
        } else if let Some(rest) = token.strip_prefix("+libext+") {
            self.library_exts.push(rest.trim_start_matches('.').to_string());
        } else if let Some(rest) = token.strip_prefix("+define+") {
            match rest.split_once('=') {
                Some((name, value)) => self.defines.push((name.to_string(), Some(value.to_string()))),
                None => self.defines.push((rest.to_string(), None)),
            }
        } else if token == "-y" || token == "-Y" || token == "-v" || token == "-f" || token == "-C" {
            // Value-taking flags arrive as separate tokens in our simple
            // line-oriented command-file grammar; a bare flag word with no
            // following value on its own line is a malformed command file.
            return Err(Error::msg(format!(
                "command file flag `{token}` requires a value on the same line"
            )));
        } else if let Some(rest) = token.strip_prefix("-y ") {
            self.library_dirs.push(base_dir.join(rest.trim()));
        } else if let Some(rest) = token.strip_prefix("-Y ") {
            self.library_exts.push(rest.trim().trim_start_matches('.').to_string());
        } else {
            self.sources.push(base_dir.join(token));
        }
        Ok(())
    }
}

/// Loads every input into the front end and returns the canonical
/// [`InputFileSet`] that covers them all.
pub struct Gatherer;

impl Gatherer {
    pub fn gather(front_end: &mut RegexFrontEnd, raw: RawInputs) -> Result<InputFileSet> {
        tracing::debug!(
            sources = raw.sources.len(),
            library_files = raw.library_files.len(),
            library_dirs = raw.library_dirs.len(),
            command_files = raw.command_files.len(),
            "gathering inputs"
        );

        let mut expanded = raw.clone();
        let mut seen_command_files = std::collections::HashSet::new();
        let mut pending: Vec<PathBuf> = raw.command_files.clone();
        while let Some(path) = pending.pop() {
            let canonical = dunce::canonicalize(&path).map_err(|e| {
                Error::msg(format!("command file `{}` could not be opened: {e}", path.display()))
            })?;
            if !seen_command_files.insert(canonical.clone()) {
                continue;
            }
            let base_dir = canonical.parent().unwrap_or(Path::new(".")).to_path_buf();
            let contents = std::fs::read_to_string(&canonical)?;
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                    continue;
                }
                if let Some(rest) = line.strip_prefix("-f ").or_else(|| line.strip_prefix("-C ")) {
                    pending.push(base_dir.join(rest.trim()));
                    continue;
                }
                if let Some(rest) = line.strip_prefix("-v ") {
                    match rest.trim().split_once('=') {
                        Some((name, value)) => {
                            expanded.library_files.push((base_dir.join(value), Some(name.to_string())))
                        }
                        None => expanded.library_files.push((base_dir.join(rest.trim()), None)),
                    }
                    continue;
                }
                expanded.extend_token(line, &base_dir)?;
            }
        }

        for incdir in &expanded.incdirs {
            front_end.add_incdir(incdir.clone());
        }

        let mut input_set = InputFileSet::default();

        for (i, source) in expanded.sources.iter().enumerate() {
            let id = front_end
                .add_source(source)
                .map_err(|e| Error::msg(format!("cannot open source `{}`: {e}", source.display())))?;
            let _ = id;
            input_set.insert(dunce::canonicalize(source).unwrap_or_else(|_| source.clone()));
        }

        for (path, name) in &expanded.library_files {
            front_end
                .add_library(path, name.clone())
                .map_err(|e| Error::msg(format!("cannot open library file `{}`: {e}", path.display())))?;
            input_set.insert(dunce::canonicalize(path).unwrap_or_else(|_| path.clone()));
        }

        for dir in &expanded.library_dirs {
            let entries = std::fs::read_dir(dir)
                .map_err(|e| Error::msg(format!("cannot open library directory `{}`: {e}", dir.display())))?;
            for entry in entries {
                let entry = entry?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let matches_ext = expanded.library_exts.is_empty()
                    || path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| expanded.library_exts.iter().any(|e| e == ext))
                        .unwrap_or(false);
                if !matches_ext {
                    continue;
                }
                front_end
                    .add_library(&path, None)
                    .map_err(|e| Error::msg(format!("cannot open library file `{}`: {e}", path.display())))?;
                input_set.insert(dunce::canonicalize(&path).unwrap_or(path));
            }
        }

        Ok(input_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gathers_explicit_sources_into_input_set() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path().join("top.sv");
        std::fs::File::create(&top)
            .unwrap()
            .write_all(b"module top; endmodule\n")
            .unwrap();

        let mut front_end = RegexFrontEnd::new();
        let raw = RawInputs {
            sources: vec![top.clone()],
            ..Default::default()
        };
        let input_set = Gatherer::gather(&mut front_end, raw).unwrap();
        assert!(input_set.contains(&dunce::canonicalize(&top).unwrap()));
    }

    #[test]
    fn expands_nested_command_file() {
        let dir = tempfile::tempdir().unwrap();
        let leaf = dir.path().join("leaf.sv");
        std::fs::File::create(&leaf)
            .unwrap()
            .write_all(b"module leaf; endmodule\n")
            .unwrap();
        let inner_f = dir.path().join("inner.f");
        std::fs::File::create(&inner_f)
            .unwrap()
            .write_all(b"leaf.sv\n")
            .unwrap();
        let outer_f = dir.path().join("outer.f");
        std::fs::File::create(&outer_f)
            .unwrap()
            .write_all(b"-f inner.f\n")
            .unwrap();

        let mut front_end = RegexFrontEnd::new();
        let raw = RawInputs {
            command_files: vec![outer_f],
            ..Default::default()
        };
        let input_set = Gatherer::gather(&mut front_end, raw).unwrap();
        assert!(input_set.contains(&dunce::canonicalize(&leaf).unwrap()));
    }
}
