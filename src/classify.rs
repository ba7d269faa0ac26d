//! Result Classifier (spec.md §4.6): partitions the ordered buffer set into
//! primary sources, includes, and library files, per the visibility rule.

use crate::frontend::FrontEnd;
use crate::model::BufferId;
use indexmap::{IndexMap, IndexSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedResult {
    pub result: Vec<PathBuf>,
    pub result_includes: Vec<PathBuf>,
    pub result_library_files: Vec<PathBuf>,
}

pub struct ResultClassifier;

impl ResultClassifier {
    /// `load_order` carries the user-listed input paths (spec.md §3's
    /// `load_order`, keyed by path); a path absent from it was discovered
    /// only through an include chain and, absent an explicit listing, is
    /// excluded from `result` per the §4.6 visibility rule.
    pub fn classify(
        front_end: &dyn FrontEnd,
        order: &[BufferId],
        load_order: &IndexMap<PathBuf, u32>,
    ) -> ClassifiedResult {
        let mut include_only: IndexSet<PathBuf> = IndexSet::new();
        for buffer in front_end.all_buffers() {
            for (included, _offset) in front_end.includes(buffer) {
                include_only.insert(front_end.full_path(included));
            }
        }

        let mut result = Vec::new();
        let mut result_includes = Vec::new();
        let mut result_library_files = Vec::new();

        for &buffer in order {
            let path = front_end.full_path(buffer);
            if path.as_os_str().is_empty() {
                continue;
            }
            let is_library = front_end.library_tag(buffer).is_some();
            let is_include = include_only.contains(&path);
            let is_listed = load_order.contains_key(&path);

            if is_include {
                result_includes.push(path.clone());
            }
            if is_library {
                result_library_files.push(path);
                continue;
            }
            if is_include && !is_listed {
                // Included but never explicitly listed: excluded from
                // `result`, already recorded in `result_includes` above.
                continue;
            }
            result.push(path);
        }

        tracing::debug!(
            result = result.len(),
            includes = result_includes.len(),
            library_files = result_library_files.len(),
            "classified result"
        );

        ClassifiedResult {
            result,
            result_includes,
            result_library_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::regex_frontend::RegexFrontEnd;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn include_only_file_excluded_from_result_but_kept_in_includes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "defs.vh", "`define WIDTH 8\n");
        let top = write_file(&dir, "top.sv", "`include \"defs.vh\"\nmodule top; endmodule\n");

        let mut fe = RegexFrontEnd::new();
        let top_id = fe.add_source(&top).unwrap();
        fe.parse_all().unwrap();
        let order = vec![fe.dependencies(top_id)[0], top_id];

        let mut load_order = IndexMap::new();
        load_order.insert(fe.full_path(top_id), 0);

        let classified = ResultClassifier::classify(&fe, &order, &load_order);
        assert_eq!(classified.result, vec![dunce::canonicalize(&top).unwrap()]);
        assert_eq!(
            classified.result_includes,
            vec![dunce::canonicalize(dir.path().join("defs.vh")).unwrap()]
        );
    }

    #[test]
    fn explicitly_listed_and_included_file_stays_in_result() {
        let dir = tempfile::tempdir().unwrap();
        let defs = write_file(&dir, "defs.vh", "`define WIDTH 8\n");
        let top = write_file(&dir, "top.sv", "`include \"defs.vh\"\nmodule top; endmodule\n");

        let mut fe = RegexFrontEnd::new();
        let top_id = fe.add_source(&top).unwrap();
        let defs_id = fe.add_source(&defs).unwrap();
        fe.parse_all().unwrap();

        let order = vec![defs_id, top_id];
        let mut load_order = IndexMap::new();
        load_order.insert(fe.full_path(top_id), 0);
        load_order.insert(fe.full_path(defs_id), 1);

        let classified = ResultClassifier::classify(&fe, &order, &load_order);
        assert!(classified.result.contains(&dunce::canonicalize(&defs).unwrap()));
        assert!(classified.result_includes.contains(&dunce::canonicalize(&defs).unwrap()));
    }
}
