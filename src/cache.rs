//! Cache Layer (spec.md §4.2): a content-hashed cache that skips the whole
//! pipeline on unchanged inputs. Grounded in the shape of `SolFilesCache`
//! (stored metadata + a version stamp + per-path content hashes, checked
//! bitwise against the current input set before trusting a hit).

use crate::classify::ClassifiedResult;
use crate::error::{Error, Result};
use crate::model::InputFileSet;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bumped whenever the on-disk record shape changes incompatibly. A reader
/// rejects any version it does not know.
pub const CACHE_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    cache_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    meta: CacheMeta,
    input_file_set: IndexSet<PathBuf>,
    file_hashes: HashMap<PathBuf, String>,
    result: Vec<PathBuf>,
    result_includes: Vec<PathBuf>,
    result_library_files: Vec<PathBuf>,
}

/// Why a cache lookup didn't produce a hit. Never propagated past this
/// module: every variant is logged and treated as the slow path.
#[derive(Debug)]
enum CacheMiss {
    Absent,
    Unparseable(serde_json::Error),
    VersionMismatch { found: u32 },
    InputSetChanged,
    FileMissingOrChanged(PathBuf),
}

impl std::fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheMiss::Absent => write!(f, "no cache file present"),
            CacheMiss::Unparseable(e) => write!(f, "cache file is not a valid record: {e}"),
            CacheMiss::VersionMismatch { found } => {
                write!(f, "cache version {found} is not the current version {CACHE_VERSION}")
            }
            CacheMiss::InputSetChanged => write!(f, "input file set no longer matches"),
            CacheMiss::FileMissingOrChanged(path) => {
                write!(f, "file changed or missing: {}", path.display())
            }
        }
    }
}

pub struct CacheLayer;

impl CacheLayer {
    /// Attempts to reconstitute a previous run's result. Any failure mode is
    /// a miss, not an error: the caller falls through to a full run.
    #[tracing::instrument(skip_all, name = "cache_try_load")]
    pub fn try_load(cache_path: &Path, input_file_set: &InputFileSet) -> Option<ClassifiedResult> {
        match Self::try_load_inner(cache_path, input_file_set) {
            Ok(result) => {
                tracing::debug!("cache hit");
                Some(result)
            }
            Err(miss) => {
                tracing::debug!(%miss, "cache miss");
                None
            }
        }
    }

    fn try_load_inner(
        cache_path: &Path,
        input_file_set: &InputFileSet,
    ) -> std::result::Result<ClassifiedResult, CacheMiss> {
        let bytes = fs::read(cache_path).map_err(|_| CacheMiss::Absent)?;
        let record: CacheRecord =
            serde_json::from_slice(&bytes).map_err(CacheMiss::Unparseable)?;

        if record.meta.cache_version != CACHE_VERSION {
            return Err(CacheMiss::VersionMismatch {
                found: record.meta.cache_version,
            });
        }

        let current: IndexSet<PathBuf> = input_file_set.iter().cloned().collect();
        if record.input_file_set != current {
            return Err(CacheMiss::InputSetChanged);
        }

        for (path, expected_hash) in &record.file_hashes {
            let actual_hash =
                hash_file(path).map_err(|_| CacheMiss::FileMissingOrChanged(path.clone()))?;
            if &actual_hash != expected_hash {
                return Err(CacheMiss::FileMissingOrChanged(path.clone()));
            }
        }

        Ok(ClassifiedResult {
            result: record.result,
            result_includes: record.result_includes,
            result_library_files: record.result_library_files,
        })
    }

    /// Writes a fresh record covering the union of `input_file_set` and
    /// every output path. Errors here are reported but do not retract an
    /// already-printed result.
    #[tracing::instrument(skip_all, name = "cache_write")]
    pub fn write(
        cache_path: &Path,
        input_file_set: &InputFileSet,
        result: &ClassifiedResult,
    ) -> Result<()> {
        let mut all_paths: IndexSet<PathBuf> = input_file_set.iter().cloned().collect();
        all_paths.extend(result.result.iter().cloned());
        all_paths.extend(result.result_includes.iter().cloned());
        all_paths.extend(result.result_library_files.iter().cloned());

        let mut file_hashes = HashMap::with_capacity(all_paths.len());
        for path in &all_paths {
            let hash = hash_file(path)
                .map_err(|source| Error::CacheWriteFailed { path: path.clone(), source })?;
            file_hashes.insert(path.clone(), hash);
        }

        let record = CacheRecord {
            meta: CacheMeta { cache_version: CACHE_VERSION },
            input_file_set: input_file_set.iter().cloned().collect(),
            file_hashes,
            result: result.result.clone(),
            result_includes: result.result_includes.clone(),
            result_library_files: result.result_library_files.clone(),
        };

        let json = serde_json::to_vec_pretty(&record)?;
        let tmp_path = cache_path.with_extension("tmp");
        fs::write(&tmp_path, &json)
            .map_err(|source| Error::CacheWriteFailed { path: cache_path.to_path_buf(), source })?;
        fs::rename(&tmp_path, cache_path)
            .map_err(|source| Error::CacheWriteFailed { path: cache_path.to_path_buf(), source })?;

        tracing::debug!(path = %cache_path.display(), files = all_paths.len(), "cache written");
        Ok(())
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn round_trips_unchanged_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(&dir, "top.sv", "module top; endmodule\n");
        let cache_path = dir.path().join("svprune.cache.json");

        let mut input_set = InputFileSet::default();
        input_set.insert(src.clone());

        let result = ClassifiedResult {
            result: vec![src.clone()],
            result_includes: vec![],
            result_library_files: vec![],
        };

        CacheLayer::write(&cache_path, &input_set, &result).unwrap();
        let loaded = CacheLayer::try_load(&cache_path, &input_set);
        assert_eq!(loaded, Some(result));
    }

    #[test]
    fn invalidates_on_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(&dir, "top.sv", "module top; endmodule\n");
        let cache_path = dir.path().join("svprune.cache.json");

        let mut input_set = InputFileSet::default();
        input_set.insert(src.clone());
        let result = ClassifiedResult {
            result: vec![src.clone()],
            result_includes: vec![],
            result_library_files: vec![],
        };
        CacheLayer::write(&cache_path, &input_set, &result).unwrap();

        fs::write(&src, "module top; wire x; endmodule\n").unwrap();
        assert_eq!(CacheLayer::try_load(&cache_path, &input_set), None);
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("svprune.cache.json");
        fs::write(&cache_path, br#"{"meta":{"cache_version":999},"input_file_set":[],"file_hashes":{},"result":[],"result_includes":[],"result_library_files":[]}"#).unwrap();
        let input_set = InputFileSet::default();
        assert_eq!(CacheLayer::try_load(&cache_path, &input_set), None);
    }
}
