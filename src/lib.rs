//! svprune — prunes a SystemVerilog/Verilog file list down to the minimum
//! set of source files required to elaborate a designated top module,
//! emitting that set in reverse-topological (leaf-first) order along with
//! the include-search directories and library files a downstream simulator
//! or synthesis tool must still see.
//!
//! The pipeline, leaf-first: [`gatherer`] expands the raw argument surface
//! into the canonical input set; [`cache`] short-circuits everything below
//! it on an unchanged input set; [`frontend`] is the external
//! parser/elaborator contract; [`graph`] merges instance, include, and
//! implicit-macro edges; [`order`] produces the leaf-first sequence; and
//! [`classify`] partitions it into sources, includes, and library files.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod error;
pub mod frontend;
pub mod gatherer;
pub mod graph;
pub mod model;
pub mod order;
pub mod output;

pub use classify::ClassifiedResult;
pub use error::{Error, Result};

use cli::RunConfig;
use frontend::regex_frontend::RegexFrontEnd;
use frontend::FrontEnd;
use indexmap::IndexMap;

/// The crate version, baked in at build time (spec.md DESIGN NOTES' "global
/// VERSION... no lifecycle").
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the full pipeline for one invocation: gather, maybe-hit cache,
/// parse, elaborate, build the dependency graph, order, and classify.
/// Does not touch the cache file or any output sink; see [`run_and_emit`]
/// for the binary-facing entry point that does.
#[tracing::instrument(skip_all, name = "run")]
pub fn run(config: &RunConfig) -> Result<ClassifiedResult> {
    let mut front_end = RegexFrontEnd::new();
    let input_file_set = gatherer::Gatherer::gather(&mut front_end, config.raw_inputs.clone())?;

    if let Some(cache_path) = &config.cache_to {
        if let Some(cached) = cache::CacheLayer::try_load(cache_path, &input_file_set) {
            return Ok(cached);
        }
    }

    front_end
        .parse_all()
        .map_err(|e| Error::ParseFatal(e.0))?;

    let mut load_order: IndexMap<std::path::PathBuf, u32> = IndexMap::new();
    for (i, source) in config.raw_inputs.sources.iter().enumerate() {
        let canonical = dunce::canonicalize(source).unwrap_or_else(|_| source.clone());
        load_order.insert(canonical, i as u32);
    }

    let root = front_end
        .elaborate(&config.top_module)
        .map_err(|e| Error::ParseFatal(e.0))?;

    let mut source_nodes = graph::build_source_nodes(&front_end, &load_order);
    let dependency_graph = graph::build(&front_end, &root, &mut source_nodes)?;
    let ordered = order::TopologicalOrderer::order(&front_end, &dependency_graph)?;
    let classified = classify::ResultClassifier::classify(&front_end, &ordered, &load_order);

    if let Some(cache_path) = &config.cache_to {
        if let Err(e) = cache::CacheLayer::write(cache_path, &input_file_set, &classified) {
            tracing::error!(error = %e, "failed to write cache");
        }
    }

    Ok(classified)
}

/// The binary-facing entry point: runs the pipeline, then writes whichever
/// output sinks the config names.
pub fn run_and_emit(config: &RunConfig) -> Result<ClassifiedResult> {
    let classified = run(config)?;

    let plain_path = config
        .output
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("svprune.files"));

    if config.output.is_some() || config.output_flags_to.is_none() {
        output::write_plain(&plain_path, &classified)?;
    }

    if let Some(flags_path) = &config.output_flags_to {
        let meta = output::FlagMetadata {
            incdirs: config.raw_inputs.incdirs.iter().cloned().collect(),
            library_dirs: config.raw_inputs.library_dirs.iter().cloned().collect(),
            library_exts: config.raw_inputs.library_exts.iter().cloned().collect(),
            named_library_files: config
                .raw_inputs
                .library_files
                .iter()
                .filter_map(|(path, name)| name.clone().map(|n| (n, path.clone())))
                .collect(),
            defines: config.raw_inputs.defines.clone(),
        };
        output::write_flags(flags_path, &classified, &meta, &plain_path, config.dialect)?;
    }

    Ok(classified)
}
