//! Dependency Graph Builder (spec.md §4.4): merges instance edges, include
//! edges, and implicit macro-resolution edges into one relation keyed by
//! [`BufferId`], and builds the `path -> SourceNode` map the rest of the
//! pipeline reads.

use crate::error::{Error, Result};
use crate::frontend::{FrontEnd, InstanceSymbol, Root};
use crate::model::{BufferId, LoadOrder, SourceNode};
use indexmap::{IndexMap, IndexSet};
use std::path::PathBuf;

/// The merged `DEP` relation, keyed by buffer, in first-discovery order.
pub struct DependencyGraph {
    pub edges: IndexMap<BufferId, IndexSet<BufferId>>,
    pub top_buffer: BufferId,
}

impl DependencyGraph {
    pub fn dependencies(&self, buffer: BufferId) -> &[BufferId] {
        self.edges
            .get(&buffer)
            .map(|set| set.as_slice())
            .unwrap_or(&[])
    }
}

/// Builds the per-buffer preprocessing view, keyed by canonical path. `load_order`
/// gives each explicitly-listed source its position in the user's input list;
/// everything else gets [`LoadOrder::NotListed`].
pub fn build_source_nodes(
    front_end: &dyn FrontEnd,
    load_order: &IndexMap<PathBuf, u32>,
) -> IndexMap<PathBuf, SourceNode> {
    let mut nodes = IndexMap::new();
    for buffer in front_end.all_buffers() {
        let path = front_end.full_path(buffer);
        if path.as_os_str().is_empty() {
            continue;
        }
        let order = load_order
            .get(&path)
            .map(|&i| LoadOrder::Listed(i))
            .unwrap_or(LoadOrder::NotListed);
        let mut node = SourceNode::new(path.clone(), order);

        for (name, offset) in front_end.exported_macros(buffer) {
            node.exported_macros.entry(name).or_insert(offset);
        }

        for (name, use_offset) in front_end.macro_usages(buffer) {
            let defined_before_use = node
                .exported_macros
                .get(&name)
                .map(|&define_offset| define_offset <= use_offset)
                .unwrap_or(false);
            if !defined_before_use {
                node.unresolved_macros.entry(name).or_insert(use_offset);
            }
        }

        for (included, offset) in front_end.includes(buffer) {
            node.includes.push((front_end.full_path(included), offset));
        }

        for dep in front_end.dependencies(buffer) {
            node.dependencies.insert(front_end.full_path(dep));
        }

        nodes.insert(path, node);
    }
    nodes
}

/// Builds the merged `DEP` relation per spec.md §4.4.
pub fn build(
    front_end: &dyn FrontEnd,
    root: &Root,
    source_nodes: &mut IndexMap<PathBuf, SourceNode>,
) -> Result<DependencyGraph> {
    if root.top_instances.len() != 1 {
        return Err(Error::TopModuleCountInvalid(root.top_instances.len()));
    }
    let top_buffer = root.top_instances[0].definition_buffer;

    let mut edges: IndexMap<BufferId, IndexSet<BufferId>> = IndexMap::new();

    // 1. Instance edges: walk every InstanceSymbol reachable from the top.
    fn walk_instances(
        node: &InstanceSymbol,
        edges: &mut IndexMap<BufferId, IndexSet<BufferId>>,
    ) {
        for child in &node.children {
            edges
                .entry(node.definition_buffer)
                .or_default()
                .insert(child.definition_buffer);
            walk_instances(child, edges);
        }
    }
    for top in &root.top_instances {
        walk_instances(top, &mut edges);
    }

    // 2. Include edges, in textual order.
    for buffer in front_end.all_buffers() {
        for (included, _offset) in front_end.includes(buffer) {
            edges.entry(buffer).or_default().insert(included);
        }
    }

    // 3. Implicit macro edges: latest user-listed exporter preceding the
    // user, per buffer, per unresolved macro name. Read-only pass first
    // (no reference into `source_nodes` outlives it), then apply the
    // resulting (node path, exporter path) pairs as a second pass.
    let mut implicit_macro_edges: Vec<(PathBuf, PathBuf)> = Vec::new();
    for node in source_nodes.values() {
        for name in node.unresolved_macros.keys() {
            let mut best: Option<(u32, PathBuf)> = None;
            for candidate in source_nodes.values() {
                if !candidate.load_order.precedes(&node.load_order) {
                    continue;
                }
                if !candidate.exported_macros.contains_key(name) {
                    continue;
                }
                let LoadOrder::Listed(candidate_order) = candidate.load_order else {
                    continue;
                };
                if best.as_ref().map(|(order, _)| candidate_order > *order).unwrap_or(true) {
                    best = Some((candidate_order, candidate.path.clone()));
                }
            }
            if let Some((_, exporter_path)) = best {
                implicit_macro_edges.push((node.path.clone(), exporter_path));
            }
        }
    }

    for (node_path, exporter_path) in implicit_macro_edges {
        let (Some(buffer), Some(exporter)) = (
            front_end.buffer_for_path(&node_path),
            front_end.buffer_for_path(&exporter_path),
        ) else {
            continue;
        };
        edges.entry(buffer).or_default().insert(exporter);
        if let Some(node_mut) = source_nodes.get_mut(&node_path) {
            node_mut.dependencies.insert(exporter_path);
        }
    }

    tracing::debug!(buffers = edges.len(), "dependency graph built");
    Ok(DependencyGraph { edges, top_buffer })
}
