//! Topological Orderer (spec.md §4.5): a hybrid BFS-of-roots / DFS-post-order
//! traversal that produces a leaf-first ordering while also discovering peer
//! dependencies that the instance-tree walk alone would miss.

use crate::error::{Error, Result};
use crate::frontend::FrontEnd;
use crate::graph::DependencyGraph;
use crate::model::{BufferId, Visit, VisitStatus};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

pub struct TopologicalOrderer;

impl TopologicalOrderer {
    /// Orders every buffer reachable from `graph.top_buffer`, following peer
    /// dependencies discovered along the way. Returns the order leaf-first.
    pub fn order(front_end: &dyn FrontEnd, graph: &DependencyGraph) -> Result<Vec<BufferId>> {
        let mut status: IndexMap<BufferId, VisitStatus> = IndexMap::new();
        let mut order: IndexSet<BufferId> = IndexSet::new();
        let mut worklist: VecDeque<BufferId> = VecDeque::new();
        worklist.push_back(graph.top_buffer);
        let mut cursor = 0;

        while let Some(n) = worklist.pop_front() {
            if status.get(&n).map(|s| s.peer_deps_enqueued).unwrap_or(false) {
                continue;
            }
            dfs_post(front_end, graph, n, &mut status, &mut order)?;
            while cursor < order.len() {
                let current = order[cursor];
                for peer in front_end.peer_dependencies(current) {
                    worklist.push_back(peer);
                }
                cursor += 1;
            }
            status.entry(n).or_default().peer_deps_enqueued = true;
        }

        tracing::debug!(ordered = order.len(), "topological order computed");
        Ok(order.into_iter().collect())
    }
}

fn dfs_post(
    front_end: &dyn FrontEnd,
    graph: &DependencyGraph,
    v: BufferId,
    status: &mut IndexMap<BufferId, VisitStatus>,
    order: &mut IndexSet<BufferId>,
) -> Result<()> {
    match status.entry(v).or_default().visit {
        Visit::Done => return Ok(()),
        Visit::InProgress => {
            return Err(Error::CycleDetected {
                buffer: v.to_string(),
                path: front_end.full_path(v),
            });
        }
        Visit::Unvisited => {}
    }
    status.entry(v).or_default().visit = Visit::InProgress;
    for u in graph.dependencies(v).to_vec() {
        dfs_post(front_end, graph, u, status, order)?;
    }
    order.insert(v);
    status.entry(v).or_default().visit = Visit::Done;
    Ok(())
}
