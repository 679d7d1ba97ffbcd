// LCDN: Admission Control for Deterministic Low-Latency Networks
// Copyright (C) 2024  LCDN Developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Routing
//!
//! Cost-based path selection on priority layer 0. The cost of a directed link is
//! `1 + 1e6 · q_delay`, kept up to date by the state refresh, so path selection is
//! monotone in the current worst-case queueing delay. Paths are handled as ordered
//! lists of directed links.

use crate::flows::{EmbeddedFlow, FlowId};
use crate::net::{Link, NodeId, Topology};
use itertools::Itertools;
use log::*;
use petgraph::algo::astar;
use petgraph::prelude::*;
use petgraph::visit::EdgeFiltered;
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Size of the internal candidate window from which the ksp offset and the configured
/// number of initial paths select.
pub(crate) const CANDIDATE_WINDOW: usize = 10;

type NodePath = Vec<NodeIndex>;

/// Up to `k` loop-free paths from `src` to `dst`, cheapest first.
///
/// Yen's algorithm: the cheapest path is found directly, every further path is the best
/// spur off an already accepted path with the conflicting links masked out. Equal-cost
/// paths are ordered lexicographically by their node-id sequence, which keeps the
/// candidate order deterministic.
pub fn k_shortest_paths(topo: &Topology, src: NodeId, dst: NodeId, k: usize) -> Vec<Vec<Link>> {
    let (src_ix, dst_ix) = match (topo.index_of(src), topo.index_of(dst)) {
        (Some(s), Some(d)) if s != d => (s, d),
        _ => return Vec::new(),
    };
    if k == 0 {
        return Vec::new();
    }

    let first = match spur_path(topo, src_ix, dst_ix, &HashSet::new(), &HashSet::new()) {
        Some(path) => path,
        None => return Vec::new(),
    };

    let mut accepted: Vec<NodePath> = vec![first];
    let mut candidates: Vec<NodePath> = Vec::new();

    while accepted.len() < k {
        let prev = accepted.last().expect("at least one accepted path").clone();

        for i in 0..prev.len() - 1 {
            let spur_node = prev[i];
            let root = &prev[..=i];

            let mut removed_links: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
            for path in &accepted {
                if path.len() > i + 1 && path[..=i] == *root {
                    removed_links.insert((path[i], path[i + 1]));
                }
            }
            let removed_nodes: HashSet<NodeIndex> = root[..i].iter().copied().collect();

            if let Some(mut spur) = spur_path(topo, spur_node, dst_ix, &removed_links, &removed_nodes)
            {
                let mut total: NodePath = root[..i].to_vec();
                total.append(&mut spur);
                if !accepted.contains(&total) && !candidates.contains(&total) {
                    candidates.push(total);
                }
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| compare_paths(topo, a, b));
        accepted.push(candidates.remove(0));
    }

    accepted.sort_by(|a, b| compare_paths(topo, a, b));
    accepted.iter().map(|path| to_links(topo, path)).collect()
}

/// Candidate paths for an embedding: the cheapest [`CANDIDATE_WINDOW`] paths with the
/// first `offset` skipped. When the offset exhausts the window the last path is kept,
/// so a connected pair always yields at least one candidate.
pub fn candidate_paths(topo: &Topology, src: NodeId, dst: NodeId, offset: usize) -> Vec<Vec<Link>> {
    let mut paths = k_shortest_paths(topo, src, dst, CANDIDATE_WINDOW);
    if paths.is_empty() {
        return paths;
    }
    let paths = if paths.len() <= offset {
        vec![paths.pop().expect("paths is not empty")]
    } else {
        paths.split_off(offset)
    };
    debug!("Candidate paths from {} to {}: {:?}", src, dst, paths);
    paths
}

/// Admitted flows ranked by how many directed links they share with the given path,
/// most overlapping first. Ties keep ascending flow id, so the order is deterministic.
pub fn flows_ranked_by_overlap(
    path: &[Link],
    flows: &BTreeMap<FlowId, EmbeddedFlow>,
) -> Vec<FlowId> {
    let links: HashSet<Link> = path.iter().copied().collect();
    flows
        .iter()
        .map(|(&id, flow)| (id, flow.path.iter().filter(|&link| links.contains(link)).count()))
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .map(|(id, _)| id)
        .collect()
}

/// Cheapest path from `from` to `to` that avoids the removed nodes and links.
fn spur_path(
    topo: &Topology,
    from: NodeIndex,
    to: NodeIndex,
    removed_links: &HashSet<(NodeIndex, NodeIndex)>,
    removed_nodes: &HashSet<NodeIndex>,
) -> Option<NodePath> {
    let graph = topo.graph();
    let filtered = EdgeFiltered::from_fn(graph, |edge| {
        !removed_nodes.contains(&edge.source())
            && !removed_nodes.contains(&edge.target())
            && !removed_links.contains(&(edge.source(), edge.target()))
    });
    astar(
        &filtered,
        from,
        |finish| finish == to,
        |edge| topo.cost((graph[edge.source()], graph[edge.target()])),
        |_| 0.0,
    )
    .map(|(_, path)| path)
}

/// Order paths by total cost, then lexicographically by the node-id sequence.
fn compare_paths(topo: &Topology, a: &NodePath, b: &NodePath) -> Ordering {
    let cost_a = path_cost(topo, a);
    let cost_b = path_cost(topo, b);
    cost_a
        .partial_cmp(&cost_b)
        .unwrap_or(Ordering::Equal)
        .then_with(|| node_ids(topo, a).cmp(&node_ids(topo, b)))
}

fn path_cost(topo: &Topology, path: &NodePath) -> f64 {
    let graph = topo.graph();
    path.iter().tuple_windows().map(|(&u, &v)| topo.cost((graph[u], graph[v]))).sum()
}

fn node_ids(topo: &Topology, path: &NodePath) -> Vec<NodeId> {
    let graph = topo.graph();
    path.iter().map(|&index| graph[index]).collect()
}

fn to_links(topo: &Topology, path: &NodePath) -> Vec<Link> {
    let graph = topo.graph();
    path.iter().tuple_windows().map(|(&u, &v)| (graph[u], graph[v])).collect()
}
