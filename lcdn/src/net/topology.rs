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

//! The stacked per-priority topology.

use crate::net::types::{
    Edge, EdgeId, Host, Link, LinkStack, LinkState, Node, NodeId, TopologyError,
    MAX_PACKET_SIZE_DELAY,
};
use log::*;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::collections::{BTreeMap, HashMap};

/// Delay thresholds in seconds for a four-queue deployment, strictest first.
const THRESHOLDS_4: [f64; 4] = [0.5e-3, 1e-3, 6e-3, 24e-3];
/// Delay thresholds in seconds for an eight-queue deployment, strictest first.
const THRESHOLDS_8: [f64; 8] = [0.1e-3, 0.5e-3, 1e-3, 3e-3, 6e-3, 12e-3, 18e-3, 24e-3];

/// The shared graph structure over switches and hosts. Node weights are the external
/// node ids; all per-link state lives in the [`Topology`]'s link map.
pub(crate) type TopoGraph = StableGraph<NodeId, (), Directed, u32>;

/// # Stacked topology
///
/// One directed graph over switches and hosts, with one [`LinkState`] per priority layer
/// on every directed link. All layers share the node and link sets and the per-layer
/// delay thresholds; they differ only in their mutable queue state.
///
/// A host-outgoing link has a single egress queue: its state lives in layer 0, and
/// lookups for higher layers are redirected there. The two directions of a link are
/// independent queue stacks.
///
/// The topology is the unit of the snapshot scheme the flow manager relies on: `Clone`
/// produces a fully independent copy, and `PartialEq` compares the complete queue state,
/// so a committed transaction can be checked for exact state restoration.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: TopoGraph,
    indices: HashMap<NodeId, NodeIndex>,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    hosts: HashMap<NodeId, Host>,
    links: BTreeMap<Link, LinkStack>,
    thresholds: Vec<f64>,
}

impl PartialEq for Topology {
    fn eq(&self, other: &Self) -> bool {
        // the graph is fully determined by the node and link registries
        self.thresholds == other.thresholds
            && self.nodes == other.nodes
            && self.edges == other.edges
            && self.hosts == other.hosts
            && self.links == other.links
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// An empty topology with the default four priority queues.
    pub fn new() -> Self {
        Self::build(THRESHOLDS_4.to_vec())
    }

    /// An empty topology with the given number of priority queues (4 or 8).
    pub fn with_queues(num_queues: usize) -> Result<Self, TopologyError> {
        match num_queues {
            4 => Ok(Self::build(THRESHOLDS_4.to_vec())),
            8 => Ok(Self::build(THRESHOLDS_8.to_vec())),
            n => Err(TopologyError::UnsupportedQueueCount(n)),
        }
    }

    fn build(thresholds: Vec<f64>) -> Self {
        Self {
            graph: TopoGraph::default(),
            indices: HashMap::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            hosts: HashMap::new(),
            links: BTreeMap::new(),
            thresholds,
        }
    }

    /// Number of priority queues per link.
    pub fn num_queues(&self) -> usize {
        self.thresholds.len()
    }

    /// The delay threshold of the given priority queue, in seconds.
    pub fn threshold(&self, q_level: usize) -> f64 {
        self.thresholds[q_level]
    }

    /// Effective per-hop delay budget of a link at the given priority: the host egress
    /// queue always contributes the layer-0 threshold.
    pub fn hop_threshold(&self, link: Link, q_level: usize) -> f64 {
        if self.is_host(link.0) {
            self.thresholds[0]
        } else {
            self.thresholds[q_level]
        }
    }

    /// Returns true if and only if the id belongs to a registered host.
    pub fn is_host(&self, id: NodeId) -> bool {
        self.hosts.contains_key(&id)
    }

    /// The node id of the host with the given IP address.
    pub fn id_for_ip(&self, ip: &str) -> Option<NodeId> {
        self.hosts.values().find(|host| host.ip == ip).map(|host| host.id)
    }

    /// Add a new switch. Fails if the id is already taken.
    pub fn add_node(&mut self, node: Node) -> Result<(), TopologyError> {
        if self.indices.contains_key(&node.id) {
            return Err(TopologyError::NodeAlreadyExists(node.id));
        }
        info!("Adding new node {}", node.id);
        debug!("Parameters: {:?}", node);
        let index = self.graph.add_node(node.id);
        self.indices.insert(node.id, index);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Remove a switch together with all its links.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), TopologyError> {
        let index = *self.indices.get(&id).ok_or(TopologyError::NodeNotFound(id))?;
        info!("Removing node {}", id);
        self.graph.remove_node(index);
        self.indices.remove(&id);
        self.nodes.remove(&id);
        self.links.retain(|&(u, v), _| u != id && v != id);
        self.edges.retain(|_, edge| edge.first != id && edge.second != id);
        Ok(())
    }

    /// Add a bidirectional link between two switches: both directions are created in
    /// every layer, with the layer state initialised to an empty arrival curve and the
    /// raw rate-latency service curve of the link.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), TopologyError> {
        if self.edges.contains_key(&edge.id) {
            return Err(TopologyError::EdgeAlreadyExists(edge.id));
        }
        let first = *self.indices.get(&edge.first).ok_or(TopologyError::NodeNotFound(edge.first))?;
        let second =
            *self.indices.get(&edge.second).ok_or(TopologyError::NodeNotFound(edge.second))?;
        if self.links.contains_key(&(edge.first, edge.second)) {
            return Err(TopologyError::LinkAlreadyExists(edge.first, edge.second));
        }
        info!("Adding new edge {} {}", edge.first, edge.second);
        debug!("Parameters: {:?}", edge);

        let num_queues = self.num_queues();
        let latency = edge.prop_delay + MAX_PACKET_SIZE_DELAY;
        self.graph.add_edge(first, second, ());
        self.graph.add_edge(second, first, ());
        self.links.insert(
            (edge.first, edge.second),
            LinkStack::new(edge.rate, latency, edge.q_size, edge.prop_delay, num_queues),
        );
        self.links.insert(
            (edge.second, edge.first),
            LinkStack::new(edge.rate, latency, edge.q_size, edge.prop_delay, num_queues),
        );
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Remove a bidirectional link.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(), TopologyError> {
        let edge = self.edges.remove(&id).ok_or(TopologyError::EdgeNotFound(id))?;
        info!("Removing edge {}", id);
        self.unlink(edge.first, edge.second);
        self.unlink(edge.second, edge.first);
        Ok(())
    }

    /// Add a host and its attachment links. The host-outgoing link models the single
    /// egress queue of the host (buffer on the host side, no propagation term in the
    /// service latency); the host-incoming link is a regular switch queue with the
    /// switch-side buffer.
    pub fn add_host(&mut self, host: Host) -> Result<(), TopologyError> {
        if self.indices.contains_key(&host.id) {
            return Err(TopologyError::NodeAlreadyExists(host.id));
        }
        let switch = *self
            .indices
            .get(&host.connected_switch)
            .ok_or(TopologyError::NodeNotFound(host.connected_switch))?;
        info!("Adding new host {}", host.id);
        debug!("Parameters: {:?}", host);

        let index = self.graph.add_node(host.id);
        self.indices.insert(host.id, index);
        let num_queues = self.num_queues();
        self.graph.add_edge(index, switch, ());
        self.graph.add_edge(switch, index, ());
        self.links.insert(
            (host.id, host.connected_switch),
            LinkStack::new(
                host.link_rate,
                MAX_PACKET_SIZE_DELAY,
                host.host_buffer,
                host.prop_delay,
                num_queues,
            ),
        );
        self.links.insert(
            (host.connected_switch, host.id),
            LinkStack::new(
                host.link_rate,
                host.prop_delay + MAX_PACKET_SIZE_DELAY,
                host.switch_buffer,
                host.prop_delay,
                num_queues,
            ),
        );
        self.hosts.insert(host.id, host);
        Ok(())
    }

    /// Remove a host and its attachment links.
    pub fn remove_host(&mut self, id: NodeId) -> Result<(), TopologyError> {
        let host = self.hosts.remove(&id).ok_or(TopologyError::HostNotFound(id))?;
        info!("Removing host {}", id);
        self.unlink(host.id, host.connected_switch);
        self.unlink(host.connected_switch, host.id);
        if let Some(index) = self.indices.remove(&id) {
            self.graph.remove_node(index);
        }
        Ok(())
    }

    fn unlink(&mut self, from: NodeId, to: NodeId) {
        self.links.remove(&(from, to));
        if let (Some(&u), Some(&v)) = (self.indices.get(&from), self.indices.get(&to)) {
            if let Some(edge) = self.graph.find_edge(u, v) {
                self.graph.remove_edge(edge);
            }
        }
    }

    /// Queue state of a directed link at the given priority. Lookups on host-outgoing
    /// links are redirected to layer 0, the single egress queue.
    pub fn state(&self, link: Link, q_level: usize) -> Option<&LinkState> {
        let q_level = if self.is_host(link.0) { 0 } else { q_level };
        self.links.get(&link).and_then(|stack| stack.queues.get(q_level))
    }

    /// Mutable queue state of a directed link, with the same layer redirection as
    /// [`Topology::state`].
    pub fn state_mut(&mut self, link: Link, q_level: usize) -> Option<&mut LinkState> {
        let q_level = if self.hosts.contains_key(&link.0) { 0 } else { q_level };
        self.links.get_mut(&link).and_then(|stack| stack.queues.get_mut(q_level))
    }

    /// Buffer capacity of a directed link, in bits.
    pub fn buffer_of(&self, link: Link) -> Option<f64> {
        self.links.get(&link).map(|stack| stack.buffer)
    }

    /// All directed links, in deterministic (sorted) order.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.keys().copied()
    }

    /// Routing cost of a directed link on layer 0; infinite for unknown links.
    pub(crate) fn cost(&self, link: Link) -> f64 {
        self.links.get(&link).map(|stack| stack.queues[0].cost).unwrap_or(f64::INFINITY)
    }

    pub(crate) fn graph(&self) -> &TopoGraph {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.indices.get(&id).copied()
    }

    /// Live worst-case queueing delay of every link, per priority. Host-outgoing links
    /// are reported for priority 0 only, where their single egress queue lives.
    pub fn all_q_delays(&self) -> Vec<BTreeMap<Link, f64>> {
        self.per_priority(|state, _| state.service.delay(state.arrival))
    }

    /// Live worst-case buffer use of every link, per priority, bounded with the
    /// layer's delay threshold.
    pub fn all_buffers(&self) -> Vec<BTreeMap<Link, f64>> {
        self.per_priority(|state, threshold| state.service.buffer_threshold(state.arrival, threshold))
    }

    /// Booked arrival rate of every link, per priority.
    pub fn all_rates(&self) -> Vec<BTreeMap<Link, f64>> {
        self.per_priority(|state, _| state.arrival.rate)
    }

    fn per_priority<F>(&self, value: F) -> Vec<BTreeMap<Link, f64>>
    where
        F: Fn(&LinkState, f64) -> f64,
    {
        (0..self.num_queues())
            .map(|q| {
                let threshold = self.threshold(q);
                self.links
                    .iter()
                    .filter(|(link, _)| q == 0 || !self.is_host(link.0))
                    .map(|(&link, stack)| (link, value(&stack.queues[q], threshold)))
                    .collect()
            })
            .collect()
    }
}
