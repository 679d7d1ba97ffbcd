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

//! The orchestration facade external collaborators drive.

use crate::error::Error;
use crate::flows::{FlowId, FlowInfo, FlowRequest};
use crate::manager::{FlowManager, Placement, RerouteStrategy, Strategy};
use crate::net::{Edge, EdgeId, Host, Link, Node, NodeId, Topology};
use log::*;
use std::collections::BTreeMap;
use std::time::Instant;

/// The record reported for a successful embedding
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedResult {
    /// Id of the new flow
    pub flow_id: FlowId,
    /// Source host id
    pub src: NodeId,
    /// Destination host id
    pub dst: NodeId,
    /// The directed links the flow traverses, in order
    pub path: Vec<Link>,
    /// The priority queue the flow occupies
    pub priority: usize,
    /// The placement the request was embedded with
    pub strategy: Placement,
    /// Wall-clock duration of the embedding decision, in nanoseconds
    pub embedding_time_ns: u128,
    /// Flows that were demoted to make room for this one
    pub rerouted_flows: Vec<ReroutedFlow>,
}

/// New placement of a flow that was demoted during an embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ReroutedFlow {
    /// Flow id
    pub id: FlowId,
    /// The flow's new path
    pub path: Vec<Link>,
    /// The flow's new priority
    pub priority: usize,
}

/// # LCDN
///
/// The admission-control core: owns the stacked [`Topology`] and the
/// [`FlowManager`] and exposes the operations external collaborators (CLI, HTTP
/// endpoint, benchmark drivers) call. All operations are synchronous and atomic from
/// the caller's perspective; a rejected embedding leaves no trace.
#[derive(Debug)]
pub struct Lcdn {
    topology: Topology,
    flow_manager: FlowManager,
}

impl Default for Lcdn {
    fn default() -> Self {
        Self::new()
    }
}

impl Lcdn {
    /// A controller with the default four priority queues.
    pub fn new() -> Self {
        info!("LCDN manager started");
        Self { topology: Topology::new(), flow_manager: FlowManager::new() }
    }

    /// A controller with the given number of priority queues (4 or 8).
    pub fn with_queues(num_queues: usize) -> Result<Self, Error> {
        let topology = Topology::with_queues(num_queues)?;
        info!("LCDN manager started with {} queues", num_queues);
        Ok(Self { topology, flow_manager: FlowManager::new() })
    }

    /// Add a switch.
    pub fn add_node(&mut self, node: Node) -> Result<(), Error> {
        Ok(self.topology.add_node(node)?)
    }

    /// Add a bidirectional link between two switches.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), Error> {
        Ok(self.topology.add_edge(edge)?)
    }

    /// Add a host attached to a switch.
    pub fn add_host(&mut self, host: Host) -> Result<(), Error> {
        Ok(self.topology.add_host(host)?)
    }

    /// Remove a switch and all its links.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<(), Error> {
        Ok(self.topology.remove_node(node_id)?)
    }

    /// Remove a bidirectional link.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<(), Error> {
        Ok(self.topology.remove_edge(edge_id)?)
    }

    /// Remove a host and its attachment links.
    pub fn remove_host(&mut self, host_id: NodeId) -> Result<(), Error> {
        Ok(self.topology.remove_host(host_id)?)
    }

    /// Try to admit a flow. On success the topology mutation is committed and the
    /// admission (path, priority, demoted flows, timing) is reported; on failure the
    /// topology is unchanged and the request leaves no trace.
    pub fn embed_flow(&mut self, request: FlowRequest) -> Result<EmbedResult, Error> {
        let start = Instant::now();
        let admission = self.flow_manager.embed_flow(&request, &mut self.topology)?;
        let embedding_time_ns = start.elapsed().as_nanos();

        info!(
            "Found path for flow: {:?} with priority {}",
            admission.flow.path, admission.flow.priority
        );
        Ok(EmbedResult {
            flow_id: admission.flow.flow_id,
            src: request.src,
            dst: request.dst,
            path: admission.flow.path,
            priority: admission.flow.priority,
            strategy: admission.placement,
            embedding_time_ns,
            rerouted_flows: admission
                .rerouted
                .into_iter()
                .map(|(id, path, priority)| ReroutedFlow { id, path, priority })
                .collect(),
        })
    }

    /// Remove an admitted flow and release its resources.
    pub fn remove_flow(&mut self, flow_id: FlowId) -> Result<(), Error> {
        self.flow_manager.remove_flow(flow_id, &mut self.topology)
    }

    /// Set how many admitted flows may be considered as reroute victims per request.
    pub fn set_reroutings(&mut self, reroutes: usize) {
        self.flow_manager.set_reroutes(reroutes);
    }

    /// Set the reroute strategy.
    pub fn set_rerouting_strategy(&mut self, strategy: RerouteStrategy) {
        self.flow_manager.set_reroute_strategy(strategy);
    }

    /// Set the placement strategy.
    pub fn set_lcdn_strategy(&mut self, strategy: Strategy) {
        self.flow_manager.set_strategy(strategy);
    }

    /// Update the probability of the mixed strategy. Fails for values outside [0, 1].
    pub fn set_greedy_probability(&mut self, p: f64) -> Result<(), Error> {
        self.flow_manager.set_greedy_probability(p)
    }

    /// Set how many candidate paths are tried for the initial placement.
    pub fn set_initial_sps(&mut self, k_sps: usize) {
        self.flow_manager.set_init_ksp(k_sps);
    }

    /// Skip the given number of cheapest candidate paths.
    pub fn set_ksp_offset(&mut self, offset: usize) {
        self.flow_manager.set_ksp_offset(offset);
    }

    /// Set the queue the greedy placement starts with.
    pub fn set_initial_q_level(&mut self, q_level: usize) {
        self.flow_manager.set_first_queue(q_level);
    }

    /// Reseed the strategy PRNG, making mixed-strategy runs reproducible.
    pub fn set_seed(&mut self, seed: u64) {
        self.flow_manager.set_seed(seed);
    }

    /// The node id of the host with the given IP address.
    pub fn get_node_id_from_ip(&self, ip: &str) -> Option<NodeId> {
        self.topology.id_for_ip(ip)
    }

    /// End-to-end worst-case queueing delay of an admitted flow, in seconds.
    pub fn get_delay_of_flow(&self, flow_id: FlowId) -> Result<f64, Error> {
        self.flow_manager.delay_of_flow(flow_id, &self.topology)
    }

    /// Worst-case queueing delay of every link, per priority.
    pub fn get_all_q_delays(&self) -> Vec<BTreeMap<Link, f64>> {
        self.topology.all_q_delays()
    }

    /// Worst-case buffer use of every link, per priority.
    pub fn get_all_buffers(&self) -> Vec<BTreeMap<Link, f64>> {
        self.topology.all_buffers()
    }

    /// Booked arrival rate of every link, per priority.
    pub fn get_all_rates(&self) -> Vec<BTreeMap<Link, f64>> {
        self.topology.all_rates()
    }

    /// Number of committed demotions so far.
    pub fn get_number_of_reroutes(&self) -> usize {
        self.flow_manager.num_reroutes()
    }

    /// Summaries of all admitted flows.
    pub fn get_all_flows_with_information(&self) -> Vec<FlowInfo> {
        self.flow_manager.flow_infos()
    }

    /// Read access to the topology, for inspection.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}
