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

//! # Flow manager
//!
//! The policy engine. It keeps the registry of admitted flows and decides where a new
//! flow is embedded: candidate paths come from [`routing`](crate::routing), placements
//! are tried with the [DNC agent](crate::dnc::agent) on topology snapshots, and when
//! nothing fits directly, admitted flows are demoted to looser queues (or alternative
//! paths) to make room.
//!
//! Every attempt runs on a snapshot and is committed atomically or not at all: after a
//! rejected request the topology and the registry are exactly as before the call.

mod reroute;

use crate::dnc::agent;
use crate::dnc::Violation;
use crate::error::Error;
use crate::flows::{EmbeddedFlow, FlowId, FlowInfo, FlowRequest, ResourceReservation};
use crate::net::{Link, Topology};
use crate::routing;
use log::*;
use rand::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

/// Default seed of the strategy PRNG.
pub(crate) const DEFAULT_SEED: u64 = 12641;

/// Placement strategy for new flows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Embed on the cheapest fitting candidate path, at the configured initial queue
    Greedy,
    /// Embed on the cheapest candidate path, in the loosest (highest-numbered) queue
    /// the flow still fits
    NotGreedy,
    /// Choose [`Strategy::Greedy`] per request with the given probability, otherwise
    /// [`Strategy::NotGreedy`]
    GreedyMix(f64),
}

/// The placement a request was actually embedded with. The mixed strategy resolves to
/// one of the two base placements per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// See [`Strategy::Greedy`]
    Greedy,
    /// See [`Strategy::NotGreedy`]
    NotGreedy,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Greedy => write!(f, "GREEDY"),
            Placement::NotGreedy => write!(f, "NOT_GREEDY"),
        }
    }
}

/// How room is made for a flow that does not fit directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerouteStrategy {
    /// Move a single admitted flow out of the way
    SingleFlow,
    /// Accumulate demotions of several admitted flows until the new one fits
    CompoundFlows,
}

/// Outcome of a successful embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// The embedded flow
    pub flow: EmbeddedFlow,
    /// Flows that were demoted to make room: id, new path and new priority
    pub rerouted: Vec<(FlowId, Vec<Link>, usize)>,
    /// The placement the request was embedded with
    pub placement: Placement,
}

/// # Flow manager
///
/// See the [module documentation](self) for the embedding contract.
#[derive(Debug)]
pub struct FlowManager {
    flows: BTreeMap<FlowId, EmbeddedFlow>,
    next_flow_id: FlowId,
    ksp_initial: usize,
    ksp_offset: usize,
    reroutes_max: usize,
    first_queue: usize,
    strategy: Strategy,
    reroute_strategy: RerouteStrategy,
    rng: StdRng,
    num_reroutes: usize,
}

impl Default for FlowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowManager {
    /// A flow manager with the default configuration: greedy placement into queue 0,
    /// one initial candidate path, single-flow rerouting with a budget of ten.
    pub fn new() -> Self {
        Self {
            flows: BTreeMap::new(),
            next_flow_id: 1,
            ksp_initial: 1,
            ksp_offset: 0,
            reroutes_max: 10,
            first_queue: 0,
            strategy: Strategy::Greedy,
            reroute_strategy: RerouteStrategy::SingleFlow,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            num_reroutes: 0,
        }
    }

    /// Set the placement strategy.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Set the reroute strategy.
    pub fn set_reroute_strategy(&mut self, strategy: RerouteStrategy) {
        self.reroute_strategy = strategy;
    }

    /// Set how many admitted flows may be considered as reroute victims per request.
    /// Zero disables rerouting.
    pub fn set_reroutes(&mut self, reroutes: usize) {
        self.reroutes_max = reroutes;
    }

    /// Set how many candidate paths are tried for the initial placement.
    pub fn set_init_ksp(&mut self, ksp: usize) {
        self.ksp_initial = ksp;
    }

    /// Skip the given number of cheapest candidate paths.
    pub fn set_ksp_offset(&mut self, offset: usize) {
        self.ksp_offset = offset;
    }

    /// Set the queue the greedy placement starts with. Must be below the number of
    /// queues of the topology.
    pub fn set_first_queue(&mut self, q_level: usize) {
        self.first_queue = q_level;
    }

    /// Update the probability of the mixed strategy. Has no effect unless the current
    /// strategy is [`Strategy::GreedyMix`].
    pub fn set_greedy_probability(&mut self, p: f64) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidProbability(p));
        }
        match self.strategy {
            Strategy::GreedyMix(_) => self.strategy = Strategy::GreedyMix(p),
            _ => warn!("Greedy probability is only used by the mixed strategy"),
        }
        Ok(())
    }

    /// Reseed the strategy PRNG. With the same seed, topology and request stream, the
    /// embedding outcomes are reproducible.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Number of committed demotions so far.
    pub fn num_reroutes(&self) -> usize {
        self.num_reroutes
    }

    /// The registry of admitted flows.
    pub fn flows(&self) -> &BTreeMap<FlowId, EmbeddedFlow> {
        &self.flows
    }

    /// Summaries of all admitted flows, in ascending id order.
    pub fn flow_infos(&self) -> Vec<FlowInfo> {
        self.flows
            .values()
            .map(|flow| FlowInfo {
                id: flow.flow_id,
                src: flow.request.src,
                dst: flow.request.dst,
                path: flow.path.clone(),
                priority: flow.priority,
            })
            .collect()
    }

    /// Try to admit the given flow.
    ///
    /// Routing on layer 0 produces the candidate paths. Greedy placement tries each
    /// candidate at the configured initial queue; not-greedy placement walks the queues
    /// from the loosest down on each candidate. The first placement that passes
    /// reservation and validation is committed. When nothing fits directly and the
    /// reroute budget allows, admitted flows are demoted to make room (see
    /// [`RerouteStrategy`]).
    ///
    /// On failure the topology and the registry are exactly as before the call.
    pub fn embed_flow(
        &mut self,
        request: &FlowRequest,
        topo: &mut Topology,
    ) -> Result<Admission, Error> {
        if !topo.is_host(request.src) {
            error!("Source {} is not a host", request.src);
            return Err(Error::NotAHost(request.src));
        }
        if !topo.is_host(request.dst) {
            error!("Destination {} is not a host", request.dst);
            return Err(Error::NotAHost(request.dst));
        }

        let placement = self.resolve_placement();
        info!(
            "Flow request from {} to {} with {} bps, {} bit, {} s deadline ({})",
            request.src, request.dst, request.rate, request.burst, request.deadline, placement
        );

        let candidates = routing::candidate_paths(topo, request.src, request.dst, self.ksp_offset);
        if candidates.is_empty() {
            info!("No path exists between source and destination");
            return Err(Error::NoPath(request.src, request.dst));
        }

        let num_queues = topo.num_queues();
        for path in candidates.iter().take(self.ksp_initial) {
            let queue_order: Vec<usize> = match placement {
                Placement::Greedy => vec![self.first_queue],
                Placement::NotGreedy => (0..num_queues).rev().collect(),
            };
            for q_level in queue_order {
                match self.place(request, path, q_level, topo) {
                    Ok(placed) => {
                        *topo = placed;
                        let flow = self.register(request, path, q_level);
                        return Ok(Admission { flow, rerouted: Vec::new(), placement });
                    }
                    Err(violation) => {
                        debug!("Placement on {:?} at queue {} failed: {}", path, q_level, violation)
                    }
                }
            }
        }

        if self.reroutes_max == 0 {
            info!("Flow does not fit and rerouting is disabled");
            return Err(Error::FlowRejected);
        }

        self.embed_with_reroutes(request, &candidates, placement, topo)
    }

    /// Release an admitted flow and commit the refreshed state. Releasing only ever
    /// loosens the bounds, so there is no failure path beyond an unknown id.
    pub fn remove_flow(&mut self, flow_id: FlowId, topo: &mut Topology) -> Result<(), Error> {
        let flow = match self.flows.remove(&flow_id) {
            Some(flow) => flow,
            None => {
                error!("Flow with id {} does not exist", flow_id);
                return Err(Error::UnknownFlow(flow_id));
            }
        };
        agent::remove_resources(&flow.reservation, topo, flow.priority);
        info!("Flow {} was removed", flow_id);
        Ok(())
    }

    /// End-to-end worst-case queueing delay of an admitted flow: the host egress delay
    /// plus the per-hop delays at the flow's priority.
    pub fn delay_of_flow(&self, flow_id: FlowId, topo: &Topology) -> Result<f64, Error> {
        let flow = self.flows.get(&flow_id).ok_or(Error::UnknownFlow(flow_id))?;
        let mut delay = 0.0;
        for (i, &link) in flow.path.iter().enumerate() {
            let layer = if i == 0 { 0 } else { flow.priority };
            delay += topo.state(link, layer).map(|state| state.q_delay).unwrap_or(0.0);
        }
        Ok(delay)
    }

    /// Reserve and validate the request at the given queue on a snapshot of `base`.
    /// Returns the snapshot ready to commit; `base` is never touched.
    fn place(
        &self,
        request: &FlowRequest,
        path: &[Link],
        q_level: usize,
        base: &Topology,
    ) -> Result<Topology, Violation> {
        let mut topo = base.clone();
        let reservation = ResourceReservation::for_request(request, path);
        agent::reserve_resources(&reservation, &mut topo, q_level)?;
        agent::refresh_and_validate(&mut topo)?;
        Ok(topo)
    }

    /// Register a new flow in the registry; ids are handed out here and only for
    /// terminal successes.
    fn register(&mut self, request: &FlowRequest, path: &[Link], priority: usize) -> EmbeddedFlow {
        let flow = EmbeddedFlow {
            flow_id: self.next_flow_id,
            request: *request,
            reservation: ResourceReservation::for_request(request, path),
            path: path.to_vec(),
            priority,
        };
        info!("Flow {} is now embedded at priority {}", flow.flow_id, priority);
        self.flows.insert(flow.flow_id, flow.clone());
        self.next_flow_id += 1;
        flow
    }

    fn resolve_placement(&mut self) -> Placement {
        match self.strategy {
            Strategy::Greedy => Placement::Greedy,
            Strategy::NotGreedy => Placement::NotGreedy,
            Strategy::GreedyMix(p) => {
                if self.rng.gen_bool(p) {
                    Placement::Greedy
                } else {
                    Placement::NotGreedy
                }
            }
        }
    }
}
