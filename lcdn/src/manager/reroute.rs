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

//! Making room for a flow that does not fit directly.
//!
//! Candidate victims are the admitted flows, ranked by how many links they share with
//! the new flow's cheapest path. A victim is re-placed either on its own path in a
//! looser queue (greedy) or on an alternative path (not greedy). The single-flow
//! strategy commits the first victim move that makes the new flow fit; the compound
//! strategy accumulates victim moves on a running snapshot until the new flow fits.
//!
//! All attempts run on snapshots. The victim registry entries are rewritten only when
//! the embedding as a whole commits.

use super::{Admission, FlowManager, Placement, RerouteStrategy};
use crate::dnc::agent;
use crate::error::Error;
use crate::flows::{FlowId, FlowRequest, ResourceReservation};
use crate::net::{Link, Topology};
use crate::routing;
use log::*;

/// A victim's new placement, applied to the registry on terminal success.
#[derive(Debug, Clone)]
struct Demotion {
    flow_id: FlowId,
    path: Vec<Link>,
    priority: usize,
}

impl FlowManager {
    pub(super) fn embed_with_reroutes(
        &mut self,
        request: &FlowRequest,
        candidates: &[Vec<Link>],
        placement: Placement,
        topo: &mut Topology,
    ) -> Result<Admission, Error> {
        let target_path = &candidates[0];
        let ranked = routing::flows_ranked_by_overlap(target_path, &self.flows);
        let budget = ranked.len().min(self.reroutes_max);

        match self.reroute_strategy {
            RerouteStrategy::SingleFlow => {
                self.reroute_single(request, target_path, &ranked[..budget], placement, topo)
            }
            RerouteStrategy::CompoundFlows => {
                self.reroute_compound(request, target_path, &ranked[..budget], placement, topo)
            }
        }
    }

    /// Reserve the new flow up front, then look for one victim whose demotion makes the
    /// whole stack validate again.
    fn reroute_single(
        &mut self,
        request: &FlowRequest,
        target_path: &[Link],
        victims: &[FlowId],
        placement: Placement,
        topo: &mut Topology,
    ) -> Result<Admission, Error> {
        debug!("--- Rerouting ({}, single flow) ---", placement);
        let new_queue = match placement {
            Placement::Greedy => 0,
            Placement::NotGreedy => self.first_queue,
        };

        let reservation = ResourceReservation::for_request(request, target_path);
        let mut base = topo.clone();
        if let Err(violation) = agent::reserve_resources(&reservation, &mut base, new_queue) {
            warn!("The new flow cannot be reserved at all: {}", violation);
            return Err(Error::FlowRejected);
        }

        for &victim in victims {
            debug!("Trying reroute with flow {}", victim);
            if let Some((rerouted, demotion)) = self.try_reroute(victim, placement, &base) {
                info!("Found valid reroute with flow {}", victim);
                *topo = rerouted;
                self.apply_demotion(&demotion);
                self.num_reroutes += 1;
                let flow = self.register(request, target_path, new_queue);
                return Ok(Admission {
                    flow,
                    rerouted: vec![(demotion.flow_id, demotion.path, demotion.priority)],
                    placement,
                });
            }
        }

        info!("No single-flow reroute makes the new flow fit");
        Err(Error::FlowRejected)
    }

    /// Accumulate victim demotions on a running snapshot, trying to place the new flow
    /// after each successful one.
    fn reroute_compound(
        &mut self,
        request: &FlowRequest,
        target_path: &[Link],
        victims: &[FlowId],
        placement: Placement,
        topo: &mut Topology,
    ) -> Result<Admission, Error> {
        debug!("--- Rerouting ({}, compound flows) ---", placement);
        let mut running = topo.clone();
        let mut demotions: Vec<Demotion> = Vec::new();

        for &victim in victims {
            debug!("Trying reroute with flow {}", victim);
            match self.try_reroute(victim, placement, &running) {
                Some((rerouted, demotion)) => {
                    debug!("Flow {} is rerouted, checking whether the new flow fits", victim);
                    running = rerouted;
                    demotions.push(demotion);
                    match self.place(request, target_path, 0, &running) {
                        Ok(done) => {
                            *topo = done;
                            for demotion in &demotions {
                                self.apply_demotion(demotion);
                            }
                            self.num_reroutes += demotions.len();
                            let flow = self.register(request, target_path, 0);
                            let rerouted = demotions
                                .into_iter()
                                .map(|d| (d.flow_id, d.path, d.priority))
                                .collect();
                            return Ok(Admission { flow, rerouted, placement });
                        }
                        Err(violation) => debug!("The new flow does not fit yet: {}", violation),
                    }
                }
                None => debug!("Flow {} could not be rerouted", victim),
            }
        }

        info!("No accumulated reroute makes the new flow fit");
        Err(Error::FlowRejected)
    }

    /// Try to move one admitted flow out of the way on the given snapshot: release it,
    /// then re-place it in a looser queue on its own path (greedy) or on an alternative
    /// path (not greedy). Returns the updated snapshot and the victim's new placement;
    /// the registry is not touched.
    fn try_reroute(
        &self,
        victim: FlowId,
        placement: Placement,
        base: &Topology,
    ) -> Option<(Topology, Demotion)> {
        let flow = self.flows.get(&victim)?;
        let num_queues = base.num_queues();

        let mut working = base.clone();
        agent::remove_resources(&flow.reservation, &mut working, flow.priority);

        match placement {
            Placement::Greedy => {
                for q_level in flow.priority + 1..num_queues {
                    match self.place(&flow.request, &flow.path, q_level, &working) {
                        Ok(rerouted) => {
                            info!("Rerouting worked for flow {} to queue {}", victim, q_level);
                            let demotion = Demotion {
                                flow_id: victim,
                                path: flow.path.clone(),
                                priority: q_level,
                            };
                            return Some((rerouted, demotion));
                        }
                        Err(violation) => debug!(
                            "Rerouting flow {} to queue {} failed: {}",
                            victim, q_level, violation
                        ),
                    }
                }
            }
            Placement::NotGreedy => {
                let paths = routing::candidate_paths(
                    &working,
                    flow.request.src,
                    flow.request.dst,
                    self.ksp_offset,
                );
                let alternative = paths.into_iter().find(|path| *path != flow.path)?;
                for q_level in (0..num_queues).rev() {
                    match self.place(&flow.request, &alternative, q_level, &working) {
                        Ok(rerouted) => {
                            info!(
                                "Rerouting worked for flow {} to queue {}, path {:?}",
                                victim, q_level, alternative
                            );
                            let demotion =
                                Demotion { flow_id: victim, path: alternative, priority: q_level };
                            return Some((rerouted, demotion));
                        }
                        Err(violation) => debug!(
                            "Rerouting flow {} to queue {} failed: {}",
                            victim, q_level, violation
                        ),
                    }
                }
            }
        }

        None
    }

    /// Rewrite a demoted victim's registry entry, including the reservation path so a
    /// later release walks the links that are actually booked.
    fn apply_demotion(&mut self, demotion: &Demotion) {
        if let Some(flow) = self.flows.get_mut(&demotion.flow_id) {
            flow.priority = demotion.priority;
            flow.path = demotion.path.clone();
            flow.reservation.path = demotion.path.clone();
        }
    }
}
