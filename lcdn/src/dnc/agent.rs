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

//! Reservation bookkeeping and network-wide state refresh.
//!
//! The agent is stateless: every operation takes the topology it works on. Callers that
//! need transactional behavior run the agent on a snapshot and commit or discard the
//! whole snapshot.

use crate::dnc::{ArrivalCurve, ServiceCurve};
use crate::flows::ResourceReservation;
use crate::net::{Link, Topology};
use log::*;
use std::fmt;

/// The resource bound a reservation or the current network state ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The aggregate arrival rate exceeds the service rate of a link
    Rate,
    /// The worst-case queueing delay of a link exceeds its per-class threshold
    Delay,
    /// The worst-case backlog of a link exceeds its buffer capacity
    Buffer,
    /// The sum of per-hop delay budgets exceeds the flow's end-to-end deadline
    FlowDeadline,
}

/// A violated resource bound, reported with the measured and the admissible value.
///
/// Violations are values, not errors: the flow manager consumes them to discard a
/// snapshot and try the next placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Which bound was violated
    pub kind: ViolationKind,
    /// The directed link the violation occurred on; `(0, 0)` for end-to-end violations
    pub edge: Link,
    /// The measured value
    pub current: f64,
    /// The maximum admissible value
    pub max_allowed: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} violation occurred on ({}, {}); value: {:.6}, max: {:.6}",
            self.kind, self.edge.0, self.edge.1, self.current, self.max_allowed
        )
    }
}

/// Book a reservation into the stack at the given priority.
///
/// Walks the path in order and adds the (progressively convolved) arrival curve to every
/// hop: the curve entering hop i+1 is the curve leaving hop i, shaped with the
/// threshold-convolution of the hop's queue. For priorities above zero the first hop is
/// the host egress queue, which lives in layer 0 and uses layer 0's threshold.
///
/// Two bounds are checked during the walk: saturation of the convolved curve (the flow
/// does not fit the service rate of a hop) and the accumulated per-hop delay budget
/// against the flow's deadline. All edits are buffered and only written back when the
/// whole walk stays within bounds, so a failed reservation leaves the topology
/// untouched.
pub fn reserve_resources(
    reservation: &ResourceReservation,
    topo: &mut Topology,
    q_level: usize,
) -> Result<(), Violation> {
    let mut ac_new = ArrivalCurve::new(reservation.rate, reservation.burst);
    let mut edits: Vec<(Link, usize, ArrivalCurve)> = Vec::with_capacity(reservation.path.len());
    let mut flow_delay = 0.0;

    for (i, &link) in reservation.path.iter().enumerate() {
        let layer = if q_level != 0 && i == 0 { 0 } else { q_level };
        let threshold = topo.threshold(layer);
        let service = topo
            .state(link, layer)
            .expect("reservation walks a link that is not in the topology")
            .service;

        edits.push((link, layer, ac_new));
        ac_new = service.conv_threshold(ac_new, threshold);

        if !ac_new.is_finite() {
            let violation = Violation {
                kind: ViolationKind::Rate,
                edge: link,
                current: ac_new.rate,
                max_allowed: service.rate,
            };
            error!("{}", violation);
            return Err(violation);
        }

        flow_delay += threshold;
    }

    if flow_delay > reservation.deadline {
        let violation = Violation {
            kind: ViolationKind::FlowDeadline,
            edge: (0, 0),
            current: flow_delay,
            max_allowed: reservation.deadline,
        };
        error!("{}", violation);
        return Err(violation);
    }

    for (link, layer, ac) in edits {
        let state = topo
            .state_mut(link, layer)
            .expect("reservation walks a link that is not in the topology");
        state.arrival = state.arrival + ac;
    }

    Ok(())
}

/// Release a reservation booked with [`reserve_resources`].
///
/// The walk mirrors the reservation exactly, including the host egress rule, so the
/// subtracted curves are the same ones that were added. On a committed state the
/// saturation branch of the convolution is unreachable: admission guarantees the flow's
/// rate fits every service rate along its path.
///
/// Releasing has no failure path. The subsequent refresh can only report a violation
/// when the caller is mid-transaction (other unvalidated reservations present); it is
/// logged and the caller revalidates before committing.
pub fn remove_resources(reservation: &ResourceReservation, topo: &mut Topology, q_level: usize) {
    let mut ac_rm = ArrivalCurve::new(reservation.rate, reservation.burst);

    for (i, &link) in reservation.path.iter().enumerate() {
        let layer = if q_level != 0 && i == 0 { 0 } else { q_level };
        let threshold = topo.threshold(layer);
        let state = topo
            .state_mut(link, layer)
            .expect("reservation walks a link that is not in the topology");
        state.arrival = state.arrival - ac_rm;
        ac_rm = state.service.conv_threshold(ac_rm, threshold);
    }

    if let Err(violation) = refresh_and_validate(topo) {
        debug!("state refresh after release reports {}", violation);
    }
}

/// Recompute the derived per-link state and check every invariant, layer by layer.
///
/// For each priority p in order: recompute the worst-case queueing delay
/// (`q_delay = β.delay(α)`) and the routing cost (`1 + 1e6 · q_delay`) of every link;
/// hand the residual service curves down to layer p+1 for every link that does not
/// leave a host (the host egress queue lives in layer 0 and is never overwritten); then
/// check the rate, delay and buffer bounds of layer p, returning the first violation.
///
/// This realises strict priority queueing: each layer is served from what the higher
/// priorities leave behind. The pass is idempotent, and since layer 0's service curves
/// are static, the whole derived state is a function of the current arrival curves.
///
/// On a violation the already-recomputed state is left in place; callers treat the
/// topology as a discarded snapshot in that case.
pub fn refresh_and_validate(topo: &mut Topology) -> Result<(), Violation> {
    let num_queues = topo.num_queues();
    let links: Vec<Link> = topo.links().collect();

    for q in 0..num_queues {
        let mut residuals: Vec<(Link, ServiceCurve)> = Vec::with_capacity(links.len());

        for &link in &links {
            if q != 0 && topo.is_host(link.0) {
                // single egress queue, fully handled in layer 0
                continue;
            }
            let state = topo.state_mut(link, q).expect("link map out of sync");
            let delay = state.service.delay(state.arrival);
            state.q_delay = delay;
            state.cost = 1.0 + 1e6 * delay;
            residuals.push((link, state.service.residual(state.arrival)));
        }

        if q + 1 < num_queues {
            for (link, residual) in &residuals {
                if topo.is_host(link.0) {
                    continue;
                }
                topo.state_mut(*link, q + 1).expect("link map out of sync").service = *residual;
            }
        }

        let threshold = topo.threshold(q);
        for &link in &links {
            if q != 0 && topo.is_host(link.0) {
                continue;
            }
            let capacity = topo.buffer_of(link).expect("link map out of sync");
            let state = topo.state(link, q).expect("link map out of sync");

            if state.arrival.rate > state.service.rate {
                let violation = Violation {
                    kind: ViolationKind::Rate,
                    edge: link,
                    current: state.arrival.rate,
                    max_allowed: state.service.rate,
                };
                error!("{} on priority {}", violation, q);
                return Err(violation);
            }

            let delay = state.service.delay(state.arrival);
            if delay > threshold {
                let violation = Violation {
                    kind: ViolationKind::Delay,
                    edge: link,
                    current: delay,
                    max_allowed: threshold,
                };
                error!("{} on priority {}", violation, q);
                return Err(violation);
            }

            let buffer_used = state.service.buffer_threshold(state.arrival, threshold);
            if buffer_used > capacity {
                let violation = Violation {
                    kind: ViolationKind::Buffer,
                    edge: link,
                    current: buffer_used,
                    max_allowed: capacity,
                };
                error!("{} on priority {}", violation, q);
                return Err(violation);
            }
        }
    }

    Ok(())
}
