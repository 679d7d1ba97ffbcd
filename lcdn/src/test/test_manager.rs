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

//! End-to-end admission, rerouting and removal scenarios.

use crate::error::Error;
use crate::flows::{FlowId, FlowRequest};
use crate::manager::{Placement, RerouteStrategy, Strategy};
use crate::net::{Edge, Host, Link, Node};
use crate::{Lcdn, ReroutedFlow};
use assert_approx_eq::assert_approx_eq;
use lazy_static::lazy_static;
use rand::prelude::*;
use std::collections::HashMap;

lazy_static! {
    /// Direct path from host 4 to host 5 in the ring.
    static ref DIRECT: Vec<Link> = vec![(4, 1), (1, 2), (2, 5)];
    /// Detour over switch 3.
    static ref DETOUR: Vec<Link> = vec![(4, 1), (1, 3), (3, 2), (2, 5)];
    /// The single path through the five-switch chain.
    static ref CHAIN: Vec<Link> = vec![(10, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 11)];
}

fn host(id: u32, switch: u32, host_buffer: f64, switch_buffer: f64, rate: f64) -> Host {
    Host {
        id,
        name: format!("h{}", id),
        mac: format!("00:00:00:00:00:{:02x}", id),
        ip: format!("10.0.0.{}", id),
        connected_switch: switch,
        host_buffer,
        switch_buffer,
        prop_delay: 0.0,
        link_rate: rate,
    }
}

/// Ring of three switches with hosts 4 and 5 on switches 1 and 2: a direct path and
/// one detour between the hosts.
fn ring(rate: f64, switch_buffer: f64) -> Lcdn {
    let mut lcdn = Lcdn::new();
    for id in 1..=3 {
        lcdn.add_node(Node { id, name: format!("s{}", id) }).unwrap();
    }
    for (id, (first, second)) in [(1, 2), (2, 3), (1, 3)].iter().copied().enumerate() {
        lcdn.add_edge(Edge {
            id: id as u32 + 1,
            first,
            second,
            rate,
            prop_delay: 0.0,
            q_size: 970_000.0,
        })
        .unwrap();
    }
    lcdn.add_host(host(4, 1, 970_000.0, switch_buffer, rate)).unwrap();
    lcdn.add_host(host(5, 2, 970_000.0, switch_buffer, rate)).unwrap();
    lcdn
}

/// Chain of five switches with hosts 10 and 11 at the ends: a single path, six hops.
fn chain() -> Lcdn {
    let mut lcdn = Lcdn::new();
    for id in 1..=5 {
        lcdn.add_node(Node { id, name: format!("s{}", id) }).unwrap();
    }
    for id in 1..=4u32 {
        lcdn.add_edge(Edge {
            id,
            first: id,
            second: id + 1,
            rate: 1.25e8,
            prop_delay: 0.0,
            q_size: 970_000.0,
        })
        .unwrap();
    }
    lcdn.add_host(host(10, 1, 970_000.0, 970_000.0, 1.25e8)).unwrap();
    lcdn.add_host(host(11, 5, 970_000.0, 970_000.0, 1.25e8)).unwrap();
    lcdn
}

fn request(burst: f64, rate: f64, deadline: f64) -> FlowRequest {
    FlowRequest { src: 4, dst: 5, protocol: 17, burst, rate, deadline }
}

fn chain_request(burst: f64, rate: f64, deadline: f64) -> FlowRequest {
    FlowRequest { src: 10, dst: 11, protocol: 17, burst, rate, deadline }
}

/// Every committed state satisfies the per-link bounds of every layer and the
/// end-to-end budget of every admitted flow.
fn assert_invariants(lcdn: &Lcdn, deadlines: &HashMap<FlowId, f64>) {
    let topo = lcdn.topology();
    for link in topo.links().collect::<Vec<_>>() {
        let capacity = topo.buffer_of(link).unwrap();
        for q_level in 0..topo.num_queues() {
            if q_level != 0 && topo.is_host(link.0) {
                continue;
            }
            let state = topo.state(link, q_level).unwrap();
            let threshold = topo.threshold(q_level);
            assert!(
                state.arrival.rate <= state.service.rate,
                "arrival rate exceeds service rate on {:?} at {}",
                link,
                q_level
            );
            assert!(
                state.service.delay(state.arrival) <= threshold + 1e-12,
                "delay bound broken on {:?} at {}",
                link,
                q_level
            );
            assert!(
                state.service.buffer_threshold(state.arrival, threshold) <= capacity + 1e-9,
                "buffer bound broken on {:?} at {}",
                link,
                q_level
            );
        }
    }

    for info in lcdn.get_all_flows_with_information() {
        let budget: f64 =
            info.path.iter().map(|&link| topo.hop_threshold(link, info.priority)).sum();
        let deadline = deadlines[&info.id];
        assert!(budget <= deadline + 1e-12, "budget of flow {} exceeds its deadline", info.id);
    }
}

#[test]
fn greedy_embeds_on_the_direct_path() {
    let mut lcdn = ring(1.25e8, 970_000.0);

    let result = lcdn.embed_flow(request(70.0, 25e6, 0.150)).unwrap();
    assert_eq!(result.flow_id, 1);
    assert_eq!(result.path, *DIRECT);
    assert_eq!(result.priority, 0);
    assert_eq!(result.strategy, Placement::Greedy);
    assert!(result.rerouted_flows.is_empty());

    let infos = lcdn.get_all_flows_with_information();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].id, 1);
    assert_eq!(infos[0].src, 4);
    assert_eq!(infos[0].dst, 5);

    // the end-to-end delay is the sum of the per-hop bounds along the path
    let topo = lcdn.topology();
    let expected: f64 =
        DIRECT.iter().map(|&link| topo.state(link, 0).unwrap().q_delay).sum();
    assert_approx_eq!(lcdn.get_delay_of_flow(1).unwrap(), expected, 1e-12);
}

#[test]
fn endpoints_must_be_hosts() {
    let mut lcdn = ring(1.25e8, 970_000.0);

    let result = lcdn.embed_flow(FlowRequest {
        src: 1,
        dst: 5,
        protocol: 17,
        burst: 70.0,
        rate: 25e6,
        deadline: 0.1,
    });
    assert_eq!(result.unwrap_err(), Error::NotAHost(1));

    let result = lcdn.embed_flow(FlowRequest {
        src: 4,
        dst: 3,
        protocol: 17,
        burst: 70.0,
        rate: 25e6,
        deadline: 0.1,
    });
    assert_eq!(result.unwrap_err(), Error::NotAHost(3));
}

#[test]
fn disconnected_hosts_are_rejected() {
    let mut lcdn = Lcdn::new();
    lcdn.add_node(Node { id: 1, name: "s1".into() }).unwrap();
    lcdn.add_node(Node { id: 2, name: "s2".into() }).unwrap();
    lcdn.add_host(host(4, 1, 970_000.0, 970_000.0, 1.25e8)).unwrap();
    lcdn.add_host(host(5, 2, 970_000.0, 970_000.0, 1.25e8)).unwrap();

    let result = lcdn.embed_flow(request(70.0, 25e6, 0.1));
    assert_eq!(result.unwrap_err(), Error::NoPath(4, 5));
}

#[test]
fn removing_an_unknown_flow_is_an_error() {
    let mut lcdn = ring(1.25e8, 970_000.0);
    assert_eq!(lcdn.remove_flow(42), Err(Error::UnknownFlow(42)));
}

#[test]
fn greedy_starts_at_the_configured_queue() {
    let mut lcdn = ring(1.25e8, 970_000.0);
    lcdn.set_initial_q_level(2);

    let result = lcdn.embed_flow(request(70.0, 25e6, 0.150)).unwrap();
    assert_eq!(result.priority, 2);

    // the host egress hop is booked in layer 0, the switch hops in layer 2
    let topo = lcdn.topology();
    assert_eq!(topo.state((4, 1), 0).unwrap().arrival.rate, 25e6);
    assert_eq!(topo.state((1, 2), 2).unwrap().arrival.rate, 25e6);
    assert_eq!(topo.state((1, 2), 0).unwrap().arrival.rate, 0.0);
}

#[test]
fn probability_setter_validates_its_range() {
    let mut lcdn = ring(1.25e8, 970_000.0);
    lcdn.set_lcdn_strategy(Strategy::GreedyMix(0.5));
    assert_eq!(lcdn.set_greedy_probability(1.5), Err(Error::InvalidProbability(1.5)));
    assert_eq!(lcdn.set_greedy_probability(1.0), Ok(()));

    // with probability one the mix always resolves to the greedy placement
    let result = lcdn.embed_flow(request(70.0, 25e6, 0.150)).unwrap();
    assert_eq!(result.strategy, Placement::Greedy);
}

/// Three-switch ring at 1 Gbps with a tight switch-side host buffer: the first two
/// flows fill the direct path at priority 0, the third (tight deadline) only fits after
/// exactly one of them is demoted to priority 1.
#[test]
fn tight_flow_is_admitted_after_one_demotion() {
    let mut lcdn = ring(1e9, 75_200.0);
    lcdn.set_reroutings(10);
    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);

    let first = lcdn.embed_flow(request(70.0, 25e6, 0.150)).unwrap();
    assert_eq!(first.path, *DIRECT);
    assert_eq!(first.priority, 0);
    assert!(first.rerouted_flows.is_empty());

    let second = lcdn.embed_flow(request(80.0, 25e6, 0.050)).unwrap();
    assert_eq!(second.path, *DIRECT);
    assert_eq!(second.priority, 0);
    assert!(second.rerouted_flows.is_empty());

    let third = lcdn.embed_flow(request(60.0, 1e5, 1.8e-3)).unwrap();
    assert_eq!(third.path, *DIRECT);
    assert_eq!(third.priority, 0);
    assert_eq!(
        third.rerouted_flows,
        vec![ReroutedFlow { id: 1, path: DIRECT.clone(), priority: 1 }]
    );

    assert_eq!(lcdn.get_number_of_reroutes(), 1);
    let infos = lcdn.get_all_flows_with_information();
    assert_eq!(infos.iter().find(|info| info.id == 1).unwrap().priority, 1);
    assert_eq!(infos.iter().find(|info| info.id == 2).unwrap().priority, 0);
    assert_eq!(infos.iter().find(|info| info.id == 3).unwrap().priority, 0);

    // the host egress queue stays shared across all layers
    let topo = lcdn.topology();
    for host_link in [(4, 1), (5, 2)].iter().copied() {
        let reference = topo.state(host_link, 0).unwrap().clone();
        for q_level in 1..topo.num_queues() {
            let state = topo.state(host_link, q_level).unwrap();
            assert_eq!(state.arrival, reference.arrival);
            assert_eq!(state.service, reference.service);
        }
    }
}

/// Filling the single chain path at priority 0 until one more flow would break the
/// delay threshold: the next request is rejected without rerouting and admitted with a
/// single demotion once rerouting is allowed.
#[test]
fn saturated_chain_needs_a_demotion() {
    let mut lcdn = chain();
    lcdn.set_reroutings(0);

    for _ in 0..9 {
        let result = lcdn.embed_flow(chain_request(100.0, 2.5e6, 0.05)).unwrap();
        assert_eq!(result.path, *CHAIN);
        assert_eq!(result.priority, 0);
    }

    assert_eq!(
        lcdn.embed_flow(chain_request(100.0, 2.5e6, 0.05)).unwrap_err(),
        Error::FlowRejected
    );

    lcdn.set_reroutings(1);
    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);
    let tenth = lcdn.embed_flow(chain_request(100.0, 2.5e6, 0.05)).unwrap();
    assert_eq!(tenth.priority, 0);
    assert_eq!(
        tenth.rerouted_flows,
        vec![ReroutedFlow { id: 1, path: CHAIN.clone(), priority: 1 }]
    );
}

/// The single-flow strategy reaches the same arrangement: the first victim demotion
/// that revalidates the stack is committed.
#[test]
fn single_flow_rerouting_demotes_one_victim() {
    let mut lcdn = chain();
    lcdn.set_reroutings(0);
    for _ in 0..9 {
        lcdn.embed_flow(chain_request(100.0, 2.5e6, 0.05)).unwrap();
    }

    lcdn.set_reroutings(3);
    lcdn.set_rerouting_strategy(RerouteStrategy::SingleFlow);
    let tenth = lcdn.embed_flow(chain_request(100.0, 2.5e6, 0.05)).unwrap();
    assert_eq!(tenth.priority, 0);
    assert_eq!(tenth.rerouted_flows.len(), 1);
    assert_eq!(tenth.rerouted_flows[0].id, 1);
    assert_eq!(tenth.rerouted_flows[0].priority, 1);
    assert_eq!(lcdn.get_number_of_reroutes(), 1);
}

/// A deadline below the summed per-hop budgets is rejected no matter how much capacity
/// or reroute budget is available.
#[test]
fn infeasible_deadlines_are_always_rejected() {
    let mut lcdn = ring(1.25e8, 970_000.0);
    lcdn.set_reroutings(10);
    let snapshot = lcdn.topology().clone();

    // three hops at priority 0 need 1.5 ms of budget
    let tight = request(60.0, 1e5, 0.1 * 0.5e-3 * 3.0);
    assert_eq!(lcdn.embed_flow(tight).unwrap_err(), Error::FlowRejected);

    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);
    assert_eq!(lcdn.embed_flow(tight).unwrap_err(), Error::FlowRejected);

    lcdn.set_reroutings(0);
    assert_eq!(lcdn.embed_flow(tight).unwrap_err(), Error::FlowRejected);

    assert!(lcdn.get_all_flows_with_information().is_empty());
    assert_eq!(*lcdn.topology(), snapshot);
}

/// Embedding and removing a flow restores every link state exactly.
#[test]
fn removal_restores_the_previous_state() {
    let mut lcdn = ring(1e9, 970_000.0);
    lcdn.set_reroutings(10);
    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);

    lcdn.embed_flow(request(70.0, 25e6, 0.150)).unwrap();
    lcdn.embed_flow(request(80.0, 25e6, 0.050)).unwrap();
    let snapshot = lcdn.topology().clone();

    // with roomy buffers the tight flow fits without demoting anyone
    let third = lcdn.embed_flow(request(60.0, 1e5, 1.8e-3)).unwrap();
    assert!(third.rerouted_flows.is_empty());

    lcdn.remove_flow(third.flow_id).unwrap();
    assert_eq!(*lcdn.topology(), snapshot);
    assert_eq!(lcdn.get_all_flows_with_information().len(), 2);
}

/// The not-greedy placement fills the loosest queue first: nineteen identical flows
/// land in priority 3 until its buffer bound is exhausted, the twentieth falls back to
/// priority 2.
#[test]
fn not_greedy_fills_the_loosest_queue_first() {
    let mut lcdn = ring(1.25e8, 140_000.0);
    lcdn.set_lcdn_strategy(Strategy::NotGreedy);
    lcdn.set_reroutings(0);

    let mut priorities = Vec::new();
    for _ in 0..20 {
        let result = lcdn.embed_flow(request(2_500.0, 1e5, 0.1)).unwrap();
        assert_eq!(result.path, *DIRECT);
        assert_eq!(result.strategy, Placement::NotGreedy);
        priorities.push(result.priority);
    }

    assert!(priorities[..19].iter().all(|&priority| priority == 3));
    assert_eq!(priorities[19], 2);

    // the booked rates mirror the fill order
    let topo = lcdn.topology();
    assert_eq!(topo.state((1, 2), 3).unwrap().arrival.rate, 19.0 * 1e5);
    assert_eq!(topo.state((1, 2), 2).unwrap().arrival.rate, 1e5);
    assert_eq!(topo.state((1, 2), 1).unwrap().arrival.rate, 0.0);
    assert_eq!(topo.state((1, 2), 0).unwrap().arrival.rate, 0.0);
}

/// Same seed, same topology, same request stream: identical outcomes.
#[test]
fn mixed_strategy_is_deterministic_under_a_seed() {
    let run = || {
        let mut lcdn = ring(1.25e8, 970_000.0);
        lcdn.set_lcdn_strategy(Strategy::GreedyMix(0.5));
        lcdn.set_seed(7);
        lcdn.set_reroutings(10);
        lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);

        let mut outcomes = Vec::new();
        for i in 0..12 {
            let result = lcdn.embed_flow(request(100.0 + 10.0 * i as f64, 2e6, 0.05));
            outcomes.push(result.ok().map(|r| {
                (r.flow_id, r.path, r.priority, r.strategy, r.rerouted_flows)
            }));
        }
        outcomes
    };

    assert_eq!(run(), run());
}

/// Random workload: whatever the controller admits keeps every invariant intact, and
/// removing everything drains the network.
#[test]
fn random_workload_keeps_all_invariants() {
    let mut lcdn = Lcdn::new();
    for id in 1..=4 {
        lcdn.add_node(Node { id, name: format!("s{}", id) }).unwrap();
    }
    for (id, (first, second)) in
        [(1, 2), (3, 4), (1, 3), (2, 4)].iter().copied().enumerate()
    {
        lcdn.add_edge(Edge {
            id: id as u32 + 1,
            first,
            second,
            rate: 1.25e8,
            prop_delay: 0.0,
            q_size: 970_000.0,
        })
        .unwrap();
    }
    for (id, switch) in [(21, 1), (22, 2), (23, 3), (24, 4)].iter().copied() {
        lcdn.add_host(host(id, switch, 970_000.0, 970_000.0, 1.25e8)).unwrap();
    }
    lcdn.set_lcdn_strategy(Strategy::GreedyMix(0.5));
    lcdn.set_seed(3);
    lcdn.set_reroutings(5);
    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);

    let hosts = [21u32, 22, 23, 24];
    let mut rng = StdRng::seed_from_u64(99);
    let mut deadlines: HashMap<FlowId, f64> = HashMap::new();

    for _ in 0..60 {
        let src = *hosts.choose(&mut rng).unwrap();
        let mut dst = *hosts.choose(&mut rng).unwrap();
        while dst == src {
            dst = *hosts.choose(&mut rng).unwrap();
        }
        let request = FlowRequest {
            src,
            dst,
            protocol: 17,
            burst: rng.gen_range(100, 2_000) as f64,
            rate: rng.gen_range(1, 10) as f64 * 1e5,
            deadline: rng.gen_range(10, 100) as f64 * 1e-3,
        };

        if let Ok(result) = lcdn.embed_flow(request) {
            deadlines.insert(result.flow_id, request.deadline);
        }
        assert_invariants(&lcdn, &deadlines);

        if rng.gen_bool(0.3) {
            if let Some(&flow_id) = deadlines.keys().next() {
                lcdn.remove_flow(flow_id).unwrap();
                deadlines.remove(&flow_id);
                assert_invariants(&lcdn, &deadlines);
            }
        }
    }

    let ids: Vec<FlowId> = deadlines.keys().copied().collect();
    for flow_id in ids {
        lcdn.remove_flow(flow_id).unwrap();
    }
    let topo = lcdn.topology();
    for link in topo.links().collect::<Vec<_>>() {
        for q_level in 0..topo.num_queues() {
            let state = topo.state(link, q_level).unwrap();
            assert_approx_eq!(state.arrival.rate, 0.0, 1e-6);
            assert_approx_eq!(state.arrival.burst, 0.0, 1e-6);
        }
    }
}
