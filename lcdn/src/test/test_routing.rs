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

//! Path enumeration and victim ranking.

use crate::flows::{EmbeddedFlow, FlowRequest, ResourceReservation};
use crate::net::{Edge, Link, Node, Topology};
use crate::routing::{candidate_paths, flows_ranked_by_overlap, k_shortest_paths};
use std::collections::BTreeMap;

/// Five switches with edges (1,2), (2,4), (1,3), (3,4), (2,5), (5,4): three simple
/// paths lead from 1 to 4. All costs start at 1, so the path order is 1-2-4, then
/// 1-3-4 (same cost, lexicographic tie break), then 1-2-5-4.
fn diamond() -> Topology {
    let mut topo = Topology::new();
    for id in 1..=5 {
        topo.add_node(Node { id, name: format!("s{}", id) }).unwrap();
    }
    let pairs = [(1, 2), (2, 4), (1, 3), (3, 4), (2, 5), (5, 4)];
    for (i, &(first, second)) in pairs.iter().enumerate() {
        topo.add_edge(Edge {
            id: i as u32 + 1,
            first,
            second,
            rate: 1.25e8,
            prop_delay: 0.0,
            q_size: 970_000.0,
        })
        .unwrap();
    }
    topo
}

fn flow(id: u64, path: Vec<Link>) -> EmbeddedFlow {
    let request =
        FlowRequest { src: 1, dst: 4, protocol: 0, burst: 100.0, rate: 1e5, deadline: 0.1 };
    EmbeddedFlow {
        flow_id: id,
        request,
        reservation: ResourceReservation::for_request(&request, &path),
        path,
        priority: 0,
    }
}

#[test]
fn paths_come_cheapest_first_with_lexicographic_ties() {
    let topo = diamond();
    let paths = k_shortest_paths(&topo, 1, 4, 10);

    assert_eq!(
        paths,
        vec![
            vec![(1, 2), (2, 4)],
            vec![(1, 3), (3, 4)],
            vec![(1, 2), (2, 5), (5, 4)],
        ]
    );
}

#[test]
fn k_bounds_the_number_of_paths() {
    let topo = diamond();
    assert_eq!(k_shortest_paths(&topo, 1, 4, 2).len(), 2);
    // 1-2-5 is the unique cheapest path to 5
    assert_eq!(k_shortest_paths(&topo, 1, 5, 1), vec![vec![(1, 2), (2, 5)]]);
}

#[test]
fn unreachable_pairs_yield_no_paths() {
    let mut topo = diamond();
    topo.add_node(Node { id: 9, name: "s9".into() }).unwrap();

    assert!(k_shortest_paths(&topo, 1, 9, 10).is_empty());
    assert!(k_shortest_paths(&topo, 1, 1, 10).is_empty());
    assert!(k_shortest_paths(&topo, 1, 99, 10).is_empty());
}

#[test]
fn costs_steer_the_path_choice() {
    let mut topo = diamond();
    topo.state_mut((1, 2), 0).unwrap().cost = 10.0;

    let paths = k_shortest_paths(&topo, 1, 4, 2);
    assert_eq!(paths[0], vec![(1, 3), (3, 4)]);
}

#[test]
fn offset_skips_the_cheapest_paths() {
    let topo = diamond();

    let paths = candidate_paths(&topo, 1, 4, 0);
    assert_eq!(paths.len(), 3);

    let paths = candidate_paths(&topo, 1, 4, 1);
    assert_eq!(paths[0], vec![(1, 3), (3, 4)]);
    assert_eq!(paths.len(), 2);

    // an offset past the window falls back to the last available path
    let paths = candidate_paths(&topo, 1, 4, 7);
    assert_eq!(paths, vec![vec![(1, 2), (2, 5), (5, 4)]]);
}

#[test]
fn overlap_ranking_is_stable() {
    let mut flows: BTreeMap<u64, EmbeddedFlow> = BTreeMap::new();
    flows.insert(1, flow(1, vec![(1, 2), (2, 4)]));
    flows.insert(2, flow(2, vec![(1, 3), (3, 4)]));
    flows.insert(3, flow(3, vec![(1, 2), (2, 5)]));
    flows.insert(4, flow(4, vec![(1, 2), (2, 5)]));

    let ranked = flows_ranked_by_overlap(&[(1, 2), (2, 4)], &flows);

    // flow 1 shares both links; flows 3 and 4 share one and keep id order; flow 2 none
    assert_eq!(ranked, vec![1, 3, 4, 2]);
}
