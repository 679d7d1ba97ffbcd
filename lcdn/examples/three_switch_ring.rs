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

//! Three switches in a ring, two hosts, three flow requests: the last request has a
//! tight deadline and may only fit after one of the earlier flows is demoted.
//!
//! Run with `RUST_LOG=debug` to see every placement attempt.

use lcdn::flows::FlowRequest;
use lcdn::manager::RerouteStrategy;
use lcdn::net::{Edge, Host, Node};
use lcdn::Lcdn;

fn main() -> Result<(), lcdn::Error> {
    pretty_env_logger::init();

    let mut lcdn = Lcdn::new();
    lcdn.set_reroutings(10);
    lcdn.set_rerouting_strategy(RerouteStrategy::CompoundFlows);

    lcdn.add_node(Node { id: 1, name: "node1".into() })?;
    lcdn.add_node(Node { id: 2, name: "node2".into() })?;
    lcdn.add_node(Node { id: 3, name: "node3".into() })?;

    let rate = 1e9 / 8.0;
    lcdn.add_edge(Edge { id: 1, first: 1, second: 2, rate, prop_delay: 0.0, q_size: 970_000.0 })?;
    lcdn.add_edge(Edge { id: 2, first: 2, second: 3, rate, prop_delay: 0.0, q_size: 970_000.0 })?;
    lcdn.add_edge(Edge { id: 3, first: 1, second: 3, rate, prop_delay: 0.0, q_size: 970_000.0 })?;

    lcdn.add_host(Host {
        id: 4,
        name: "host1".into(),
        mac: "00:00:00:00:00:01".into(),
        ip: "10.0.0.1".into(),
        connected_switch: 1,
        host_buffer: 970_000.0,
        switch_buffer: 970_000.0,
        prop_delay: 0.0,
        link_rate: rate,
    })?;
    lcdn.add_host(Host {
        id: 5,
        name: "host2".into(),
        mac: "00:00:00:00:00:02".into(),
        ip: "10.0.0.2".into(),
        connected_switch: 2,
        host_buffer: 970_000.0,
        switch_buffer: 970_000.0,
        prop_delay: 0.0,
        link_rate: rate,
    })?;

    let requests = vec![
        FlowRequest { src: 4, dst: 5, protocol: 69, burst: 70.0, rate: 25e6, deadline: 0.150 },
        FlowRequest { src: 4, dst: 5, protocol: 70, burst: 80.0, rate: 25e6, deadline: 0.050 },
        FlowRequest { src: 4, dst: 5, protocol: 71, burst: 60.0, rate: 1e5, deadline: 1.8e-3 },
    ];

    for request in requests {
        match lcdn.embed_flow(request) {
            Ok(result) => println!(
                "flow {} embedded on {:?} at priority {} ({} rerouted)",
                result.flow_id,
                result.path,
                result.priority,
                result.rerouted_flows.len()
            ),
            Err(error) => println!("flow rejected: {}", error),
        }
    }

    for (priority, delays) in lcdn.get_all_q_delays().iter().enumerate() {
        println!("queue delays at priority {}: {:?}", priority, delays);
    }

    Ok(())
}
