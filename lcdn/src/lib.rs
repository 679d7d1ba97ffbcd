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

#![deny(missing_docs)]

//! # LCDN: Admission Control for Deterministic Low-Latency Networks
//!
//! This is a library for online admission control and traffic engineering in a
//! multi-priority packet-switched network. Given a live topology and a stream of flow
//! requests (source host, destination host, rate, burst, end-to-end deadline), the
//! controller decides whether each request can be admitted, on which path, into which
//! priority queue, and which already admitted flows (if any) to demote so that the new
//! one fits. Every decision is backed by a Deterministic Network Calculus proof that all
//! per-link and end-to-end latency and buffer bounds still hold.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`dnc`]**: The Deterministic Network Calculus layer. Token-bucket
//!   [arrival curves](dnc::ArrivalCurve) and rate-latency
//!   [service curves](dnc::ServiceCurve) with their closed-form operators, and the
//!   [agent](dnc::agent) that books and releases reservations against the topology and
//!   revalidates the whole stack.
//!
//! - **[`net`]**: The stacked [`Topology`](net::Topology): one directed graph over
//!   switches and hosts with one queue state per priority layer on every directed link.
//!   Lower-priority layers are served from the residual service the higher priorities
//!   leave behind (strict priority queueing).
//!
//! - **[`routing`]**: Loop-free path selection by link cost, where the cost is monotone
//!   in the current worst-case queueing delay, plus the overlap ranking used to pick
//!   reroute victims.
//!
//! - **[`manager`]**: The policy engine. Keeps the registry of admitted flows and
//!   implements the placement strategies ([greedy, not greedy, or a seeded
//!   mix](manager::Strategy)) and the reroute strategies
//!   ([single flow or compound](manager::RerouteStrategy)), all on
//!   snapshot-and-commit transactions over the topology.
//!
//! - **[`Lcdn`]**: The orchestration facade external collaborators drive: topology
//!   changes, flow embedding and removal, configuration setters and state queries.
//!
//! ## Usage
//!
//! Build the topology, then submit flow requests:
//!
//! ```
//! use lcdn::flows::FlowRequest;
//! use lcdn::net::{Edge, Host, Node};
//! use lcdn::Lcdn;
//!
//! fn main() -> Result<(), lcdn::Error> {
//!     let mut lcdn = Lcdn::new();
//!
//!     lcdn.add_node(Node { id: 1, name: "s1".into() })?;
//!     lcdn.add_node(Node { id: 2, name: "s2".into() })?;
//!     lcdn.add_edge(Edge {
//!         id: 1,
//!         first: 1,
//!         second: 2,
//!         rate: 1e9,
//!         prop_delay: 0.0,
//!         q_size: 970_000.0,
//!     })?;
//!     lcdn.add_host(Host {
//!         id: 3,
//!         name: "h1".into(),
//!         mac: "00:00:00:00:00:01".into(),
//!         ip: "10.0.0.1".into(),
//!         connected_switch: 1,
//!         host_buffer: 970_000.0,
//!         switch_buffer: 970_000.0,
//!         prop_delay: 0.0,
//!         link_rate: 1e9,
//!     })?;
//!     lcdn.add_host(Host {
//!         id: 4,
//!         name: "h2".into(),
//!         mac: "00:00:00:00:00:02".into(),
//!         ip: "10.0.0.2".into(),
//!         connected_switch: 2,
//!         host_buffer: 970_000.0,
//!         switch_buffer: 970_000.0,
//!         prop_delay: 0.0,
//!         link_rate: 1e9,
//!     })?;
//!
//!     let admission = lcdn.embed_flow(FlowRequest {
//!         src: 3,
//!         dst: 4,
//!         protocol: 17,
//!         burst: 1_000.0,
//!         rate: 1e6,
//!         deadline: 0.01,
//!     })?;
//!
//!     assert_eq!(admission.path, vec![(3, 1), (1, 2), (2, 4)]);
//!     assert_eq!(admission.priority, 0);
//!
//!     Ok(())
//! }
//! ```

pub mod dnc;
mod error;
pub mod flows;
pub mod manager;
pub mod net;
pub mod routing;

mod lcdn;
mod test;

pub use error::Error;
pub use lcdn::{EmbedResult, Lcdn, ReroutedFlow};
