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

//! Module containing all type definitions of the topology store

use crate::dnc::{ArrivalCurve, ServiceCurve};
use thiserror::Error;

/// External identifier of a switch or host, assigned by the operator
pub type NodeId = u32;
/// External identifier of a bidirectional link, assigned by the operator
pub type EdgeId = u32;
/// A directed link, as an ordered pair of node ids. Paths are ordered lists of these.
pub type Link = (NodeId, NodeId);

/// Serialisation delay of one maximum-size packet, in seconds. Part of the initial
/// service latency of every link.
pub const MAX_PACKET_SIZE_DELAY: f64 = 24.48 / 1e6;

/// A switch in the topology
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique node id
    pub id: NodeId,
    /// Human-readable name
    pub name: String,
}

/// A bidirectional link between two switches. Both directions get their own queue
/// stack with the same physical parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Unique link id
    pub id: EdgeId,
    /// One endpoint
    pub first: NodeId,
    /// The other endpoint
    pub second: NodeId,
    /// Link rate in bits per second
    pub rate: f64,
    /// Propagation delay in seconds
    pub prop_delay: f64,
    /// Queue buffer capacity in bits
    pub q_size: f64,
}

/// An end host attached to a switch.
///
/// A host has a single egress queue, modelled in priority layer 0 regardless of the
/// priority of the traffic passing through it.
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    /// Unique node id
    pub id: NodeId,
    /// Human-readable name
    pub name: String,
    /// MAC address of the host interface
    pub mac: String,
    /// IP address of the host interface
    pub ip: String,
    /// The switch the host is attached to
    pub connected_switch: NodeId,
    /// Buffer on the host side of the attachment link, in bits
    pub host_buffer: f64,
    /// Buffer on the switch side of the attachment link, in bits
    pub switch_buffer: f64,
    /// Propagation delay of the attachment link in seconds
    pub prop_delay: f64,
    /// Attachment link rate in bits per second
    pub link_rate: f64,
}

/// Mutable per-priority queue state of a directed link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    /// Routing cost, kept at 1 + 1e6 · q_delay by the state refresh
    pub cost: f64,
    /// Worst-case queueing delay bound in seconds
    pub q_delay: f64,
    /// Aggregate arrival curve of the traffic booked on this queue
    pub arrival: ArrivalCurve,
    /// Service curve this queue offers. For layers above 0 this is the residual of the
    /// next-higher priority; layer 0 keeps the raw rate-latency curve of the link.
    pub service: ServiceCurve,
}

/// A directed link: static physical attributes plus one [`LinkState`] per priority
/// layer
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStack {
    /// Physical rate in bits per second
    pub rate: f64,
    /// Propagation delay in seconds
    pub prop_delay: f64,
    /// Buffer capacity in bits. The capacity bounds the backlog of each queue.
    pub buffer: f64,
    /// Per-priority queue state, indexed by priority
    pub queues: Vec<LinkState>,
}

impl LinkStack {
    /// Initial stack of a new link: empty arrival curves, unit routing cost and the raw
    /// rate-latency service curve in every layer.
    pub(crate) fn new(rate: f64, latency: f64, buffer: f64, prop_delay: f64, num_queues: usize) -> Self {
        let state = LinkState {
            cost: 1.0,
            q_delay: 0.0,
            arrival: ArrivalCurve::default(),
            service: ServiceCurve::new(latency, rate),
        };
        Self { rate, prop_delay, buffer, queues: vec![state; num_queues] }
    }
}

/// Topology manipulation errors
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    /// A node with the same id is already registered
    #[error("Node {0} already exists in the topology")]
    NodeAlreadyExists(NodeId),
    /// The node id is not registered
    #[error("Node {0} was not found in the topology")]
    NodeNotFound(NodeId),
    /// An edge with the same id is already registered
    #[error("Edge {0} already exists in the topology")]
    EdgeAlreadyExists(EdgeId),
    /// The edge id is not registered
    #[error("Edge {0} was not found in the topology")]
    EdgeNotFound(EdgeId),
    /// The two nodes are already connected
    #[error("Link ({0}, {1}) already exists in the topology")]
    LinkAlreadyExists(NodeId, NodeId),
    /// The host id is not registered
    #[error("Host {0} was not found in the topology")]
    HostNotFound(NodeId),
    /// Only the four-queue and eight-queue threshold schedules are defined
    #[error("Unsupported number of priority queues: {0} (must be 4 or 8)")]
    UnsupportedQueueCount(usize),
}
