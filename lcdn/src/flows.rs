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

//! Flow model types: what users request, what gets booked, and what is reported back.

use crate::net::{Link, NodeId};

/// Identifier of an admitted flow, assigned by the flow manager. Ids are unique and
/// monotonically increasing; rejected requests do not consume ids.
pub type FlowId = u64;

/// A request to admit a new flow into the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRequest {
    /// Source host id
    pub src: NodeId,
    /// Destination host id
    pub dst: NodeId,
    /// Protocol discriminator, opaque to the admission control
    pub protocol: u32,
    /// Burst size in bits
    pub burst: f64,
    /// Sustained rate in bits per second
    pub rate: f64,
    /// End-to-end deadline in seconds
    pub deadline: f64,
}

/// The resource demand a flow places along a concrete path
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceReservation {
    /// The directed links the flow traverses, in order
    pub path: Vec<Link>,
    /// Sustained rate in bits per second
    pub rate: f64,
    /// Burst size in bits
    pub burst: f64,
    /// End-to-end deadline in seconds
    pub deadline: f64,
}

impl ResourceReservation {
    /// The reservation of the given request along a concrete path.
    pub fn for_request(request: &FlowRequest, path: &[Link]) -> Self {
        Self {
            path: path.to_vec(),
            rate: request.rate,
            burst: request.burst,
            deadline: request.deadline,
        }
    }
}

/// An admitted flow together with its booked resources
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFlow {
    /// Flow id
    pub flow_id: FlowId,
    /// The original request
    pub request: FlowRequest,
    /// The booked reservation; released exactly as booked when the flow is removed
    pub reservation: ResourceReservation,
    /// The directed links the flow traverses, in order
    pub path: Vec<Link>,
    /// The priority queue the flow occupies
    pub priority: usize,
}

/// Summary of an admitted flow, as reported to external collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct FlowInfo {
    /// Flow id
    pub id: FlowId,
    /// Source host id
    pub src: NodeId,
    /// Destination host id
    pub dst: NodeId,
    /// The directed links the flow traverses, in order
    pub path: Vec<Link>,
    /// The priority queue the flow occupies
    pub priority: usize,
}
