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

//! Module containing all error types

use crate::flows::FlowId;
use crate::net::{NodeId, TopologyError};
use thiserror::Error;

/// Main error type
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Error propagated from the topology store
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
    /// A flow endpoint is not a registered host
    #[error("Node {0} is not a host")]
    NotAHost(NodeId),
    /// Source and destination are not connected
    #[error("No path exists between {0} and {1}")]
    NoPath(NodeId, NodeId),
    /// The flow id is not registered
    #[error("Flow with id {0} does not exist")]
    UnknownFlow(FlowId),
    /// No feasible embedding was found for the request. The violations that ruled out
    /// the individual placements are logged, not propagated.
    #[error("The flow request cannot be embedded")]
    FlowRejected,
    /// A probability outside of [0, 1] was configured
    #[error("{0} is not a probability")]
    InvalidProbability(f64),
}
