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

//! # Topology store
//!
//! The stacked network state: one shared directed graph over switches and hosts, with
//! one queue state per priority layer on every directed link. See [`Topology`] for the
//! main structure.

mod topology;
mod types;

pub use topology::Topology;
pub use types::{
    Edge, EdgeId, Host, Link, LinkStack, LinkState, Node, NodeId, TopologyError,
    MAX_PACKET_SIZE_DELAY,
};
