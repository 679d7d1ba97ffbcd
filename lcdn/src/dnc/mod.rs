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

//! # Deterministic Network Calculus
//!
//! The analytical core: token-bucket [`ArrivalCurve`]s bound how much traffic a flow may
//! produce, rate-latency [`ServiceCurve`]s bound the service a link or queue guarantees,
//! and their closed-form combinations yield worst-case delay and buffer bounds that hold
//! for every packet, not just on average.
//!
//! All operators are total: a reservation that exceeds the available service rate
//! saturates to an infinite curve (or delay) instead of failing. Saturation is a regular
//! value and is how instability is detected downstream.
//!
//! The [`agent`] applies these operators to the stacked topology: it books and releases
//! reservations hop by hop and recomputes the network-wide state (queue delays, routing
//! costs, residual service curves) after every change.

pub mod agent;
mod arrival_curve;
mod service_curve;

pub use agent::{Violation, ViolationKind};
pub use arrival_curve::ArrivalCurve;
pub use service_curve::ServiceCurve;
