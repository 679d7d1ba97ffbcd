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

//! Rate-latency service curves.

use crate::dnc::ArrivalCurve;
use std::fmt;
use std::ops::Add;

/// # Rate-latency service curve
///
/// The curve β(t) = rate · max(0, t − latency) is a lower bound on the service a link or
/// queue offers: after an initial latency, data is served at least at `rate`.
///
/// Combined with an [`ArrivalCurve`] it yields the worst-case delay and backlog bounds of
/// the queue, the arrival curve of the outgoing (shaped) traffic, and the residual
/// service left over for lower-priority traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceCurve {
    /// Worst-case service latency in seconds
    pub latency: f64,
    /// Guaranteed service rate in bits per second
    pub rate: f64,
}

impl ServiceCurve {
    /// Create a new service curve.
    pub fn new(latency: f64, rate: f64) -> Self {
        Self { latency, rate }
    }

    /// Arrival curve of the traffic leaving the queue: the rate is preserved and the
    /// burst grows by what can pile up during the service latency. Saturates when the
    /// flow's rate exceeds the service rate.
    pub fn conv(&self, ac: ArrivalCurve) -> ArrivalCurve {
        if ac.rate > self.rate {
            ArrivalCurve::saturated()
        } else {
            ArrivalCurve { rate: ac.rate, burst: ac.burst + ac.rate * self.latency }
        }
    }

    /// Output arrival curve with the service latency replaced by the queue's delay
    /// threshold. The threshold is an upper bound on the latency any admitted state
    /// allows, so this bound is valid for every flow of the class without tracking the
    /// exact latency, at the price of some pessimism.
    pub fn conv_threshold(&self, ac: ArrivalCurve, threshold: f64) -> ArrivalCurve {
        if ac.rate > self.rate {
            ArrivalCurve::saturated()
        } else {
            ArrivalCurve { rate: ac.rate, burst: ac.burst + ac.rate * threshold }
        }
    }

    /// Worst-case delay bound for the given arrival curve, in seconds. Infinite when
    /// the flow's rate exceeds the service rate.
    pub fn delay(&self, ac: ArrivalCurve) -> f64 {
        if ac.rate > self.rate {
            f64::INFINITY
        } else {
            (ac.burst + self.latency * self.rate) / self.rate
        }
    }

    /// Buffer required to serve the arrival curve without loss, in bits.
    pub fn buffer(&self, ac: ArrivalCurve) -> f64 {
        if ac.rate > self.rate {
            f64::INFINITY
        } else {
            ac.burst + ac.rate * self.latency
        }
    }

    /// Buffer bound with the service latency replaced by the queue's delay threshold.
    pub fn buffer_threshold(&self, ac: ArrivalCurve, threshold: f64) -> f64 {
        if ac.rate > self.rate {
            f64::INFINITY
        } else {
            ac.burst + ac.rate * threshold
        }
    }

    /// Service left over for lower priorities after serving the given arrival curve:
    /// the rate shrinks by the served rate and the latency grows by the time the served
    /// backlog occupies the link. The zero curve when the flow's rate exceeds the
    /// service rate.
    pub fn residual(&self, ac: ArrivalCurve) -> ServiceCurve {
        if ac.rate > self.rate {
            Self::new(0.0, 0.0)
        } else {
            Self {
                rate: self.rate - ac.rate,
                latency: (ac.burst + self.rate * self.latency) / (self.rate - ac.rate),
            }
        }
    }
}

impl Add for ServiceCurve {
    type Output = Self;

    /// Serial composition of two systems: latencies add and the bottleneck rate is the
    /// minimum of both.
    fn add(self, other: Self) -> Self {
        Self { latency: self.latency + other.latency, rate: self.rate.min(other.rate) }
    }
}

impl fmt::Display for ServiceCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SC: {:.9}s {:.2} bps", self.latency, self.rate)
    }
}
