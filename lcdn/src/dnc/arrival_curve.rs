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

//! Token-bucket arrival curves.

use std::fmt;
use std::ops::{Add, Sub};

/// # Token-bucket arrival curve
///
/// The curve α(t) = rate · t + burst bounds the amount of traffic a flow (or an
/// aggregate of flows) may produce in any window of length t.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArrivalCurve {
    /// Sustained arrival rate in bits per second
    pub rate: f64,
    /// Maximum burst size in bits
    pub burst: f64,
}

impl ArrivalCurve {
    /// Create a new arrival curve. Negative parameters are clamped to zero.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self { rate: rate.max(0.0), burst: burst.max(0.0) }
    }

    /// The saturated curve marking an unstable reservation.
    pub fn saturated() -> Self {
        Self { rate: f64::INFINITY, burst: f64::INFINITY }
    }

    /// Returns true if and only if both rate and burst are finite.
    pub fn is_finite(&self) -> bool {
        self.rate.is_finite() && self.burst.is_finite()
    }
}

impl Add for ArrivalCurve {
    type Output = Self;

    /// Aggregate two arrival curves: rates and bursts add.
    fn add(self, other: Self) -> Self {
        Self { rate: self.rate + other.rate, burst: self.burst + other.burst }
    }
}

impl Sub for ArrivalCurve {
    type Output = Self;

    /// Remove one arrival curve from an aggregate. Negative results are clamped to
    /// zero.
    fn sub(self, other: Self) -> Self {
        Self::new(self.rate - other.rate, self.burst - other.burst)
    }
}

impl fmt::Display for ArrivalCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AC: {:.2} bps, {:.2} bit", self.rate, self.burst)
    }
}
