//! Closed numeric intervals used for bound propagation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `[lo, hi]` with `lo <= hi`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    /// Build an interval, ordering the endpoints.
    pub fn new(a: f64, b: f64) -> Self {
        Self::sorted(a, b)
    }

    pub fn sorted(a: f64, b: f64) -> Self {
        if a <= b {
            Interval { lo: a, hi: b }
        } else {
            Interval { lo: b, hi: a }
        }
    }

    pub fn point(v: f64) -> Self {
        Interval { lo: v, hi: v }
    }

    /// `[v - d, v + d]`
    pub fn around(v: f64, d: f64) -> Self {
        Self::sorted(v - d, v + d)
    }

    pub fn widen(&self, d: f64) -> Self {
        Self::sorted(self.lo - d, self.hi + d)
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    /// Largest absolute value in the interval.
    pub fn magnitude(&self) -> f64 {
        self.lo.abs().max(self.hi.abs())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}
