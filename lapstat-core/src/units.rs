//! Type-safe wrappers for timing and speed units
//!
//! Both documents report times in milliseconds while the analysis works in
//! seconds. Every quantity crossing a module boundary carries its unit in
//! the type.
//!
//! All unit types serialize with 4 decimal places to keep reports readable.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Seconds (lap times, sector times, cumulative race time)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round4")] pub f64);

impl Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Seconds;

    fn sub(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 - rhs.0)
    }
}

impl Sum for Seconds {
    fn sum<I: Iterator<Item = Seconds>>(iter: I) -> Seconds {
        Seconds(iter.map(|s| s.0).sum())
    }
}

/// Milliseconds, the raw unit of both source documents
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Milliseconds(#[serde(serialize_with = "round4")] pub f64);

impl Milliseconds {
    pub fn as_seconds(&self) -> Seconds {
        Seconds(self.0 / 1000.0)
    }
}

/// Kilometers per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f64);

/// Percentage expressed on a 0-100 scale (e.g. 103.0 = 103%)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);

impl Percent {
    /// `part` as a percentage of `whole`. A zero `whole` yields 0%.
    pub fn of(part: f64, whole: f64) -> Self {
        if whole == 0.0 {
            Self(0.0)
        } else {
            Self(part / whole * 100.0)
        }
    }
}
