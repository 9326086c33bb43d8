//! Identity and time-base types shared by the simulator crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Indivisible unit of simulated time.
pub type Tick = u64;

/// Length of the repeating global schedule, in ticks.
pub const SUPERCYCLE_LENGTH: Tick = 1_000_000;

/// Unique identifier of a simulated device.
///
/// Ordering follows the numeric id, which is also the order in which the
/// scheduler visits devices within a tick.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// Creates DeviceId from its numeric value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying id as u32.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
