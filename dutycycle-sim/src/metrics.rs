//! Run-wide metrics collected by the scheduler.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::channel::{Channel, ChannelActivity};
use crate::device::StateKind;
use crate::invariants::InvariantViolation;

/// How the channel was used, sampled once at the end of every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMetrics {
    /// Ticks with at least one transmission
    pub occupied_ticks: u64,
    /// Ticks with exactly one transmission
    pub clean_ticks: u64,
    /// Ticks with two or more transmissions
    pub collision_ticks: u64,
}

impl ChannelMetrics {
    /// Records the channel's activity for the tick just finished.
    pub fn observe(&mut self, channel: &Channel) {
        match channel.activity() {
            ChannelActivity::Free => {}
            ChannelActivity::Clean(_) => {
                self.occupied_ticks += 1;
                self.clean_ticks += 1;
            }
            ChannelActivity::Collision(_) => {
                self.occupied_ticks += 1;
                self.collision_ticks += 1;
            }
        }
    }
}

/// Metrics collected during simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationMetrics {
    /// Channel usage
    pub channel: ChannelMetrics,
    /// Transitions counted by the state entered
    pub transitions_by_state: BTreeMap<StateKind, u64>,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationMetrics {
    /// Creates empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a transition into `entered`.
    pub fn record_transition(&mut self, entered: StateKind) {
        *self.transitions_by_state.entry(entered).or_insert(0) += 1;
    }

    /// Stores a detected violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }

    /// Total transitions across all devices.
    pub fn total_transitions(&self) -> u64 {
        self.transitions_by_state.values().sum()
    }
}
