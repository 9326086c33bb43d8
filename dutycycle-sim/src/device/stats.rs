//! Per-device statistics read by the driver after a run.

use std::collections::BTreeSet;

use dutycycle_core::DeviceId;
use serde::Serialize;

/// Outcomes a device accumulates over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStatistics {
    /// Senders whose transmissions passed debounce confirmation
    pub confirmed_receptions: BTreeSet<DeviceId>,
    /// ChannelCheck phases that found the channel occupied
    pub busy_channel_detections: u64,
    /// Ticks spent registering transmissions on the channel
    pub transmitted_ticks: u64,
    /// State transitions taken
    pub transitions: u64,
}

impl DeviceStatistics {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a confirmed sender. Returns true if it was not already confirmed.
    pub fn confirm_reception(&mut self, sender: DeviceId) -> bool {
        self.confirmed_receptions.insert(sender)
    }

    /// Counts one busy-channel backoff.
    pub fn record_busy_channel(&mut self) {
        self.busy_channel_detections += 1;
    }

    /// Counts one transmitted tick.
    pub fn record_transmission(&mut self) {
        self.transmitted_ticks += 1;
    }

    /// Counts one state transition.
    pub fn record_transition(&mut self) {
        self.transitions += 1;
    }

    /// Clears every counter and the confirmed set.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
