//! End-of-run reports for the driver.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use dutycycle_core::{DeviceId, ProtocolConfig, Tick};
use serde::Serialize;

use crate::device::{Device, DeviceStatistics, StateKind};
use crate::invariants::InvariantViolation;
use crate::metrics::ChannelMetrics;

/// Final view of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    /// Device id
    pub id: DeviceId,
    /// Configured power-on tick
    pub turn_on_at: Tick,
    /// Configured timeslots per supercycle
    pub tx_freq: u64,
    /// State at the end of the run
    pub final_state: StateKind,
    /// Position within its own supercycle at the end of the run
    pub relative_time: Tick,
    /// Accumulated statistics
    pub statistics: DeviceStatistics,
}

impl DeviceReport {
    /// Captures a device's current state and statistics.
    pub fn from_device(device: &Device) -> Self {
        Self {
            id: device.id(),
            turn_on_at: device.turn_on_at(),
            tx_freq: device.tx_freq(),
            final_state: device.kind(),
            relative_time: device.relative_time(),
            statistics: device.statistics().clone(),
        }
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Ticks executed
    pub ticks: Tick,
    /// Complete supercycles executed
    pub supercycles: u64,
    /// Policy the run used
    pub protocol: ProtocolConfig,
    /// Per-device outcomes in id order
    pub devices: Vec<DeviceReport>,
    /// Channel usage
    pub channel: ChannelMetrics,
    /// Transitions counted by the state entered
    pub transitions_by_state: BTreeMap<StateKind, u64>,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationReport {
    /// Looks up one device's report.
    pub fn device(&self, id: DeviceId) -> Option<&DeviceReport> {
        self.devices.iter().find(|device| device.id == id)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        let _ = writeln!(
            summary,
            "Simulation Report ({} ticks, {} supercycles)",
            self.ticks, self.supercycles
        );
        let _ = writeln!(
            summary,
            "Policy: tx_time={} busy_channel_backoff={}",
            self.protocol.tx_time, self.protocol.busy_channel_backoff
        );
        let _ = writeln!(
            summary,
            "Channel: occupied={} clean={} collisions={}",
            self.channel.occupied_ticks, self.channel.clean_ticks, self.channel.collision_ticks
        );

        summary.push_str("\nDevices:\n");
        for device in &self.devices {
            let received: Vec<String> = device
                .statistics
                .confirmed_receptions
                .iter()
                .map(DeviceId::to_string)
                .collect();
            let _ = writeln!(
                summary,
                "  [{}] {} received={{{}}} busy_channel={} tx_ticks={} transitions={}",
                device.id,
                device.final_state,
                received.join(", "),
                device.statistics.busy_channel_detections,
                device.statistics.transmitted_ticks,
                device.statistics.transitions
            );
        }

        if !self.transitions_by_state.is_empty() {
            summary.push_str("\nTransitions by state entered:\n");
            for (state, count) in &self.transitions_by_state {
                let _ = writeln!(summary, "  {state}: {count}");
            }
        }

        if !self.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.invariant_violations {
                let _ = writeln!(summary, "  - {violation}");
            }
        }

        summary
    }
}
