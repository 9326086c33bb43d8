//! Device state machine variants.

use std::fmt;

use dutycycle_core::{ProtocolConfig, Tick};
use serde::Serialize;

/// Current state of a device, carrying the bound that only that state needs.
///
/// Bounds for WakingUp, ChannelCheck and Tx come from the run's
/// `ProtocolConfig`; Rx and Sleep carry their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Not yet powered on
    Off,
    /// Radio powering up
    WakingUp,
    /// Listening for a full timeslot
    Rx {
        /// Listening duration in ticks
        dwell: Tick,
    },
    /// Broadcasting on the channel
    Tx,
    /// Dormant
    Sleep {
        /// Sleep duration in ticks
        duration: Tick,
    },
    /// Carrier sense before transmitting
    ChannelCheck,
    /// Reserved; nothing transitions into or out of it
    On,
}

impl DeviceState {
    /// Returns the flat tag of this state.
    pub fn kind(&self) -> StateKind {
        match self {
            DeviceState::Off => StateKind::Off,
            DeviceState::WakingUp => StateKind::WakingUp,
            DeviceState::Rx { .. } => StateKind::Rx,
            DeviceState::Tx => StateKind::Tx,
            DeviceState::Sleep { .. } => StateKind::Sleep,
            DeviceState::ChannelCheck => StateKind::ChannelCheck,
            DeviceState::On => StateKind::On,
        }
    }

    /// Maximum value `state_timer` may reach in this state.
    ///
    /// `None` for states without a dwell limit.
    pub fn bound(&self, protocol: &ProtocolConfig) -> Option<Tick> {
        match self {
            DeviceState::Off | DeviceState::On => None,
            DeviceState::WakingUp => Some(protocol.wakeup_time),
            DeviceState::Rx { dwell } => Some(*dwell),
            DeviceState::Tx => Some(protocol.tx_time),
            DeviceState::Sleep { duration } => Some(*duration),
            DeviceState::ChannelCheck => Some(protocol.channel_check_time),
        }
    }
}

/// State tag without per-state data, used in events and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StateKind {
    /// Not yet powered on
    Off,
    /// Radio powering up
    WakingUp,
    /// Listening
    Rx,
    /// Transmitting
    Tx,
    /// Dormant
    Sleep,
    /// Carrier sense
    ChannelCheck,
    /// Reserved
    On,
}

impl StateKind {
    /// Returns string representation for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Off => "Off",
            StateKind::WakingUp => "WakingUp",
            StateKind::Rx => "Rx",
            StateKind::Tx => "Tx",
            StateKind::Sleep => "Sleep",
            StateKind::ChannelCheck => "ChannelCheck",
            StateKind::On => "On",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
