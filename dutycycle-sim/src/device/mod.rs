//! Duty-cycled device finite-state machine.
//!
//! A device sleeps most of the time and wakes once per timeslot of its own
//! cycle. In timeslot 0 it listens for a full slot; in every other slot it
//! carrier-senses the channel and, if the channel stays quiet, transmits once
//! and sleeps until its next slot boundary.
//!
//! Timeslots are derived from the device's power-on-relative clock, so two
//! devices powered on at different ticks run on independent slot grids.

mod debounce;
mod state;
mod stats;

use std::collections::BTreeSet;

use dutycycle_core::{ConfigError, DeviceConfig, DeviceId, ProtocolConfig, SUPERCYCLE_LENGTH, Tick};

pub use debounce::ReceptionDebounce;
pub use state::{DeviceState, StateKind};
pub use stats::DeviceStatistics;

use crate::channel::Channel;
use crate::events::TransitionEvent;

/// A simulated device with its clocks, timers and statistics.
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    turn_on_at: Tick,
    tx_freq: u64,
    timeslot_size: Tick,
    state: DeviceState,
    /// Ticks since simulation start; advances even while Off
    absolute_time: Tick,
    /// Position within the device's own supercycle; frozen while Off
    relative_time: Tick,
    /// Ticks since the last transition
    state_timer: Tick,
    debounce: ReceptionDebounce,
    stats: DeviceStatistics,
}

impl Device {
    /// Creates a powered-off device.
    ///
    /// # Errors
    /// - `ConfigError::InvalidTxFreq` - tx_freq yields an empty timeslot
    pub fn new(config: DeviceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            id: config.id,
            turn_on_at: config.turn_on_at,
            tx_freq: config.tx_freq,
            timeslot_size: config.timeslot_size(),
            state: DeviceState::Off,
            absolute_time: 0,
            relative_time: 0,
            state_timer: 0,
            debounce: ReceptionDebounce::new(),
            stats: DeviceStatistics::new(),
        })
    }

    /// Returns the device id.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the current state with its bound.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Returns the current state tag.
    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    /// Ticks since simulation start.
    pub fn absolute_time(&self) -> Tick {
        self.absolute_time
    }

    /// Position within the device's own supercycle.
    pub fn relative_time(&self) -> Tick {
        self.relative_time
    }

    /// Ticks spent in the current state.
    pub fn state_timer(&self) -> Tick {
        self.state_timer
    }

    /// Target duration of the current sleep, if sleeping.
    pub fn sleep_timer(&self) -> Option<Tick> {
        match self.state {
            DeviceState::Sleep { duration } => Some(duration),
            _ => None,
        }
    }

    /// Absolute tick at which the device powers on.
    pub fn turn_on_at(&self) -> Tick {
        self.turn_on_at
    }

    /// Timeslots per supercycle.
    pub fn tx_freq(&self) -> u64 {
        self.tx_freq
    }

    /// Timeslot length in ticks.
    pub fn timeslot_size(&self) -> Tick {
        self.timeslot_size
    }

    /// Index of the timeslot the device's own clock is in.
    pub fn timeslot(&self) -> u64 {
        self.relative_time / self.timeslot_size
    }

    /// Returns true while the device is in Tx.
    pub fn is_transmitting(&self) -> bool {
        matches!(self.state, DeviceState::Tx)
    }

    /// Running reception counts.
    pub fn debounce(&self) -> &ReceptionDebounce {
        &self.debounce
    }

    /// Statistics accumulated since creation or the last reset.
    pub fn statistics(&self) -> &DeviceStatistics {
        &self.stats
    }

    /// Senders this device has confirmed.
    pub fn confirmed_receptions(&self) -> &BTreeSet<DeviceId> {
        &self.stats.confirmed_receptions
    }

    /// Carrier-sense phases that found the channel occupied.
    pub fn busy_channel_detections(&self) -> u64 {
        self.stats.busy_channel_detections
    }

    /// Clears accumulated statistics without touching clocks or state.
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Advances the device by one tick against the current channel.
    ///
    /// Returns the transition taken this tick, if any. A device changes state
    /// at most once per tick.
    pub fn tick(&mut self, channel: &mut Channel, protocol: &ProtocolConfig) -> Option<TransitionEvent> {
        self.absolute_time += 1;
        if !matches!(self.state, DeviceState::Off) {
            self.relative_time = (self.relative_time + 1) % SUPERCYCLE_LENGTH;
            self.state_timer += 1;
        }

        let next = match self.state {
            DeviceState::Off => (self.absolute_time >= self.turn_on_at).then_some(DeviceState::WakingUp),
            DeviceState::Sleep { duration } => {
                (self.state_timer == duration).then_some(DeviceState::WakingUp)
            }
            DeviceState::WakingUp => {
                (self.state_timer == protocol.wakeup_time).then(|| self.state_after_wakeup())
            }
            DeviceState::Tx => {
                channel.transmit(self.id);
                self.stats.record_transmission();
                (self.state_timer == protocol.tx_time).then(|| DeviceState::Sleep {
                    duration: self.ticks_until_next_timeslot(),
                })
            }
            DeviceState::Rx { dwell } => {
                if let Some(sender) = self.debounce.observe(channel.receive(), protocol.tx_time) {
                    if self.stats.confirm_reception(sender) {
                        tracing::debug!(device = %self.id, %sender, at = self.absolute_time, "Reception confirmed");
                    }
                }
                (self.state_timer == dwell).then_some(DeviceState::WakingUp)
            }
            DeviceState::ChannelCheck => self.check_channel(channel, protocol),
            DeviceState::On => None,
        };

        next.map(|state| self.transition(state))
    }

    fn state_after_wakeup(&self) -> DeviceState {
        if self.timeslot() == 0 {
            DeviceState::Rx {
                dwell: self.timeslot_size,
            }
        } else {
            DeviceState::ChannelCheck
        }
    }

    fn check_channel(&mut self, channel: &Channel, protocol: &ProtocolConfig) -> Option<DeviceState> {
        if protocol.busy_channel_backoff && !channel.is_free() {
            self.stats.record_busy_channel();
            tracing::trace!(
                device = %self.id,
                at = self.absolute_time,
                senders = channel.sender_count(),
                "Channel busy, backing off"
            );
            return Some(DeviceState::Sleep {
                duration: protocol.tx_time,
            });
        }

        (self.state_timer == protocol.channel_check_time).then_some(DeviceState::Tx)
    }

    /// Ticks from now to the start of the device's next timeslot.
    fn ticks_until_next_timeslot(&self) -> Tick {
        let next_boundary = (self.timeslot() + 1) * self.timeslot_size;
        next_boundary - self.relative_time
    }

    fn transition(&mut self, next: DeviceState) -> TransitionEvent {
        let event = TransitionEvent {
            device: self.id,
            from: self.state.kind(),
            to: next.kind(),
            at: self.absolute_time,
        };

        self.state = next;
        self.debounce.clear();
        self.state_timer = 0;
        self.stats.record_transition();

        event
    }

    #[cfg(test)]
    pub(crate) fn skew_clock(&mut self, ticks: Tick) {
        self.absolute_time += ticks;
    }
}
