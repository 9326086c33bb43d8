//! Fixed-timestep scheduler driving the channel and every device.
//!
//! Within a tick the order is fixed: the channel is cleared first, then every
//! device that was in Tx at the start of the tick acts, then everyone else.
//! Both groups are visited in ascending device id. Transmissions therefore
//! reach listeners within the tick they are made, and a run is reproducible
//! bit for bit.

use std::collections::HashSet;

use dutycycle_core::{ConfigError, DeviceConfig, DeviceId, ProtocolConfig, SUPERCYCLE_LENGTH, Tick};
use thiserror::Error;

use crate::channel::Channel;
use crate::device::Device;
use crate::events::{TransitionEvent, TransitionSink};
use crate::invariants::{Invariant, TickView};
use crate::metrics::SimulationMetrics;
use crate::report::{DeviceReport, SimulationReport};

/// Maximum number of invariant violations before stopping simulation.
const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Errors that can occur while building or running a simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// A device's clock diverged from the scheduler's
    #[error("Device {device} clock desync: scheduler at tick {expected}, device at {actual}")]
    ClockDesync {
        /// Device whose clock diverged
        device: DeviceId,
        /// Scheduler tick counter
        expected: Tick,
        /// Device absolute time
        actual: Tick,
    },

    /// The channel's clock diverged from the scheduler's
    #[error("Channel clock desync: scheduler at tick {expected}, channel at {actual}")]
    ChannelDesync {
        /// Scheduler tick counter
        expected: Tick,
        /// Channel time counter
        actual: Tick,
    },

    /// Too many invariant violations occurred
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },

    /// A previous tick failed; the run cannot continue
    #[error("Simulation aborted at tick {at}")]
    Aborted {
        /// Tick at which the run stopped
        at: Tick,
    },

    /// Two devices share an id
    #[error("Duplicate device id {id}")]
    DuplicateDevice {
        /// Repeated id
        id: DeviceId,
    },

    /// Invalid protocol or device configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Owner of the channel and the device population.
pub struct Scheduler {
    protocol: ProtocolConfig,
    channel: Channel,
    /// Sorted by ascending id
    devices: Vec<Device>,
    time: Tick,
    completed_supercycles: u64,
    /// Scratch buffer: which devices were transmitting when the tick began
    started_in_tx: Vec<bool>,
    sinks: Vec<Box<dyn TransitionSink>>,
    invariants: Vec<Box<dyn Invariant>>,
    metrics: SimulationMetrics,
    /// Violations over the whole run; survives `reset_statistics`
    violation_count: usize,
    aborted_at: Option<Tick>,
}

impl Scheduler {
    /// Creates a scheduler for the given policy and population.
    ///
    /// # Errors
    /// - `SchedulerError::Config` - Invalid protocol durations or device tx_freq
    /// - `SchedulerError::DuplicateDevice` - Two configs share an id
    pub fn new(protocol: ProtocolConfig, configs: &[DeviceConfig]) -> Result<Self, SchedulerError> {
        let devices = configs
            .iter()
            .map(|config| Device::new(*config))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_devices(protocol, devices)
    }

    /// Creates a scheduler from already constructed devices.
    ///
    /// # Errors
    /// - `SchedulerError::Config` - Invalid protocol durations
    /// - `SchedulerError::DuplicateDevice` - Two devices share an id
    pub fn with_devices(protocol: ProtocolConfig, devices: Vec<Device>) -> Result<Self, SchedulerError> {
        Self::with_channel(protocol, Channel::new(), devices)
    }

    /// Creates a scheduler around a channel built by the caller.
    ///
    /// The channel's clock must agree with the scheduler's, which starts at
    /// zero; otherwise the first tick fails with `SchedulerError::ChannelDesync`.
    ///
    /// # Errors
    /// - `SchedulerError::Config` - Invalid protocol durations
    /// - `SchedulerError::DuplicateDevice` - Two devices share an id
    pub fn with_channel(
        protocol: ProtocolConfig,
        channel: Channel,
        mut devices: Vec<Device>,
    ) -> Result<Self, SchedulerError> {
        protocol.validate()?;

        let mut seen = HashSet::with_capacity(devices.len());
        if let Some(duplicate) = devices.iter().find(|device| !seen.insert(device.id())) {
            return Err(SchedulerError::DuplicateDevice { id: duplicate.id() });
        }
        devices.sort_by_key(Device::id);

        tracing::info!(
            devices = devices.len(),
            tx_time = protocol.tx_time,
            backoff = protocol.busy_channel_backoff,
            "Scheduler created"
        );

        Ok(Self {
            protocol,
            channel,
            started_in_tx: vec![false; devices.len()],
            devices,
            time: 0,
            completed_supercycles: 0,
            sinks: Vec::new(),
            invariants: Vec::new(),
            metrics: SimulationMetrics::new(),
            violation_count: 0,
            aborted_at: None,
        })
    }

    /// Registers an observer for every state transition.
    pub fn add_sink(&mut self, sink: Box<dyn TransitionSink>) {
        self.sinks.push(sink);
    }

    /// Adds an invariant checked after every tick.
    pub fn add_invariant(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Policy applied to every device.
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Scheduler tick counter.
    pub fn time(&self) -> Tick {
        self.time
    }

    /// Channel as the last tick left it.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Devices in visiting order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Looks up a device by id.
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices
            .binary_search_by_key(&id, Device::id)
            .ok()
            .map(|index| &self.devices[index])
    }

    /// Metrics since creation or the last reset.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Supercycles finished by `super_cycle` or `run`.
    pub fn completed_supercycles(&self) -> u64 {
        self.completed_supercycles
    }

    /// Clears every device's statistics and the run-wide metrics.
    ///
    /// The invariant violation limit still counts every violation of the run.
    pub fn reset_statistics(&mut self) {
        for device in &mut self.devices {
            device.reset_statistics();
        }
        self.metrics = SimulationMetrics::new();
    }

    /// Executes `supercycles` full supercycles.
    ///
    /// # Errors
    /// Propagates the first error from `super_cycle`.
    pub fn run(&mut self, supercycles: u32) -> Result<(), SchedulerError> {
        for _ in 0..supercycles {
            self.super_cycle()?;
        }
        Ok(())
    }

    /// Executes exactly `SUPERCYCLE_LENGTH` ticks.
    ///
    /// # Errors
    /// Propagates the first error from `tick`; the remaining ticks are not run.
    pub fn super_cycle(&mut self) -> Result<(), SchedulerError> {
        for _ in 0..SUPERCYCLE_LENGTH {
            self.tick()?;
        }
        self.completed_supercycles += 1;

        tracing::info!(
            supercycle = self.completed_supercycles,
            time = self.time,
            collisions = self.metrics.channel.collision_ticks,
            "Supercycle complete"
        );
        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// # Errors
    /// - `SchedulerError::ChannelDesync` / `SchedulerError::ClockDesync` - A clock diverged; the run is aborted
    /// - `SchedulerError::TooManyInvariantViolations` - Violation limit reached; the run is aborted
    /// - `SchedulerError::Aborted` - An earlier tick already failed
    pub fn tick(&mut self) -> Result<(), SchedulerError> {
        if let Some(at) = self.aborted_at {
            return Err(SchedulerError::Aborted { at });
        }

        self.time += 1;
        self.channel.tick();
        if self.channel.time() != self.time {
            let error = SchedulerError::ChannelDesync {
                expected: self.time,
                actual: self.channel.time(),
            };
            return Err(self.abort(error));
        }

        for (started, device) in self.started_in_tx.iter_mut().zip(&self.devices) {
            *started = device.is_transmitting();
        }

        for index in 0..self.devices.len() {
            if self.started_in_tx[index] {
                self.tick_device(index)?;
            }
        }
        for index in 0..self.devices.len() {
            if !self.started_in_tx[index] {
                self.tick_device(index)?;
            }
        }

        self.metrics.channel.observe(&self.channel);
        self.check_invariants()
    }

    fn tick_device(&mut self, index: usize) -> Result<(), SchedulerError> {
        let device = &mut self.devices[index];
        let transition = device.tick(&mut self.channel, &self.protocol);
        let (id, actual) = (device.id(), device.absolute_time());

        if let Some(event) = transition {
            self.dispatch(&event);
        }

        if actual != self.time {
            let error = SchedulerError::ClockDesync {
                device: id,
                expected: self.time,
                actual,
            };
            return Err(self.abort(error));
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &TransitionEvent) {
        tracing::debug!(
            device = %event.device,
            from = %event.from,
            to = %event.to,
            at = event.at,
            "State transition"
        );
        self.metrics.record_transition(event.to);
        for sink in &mut self.sinks {
            sink.record(event);
        }
    }

    fn check_invariants(&mut self) -> Result<(), SchedulerError> {
        if self.invariants.is_empty() {
            return Ok(());
        }

        let view = TickView {
            tick: self.time,
            channel: &self.channel,
            devices: &self.devices,
            protocol: &self.protocol,
        };
        let violations: Vec<_> = self
            .invariants
            .iter()
            .filter_map(|invariant| invariant.check(&view).err())
            .collect();

        for violation in violations {
            tracing::warn!(%violation, "Invariant violated");
            self.metrics.record_invariant_violation(violation);
            self.violation_count += 1;

            if self.violation_count >= MAX_INVARIANT_VIOLATIONS {
                let count = self.violation_count;
                return Err(self.abort(SchedulerError::TooManyInvariantViolations { count }));
            }
        }
        Ok(())
    }

    fn abort(&mut self, error: SchedulerError) -> SchedulerError {
        tracing::error!(%error, tick = self.time, "Simulation aborted");
        self.aborted_at = Some(self.time);
        error
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            ticks: self.time,
            supercycles: self.completed_supercycles,
            protocol: self.protocol,
            devices: self.devices.iter().map(DeviceReport::from_device).collect(),
            channel: self.metrics.channel,
            transitions_by_state: self.metrics.transitions_by_state.clone(),
            invariant_violations: self.metrics.invariant_violations.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn device_mut(&mut self, index: usize) -> &mut Device {
        &mut self.devices[index]
    }
}
