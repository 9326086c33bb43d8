//! Invariant checking framework for simulation validation.
//!
//! Invariants are evaluated by the scheduler after every tick. A violation is
//! recorded rather than fatal; the scheduler gives up once too many pile up.

use std::fmt;

use dutycycle_core::{ProtocolConfig, Tick};
use serde::Serialize;

use crate::channel::Channel;
use crate::device::{Device, DeviceState};

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Scheduler tick at which the violation was observed
    pub tick: Tick,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at tick {}: {}",
            self.invariant, self.tick, self.description
        )
    }
}

/// Read-only view of the simulation at the end of a tick.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    /// Scheduler tick just completed
    pub tick: Tick,
    /// Channel as the tick left it
    pub channel: &'a Channel,
    /// Devices in visiting order
    pub devices: &'a [Device],
    /// Policy of the run
    pub protocol: &'a ProtocolConfig,
}

impl TickView<'_> {
    fn violation(&self, invariant: &dyn Invariant, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: invariant.name().to_string(),
            description,
            tick: self.tick,
        }
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant {
    /// Checks if invariant holds for the current tick.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, view: &TickView<'_>) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;
}

/// Ensures every device's state timer stays within its state's bound.
pub struct StateTimerBoundInvariant;

impl Invariant for StateTimerBoundInvariant {
    fn check(&self, view: &TickView<'_>) -> Result<(), InvariantViolation> {
        for device in view.devices {
            if let Some(bound) = device.state().bound(view.protocol) {
                if device.state_timer() > bound {
                    return Err(view.violation(
                        self,
                        format!(
                            "device {} in {} has state_timer {} > bound {}",
                            device.id(),
                            device.kind(),
                            device.state_timer(),
                            bound
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StateTimerBound"
    }
}

/// Ensures powered-off devices have not started their own clock.
pub struct PowerOffClockInvariant;

impl Invariant for PowerOffClockInvariant {
    fn check(&self, view: &TickView<'_>) -> Result<(), InvariantViolation> {
        let drifted = view.devices.iter().find(|device| {
            matches!(device.state(), DeviceState::Off)
                && (device.relative_time() != 0 || device.state_timer() != 0)
        });

        match drifted {
            Some(device) => Err(view.violation(
                self,
                format!(
                    "device {} is Off with relative_time {} and state_timer {}",
                    device.id(),
                    device.relative_time(),
                    device.state_timer()
                ),
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "PowerOffClock"
    }
}

/// Ensures only listening devices hold reception counts.
pub struct DebounceScopeInvariant;

impl Invariant for DebounceScopeInvariant {
    fn check(&self, view: &TickView<'_>) -> Result<(), InvariantViolation> {
        for device in view.devices {
            let listening = matches!(device.state(), DeviceState::Rx { .. });
            if !listening && !device.debounce().is_empty() {
                return Err(view.violation(
                    self,
                    format!(
                        "device {} holds reception counts while {}",
                        device.id(),
                        device.kind()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "DebounceScope"
    }
}

/// Invariants every run can afford to check.
pub fn standard_invariants() -> Vec<Box<dyn Invariant>> {
    vec![
        Box::new(StateTimerBoundInvariant),
        Box::new(PowerOffClockInvariant),
        Box::new(DebounceScopeInvariant),
    ]
}
