//! Dutycycle Simulation Kernel - tick-exact model of duty-cycled broadcast devices.
//!
//! Devices power on at scheduled ticks, sleep most of the time, and wake once
//! per timeslot either to listen for a whole slot or to carrier-sense and then
//! transmit on a single shared channel. Receivers only accept a sender after
//! an unbroken run of single-sender ticks.
//!
//! # Example
//!
//! ```rust,no_run
//! use dutycycle_core::{DeviceConfig, DeviceId, ProtocolConfig};
//! use dutycycle_sim::Scheduler;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let devices = [
//!     DeviceConfig::new(0, 1, 5),
//!     DeviceConfig::new(1, 500_000, 5),
//! ];
//! let mut scheduler = Scheduler::new(ProtocolConfig::carrier_sense(), &devices)?;
//! scheduler.run(2)?;
//!
//! let listener = scheduler.device(DeviceId(0)).expect("device 0 exists");
//! println!("device 0 received from {:?}", listener.confirmed_receptions());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Channel**: one tick of shared-medium state
//! - **Device**: per-device state machine, clocks and statistics
//! - **Scheduler**: owns both and fixes the order of every tick
//! - **Invariants / sinks**: optional checks and observers that never feed back

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]

pub mod channel;
pub mod device;
pub mod events;
pub mod invariants;
pub mod metrics;
pub mod population;
pub mod report;
pub mod scheduler;

pub use channel::{Channel, ChannelActivity};
pub use device::{Device, DeviceState, DeviceStatistics, ReceptionDebounce, StateKind};
pub use events::{DEFAULT_LOG_CAPACITY, TransitionEvent, TransitionLog, TransitionSink};
pub use invariants::{
    DebounceScopeInvariant, Invariant, InvariantViolation, PowerOffClockInvariant,
    StateTimerBoundInvariant, TickView, standard_invariants,
};
pub use metrics::{ChannelMetrics, SimulationMetrics};
pub use population::Population;
pub use report::{DeviceReport, SimulationReport};
pub use scheduler::{Scheduler, SchedulerError};
