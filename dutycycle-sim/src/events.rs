//! State-transition records and the sinks that observe them.
//!
//! Sinks are an observability side channel: the scheduler hands every
//! transition to them after the fact, and nothing they do feeds back into the
//! simulation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use dutycycle_core::{DeviceId, Tick};
use serde::Serialize;

use crate::device::StateKind;

/// Default number of transitions a `TransitionLog` keeps.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// One FSM transition of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    /// Device that changed state
    pub device: DeviceId,
    /// State left
    pub from: StateKind,
    /// State entered
    pub to: StateKind,
    /// Device's absolute time at the transition
    pub at: Tick,
}

/// Receiver of transition events.
pub trait TransitionSink {
    /// Called once per transition, in the order transitions happen.
    fn record(&mut self, event: &TransitionEvent);
}

impl<F> TransitionSink for F
where
    F: FnMut(&TransitionEvent),
{
    fn record(&mut self, event: &TransitionEvent) {
        self(event)
    }
}

/// Bounded in-memory transition history.
///
/// Clones share the same buffer, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Debug, Clone)]
pub struct TransitionLog {
    entries: Rc<RefCell<VecDeque<TransitionEvent>>>,
    capacity: usize,
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl TransitionLog {
    /// Creates a log with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that drops its oldest entry once `capacity` is reached.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Rc::new(RefCell::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    /// Copies out the retained events, oldest first.
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.entries.borrow().iter().copied().collect()
    }

    /// Removes and returns the retained events, oldest first.
    pub fn drain(&self) -> Vec<TransitionEvent> {
        self.entries.borrow_mut().drain(..).collect()
    }

    /// Retained events for a single device, oldest first.
    pub fn events_for(&self, device: DeviceId) -> Vec<TransitionEvent> {
        self.entries
            .borrow()
            .iter()
            .filter(|event| event.device == device)
            .copied()
            .collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl TransitionSink for TransitionLog {
    fn record(&mut self, event: &TransitionEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.borrow_mut();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(*event);
    }
}
