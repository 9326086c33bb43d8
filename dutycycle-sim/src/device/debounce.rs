//! Consecutive-observation counting for reception confirmation.

use std::collections::BTreeMap;

use dutycycle_core::{DeviceId, Tick};

/// Per-sender count of consecutive single-sender observations.
///
/// Only an unbroken run counts: a tick of silence or collision clears every
/// entry, and hearing a different sender clears all entries but that sender's.
/// The owning device clears the whole map on every state transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceptionDebounce {
    counts: BTreeMap<DeviceId, Tick>,
}

impl ReceptionDebounce {
    /// Creates an empty debounce map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one tick's channel observation.
    ///
    /// Returns the sender on the exact tick its run reaches `threshold`. Ticks
    /// past the threshold keep counting but return `None`.
    pub fn observe(&mut self, observation: Option<DeviceId>, threshold: Tick) -> Option<DeviceId> {
        let Some(sender) = observation else {
            self.counts.clear();
            return None;
        };

        self.counts.retain(|id, _| *id == sender);
        let count = self.counts.entry(sender).or_insert(0);
        *count += 1;

        (*count == threshold).then_some(sender)
    }

    /// Current run length for a sender.
    pub fn count(&self, sender: DeviceId) -> Tick {
        self.counts.get(&sender).copied().unwrap_or(0)
    }

    /// Returns true if no sender has a running count.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Drops every count.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
