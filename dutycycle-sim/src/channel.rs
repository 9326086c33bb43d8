//! Shared broadcast medium, modeled one tick at a time.

use dutycycle_core::{DeviceId, Tick};

/// What a listener would make of the channel during the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelActivity {
    /// Nobody transmitted
    Free,
    /// Exactly one device transmitted
    Clean(DeviceId),
    /// Two or more devices transmitted; indistinguishable from silence to a receiver
    Collision(usize),
}

/// Single shared channel.
///
/// Holds every transmission registered during the current tick and nothing
/// older: `tick` drops them before any device acts again.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    time: Tick,
    senders: Vec<DeviceId>,
}

impl Channel {
    /// Creates an idle channel at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the channel's own tick counter.
    pub fn time(&self) -> Tick {
        self.time
    }

    /// Registers a transmission for the current tick.
    ///
    /// Repeated registrations are all retained, even from the same sender.
    pub fn transmit(&mut self, sender: DeviceId) {
        self.senders.push(sender);
    }

    /// Returns the sender if exactly one device transmitted this tick.
    pub fn receive(&self) -> Option<DeviceId> {
        match self.senders.as_slice() {
            [sender] => Some(*sender),
            _ => None,
        }
    }

    /// Returns true if nobody transmitted this tick.
    pub fn is_free(&self) -> bool {
        self.senders.is_empty()
    }

    /// Number of transmissions registered this tick.
    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    /// Transmissions registered this tick, in registration order.
    pub fn senders(&self) -> &[DeviceId] {
        &self.senders
    }

    /// Classifies the current tick's traffic.
    pub fn activity(&self) -> ChannelActivity {
        match self.senders.as_slice() {
            [] => ChannelActivity::Free,
            [sender] => ChannelActivity::Clean(*sender),
            many => ChannelActivity::Collision(many.len()),
        }
    }

    /// Starts the next tick: clears transmissions and advances the time counter.
    pub fn tick(&mut self) {
        self.senders.clear();
        self.time += 1;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_single_sender_is_received() {
        let mut channel = Channel::new();
        channel.transmit(DeviceId(4));

        assert_eq!(channel.receive(), Some(DeviceId(4)));
        assert!(!channel.is_free());
        assert_eq!(channel.activity(), ChannelActivity::Clean(DeviceId(4)));
    }

    #[test]
    fn test_collision_reads_as_silence() {
        let mut channel = Channel::new();
        channel.transmit(DeviceId(1));
        channel.transmit(DeviceId(2));

        assert_eq!(channel.receive(), None);
        assert!(!channel.is_free());
        assert_eq!(channel.activity(), ChannelActivity::Collision(2));
    }

    #[test]
    fn test_duplicate_registration_from_one_sender_collides() {
        let mut channel = Channel::new();
        channel.transmit(DeviceId(9));
        channel.transmit(DeviceId(9));

        assert_eq!(channel.sender_count(), 2);
        assert_eq!(channel.receive(), None);
    }

    #[test]
    fn test_tick_clears_and_advances() {
        let mut channel = Channel::new();
        channel.transmit(DeviceId(0));
        channel.tick();

        assert!(channel.is_free());
        assert_eq!(channel.receive(), None);
        assert_eq!(channel.time(), 1);
        assert_eq!(channel.activity(), ChannelActivity::Free);
    }

    proptest! {
        #[test]
        fn test_receive_matches_sender_count(ids in proptest::collection::vec(0u32..16, 0..6)) {
            let mut channel = Channel::new();
            for id in &ids {
                channel.transmit(DeviceId(*id));
            }

            prop_assert_eq!(channel.is_free(), ids.is_empty());
            if ids.len() == 1 {
                prop_assert_eq!(channel.receive(), Some(DeviceId(ids[0])));
            } else {
                prop_assert_eq!(channel.receive(), None);
            }

            channel.tick();
            prop_assert!(channel.is_free());
        }
    }
}
