//! Builders for common device populations.

use dutycycle_core::{ConfigError, DeviceConfig, Tick};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::device::Device;

/// Ordered list of device configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Population {
    devices: Vec<DeviceConfig>,
}

impl Population {
    /// Creates an empty population.
    pub fn new() -> Self {
        Self::default()
    }

    /// Device 0 powers on at tick 1; every other device powers on together at `late_start`.
    pub fn staggered(count: u32, tx_freq: u64, late_start: Tick) -> Self {
        let devices = (0..count)
            .map(|id| {
                let turn_on_at = if id == 0 { 1 } else { late_start };
                DeviceConfig::new(id, turn_on_at, tx_freq)
            })
            .collect();
        Self { devices }
    }

    /// Power-on ticks drawn uniformly from `1..=window` with a seeded RNG.
    ///
    /// The same seed always yields the same population.
    pub fn jittered(count: u32, tx_freq: u64, window: Tick, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let window = window.max(1);
        let devices = (0..count)
            .map(|id| DeviceConfig::new(id, rng.random_range(1..=window), tx_freq))
            .collect();
        Self { devices }
    }

    /// Appends a device.
    pub fn push(&mut self, config: DeviceConfig) {
        self.devices.push(config);
    }

    /// Device configurations in insertion order.
    pub fn configs(&self) -> &[DeviceConfig] {
        &self.devices
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true if there are no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Builds powered-off devices.
    ///
    /// # Errors
    /// - `ConfigError::InvalidTxFreq` - A config has an unusable tx_freq
    pub fn into_devices(self) -> Result<Vec<Device>, ConfigError> {
        self.devices.into_iter().map(Device::new).collect()
    }
}

impl From<Vec<DeviceConfig>> for Population {
    fn from(devices: Vec<DeviceConfig>) -> Self {
        Self { devices }
    }
}

#[cfg(test)]
mod tests {
    use dutycycle_core::DeviceId;

    use super::*;

    #[test]
    fn test_staggered_layout() {
        let population = Population::staggered(5, 5, 500_000);
        let turn_on: Vec<Tick> = population.configs().iter().map(|c| c.turn_on_at).collect();

        assert_eq!(turn_on, vec![1, 500_000, 500_000, 500_000, 500_000]);
        assert_eq!(population.configs()[4].id, DeviceId(4));
    }

    #[test]
    fn test_jittered_is_reproducible_and_in_window() {
        let first = Population::jittered(20, 5, 1_000, 7);
        let second = Population::jittered(20, 5, 1_000, 7);
        let other = Population::jittered(20, 5, 1_000, 8);

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.configs().iter().all(|c| (1..=1_000).contains(&c.turn_on_at)));
    }

    #[test]
    fn test_into_devices_validates() {
        let mut population = Population::staggered(2, 5, 10);
        population.push(DeviceConfig::new(2, 1, 0));

        assert!(population.into_devices().is_err());
        assert_eq!(Population::staggered(2, 5, 10).into_devices().unwrap().len(), 2);
    }
}
