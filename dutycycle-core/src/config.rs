//! Centralized configuration for the duty-cycle simulator.
//!
//! Protocol durations, per-device settings and run length live here so the
//! kernel never carries hard-coded values of its own.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, SUPERCYCLE_LENGTH, Tick};

/// Ticks a device spends powering its radio up before it can listen or transmit.
pub const DEFAULT_WAKEUP_TIME: Tick = 240;

/// Ticks of carrier sense performed before every transmission.
pub const DEFAULT_CHANNEL_CHECK_TIME: Tick = 300;

/// Transmission duration and reception debounce threshold of the carrier-sense policy.
pub const DEFAULT_TX_TIME: Tick = 2_000;

/// Errors raised while validating configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Protocol duration '{name}' must be at least one tick")]
    ZeroDuration { name: &'static str },

    #[error("Device {device}: tx_freq {tx_freq} must be within 1..={max}")]
    InvalidTxFreq {
        device: DeviceId,
        tx_freq: u64,
        max: u64,
    },

    #[error("Duplicate device id {device} in scenario")]
    DuplicateDevice { device: DeviceId },

    #[error("Scenario must contain at least one device")]
    EmptyScenario,
}

/// Protocol-level timing parameters shared by every device in a run.
///
/// `tx_time` doubles as the transmission length and the number of consecutive
/// single-sender ticks a receiver needs before it confirms a reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Duration of the WakingUp state
    pub wakeup_time: Tick,
    /// Duration of a quiet ChannelCheck before transmitting
    pub channel_check_time: Tick,
    /// Transmission duration and debounce threshold
    pub tx_time: Tick,
    /// Whether ChannelCheck backs off when it hears another transmitter
    pub busy_channel_backoff: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::carrier_sense()
    }
}

impl ProtocolConfig {
    /// Long transmissions with live collision-avoidance backoff.
    pub fn carrier_sense() -> Self {
        Self {
            wakeup_time: DEFAULT_WAKEUP_TIME,
            channel_check_time: DEFAULT_CHANNEL_CHECK_TIME,
            tx_time: DEFAULT_TX_TIME,
            busy_channel_backoff: true,
        }
    }

    /// Single-tick transmissions with the busy-channel backoff switched off.
    pub fn single_tick() -> Self {
        Self {
            tx_time: 1,
            busy_channel_backoff: false,
            ..Self::carrier_sense()
        }
    }

    /// Checks every duration is usable as a state bound.
    ///
    /// # Errors
    /// - `ConfigError::ZeroDuration` - A protocol duration is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("wakeup_time", self.wakeup_time),
            ("channel_check_time", self.channel_check_time),
            ("tx_time", self.tx_time),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { name });
            }
        }
        Ok(())
    }
}

/// Construction parameters for a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device id
    pub id: DeviceId,
    /// Absolute tick at which the device powers on
    pub turn_on_at: Tick,
    /// Timeslots per supercycle
    pub tx_freq: u64,
}

impl DeviceConfig {
    /// Creates device configuration.
    pub fn new(id: impl Into<DeviceId>, turn_on_at: Tick, tx_freq: u64) -> Self {
        Self {
            id: id.into(),
            turn_on_at,
            tx_freq,
        }
    }

    /// Returns the timeslot length in ticks.
    ///
    /// Only meaningful once `validate` has accepted `tx_freq`.
    pub fn timeslot_size(&self) -> Tick {
        SUPERCYCLE_LENGTH / self.tx_freq.max(1)
    }

    /// Checks that the timeslot size is at least one tick.
    ///
    /// # Errors
    /// - `ConfigError::InvalidTxFreq` - tx_freq is zero or larger than the supercycle
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tx_freq == 0 || self.tx_freq > SUPERCYCLE_LENGTH {
            return Err(ConfigError::InvalidTxFreq {
                device: self.id,
                tx_freq: self.tx_freq,
                max: SUPERCYCLE_LENGTH,
            });
        }
        Ok(())
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Protocol policy applied to every device
    pub protocol: ProtocolConfig,
    /// Number of supercycles to execute
    pub supercycles: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            supercycles: default_supercycles(),
        }
    }
}

impl SimulationConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Recognizes `DUTYCYCLE_TX_TIME`, `DUTYCYCLE_BUSY_BACKOFF` and
    /// `DUTYCYCLE_SUPERCYCLES`. Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(tx_time) = lookup("DUTYCYCLE_TX_TIME").and_then(|v| v.parse::<Tick>().ok()) {
            self.protocol.tx_time = tx_time;
        }

        if let Some(backoff) = lookup("DUTYCYCLE_BUSY_BACKOFF").and_then(|v| v.parse::<bool>().ok())
        {
            self.protocol.busy_channel_backoff = backoff;
        }

        if let Some(supercycles) =
            lookup("DUTYCYCLE_SUPERCYCLES").and_then(|v| v.parse::<u32>().ok())
        {
            self.supercycles = supercycles;
        }

        self
    }
}

/// A complete, file-loadable experiment: policy, run length and population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default = "default_supercycles")]
    pub supercycles: u32,
    pub devices: Vec<DeviceConfig>,
}

fn default_supercycles() -> u32 {
    1
}

impl Scenario {
    /// Validates the protocol and every device, rejecting duplicate ids.
    ///
    /// # Errors
    /// - `ConfigError::EmptyScenario` - No devices listed
    /// - `ConfigError::DuplicateDevice` - Two devices share an id
    /// - `ConfigError::ZeroDuration` / `ConfigError::InvalidTxFreq` - Invalid values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.protocol.validate()?;

        if self.devices.is_empty() {
            return Err(ConfigError::EmptyScenario);
        }

        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !seen.insert(device.id) {
                return Err(ConfigError::DuplicateDevice { device: device.id });
            }
        }
        Ok(())
    }

    /// Splits the scenario into run configuration and device list.
    pub fn into_parts(self) -> (SimulationConfig, Vec<DeviceConfig>) {
        let config = SimulationConfig {
            protocol: self.protocol,
            supercycles: self.supercycles,
        };
        (config, self.devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocol_is_carrier_sense() {
        let config = ProtocolConfig::default();

        assert_eq!(config.wakeup_time, 240);
        assert_eq!(config.channel_check_time, 300);
        assert_eq!(config.tx_time, 2_000);
        assert!(config.busy_channel_backoff);
    }

    #[test]
    fn test_single_tick_preset() {
        let config = ProtocolConfig::single_tick();

        assert_eq!(config.tx_time, 1);
        assert!(!config.busy_channel_backoff);
        assert_eq!(config.wakeup_time, DEFAULT_WAKEUP_TIME);
        assert_eq!(config.channel_check_time, DEFAULT_CHANNEL_CHECK_TIME);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let config = ProtocolConfig {
            tx_time: 0,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration { name: "tx_time" })
        );
    }

    #[test]
    fn test_timeslot_size_divides_supercycle() {
        let device = DeviceConfig::new(0, 1, 5);
        assert_eq!(device.timeslot_size(), 200_000);
        assert!(device.validate().is_ok());
    }

    #[test]
    fn test_tx_freq_bounds() {
        assert!(matches!(
            DeviceConfig::new(1, 1, 0).validate(),
            Err(ConfigError::InvalidTxFreq { tx_freq: 0, .. })
        ));
        assert!(DeviceConfig::new(1, 1, SUPERCYCLE_LENGTH).validate().is_ok());
        assert!(
            DeviceConfig::new(1, 1, SUPERCYCLE_LENGTH + 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_env_overrides_apply_and_ignore_garbage() {
        let config = SimulationConfig::default().with_overrides(|key| match key {
            "DUTYCYCLE_TX_TIME" => Some("1".to_string()),
            "DUTYCYCLE_BUSY_BACKOFF" => Some("false".to_string()),
            "DUTYCYCLE_SUPERCYCLES" => Some("many".to_string()),
            _ => None,
        });

        assert_eq!(config.protocol.tx_time, 1);
        assert!(!config.protocol.busy_channel_backoff);
        assert_eq!(config.supercycles, 1);
    }

    #[test]
    fn test_scenario_defaults_and_validation() {
        let json = r#"{
            "devices": [
                { "id": 0, "turn_on_at": 1, "tx_freq": 5 },
                { "id": 1, "turn_on_at": 500000, "tx_freq": 5 }
            ]
        }"#;

        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.supercycles, 1);
        assert_eq!(scenario.protocol, ProtocolConfig::carrier_sense());
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_scenario_rejects_duplicate_ids() {
        let scenario = Scenario {
            protocol: ProtocolConfig::default(),
            supercycles: 1,
            devices: vec![DeviceConfig::new(3, 1, 5), DeviceConfig::new(3, 10, 5)],
        };

        assert_eq!(
            scenario.validate(),
            Err(ConfigError::DuplicateDevice {
                device: DeviceId(3)
            })
        );
    }
}
