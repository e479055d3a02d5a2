//! System configuration parameters.
//!
//! All tunable parameters for the sensor arbiter. The defaults match the
//! production pod; an external config loader may override them from a
//! persisted JSON document via [`SystemConfig::from_json`].
//!
//! The mailbox depth is not here: bounded channels are sized at compile
//! time, so it is the `MAILBOX` const parameter of `SensorArbiter`.

use serde::{Deserialize, Serialize};

use crate::reading::{Priority, SensorType};

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Scheduler timing ---
    /// Base poll period in milliseconds (one scheduler cycle).
    pub tick_period_ms: u32,
    /// Delay after each bus transaction to let the bus settle.
    pub settle_delay_ms: u32,

    // --- Cache ---
    /// Maximum age of a cached reading that `read()` serves without
    /// requesting a fresh poll.
    pub cache_staleness_ms: u32,

    // --- Bus arbitration ---
    /// Bound on waiting for exclusive bus access during a scheduled poll.
    pub bus_timeout_ms: u32,

    // --- History logging ---
    /// Seconds between history snapshots (0 disables logging).
    pub snapshot_interval_secs: u32,

    // --- Per-sensor schedule, indexed by `SensorType::index()` ---
    /// Initial polling priority per sensor type.
    pub sensor_priorities: [Priority; SensorType::COUNT],
    /// Initial enable flag per sensor type (init failures clear these for
    /// the rest of the boot).
    pub sensor_enabled: [bool; SensorType::COUNT],
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            settle_delay_ms: 10,
            cache_staleness_ms: 5000,
            bus_timeout_ms: 1000,
            snapshot_interval_secs: 60,
            // Power rails poll fast; climate moves slowly.
            sensor_priorities: [
                Priority::High,   // power-current
                Priority::High,   // power-voltage
                Priority::High,   // power-power
                Priority::Low,    // temperature-humidity
                Priority::Medium, // light
                Priority::Medium, // water-level
            ],
            sensor_enabled: [true; SensorType::COUNT],
        }
    }
}

impl SystemConfig {
    /// Range-check the configuration. Invalid values are rejected, not
    /// silently clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.tick_period_ms == 0 {
            return Err("tick_period_ms must be non-zero");
        }
        if self.tick_period_ms > 10_000 {
            return Err("tick_period_ms above 10s defeats the scheduler");
        }
        if self.cache_staleness_ms < self.tick_period_ms {
            return Err("cache_staleness_ms must cover at least one cycle");
        }
        if self.bus_timeout_ms == 0 {
            return Err("bus_timeout_ms must be non-zero");
        }
        if self.settle_delay_ms >= self.tick_period_ms {
            return Err("settle_delay_ms must be shorter than the tick period");
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, &'static str> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| "malformed config document")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, &'static str> {
        serde_json::to_string(self).map_err(|_| "config serialisation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.cache_staleness_ms > c.tick_period_ms);
        assert!(c.settle_delay_ms < c.tick_period_ms);
        assert!(c.sensor_enabled.iter().all(|&e| e));
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = c.to_json().unwrap();
        let c2 = SystemConfig::from_json(&json).unwrap();
        assert_eq!(c.tick_period_ms, c2.tick_period_ms);
        assert_eq!(c.sensor_priorities, c2.sensor_priorities);
        assert_eq!(c.sensor_enabled, c2.sensor_enabled);
    }

    #[test]
    fn zero_tick_rejected() {
        let mut c = SystemConfig::default();
        c.tick_period_ms = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn staleness_shorter_than_tick_rejected() {
        let mut c = SystemConfig::default();
        c.cache_staleness_ms = c.tick_period_ms - 1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn settle_delay_must_fit_inside_tick() {
        let mut c = SystemConfig::default();
        c.settle_delay_ms = c.tick_period_ms;
        assert!(c.validate().is_err());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(SystemConfig::from_json("{not json").is_err());
        assert!(SystemConfig::from_json("{}").is_err());
    }
}
