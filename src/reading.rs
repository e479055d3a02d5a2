//! Sensor taxonomy and typed readings.
//!
//! `SensorType` is the identity key everywhere (cache slots, schedule
//! rows, requests, statistics); `Reading` is the tagged value a driver
//! produces. The pairing is structural: a power-type slot holds a
//! `Reading::Power`, and [`Reading::matches`] checks exactly that.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sensor types
// ---------------------------------------------------------------------------

/// Every pollable quantity on the pod's sensor bus.
///
/// The three power entries come from one INA219 but are scheduled,
/// cached, and requested independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    PowerCurrent,
    PowerVoltage,
    PowerPower,
    TemperatureHumidity,
    Light,
    WaterLevel,
}

impl SensorType {
    pub const COUNT: usize = 6;

    /// All types, in slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::PowerCurrent,
        Self::PowerVoltage,
        Self::PowerPower,
        Self::TemperatureHumidity,
        Self::Light,
        Self::WaterLevel,
    ];

    /// Dense slot index used by the cache, schedule, and history tables.
    pub const fn index(self) -> usize {
        match self {
            Self::PowerCurrent => 0,
            Self::PowerVoltage => 1,
            Self::PowerPower => 2,
            Self::TemperatureHumidity => 3,
            Self::Light => 4,
            Self::WaterLevel => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PowerCurrent => "power-current",
            Self::PowerVoltage => "power-voltage",
            Self::PowerPower => "power-power",
            Self::TemperatureHumidity => "temperature-humidity",
            Self::Light => "light",
            Self::WaterLevel => "water-level",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Polling priority
// ---------------------------------------------------------------------------

/// Polling cadence class. The interval is in scheduler cycles; with the
/// default 100 ms tick the levels are 0.5 s / 1 s / 2.5 s / 5 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub const fn index(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Poll interval in scheduler cycles.
    pub const fn interval_cycles(self) -> u32 {
        match self {
            Self::Critical => 5,
            Self::High => 10,
            Self::Medium => 25,
            Self::Low => 50,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL(0.5s)"),
            Self::High => write!(f, "HIGH(1s)"),
            Self::Medium => write!(f, "MEDIUM(2.5s)"),
            Self::Low => write!(f, "LOW(5s)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// One typed measurement, tagged by shape rather than by a separate
/// validity flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// A single power-rail quantity: mA, mV, or mW depending on the slot.
    Power { value: f32 },
    /// Combined climate measurement (one SHT45 transaction yields both).
    Climate { temperature_c: f32, humidity_rh: f32 },
    /// Ambient light with the raw channel counts kept for diagnostics.
    Light { lux: f32, visible: u16, infrared: u16 },
    /// Tank level derived from the capacitive probe.
    WaterLevel { level_mm: f32, fill_percent: f32 },
}

impl Reading {
    /// The headline scalar, for displays and history rows that want one
    /// number per sensor.
    pub fn primary_value(&self) -> f32 {
        match *self {
            Self::Power { value } => value,
            Self::Climate { temperature_c, .. } => temperature_c,
            Self::Light { lux, .. } => lux,
            Self::WaterLevel { level_mm, .. } => level_mm,
        }
    }

    /// Whether this reading has the shape the given sensor type produces.
    pub fn matches(&self, ty: SensorType) -> bool {
        matches!(
            (self, ty),
            (Self::Power { .. }, SensorType::PowerCurrent)
                | (Self::Power { .. }, SensorType::PowerVoltage)
                | (Self::Power { .. }, SensorType::PowerPower)
                | (Self::Climate { .. }, SensorType::TemperatureHumidity)
                | (Self::Light { .. }, SensorType::Light)
                | (Self::WaterLevel { .. }, SensorType::WaterLevel)
        )
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Power { value } => write!(f, "{value:.1}"),
            Self::Climate { temperature_c, humidity_rh } => {
                write!(f, "{temperature_c:.1}C {humidity_rh:.1}%RH")
            }
            Self::Light { lux, .. } => write!(f, "{lux:.1} lux"),
            Self::WaterLevel { level_mm, fill_percent } => {
                write!(f, "{level_mm:.0}mm ({fill_percent:.0}%)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_match_all_order() {
        for (i, ty) in SensorType::ALL.into_iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }

    #[test]
    fn every_priority_interval_is_positive_and_ascending() {
        let mut last = 0;
        for level in Priority::ALL {
            assert!(level.interval_cycles() > last);
            last = level.interval_cycles();
        }
    }

    #[test]
    fn matches_pairs_each_type_with_exactly_one_shape() {
        let samples = [
            Reading::Power { value: 1.0 },
            Reading::Climate { temperature_c: 20.0, humidity_rh: 50.0 },
            Reading::Light { lux: 100.0, visible: 80, infrared: 10 },
            Reading::WaterLevel { level_mm: 90.0, fill_percent: 50.0 },
        ];
        for ty in SensorType::ALL {
            let matching = samples.iter().filter(|r| r.matches(ty)).count();
            assert_eq!(matching, 1, "{ty} matched {matching} shapes");
        }
    }

    #[test]
    fn display_is_compact() {
        let r = Reading::Climate { temperature_c: 22.46, humidity_rh: 57.21 };
        assert_eq!(r.to_string(), "22.5C 57.2%RH");
        assert_eq!(Reading::Power { value: 412.04 }.to_string(), "412.0");
    }
}
