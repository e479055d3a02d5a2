//! Sensor driver adapters — one module per chip plus the aggregating
//! [`PodSensorBank`].
//!
//! Chip transactions are written against the `embedded-hal` I2C and delay
//! traits, so the protocol logic compiles (and its pure parts test) on the
//! host. The bank implements [`SensorDriver`]; it performs exactly one
//! hardware transaction per call and never arbitrates the bus itself —
//! the arbiter holds the bus token around every call.
//!
//! ## Dual-target design
//!
//! On ESP-IDF the bank owns the real `I2cDriver`. On host/test builds the
//! chip modules serve process-local simulated values with `sim_set_*`
//! setters.

pub mod climate;
pub mod light;
pub mod power;
pub mod water_level;

use log::{info, warn};

use crate::error::DriverError;
use crate::ports::SensorDriver;
use crate::reading::{Reading, SensorType};

use water_level::LevelCalibration;

/// Aggregates every chip on the pod's sensor bus.
pub struct PodSensorBank {
    #[cfg(target_os = "espidf")]
    i2c: esp_idf_hal::i2c::I2cDriver<'static>,
    #[cfg(target_os = "espidf")]
    delay: esp_idf_hal::delay::Delay,
    water_cal: LevelCalibration,
}

impl PodSensorBank {
    #[cfg(target_os = "espidf")]
    pub fn new(i2c: esp_idf_hal::i2c::I2cDriver<'static>) -> Self {
        Self {
            i2c,
            delay: esp_idf_hal::delay::Delay::new_default(),
            water_cal: LevelCalibration::default(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            water_cal: LevelCalibration::default(),
        }
    }

    /// Replace the water-level calibration (loaded by the external config
    /// collaborator, or set interactively during tank calibration).
    pub fn set_water_calibration(&mut self, cal: LevelCalibration) {
        info!(
            "water level calibration: empty={:.3}pF full={:.3}pF depth={:.0}mm",
            cal.cap_empty_pf, cal.cap_full_pf, cal.tank_depth_mm,
        );
        self.water_cal = cal;
    }

    /// Probe every chip once and report which sensor types are usable.
    /// A chip that fails its probe stays disabled for the rest of the
    /// boot; the pod keeps running on whatever answered.
    pub fn probe(&mut self) -> [bool; SensorType::COUNT] {
        let power_ok = self.probe_power();
        let climate_ok = self.probe_climate();
        let light_ok = self.probe_light();
        let water_ok = self.probe_water();

        let mut present = [true; SensorType::COUNT];
        present[SensorType::PowerCurrent.index()] = power_ok;
        present[SensorType::PowerVoltage.index()] = power_ok;
        present[SensorType::PowerPower.index()] = power_ok;
        present[SensorType::TemperatureHumidity.index()] = climate_ok;
        present[SensorType::Light.index()] = light_ok;
        present[SensorType::WaterLevel.index()] = water_ok;

        for (ty, ok) in SensorType::ALL.into_iter().zip(present) {
            if ok {
                info!("probe: {ty} present");
            } else {
                warn!("probe: {ty} not responding, disabled for this boot");
            }
        }
        present
    }

    #[cfg(target_os = "espidf")]
    fn probe_power(&mut self) -> bool {
        power::init(&mut self.i2c).is_ok()
    }

    #[cfg(target_os = "espidf")]
    fn probe_climate(&mut self) -> bool {
        climate::soft_reset(&mut self.i2c, &mut self.delay).is_ok()
    }

    #[cfg(target_os = "espidf")]
    fn probe_light(&mut self) -> bool {
        light::init(&mut self.i2c).is_ok()
    }

    #[cfg(target_os = "espidf")]
    fn probe_water(&mut self) -> bool {
        water_level::init(&mut self.i2c).is_ok()
    }

    #[cfg(not(target_os = "espidf"))]
    fn probe_power(&mut self) -> bool {
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn probe_climate(&mut self) -> bool {
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn probe_light(&mut self) -> bool {
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn probe_water(&mut self) -> bool {
        true
    }
}

#[cfg(target_os = "espidf")]
impl SensorDriver for PodSensorBank {
    fn read(&mut self, ty: SensorType) -> Result<Reading, DriverError> {
        match ty {
            SensorType::PowerCurrent => {
                let value = power::read_current_ma(&mut self.i2c)?;
                Ok(Reading::Power { value })
            }
            SensorType::PowerVoltage => {
                let value = power::read_bus_voltage_mv(&mut self.i2c)?;
                Ok(Reading::Power { value })
            }
            SensorType::PowerPower => {
                let value = power::read_power_mw(&mut self.i2c)?;
                Ok(Reading::Power { value })
            }
            SensorType::TemperatureHumidity => {
                let (temperature_c, humidity_rh) =
                    climate::read_measurement(&mut self.i2c, &mut self.delay)?;
                Ok(Reading::Climate { temperature_c, humidity_rh })
            }
            SensorType::Light => {
                let (lux, visible, infrared) = light::read_measurement(&mut self.i2c)?;
                Ok(Reading::Light { lux, visible, infrared })
            }
            SensorType::WaterLevel => {
                let cap_pf = water_level::read_capacitance_pf(&mut self.i2c, &mut self.delay)?;
                Ok(Reading::WaterLevel {
                    level_mm: self.water_cal.level_mm(cap_pf),
                    fill_percent: self.water_cal.fill_percent(cap_pf),
                })
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SensorDriver for PodSensorBank {
    fn read(&mut self, ty: SensorType) -> Result<Reading, DriverError> {
        match ty {
            SensorType::PowerCurrent => Ok(Reading::Power { value: power::sim_current_ma() }),
            SensorType::PowerVoltage => Ok(Reading::Power { value: power::sim_voltage_mv() }),
            SensorType::PowerPower => Ok(Reading::Power { value: power::sim_power_mw() }),
            SensorType::TemperatureHumidity => {
                let (temperature_c, humidity_rh) = climate::sim_measurement();
                Ok(Reading::Climate { temperature_c, humidity_rh })
            }
            SensorType::Light => {
                let (lux, visible, infrared) = light::sim_measurement();
                Ok(Reading::Light { lux, visible, infrared })
            }
            SensorType::WaterLevel => {
                let cap_pf = water_level::sim_capacitance_pf();
                Ok(Reading::WaterLevel {
                    level_mm: self.water_cal.level_mm(cap_pf),
                    fill_percent: self.water_cal.fill_percent(cap_pf),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_produces_the_matching_variant_for_every_type() {
        let mut bank = PodSensorBank::new();
        for ty in SensorType::ALL {
            let reading = bank.read(ty).unwrap();
            assert!(reading.matches(ty), "{ty} produced {reading:?}");
        }
    }

    #[test]
    fn host_probe_reports_everything_present() {
        let mut bank = PodSensorBank::new();
        assert_eq!(bank.probe(), [true; SensorType::COUNT]);
    }

    #[test]
    fn water_reading_follows_calibration() {
        let mut bank = PodSensorBank::new();
        bank.set_water_calibration(LevelCalibration {
            cap_empty_pf: 1.0,
            cap_full_pf: 3.0,
            tank_depth_mm: 200.0,
        });
        water_level::sim_set_capacitance_pf(2.0); // midpoint
        let reading = bank.read(SensorType::WaterLevel).unwrap();
        match reading {
            Reading::WaterLevel { level_mm, fill_percent } => {
                assert!((fill_percent - 50.0).abs() < 0.01);
                assert!((level_mm - 100.0).abs() < 0.01);
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }
}
