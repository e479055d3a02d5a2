//! FDC1004 capacitive water level sensor.
//!
//! A submerged probe reads a capacitance between the empty-tank and
//! full-tank calibration points; the level in millimetres is linear
//! between them. Calibration is per-tank and loaded from config.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::DriverError;

pub const I2C_ADDR: u8 = 0x50;

const REG_MEAS1_MSB: u8 = 0x00;
const REG_MEAS1_LSB: u8 = 0x01;
const REG_CONF_MEAS1: u8 = 0x08;
const REG_FDC_CONF: u8 = 0x0C;
const REG_DEVICE_ID: u8 = 0xFF;

const DEVICE_ID: u16 = 0x1004;

/// CIN1 single-ended, no CAPDAC.
const CONF_MEAS1_CIN1: u16 = 0x1C00;
/// 100 S/s, trigger measurement 1.
const FDC_CONF_TRIGGER_M1: u16 = 0x0480;

/// Worst-case single conversion at 100 S/s.
const CONVERSION_DELAY_MS: u32 = 15;

/// Picofarads per LSB of the 24-bit measurement (3.125 fF granularity
/// after the fixed-point shift).
const CAP_LSB_PF: f32 = 3.125e-6;

// ── Calibration ───────────────────────────────────────────────

/// Linear two-point calibration mapping capacitance to water level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCalibration {
    /// Probe capacitance with the tank empty, picofarads.
    pub cap_empty_pf: f32,
    /// Probe capacitance with the tank full, picofarads.
    pub cap_full_pf: f32,
    /// Physical tank depth, millimetres.
    pub tank_depth_mm: f32,
}

impl Default for LevelCalibration {
    fn default() -> Self {
        // Factory values for the reference probe; real pods calibrate
        // during tank commissioning.
        Self {
            cap_empty_pf: 1.2,
            cap_full_pf: 3.8,
            tank_depth_mm: 180.0,
        }
    }
}

impl LevelCalibration {
    /// Fill fraction as a percentage, clamped to 0..=100. A degenerate
    /// calibration (empty >= full) reads as an empty tank.
    pub fn fill_percent(&self, cap_pf: f32) -> f32 {
        let span = self.cap_full_pf - self.cap_empty_pf;
        if span <= 0.0 {
            return 0.0;
        }
        (100.0 * (cap_pf - self.cap_empty_pf) / span).clamp(0.0, 100.0)
    }

    /// Water level in millimetres, clamped to the tank depth.
    pub fn level_mm(&self, cap_pf: f32) -> f32 {
        self.tank_depth_mm * self.fill_percent(cap_pf) / 100.0
    }
}

// ── Pure register math ────────────────────────────────────────

/// 24-bit two's-complement measurement (MSB register ++ LSB register,
/// lower byte of the LSB register is padding) to picofarads.
pub fn measurement_to_pf(msb: u16, lsb: u16) -> f32 {
    let raw24 = (u32::from(msb) << 8) | u32::from(lsb >> 8);
    // Sign-extend 24 -> 32 bits.
    let signed = ((raw24 << 8) as i32) >> 8;
    signed as f32 * CAP_LSB_PF
}

// ── Transactions ──────────────────────────────────────────────

fn read_register<I: I2c>(i2c: &mut I, reg: u8) -> Result<u16, DriverError> {
    let mut buf = [0u8; 2];
    i2c.write_read(I2C_ADDR, &[reg], &mut buf)
        .map_err(|_| DriverError::Bus)?;
    Ok(u16::from_be_bytes(buf))
}

fn write_register<I: I2c>(i2c: &mut I, reg: u8, value: u16) -> Result<(), DriverError> {
    let [msb, lsb] = value.to_be_bytes();
    i2c.write(I2C_ADDR, &[reg, msb, lsb]).map_err(|_| DriverError::Bus)
}

/// Verify the device ID and set up measurement slot 1 on CIN1.
pub fn init<I: I2c>(i2c: &mut I) -> Result<(), DriverError> {
    if read_register(i2c, REG_DEVICE_ID)? != DEVICE_ID {
        return Err(DriverError::NotReady);
    }
    write_register(i2c, REG_CONF_MEAS1, CONF_MEAS1_CIN1)
}

/// Trigger one conversion and read the probe capacitance in picofarads.
pub fn read_capacitance_pf<I: I2c, D: DelayNs>(
    i2c: &mut I,
    delay: &mut D,
) -> Result<f32, DriverError> {
    write_register(i2c, REG_FDC_CONF, FDC_CONF_TRIGGER_M1)?;
    delay.delay_ms(CONVERSION_DELAY_MS);

    // DONE_1 flag, bit 3.
    if read_register(i2c, REG_FDC_CONF)? & 0x0008 == 0 {
        return Err(DriverError::NotReady);
    }
    let msb = read_register(i2c, REG_MEAS1_MSB)?;
    let lsb = read_register(i2c, REG_MEAS1_LSB)?;
    Ok(measurement_to_pf(msb, lsb))
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};

    static SIM_CAP_PF: AtomicU32 = AtomicU32::new(2.4f32.to_bits());

    pub fn sim_set_capacitance_pf(cap_pf: f32) {
        SIM_CAP_PF.store(cap_pf.to_bits(), Ordering::Relaxed);
    }

    pub fn sim_capacitance_pf() -> f32 {
        f32::from_bits(SIM_CAP_PF.load(Ordering::Relaxed))
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_capacitance_pf, sim_set_capacitance_pf};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_percent_is_linear_and_clamped() {
        let cal = LevelCalibration {
            cap_empty_pf: 1.0,
            cap_full_pf: 3.0,
            tank_depth_mm: 200.0,
        };
        assert_eq!(cal.fill_percent(1.0), 0.0);
        assert_eq!(cal.fill_percent(3.0), 100.0);
        assert!((cal.fill_percent(2.0) - 50.0).abs() < 0.001);
        // Readings outside the calibrated range clamp.
        assert_eq!(cal.fill_percent(0.2), 0.0);
        assert_eq!(cal.fill_percent(9.0), 100.0);
    }

    #[test]
    fn level_tracks_fill() {
        let cal = LevelCalibration {
            cap_empty_pf: 1.0,
            cap_full_pf: 3.0,
            tank_depth_mm: 200.0,
        };
        assert!((cal.level_mm(2.0) - 100.0).abs() < 0.001);
        assert_eq!(cal.level_mm(3.5), 200.0);
    }

    #[test]
    fn degenerate_calibration_reads_empty() {
        let cal = LevelCalibration {
            cap_empty_pf: 2.0,
            cap_full_pf: 2.0,
            tank_depth_mm: 150.0,
        };
        assert_eq!(cal.fill_percent(5.0), 0.0);
        assert_eq!(cal.level_mm(5.0), 0.0);
    }

    #[test]
    fn measurement_decodes_sign_and_scale() {
        // +0x100000 counts.
        let pf = measurement_to_pf(0x1000, 0x0000);
        assert!((pf - 1_048_576.0 * 3.125e-6).abs() < 1e-4);
        // Negative capacitance (offset drift) decodes as negative.
        assert!(measurement_to_pf(0xFFFF, 0xFF00) < 0.0);
    }
}
