//! TSL2591 ambient light sensor.
//!
//! CH0 counts visible + infrared, CH1 counts infrared only; lux is
//! derived from both channels with the AMS empirical formula.

use embedded_hal::i2c::I2c;

use crate::error::DriverError;

pub const I2C_ADDR: u8 = 0x29;

const COMMAND_BIT: u8 = 0xA0;
const REG_ENABLE: u8 = 0x00;
const REG_CONTROL: u8 = 0x01;
const REG_DEVICE_ID: u8 = 0x12;
const REG_C0DATAL: u8 = 0x14;

const ENABLE_POWERON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;
const DEVICE_ID: u8 = 0x50;

/// 100 ms integration, 25x gain (register value).
const CONTROL_DEFAULT: u8 = 0x10;

/// Integration time and analog gain matching `CONTROL_DEFAULT`.
const ATIME_MS: f32 = 100.0;
const AGAIN: f32 = 25.0;

const LUX_DF: f32 = 408.0;
const LUX_COEFB: f32 = 1.64;
const LUX_COEFC: f32 = 0.59;
const LUX_COEFD: f32 = 0.86;

// ── Pure lux math ─────────────────────────────────────────────

/// Two-segment empirical lux formula; the larger estimate wins,
/// floored at zero.
pub fn calculate_lux(ch0: u16, ch1: u16) -> f32 {
    let cpl = (ATIME_MS * AGAIN) / LUX_DF;
    let lux1 = (f32::from(ch0) - LUX_COEFB * f32::from(ch1)) / cpl;
    let lux2 = (LUX_COEFC * f32::from(ch0) - LUX_COEFD * f32::from(ch1)) / cpl;
    lux1.max(lux2).max(0.0)
}

/// Visible-only counts (CH0 minus the infrared channel).
pub fn visible_counts(ch0: u16, ch1: u16) -> u16 {
    ch0.saturating_sub(ch1)
}

// ── Transactions ──────────────────────────────────────────────

/// Verify the device ID, then power the ALS up with default gain and
/// integration time.
pub fn init<I: I2c>(i2c: &mut I) -> Result<(), DriverError> {
    let mut id = [0u8; 1];
    i2c.write_read(I2C_ADDR, &[COMMAND_BIT | REG_DEVICE_ID], &mut id)
        .map_err(|_| DriverError::Bus)?;
    if id[0] != DEVICE_ID {
        return Err(DriverError::Bus);
    }
    i2c.write(I2C_ADDR, &[COMMAND_BIT | REG_CONTROL, CONTROL_DEFAULT])
        .map_err(|_| DriverError::Bus)?;
    i2c.write(I2C_ADDR, &[COMMAND_BIT | REG_ENABLE, ENABLE_POWERON | ENABLE_AEN])
        .map_err(|_| DriverError::Bus)?;
    Ok(())
}

/// Read both channels and return (lux, visible, infrared).
pub fn read_measurement<I: I2c>(i2c: &mut I) -> Result<(f32, u16, u16), DriverError> {
    // CH0 low/high then CH1 low/high, little endian, auto-increment.
    let mut buf = [0u8; 4];
    i2c.write_read(I2C_ADDR, &[COMMAND_BIT | REG_C0DATAL], &mut buf)
        .map_err(|_| DriverError::Bus)?;

    let ch0 = u16::from_le_bytes([buf[0], buf[1]]);
    let ch1 = u16::from_le_bytes([buf[2], buf[3]]);
    if ch0 == u16::MAX || ch1 == u16::MAX {
        // Saturated integration; value would be garbage.
        return Err(DriverError::OutOfRange);
    }
    Ok((calculate_lux(ch0, ch1), visible_counts(ch0, ch1), ch1))
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

    static SIM_LUX: AtomicU32 = AtomicU32::new(450.0f32.to_bits());
    static SIM_VISIBLE: AtomicU16 = AtomicU16::new(312);
    static SIM_INFRARED: AtomicU16 = AtomicU16::new(45);

    pub fn sim_set_light(lux: f32, visible: u16, infrared: u16) {
        SIM_LUX.store(lux.to_bits(), Ordering::Relaxed);
        SIM_VISIBLE.store(visible, Ordering::Relaxed);
        SIM_INFRARED.store(infrared, Ordering::Relaxed);
    }

    pub fn sim_measurement() -> (f32, u16, u16) {
        (
            f32::from_bits(SIM_LUX.load(Ordering::Relaxed)),
            SIM_VISIBLE.load(Ordering::Relaxed),
            SIM_INFRARED.load(Ordering::Relaxed),
        )
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_measurement, sim_set_light};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_chamber_is_zero_lux() {
        assert_eq!(calculate_lux(0, 0), 0.0);
    }

    #[test]
    fn more_visible_light_means_more_lux() {
        let dim = calculate_lux(100, 20);
        let bright = calculate_lux(1000, 20);
        assert!(bright > dim);
        assert!(dim > 0.0);
    }

    #[test]
    fn ir_heavy_source_never_goes_negative() {
        // CH1 > CH0 would drive the linear formula negative.
        assert_eq!(calculate_lux(10, 500), 0.0);
        assert_eq!(visible_counts(10, 500), 0);
    }
}
