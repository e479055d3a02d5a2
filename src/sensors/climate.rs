//! SHT45 temperature/humidity sensor.
//!
//! One high-precision measurement command yields both temperature and
//! humidity (this is why the arbiter models them as a single combined
//! sensor type). Each 16-bit word in the reply carries its own CRC-8.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::DriverError;

pub const I2C_ADDR: u8 = 0x44;

const CMD_MEASURE_HIGH_PREC: u8 = 0xFD;
const CMD_SOFT_RESET: u8 = 0x94;

/// Datasheet: 8.3 ms typical for high precision; leave headroom.
const MEASURE_DELAY_MS: u32 = 15;
const RESET_DELAY_MS: u32 = 2;

// ── Pure protocol helpers ─────────────────────────────────────

/// CRC-8 over a data word, polynomial 0x31, init 0xFF (Sensirion).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
        }
    }
    crc
}

/// Raw ticks to degrees Celsius: -45 + 175 * raw / 65535.
pub fn ticks_to_celsius(raw: u16) -> f32 {
    -45.0 + 175.0 * (f32::from(raw) / 65535.0)
}

/// Raw ticks to %RH: -6 + 125 * raw / 65535, clamped to 0..=100.
pub fn ticks_to_humidity(raw: u16) -> f32 {
    (-6.0 + 125.0 * (f32::from(raw) / 65535.0)).clamp(0.0, 100.0)
}

/// Decode and CRC-check the 6-byte measurement frame
/// (temp msb, temp lsb, crc, hum msb, hum lsb, crc).
pub fn decode_frame(frame: &[u8; 6]) -> Result<(f32, f32), DriverError> {
    if crc8(&frame[0..2]) != frame[2] || crc8(&frame[3..5]) != frame[5] {
        return Err(DriverError::Crc);
    }
    let temp_raw = u16::from_be_bytes([frame[0], frame[1]]);
    let hum_raw = u16::from_be_bytes([frame[3], frame[4]]);
    Ok((ticks_to_celsius(temp_raw), ticks_to_humidity(hum_raw)))
}

// ── Transactions ──────────────────────────────────────────────

/// Trigger a high-precision measurement and read both values.
pub fn read_measurement<I: I2c, D: DelayNs>(
    i2c: &mut I,
    delay: &mut D,
) -> Result<(f32, f32), DriverError> {
    i2c.write(I2C_ADDR, &[CMD_MEASURE_HIGH_PREC])
        .map_err(|_| DriverError::Bus)?;
    delay.delay_ms(MEASURE_DELAY_MS);

    let mut frame = [0u8; 6];
    i2c.read(I2C_ADDR, &mut frame).map_err(|_| DriverError::Bus)?;
    decode_frame(&frame)
}

/// Soft reset; doubles as the presence probe.
pub fn soft_reset<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D) -> Result<(), DriverError> {
    i2c.write(I2C_ADDR, &[CMD_SOFT_RESET]).map_err(|_| DriverError::Bus)?;
    delay.delay_ms(RESET_DELAY_MS);
    Ok(())
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};

    static SIM_TEMP_C: AtomicU32 = AtomicU32::new(22.5f32.to_bits());
    static SIM_HUMIDITY_RH: AtomicU32 = AtomicU32::new(55.0f32.to_bits());

    pub fn sim_set_climate(temperature_c: f32, humidity_rh: f32) {
        SIM_TEMP_C.store(temperature_c.to_bits(), Ordering::Relaxed);
        SIM_HUMIDITY_RH.store(humidity_rh.to_bits(), Ordering::Relaxed);
    }

    pub fn sim_measurement() -> (f32, f32) {
        (
            f32::from_bits(SIM_TEMP_C.load(Ordering::Relaxed)),
            f32::from_bits(SIM_HUMIDITY_RH.load(Ordering::Relaxed)),
        )
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_measurement, sim_set_climate};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_sensirion_reference() {
        // Datasheet example: CRC of 0xBEEF is 0x92.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn conversion_endpoints() {
        assert!((ticks_to_celsius(0) - -45.0).abs() < 0.01);
        assert!((ticks_to_celsius(u16::MAX) - 130.0).abs() < 0.01);
        // Humidity is clamped to the physical range.
        assert_eq!(ticks_to_humidity(0), 0.0);
        assert_eq!(ticks_to_humidity(u16::MAX), 100.0);
    }

    #[test]
    fn decode_rejects_corrupt_frame() {
        let mut frame = [0u8; 6];
        frame[0] = 0x66;
        frame[1] = 0x66;
        frame[2] = crc8(&frame[0..2]);
        frame[3] = 0x80;
        frame[4] = 0x00;
        frame[5] = crc8(&frame[3..5]);
        assert!(decode_frame(&frame).is_ok());

        frame[5] ^= 0xFF;
        assert_eq!(decode_frame(&frame).unwrap_err(), DriverError::Crc);
    }
}
