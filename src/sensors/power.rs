//! INA219 power monitor.
//!
//! One chip backs three sensor types (current, bus voltage, power), which
//! is why the arbiter polls them as separate entries: each is one register
//! read and the consumers want them cached independently.

use embedded_hal::i2c::I2c;

use crate::error::DriverError;

pub const I2C_ADDR: u8 = 0x40;

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

/// 32V range, gain /8, 12-bit continuous shunt+bus conversion.
const CONFIG_DEFAULT: u16 = 0x399F;

/// Calibration for a 0.1 ohm shunt: current LSB 0.1 mA, power LSB 2 mW.
const CALIBRATION: u16 = 4096;
const CURRENT_LSB_MA: f32 = 0.1;
const POWER_LSB_MW: f32 = 2.0;

// ── Pure register math ────────────────────────────────────────

/// Bus voltage register: value in bits 15..3, LSB 4 mV.
pub fn bus_register_to_mv(raw: u16) -> f32 {
    f32::from(raw >> 3) * 4.0
}

/// Current register is signed, scaled by the calibration LSB.
pub fn current_register_to_ma(raw: u16) -> f32 {
    f32::from(raw as i16) * CURRENT_LSB_MA
}

pub fn power_register_to_mw(raw: u16) -> f32 {
    f32::from(raw) * POWER_LSB_MW
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

/// Configure and calibrate the chip; doubles as the presence probe.
pub fn init<I: I2c>(i2c: &mut I) -> Result<(), DriverError> {
    write_register(i2c, REG_CONFIG, CONFIG_DEFAULT)?;
    write_register(i2c, REG_CALIBRATION, CALIBRATION)?;
    // Read the config back; a missing chip acks nothing, a wedged one
    // returns garbage.
    if read_register(i2c, REG_CONFIG)? != CONFIG_DEFAULT {
        return Err(DriverError::NotReady);
    }
    Ok(())
}

pub fn read_current_ma<I: I2c>(i2c: &mut I) -> Result<f32, DriverError> {
    // Reading the shunt register first keeps the current register fresh
    // after a bus-voltage conversion (datasheet erratum workaround).
    let _ = read_register(i2c, REG_SHUNT_VOLTAGE)?;
    Ok(current_register_to_ma(read_register(i2c, REG_CURRENT)?))
}

pub fn read_bus_voltage_mv<I: I2c>(i2c: &mut I) -> Result<f32, DriverError> {
    let raw = read_register(i2c, REG_BUS_VOLTAGE)?;
    // Bit 0 is the math overflow flag.
    if raw & 0x0001 != 0 {
        return Err(DriverError::OutOfRange);
    }
    Ok(bus_register_to_mv(raw))
}

pub fn read_power_mw<I: I2c>(i2c: &mut I) -> Result<f32, DriverError> {
    Ok(power_register_to_mw(read_register(i2c, REG_POWER)?))
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};

    static SIM_CURRENT_MA: AtomicU32 = AtomicU32::new(420.0f32.to_bits());
    static SIM_VOLTAGE_MV: AtomicU32 = AtomicU32::new(12_050.0f32.to_bits());
    static SIM_POWER_MW: AtomicU32 = AtomicU32::new(5060.0f32.to_bits());

    pub fn sim_set_power(current_ma: f32, voltage_mv: f32, power_mw: f32) {
        SIM_CURRENT_MA.store(current_ma.to_bits(), Ordering::Relaxed);
        SIM_VOLTAGE_MV.store(voltage_mv.to_bits(), Ordering::Relaxed);
        SIM_POWER_MW.store(power_mw.to_bits(), Ordering::Relaxed);
    }

    pub fn sim_current_ma() -> f32 {
        f32::from_bits(SIM_CURRENT_MA.load(Ordering::Relaxed))
    }

    pub fn sim_voltage_mv() -> f32 {
        f32::from_bits(SIM_VOLTAGE_MV.load(Ordering::Relaxed))
    }

    pub fn sim_power_mw() -> f32 {
        f32::from_bits(SIM_POWER_MW.load(Ordering::Relaxed))
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_current_ma, sim_power_mw, sim_set_power, sim_voltage_mv};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_voltage_uses_upper_13_bits() {
        // 12.0 V = 3000 counts of 4 mV, shifted left 3.
        assert_eq!(bus_register_to_mv(3000 << 3), 12_000.0);
        assert_eq!(bus_register_to_mv(0), 0.0);
    }

    #[test]
    fn current_register_is_signed() {
        assert_eq!(current_register_to_ma(100), 10.0);
        // -100 counts: discharge direction.
        assert_eq!(current_register_to_ma((-100i16) as u16), -10.0);
    }

    #[test]
    fn power_register_scales_by_2mw() {
        assert_eq!(power_register_to_mw(2530), 5060.0);
    }
}
