//! GPIO / peripheral pin assignments for the GrowPod controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// I²C sensor bus (INA219, SHT45, TSL2591, FDC1004)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 42;
pub const I2C_SCL_GPIO: i32 = 41;

/// Standard-mode clock. The FDC1004 misbehaves at 400 kHz on long probe
/// leads, so the whole bus runs at 100 kHz.
pub const I2C_FREQ_HZ: u32 = 100_000;
