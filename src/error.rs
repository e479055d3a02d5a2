//! Unified error types for the GrowPod firmware.
//!
//! One small `Copy` enum per concern, funnelled into a top-level `Error`
//! so the outer loops handle failures uniformly. Hardware-facing failures
//! (`DriverError`, `ArbiterError::BusTimeout`) are absorbed at the arbiter
//! boundary as cache invalidity plus a statistics increment; they never
//! escape as process-fatal errors.

use core::fmt;

// ---------------------------------------------------------------------------
// Driver adapter errors
// ---------------------------------------------------------------------------

/// Failure reported by a sensor driver adapter for a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The I2C transaction itself failed (NAK, arbitration loss, timeout).
    Bus,
    /// The chip answered but the payload failed its checksum.
    Crc,
    /// The chip answered with a physically implausible value.
    OutOfRange,
    /// The chip is present but not ready to measure (warm-up, conversion
    /// still running, calibration missing).
    NotReady,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transaction failed"),
            Self::Crc => write!(f, "checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotReady => write!(f, "sensor not ready"),
        }
    }
}

// ---------------------------------------------------------------------------
// Arbiter errors
// ---------------------------------------------------------------------------

/// Outcome codes of the sensor access arbiter.
///
/// `BusTimeout` and `Driver` describe a failed hardware poll and live in
/// the cache slot's `last_error`; the remaining variants are returned to
/// callers of the consumer API as ordinary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterError {
    /// Exclusive bus access could not be acquired in time. Recoverable;
    /// the sensor is retried on its next scheduled cycle.
    BusTimeout,
    /// The driver adapter failed the transaction. Recoverable; the cache
    /// slot is marked invalid for this cycle.
    Driver(DriverError),
    /// No valid cached value exists for this sensor type.
    NotFound,
    /// The caller's deadline elapsed before a fresh value arrived.
    Timeout,
    /// The request mailbox is saturated.
    QueueFull,
}

impl fmt::Display for ArbiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTimeout => write!(f, "bus token timeout"),
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::NotFound => write!(f, "no valid cached value"),
            Self::Timeout => write!(f, "request timed out"),
            Self::QueueFull => write!(f, "request mailbox full"),
        }
    }
}

impl From<DriverError> for ArbiterError {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Sensor access arbiter failure.
    Arbiter(ArbiterError),
    /// Raw driver failure outside the arbiter (init-time probing).
    Driver(DriverError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arbiter(e) => write!(f, "arbiter: {e}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl From<ArbiterError> for Error {
    fn from(e: ArbiterError) -> Self {
        Self::Arbiter(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl std::error::Error for Error {}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
