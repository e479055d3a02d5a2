//! Port traits — the boundary between the arbiter core and the outside world.
//!
//! ```text
//!   consumer tasks ──▶ SensorArbiter ──▶ SensorDriver (hardware)
//!                            │
//!                            └─────────▶ HistorySink (persistence)
//! ```
//!
//! Driven adapters (the I2C sensor bank, the history logger) implement
//! these traits. The arbiter consumes them via generics or `&mut dyn`, so
//! the core never touches hardware or the filesystem directly.

use embassy_time::Instant;

use crate::arbiter::cache::CacheSlot;
use crate::error::DriverError;
use crate::reading::{Reading, SensorType};

// ───────────────────────────────────────────────────────────────
// Sensor driver port (driven adapter: hardware → arbiter)
// ───────────────────────────────────────────────────────────────

/// One hardware transaction per call.
///
/// Implementations are invoked only while the arbiter holds the bus token,
/// so they MUST NOT attempt any bus arbitration of their own. Expected
/// latency is a single transaction (tens of milliseconds): no internal
/// retry loops that would exceed the arbiter's per-sensor timeout.
pub trait SensorDriver {
    /// Perform the hardware transaction for `ty` and return a typed reading.
    fn read(&mut self, ty: SensorType) -> Result<Reading, DriverError>;
}

// ───────────────────────────────────────────────────────────────
// History sink port (driven adapter: arbiter → persistence)
// ───────────────────────────────────────────────────────────────

/// A consistent copy of the whole cache, taken under the cache mutex.
#[derive(Debug, Clone, Copy)]
pub struct HistorySnapshot {
    /// Monotonic capture time.
    pub taken_at: Instant,
    /// One slot per sensor type, indexed by [`SensorType::index`].
    pub slots: [CacheSlot; SensorType::COUNT],
}

/// Receives one snapshot per logging interval.
///
/// Failures are reported back so the arbiter can log them, but they never
/// stop the poll loop.
pub trait HistorySink {
    fn log_snapshot(&mut self, snapshot: &HistorySnapshot) -> Result<(), &'static str>;
}

/// No-op sink for deployments (and tests) that do not keep history.
pub struct NullHistorySink;

impl HistorySink for NullHistorySink {
    fn log_snapshot(&mut self, _snapshot: &HistorySnapshot) -> Result<(), &'static str> {
        Ok(())
    }
}
