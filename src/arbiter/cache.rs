//! Freshness-stamped reading cache.
//!
//! One fixed slot per sensor type behind a blocking mutex that is distinct
//! from the bus token, so cache readers never wait on hardware I/O. Hold
//! time is a struct copy; the mutex is a leaf lock and is never held
//! across an await point.
//!
//! Validity is carried by `Option<Reading>` rather than a separate flag:
//! a failed poll overwrites the slot with `None` plus the error. A
//! stale-but-good value is deliberately not preserved across a failure;
//! consumers see `NotFound` instead of silently old data.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};

use crate::error::ArbiterError;
use crate::reading::{Reading, SensorType};

/// One cache slot. Exclusively written by the poll task (plus forced
/// reads); copied out for readers.
#[derive(Debug, Clone, Copy)]
pub struct CacheSlot {
    /// Last reading; `None` until the first successful poll, and again
    /// after any failed poll.
    pub reading: Option<Reading>,
    /// When the slot was last written (success or failure).
    pub timestamp: Instant,
    /// Error of the most recent failed poll, cleared on success.
    pub last_error: Option<ArbiterError>,
}

impl CacheSlot {
    const fn empty() -> Self {
        Self {
            reading: None,
            timestamp: Instant::from_ticks(0),
            last_error: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.reading.is_some()
    }

    /// Age of the slot relative to `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }
}

/// The cache table.
pub struct Cache {
    slots: Mutex<CriticalSectionRawMutex, RefCell<[CacheSlot; SensorType::COUNT]>>,
}

impl Cache {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([CacheSlot::empty(); SensorType::COUNT])),
        }
    }

    /// Copy out the reading and its age. `NotFound` when no valid entry
    /// exists (never polled yet, or the last poll failed).
    pub fn get(&self, ty: SensorType) -> Result<(Reading, Duration), ArbiterError> {
        let now = Instant::now();
        self.slots.lock(|slots| {
            let slot = slots.borrow()[ty.index()];
            match slot.reading {
                Some(reading) => Ok((reading, slot.age(now))),
                None => Err(ArbiterError::NotFound),
            }
        })
    }

    /// Overwrite a slot with the outcome of a poll. The timestamp is
    /// always refreshed; an error leaves the slot invalid.
    pub fn store(&self, ty: SensorType, outcome: Result<Reading, ArbiterError>) {
        let now = Instant::now();
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            slots[ty.index()] = match outcome {
                Ok(reading) => CacheSlot {
                    reading: Some(reading),
                    timestamp: now,
                    last_error: None,
                },
                Err(e) => CacheSlot {
                    reading: None,
                    timestamp: now,
                    last_error: Some(e),
                },
            };
        });
    }

    /// Consistent copy of every slot, taken under a single lock.
    pub fn snapshot(&self) -> [CacheSlot; SensorType::COUNT] {
        self.slots.lock(|slots| *slots.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    #[test]
    fn empty_cache_reports_not_found() {
        let cache = Cache::new();
        for ty in SensorType::ALL {
            assert_eq!(cache.get(ty).unwrap_err(), ArbiterError::NotFound);
        }
    }

    #[test]
    fn successful_store_round_trips_the_exact_reading() {
        let cache = Cache::new();
        let reading = Reading::Climate { temperature_c: 21.7, humidity_rh: 48.2 };
        cache.store(SensorType::TemperatureHumidity, Ok(reading));
        let (got, age) = cache.get(SensorType::TemperatureHumidity).unwrap();
        assert_eq!(got, reading);
        assert!(age < Duration::from_secs(1));
    }

    #[test]
    fn failed_poll_invalidates_a_previously_valid_slot() {
        let cache = Cache::new();
        cache.store(SensorType::Light, Ok(Reading::Light { lux: 120.0, visible: 80, infrared: 12 }));
        assert!(cache.get(SensorType::Light).is_ok());

        cache.store(SensorType::Light, Err(DriverError::Bus.into()));
        assert_eq!(cache.get(SensorType::Light).unwrap_err(), ArbiterError::NotFound);

        let slot = cache.snapshot()[SensorType::Light.index()];
        assert!(!slot.is_valid());
        assert_eq!(slot.last_error, Some(ArbiterError::Driver(DriverError::Bus)));
    }

    #[test]
    fn get_is_idempotent_between_stores() {
        let cache = Cache::new();
        let reading = Reading::Power { value: 412.0 };
        cache.store(SensorType::PowerCurrent, Ok(reading));

        let (a, age_a) = cache.get(SensorType::PowerCurrent).unwrap();
        let (b, age_b) = cache.get(SensorType::PowerCurrent).unwrap();
        assert_eq!(a, b);
        assert!(age_b >= age_a, "age only grows between stores");
    }

    #[test]
    fn store_updates_timestamp_even_on_error() {
        let cache = Cache::new();
        cache.store(SensorType::WaterLevel, Err(ArbiterError::BusTimeout));
        let slot = cache.snapshot()[SensorType::WaterLevel.index()];
        assert!(slot.age(Instant::now()) < Duration::from_secs(1));
        assert_eq!(slot.last_error, Some(ArbiterError::BusTimeout));
    }
}
