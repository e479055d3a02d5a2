//! In-RAM history of sensor snapshots.
//!
//! The arbiter hands a cache snapshot to a [`HistorySink`] once per
//! logging interval (one minute by default). This module keeps the most
//! recent records in a fixed-capacity ring; the persistent 24-hour tier
//! lives behind the same trait in the filesystem component and is outside
//! this crate's scope.

use heapless::Deque;
use log::debug;

use crate::ports::{HistorySink, HistorySnapshot};
use crate::reading::{Reading, SensorType};

/// One flattened history row. Absent fields mean the sensor had no valid
/// reading when the snapshot was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryRecord {
    pub uptime_ms: u64,
    pub temperature_c: Option<f32>,
    pub humidity_rh: Option<f32>,
    pub lux: Option<f32>,
    pub light_visible: Option<u16>,
    pub light_infrared: Option<u16>,
    pub current_ma: Option<f32>,
    pub voltage_mv: Option<f32>,
    pub power_mw: Option<f32>,
    pub water_level_mm: Option<f32>,
    pub water_fill_percent: Option<f32>,
}

impl HistoryRecord {
    /// Flatten a cache snapshot into one row.
    pub fn from_snapshot(snapshot: &HistorySnapshot) -> Self {
        let mut record = Self {
            uptime_ms: snapshot.taken_at.as_millis(),
            ..Self::default()
        };
        for (ty, slot) in SensorType::ALL.into_iter().zip(snapshot.slots) {
            let Some(reading) = slot.reading else { continue };
            match (ty, reading) {
                (SensorType::PowerCurrent, Reading::Power { value }) => {
                    record.current_ma = Some(value);
                }
                (SensorType::PowerVoltage, Reading::Power { value }) => {
                    record.voltage_mv = Some(value);
                }
                (SensorType::PowerPower, Reading::Power { value }) => {
                    record.power_mw = Some(value);
                }
                (_, Reading::Climate { temperature_c, humidity_rh }) => {
                    record.temperature_c = Some(temperature_c);
                    record.humidity_rh = Some(humidity_rh);
                }
                (_, Reading::Light { lux, visible, infrared }) => {
                    record.lux = Some(lux);
                    record.light_visible = Some(visible);
                    record.light_infrared = Some(infrared);
                }
                (_, Reading::WaterLevel { level_mm, fill_percent }) => {
                    record.water_level_mm = Some(level_mm);
                    record.water_fill_percent = Some(fill_percent);
                }
                _ => {}
            }
        }
        record
    }
}

/// Fixed-capacity ring of the most recent records; the oldest row is
/// overwritten once the buffer is full.
pub struct HistoryBuffer<const N: usize = 64> {
    records: Deque<HistoryRecord, N>,
    total_entries: u32,
    buffer_wraps: u32,
}

impl<const N: usize> HistoryBuffer<N> {
    pub const fn new() -> Self {
        Self {
            records: Deque::new(),
            total_entries: 0,
            buffer_wraps: 0,
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        if self.records.is_full() {
            let _ = self.records.pop_front();
            self.buffer_wraps += 1;
        }
        // Cannot fail: a slot was just freed if the ring was full.
        let _ = self.records.push_back(record);
        self.total_entries += 1;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn newest(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    pub fn oldest(&self) -> Option<&HistoryRecord> {
        self.records.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    /// Lifetime count of records pushed (not capped by capacity).
    pub fn total_entries(&self) -> u32 {
        self.total_entries
    }

    pub fn buffer_wraps(&self) -> u32 {
        self.buffer_wraps
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<const N: usize> HistorySink for HistoryBuffer<N> {
    fn log_snapshot(&mut self, snapshot: &HistorySnapshot) -> Result<(), &'static str> {
        let record = HistoryRecord::from_snapshot(snapshot);
        debug!("history: record at uptime={}ms ({} rows)", record.uptime_ms, self.len() + 1);
        self.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::cache::CacheSlot;
    use embassy_time::Instant;

    fn snapshot_with(slots: [CacheSlot; SensorType::COUNT]) -> HistorySnapshot {
        HistorySnapshot { taken_at: Instant::now(), slots }
    }

    fn empty_slot() -> CacheSlot {
        CacheSlot {
            reading: None,
            timestamp: Instant::from_ticks(0),
            last_error: None,
        }
    }

    #[test]
    fn record_flattens_valid_slots_only() {
        let mut slots = [empty_slot(); SensorType::COUNT];
        slots[SensorType::PowerCurrent.index()].reading = Some(Reading::Power { value: 250.0 });
        slots[SensorType::TemperatureHumidity.index()].reading =
            Some(Reading::Climate { temperature_c: 23.1, humidity_rh: 61.0 });

        let record = HistoryRecord::from_snapshot(&snapshot_with(slots));
        assert_eq!(record.current_ma, Some(250.0));
        assert_eq!(record.temperature_c, Some(23.1));
        assert_eq!(record.humidity_rh, Some(61.0));
        assert_eq!(record.lux, None);
        assert_eq!(record.water_fill_percent, None);
    }

    #[test]
    fn ring_overwrites_oldest_when_full() {
        let mut buffer: HistoryBuffer<3> = HistoryBuffer::new();
        for i in 0..5u64 {
            buffer.push(HistoryRecord { uptime_ms: i, ..HistoryRecord::default() });
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.oldest().unwrap().uptime_ms, 2);
        assert_eq!(buffer.newest().unwrap().uptime_ms, 4);
        assert_eq!(buffer.total_entries(), 5);
        assert_eq!(buffer.buffer_wraps(), 2);
    }

    #[test]
    fn sink_impl_appends_records() {
        let mut buffer: HistoryBuffer<8> = HistoryBuffer::new();
        let slots = [empty_slot(); SensorType::COUNT];
        buffer.log_snapshot(&snapshot_with(slots)).unwrap();
        buffer.log_snapshot(&snapshot_with(slots)).unwrap();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn clear_keeps_lifetime_counters() {
        let mut buffer: HistoryBuffer<4> = HistoryBuffer::new();
        buffer.push(HistoryRecord::default());
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_entries(), 1);
    }
}
