//! Staggered poll schedule.
//!
//! Each sensor polls at the fixed interval of its priority level, phase
//! shifted by a per-sensor offset so that sensors sharing a level never
//! land on the same cycle:
//!
//! ```text
//! HIGH (every 10 cycles), three sensors:
//!   power-current : cycles 0, 10, 20, ...  (offset 0)
//!   power-voltage : cycles 1, 11, 21, ...  (offset 1)
//!   power-power   : cycles 2, 12, 22, ...  (offset 2)
//! ```
//!
//! Offsets are re-derived whenever a priority changes at runtime, so the
//! uniqueness invariant survives re-prioritisation.

use log::info;

use crate::config::SystemConfig;
use crate::reading::{Priority, SensorType};

/// Pure due-ness predicate: `cycle` is a due cycle for a sensor with the
/// given stagger `offset` and priority `interval` (in cycles).
pub fn is_due(cycle: u32, offset: u32, interval: u32) -> bool {
    cycle >= offset && (cycle - offset) % interval == 0
}

/// Per-sensor priority, stagger offset, and enable flag.
#[derive(Debug, Clone)]
pub struct ScheduleTable {
    priorities: [Priority; SensorType::COUNT],
    offsets: [u32; SensorType::COUNT],
    enabled: [bool; SensorType::COUNT],
}

impl ScheduleTable {
    pub fn new(config: &SystemConfig) -> Self {
        let mut table = Self {
            priorities: config.sensor_priorities,
            offsets: [0; SensorType::COUNT],
            enabled: config.sensor_enabled,
        };
        table.assign_offsets();
        table
    }

    /// Sequential offsets within each priority group, in sensor-type order.
    /// Offsets are unique within a group as long as the group is no larger
    /// than its interval (always the case for sane assignments); the modulo
    /// keeps `offset < interval` even for oversubscribed groups.
    fn assign_offsets(&mut self) {
        let mut counters = [0u32; Priority::ALL.len()];
        for ty in SensorType::ALL {
            let level = self.priorities[ty.index()];
            self.offsets[ty.index()] = counters[level.index()] % level.interval_cycles();
            counters[level.index()] += 1;
        }
    }

    /// Whether `ty` requires a hardware read on `cycle`.
    pub fn should_poll(&self, ty: SensorType, cycle: u32) -> bool {
        let i = ty.index();
        self.enabled[i]
            && is_due(cycle, self.offsets[i], self.priorities[i].interval_cycles())
    }

    pub fn priority(&self, ty: SensorType) -> Priority {
        self.priorities[ty.index()]
    }

    pub fn offset(&self, ty: SensorType) -> u32 {
        self.offsets[ty.index()]
    }

    pub fn is_enabled(&self, ty: SensorType) -> bool {
        self.enabled[ty.index()]
    }

    pub fn set_enabled(&mut self, ty: SensorType, enabled: bool) {
        self.enabled[ty.index()] = enabled;
        info!("schedule: {} sensor {}", if enabled { "enabled" } else { "disabled" }, ty);
    }

    /// Change a sensor's priority and re-derive every stagger offset.
    pub fn set_priority(&mut self, ty: SensorType, priority: Priority) {
        self.priorities[ty.index()] = priority;
        self.assign_offsets();
        info!("schedule: {} priority set to {}", ty, priority);
    }

    /// Log the full staggered schedule (called once at startup).
    pub fn log_layout(&self) {
        info!("staggered polling schedule:");
        for ty in SensorType::ALL {
            let i = ty.index();
            info!(
                "  {}: priority={}, offset={}{}",
                ty,
                self.priorities[i],
                self.offsets[i],
                if self.enabled[i] { "" } else { " (disabled)" },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_table() -> ScheduleTable {
        ScheduleTable::new(&SystemConfig::default())
    }

    #[test]
    fn offsets_unique_within_each_priority_group() {
        let table = default_table();
        for level in Priority::ALL {
            let group: Vec<u32> = SensorType::ALL
                .iter()
                .filter(|ty| table.priority(**ty) == level)
                .map(|ty| table.offset(*ty))
                .collect();
            for (i, a) in group.iter().enumerate() {
                assert!(*a < level.interval_cycles(), "offset must stay below the interval");
                assert!((*a as usize) < group.len().max(1), "offset bounded by group size");
                for b in &group[i + 1..] {
                    assert_ne!(a, b, "two {level} sensors share offset {a}");
                }
            }
        }
    }

    #[test]
    fn due_cycles_are_exactly_periodic_past_the_offset() {
        // Every due cycle in [offset, c] counted: floor((c-offset)/interval)+1.
        for (offset, interval) in [(0u32, 5u32), (1, 10), (3, 25), (7, 50)] {
            for c in offset..offset + 4 * interval {
                let due_count = (offset..=c).filter(|&k| is_due(k, offset, interval)).count() as u32;
                assert_eq!(due_count, (c - offset) / interval + 1);
            }
        }
    }

    #[test]
    fn not_due_before_offset() {
        assert!(!is_due(0, 3, 10));
        assert!(!is_due(2, 3, 10));
        assert!(is_due(3, 3, 10));
    }

    #[test]
    fn two_high_sensors_never_collide_over_twenty_cycles() {
        // A: HIGH offset 0, B: HIGH offset 1 — due sets {0,10} and {1,11}.
        let a_due: Vec<u32> = (0..20).filter(|&c| is_due(c, 0, 10)).collect();
        let b_due: Vec<u32> = (0..20).filter(|&c| is_due(c, 1, 10)).collect();
        assert_eq!(a_due, vec![0, 10]);
        assert_eq!(b_due, vec![1, 11]);
        for c in 0..20 {
            assert!(!(a_due.contains(&c) && b_due.contains(&c)));
        }
    }

    #[test]
    fn disabled_sensor_is_never_due() {
        let mut table = default_table();
        table.set_enabled(SensorType::Light, false);
        for cycle in 0..500 {
            assert!(!table.should_poll(SensorType::Light, cycle));
        }
    }

    #[test]
    fn reprioritisation_rederives_unique_offsets() {
        let mut table = default_table();
        // Pile everything onto HIGH; offsets must still be pairwise distinct.
        for ty in SensorType::ALL {
            table.set_priority(ty, Priority::High);
        }
        let offsets: Vec<u32> = SensorType::ALL.iter().map(|ty| table.offset(*ty)).collect();
        for (i, a) in offsets.iter().enumerate() {
            for b in &offsets[i + 1..] {
                assert_ne!(a, b);
            }
            assert!(*a < Priority::High.interval_cycles());
        }
    }

    #[test]
    fn default_schedule_polls_each_enabled_sensor() {
        let table = default_table();
        for ty in SensorType::ALL {
            let interval = table.priority(ty).interval_cycles();
            let due = (0..200).filter(|&c| table.should_poll(ty, c)).count() as u32;
            // 200 cycles cover at least 200/interval fires.
            assert!(due >= 200 / interval, "{ty} under-polled: {due}");
        }
    }
}
