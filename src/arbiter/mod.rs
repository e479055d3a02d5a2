//! Sensor access arbiter — scheduler, cache, and request broker.
//!
//! Every sensor on the pod shares one I2C bus, read at different cadences
//! by independent consumers (display, control logic, network API, CLI).
//! The arbiter is the only code that touches that bus:
//!
//! ```text
//! ┌──────────┐ read()/get_cached() ┌─────────────────────────────┐
//! │ consumer │────────────────────▶│        SensorArbiter        │
//! │  tasks   │◀────────────────────│  cache ── schedule ── stats │
//! └──────────┘   value / error     │     │                       │
//!                                  │  mailbox ──▶ poll task      │
//!                                  │                │ bus token  │
//!                                  └────────────────┼────────────┘
//!                                                   ▼
//!                                            SensorDriver (I2C)
//! ```
//!
//! The poll task wakes on a fixed tick, polls whichever sensors are due
//! on this cycle (priority interval + stagger offset), refreshes the
//! cache, then drains the request mailbox. Consumers either take a fresh
//! cache hit immediately or wait, bounded by a timeout, for the next
//! drain to serve them.
//!
//! Lock discipline: the bus token is never held while taking the cache or
//! schedule mutex and vice versa; both of those are leaf locks with
//! O(copy) hold times. No resource is held across a wait on another.

pub mod cache;
pub mod mailbox;
pub mod schedule;
pub mod stats;

use core::cell::RefCell;
use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant, Ticker, Timer, with_timeout};
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::ArbiterError;
use crate::ports::{HistorySink, HistorySnapshot, SensorDriver};
use crate::reading::{Priority, Reading, SensorType};

use cache::Cache;
use mailbox::{Mailbox, ReadOutcome, Request};
use schedule::ScheduleTable;
use stats::{Stats, StatsSnapshot};

/// Default bound on pending consumer requests.
pub const DEFAULT_MAILBOX_DEPTH: usize = 8;

/// Centralised scheduler, cache, and request broker for the sensor bus.
///
/// Explicitly constructed and shared by reference (typically `Arc`); there
/// is no process-wide instance, so tests can run several arbiters side by
/// side and drive cycles deterministically via [`run_cycle`].
///
/// [`run_cycle`]: SensorArbiter::run_cycle
pub struct SensorArbiter<D: SensorDriver, const MAILBOX: usize = DEFAULT_MAILBOX_DEPTH> {
    /// The bus ownership token. Every hardware transaction happens inside
    /// `bus.lock()`; adapters must not arbitrate on their own.
    bus: Mutex<CriticalSectionRawMutex, D>,
    cache: Cache,
    schedule: BlockingMutex<CriticalSectionRawMutex, RefCell<ScheduleTable>>,
    mailbox: Mailbox<MAILBOX>,
    stats: Stats,
    running: AtomicBool,

    tick_period: Duration,
    staleness_bound: Duration,
    bus_timeout: Duration,
    settle_delay: Duration,
    /// Cycles between history snapshots (0 disables snapshot logging).
    cycles_per_snapshot: u32,
}

impl<D: SensorDriver, const MAILBOX: usize> SensorArbiter<D, MAILBOX> {
    pub fn new(driver: D, config: &SystemConfig) -> Self {
        let cycles_per_snapshot = if config.snapshot_interval_secs == 0 {
            0
        } else {
            (config.snapshot_interval_secs * 1000) / config.tick_period_ms.max(1)
        };
        Self {
            bus: Mutex::new(driver),
            cache: Cache::new(),
            schedule: BlockingMutex::new(RefCell::new(ScheduleTable::new(config))),
            mailbox: Mailbox::new(),
            stats: Stats::new(),
            running: AtomicBool::new(false),
            tick_period: Duration::from_millis(u64::from(config.tick_period_ms)),
            staleness_bound: Duration::from_millis(u64::from(config.cache_staleness_ms)),
            bus_timeout: Duration::from_millis(u64::from(config.bus_timeout_ms)),
            settle_delay: Duration::from_millis(u64::from(config.settle_delay_ms)),
            cycles_per_snapshot,
        }
    }

    // ── Poll task ─────────────────────────────────────────────

    /// Poll loop body, to be driven by a dedicated task until [`stop`] is
    /// called. The loop has no error exit path: every failure is absorbed
    /// into cache invalidity plus a statistics increment.
    ///
    /// [`stop`]: SensorArbiter::stop
    pub async fn run(&self, sink: &mut dyn HistorySink) {
        self.running.store(true, Ordering::Release);
        self.schedule.lock(|s| s.borrow().log_layout());
        info!(
            "arbiter running (tick={}ms, staleness={}ms, snapshot every {} cycles)",
            self.tick_period.as_millis(),
            self.staleness_bound.as_millis(),
            self.cycles_per_snapshot,
        );

        let mut ticker = Ticker::every(self.tick_period);
        while self.running.load(Ordering::Acquire) {
            self.run_cycle(sink).await;
            ticker.next().await;
        }
        info!("arbiter stopped after {} cycles", self.stats.cycle());
    }

    /// One scheduler cycle: poll due sensors in type order, then drain the
    /// mailbox, then (on the logging cadence) emit a history snapshot.
    ///
    /// Public so tests and calibration tooling can advance the arbiter
    /// deterministically without a ticker.
    pub async fn run_cycle(&self, sink: &mut dyn HistorySink) {
        let cycle = self.stats.next_cycle();
        debug!("=== poll cycle {cycle} ===");

        for ty in SensorType::ALL {
            // Due-ness depends only on the cycle number captured above, so
            // the settle delay below cannot push other sensors off cadence.
            let due = self.schedule.lock(|s| s.borrow().should_poll(ty, cycle));
            if !due {
                continue;
            }
            let _ = self.poll_once(ty, self.bus_timeout).await;
            if self.settle_delay.as_ticks() > 0 {
                // Let the bus settle between transactions.
                Timer::after(self.settle_delay).await;
            }
        }

        // Requests are served strictly after this cycle's polling, so a
        // request for a sensor that was due this cycle sees the fresh value.
        self.drain_mailbox().await;

        if self.cycles_per_snapshot > 0 && cycle % self.cycles_per_snapshot == 0 {
            let snapshot = HistorySnapshot {
                taken_at: Instant::now(),
                slots: self.cache.snapshot(),
            };
            if let Err(msg) = sink.log_snapshot(&snapshot) {
                warn!("history snapshot failed: {msg}");
            }
        }
    }

    /// Request the poll loop to exit after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Single bus transaction: acquire the token with a bounded wait, read,
    /// release, then publish the outcome to the cache.
    async fn poll_once(&self, ty: SensorType, bus_timeout: Duration) -> ReadOutcome {
        let outcome = match with_timeout(bus_timeout, self.bus.lock()).await {
            // The token is released when the guard drops, before the cache
            // mutex is taken below.
            Ok(mut driver) => driver.read(ty).map_err(ArbiterError::from),
            Err(_) => {
                warn!("bus token timeout while polling {ty}");
                Err(ArbiterError::BusTimeout)
            }
        };

        if let Err(e) = outcome {
            debug!("poll {ty} failed: {e}");
        }
        self.stats.record_read(outcome.is_err());
        self.cache.store(ty, outcome);
        outcome
    }

    /// Serve every currently queued request. A request whose sensor has a
    /// sufficiently fresh cache entry is answered from the cache; otherwise
    /// the drain polls that sensor on demand and answers with the outcome,
    /// so a waiter is never told "not found" for a sensor that simply has
    /// not been polled yet. Requests arriving after this drain wait for
    /// the next cycle.
    async fn drain_mailbox(&self) {
        while let Some(request) = self.mailbox.try_receive() {
            let ty = request.sensor_type;
            let outcome = match self.cache.get(ty) {
                Ok((reading, age)) if age < self.staleness_bound => {
                    debug!("serving request for {ty} from cache (age={}ms)", age.as_millis());
                    Ok(reading)
                }
                _ => {
                    debug!("serving request for {ty} via on-demand poll");
                    self.poll_once(ty, self.bus_timeout).await
                }
            };
            // If the caller already timed out it has dropped its handle;
            // the signal write then lands in an Arc only we still own.
            request.reply.signal(outcome);
        }
    }

    // ── Consumer API ──────────────────────────────────────────

    /// Blocking read with bounded wait.
    ///
    /// A cache hit younger than the staleness bound returns immediately.
    /// Otherwise the call enqueues a request (failing fast with
    /// [`ArbiterError::QueueFull`] when the mailbox is saturated) and
    /// waits for the poll task to serve it, up to `timeout`.
    pub async fn read(&self, ty: SensorType, timeout: Duration) -> ReadOutcome {
        if let Ok((reading, age)) = self.cache.get(ty) {
            if age < self.staleness_bound {
                debug!("cache hit for {} (age={}ms)", ty, age.as_millis());
                self.stats.record_hit();
                return Ok(reading);
            }
            debug!("cache for {} stale (age={}ms)", ty, age.as_millis());
        }
        self.stats.record_miss();

        let (request, reply) = Request::new(ty);
        self.mailbox.try_send(request)?;

        match with_timeout(timeout, reply.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // Dropping `reply` abandons the request; a late signal from
                // the poll task is a no-op on its own clone.
                warn!("read request for {ty} timed out");
                Err(ArbiterError::Timeout)
            }
        }
    }

    /// Pure cache read: never blocks on hardware, never enqueues. Returns
    /// the reading and its age, or `NotFound` if no valid entry exists.
    pub fn get_cached(&self, ty: SensorType) -> Result<(Reading, Duration), ArbiterError> {
        self.cache.get(ty)
    }

    /// Out-of-band poll that bypasses the schedule (still serialised
    /// through the bus token) and updates the cache. For calibration and
    /// user-triggered refreshes only: it perturbs the stagger pattern, so
    /// steady-state consumers should use [`read`](SensorArbiter::read).
    pub async fn read_forced(&self, ty: SensorType, timeout: Duration) -> ReadOutcome {
        info!("forced read for {ty}");
        self.poll_once(ty, timeout).await
    }

    // ── Runtime control surface ───────────────────────────────

    pub fn set_enabled(&self, ty: SensorType, enabled: bool) {
        self.schedule.lock(|s| s.borrow_mut().set_enabled(ty, enabled));
    }

    pub fn is_enabled(&self, ty: SensorType) -> bool {
        self.schedule.lock(|s| s.borrow().is_enabled(ty))
    }

    pub fn set_priority(&self, ty: SensorType, priority: Priority) {
        self.schedule.lock(|s| s.borrow_mut().set_priority(ty, priority));
    }

    pub fn priority(&self, ty: SensorType) -> Priority {
        self.schedule.lock(|s| s.borrow().priority(ty))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of requests currently queued in the mailbox.
    pub fn pending_requests(&self) -> usize {
        self.mailbox.len()
    }

    /// Log every cache slot with value, priority, validity, and age.
    pub fn dump_cache(&self) {
        let snap = self.stats.snapshot();
        info!("=== sensor arbiter ===");
        info!(
            "cycles={} reads={} hits={} misses={} errors={}",
            snap.poll_cycles, snap.total_reads, snap.cache_hits, snap.cache_misses, snap.errors,
        );

        let now = Instant::now();
        for (ty, slot) in SensorType::ALL.iter().zip(self.cache.snapshot()) {
            let (priority, enabled) =
                self.schedule.lock(|s| (s.borrow().priority(*ty), s.borrow().is_enabled(*ty)));

            let mut value: heapless::String<64> = heapless::String::new();
            match (slot.reading, slot.last_error) {
                (Some(reading), _) => {
                    let _ = write!(value, "{reading}");
                }
                (None, Some(e)) => {
                    let _ = write!(value, "error: {e}");
                }
                (None, None) => {
                    let _ = write!(value, "never polled");
                }
            }

            info!(
                "  {}: {}, priority={}, value={}, age={}ms",
                ty,
                if !enabled {
                    "DISABLED"
                } else if slot.is_valid() {
                    "VALID"
                } else {
                    "INVALID"
                },
                priority,
                value,
                slot.age(now).as_millis(),
            );
        }
    }
}
