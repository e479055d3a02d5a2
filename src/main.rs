//! GrowPod Sensor Firmware — Main Entry Point
//!
//! One arbiter owns the I2C bus; everything else reads through it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ main thread                 sensor-poll thread           │
//! │                                                          │
//! │  status dump loop   ──────▶  SensorArbiter::run()        │
//! │  (read/get_cached)           cache · schedule · mailbox  │
//! │                                    │                     │
//! │                              PodSensorBank (bus token)   │
//! │                                    │                     │
//! │                              I2C: INA219 · SHT45         │
//! │                                   TSL2591 · FDC1004      │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    espidf::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    // The binary only makes sense on the pod; host builds use the
    // library and its test suite.
    eprintln!("growpod: this binary targets ESP-IDF only");
}

#[cfg(target_os = "espidf")]
mod espidf {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use anyhow::{Context, Result};
    use edge_executor::LocalExecutor;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::units::Hertz;
    use log::{info, warn};

    use growpod::history::HistoryBuffer;
    use growpod::sensors::PodSensorBank;
    use growpod::{pins, SensorArbiter, SensorType, SystemConfig};

    /// Poll task needs room for the executor plus driver stack frames.
    const POLL_TASK_STACK: usize = 8 * 1024;

    pub fn run() -> Result<()> {
        // ── 1. ESP-IDF bootstrap ──────────────────────────────
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;

        info!("╔══════════════════════════════════════╗");
        info!("║  GrowPod sensors v{}               ║", env!("CARGO_PKG_VERSION"));
        info!("╚══════════════════════════════════════╝");

        // ── 2. Configuration ──────────────────────────────────
        // A config loader may replace this with a persisted document;
        // defaults match the production pod.
        let config = SystemConfig::default();
        config.validate().map_err(anyhow::Error::msg)?;

        // ── 3. Sensor bus ─────────────────────────────────────
        let peripherals = Peripherals::take().context("peripherals already taken")?;
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio42, // pins::I2C_SDA_GPIO
            peripherals.pins.gpio41, // pins::I2C_SCL_GPIO
            &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
        )
        .context("I2C driver init failed")?;

        let mut bank = PodSensorBank::new(i2c);
        let present = bank.probe();

        // ── 4. Arbiter ────────────────────────────────────────
        let arbiter = Arc::new(SensorArbiter::<_>::new(bank, &config));
        for (ty, ok) in SensorType::ALL.into_iter().zip(present) {
            if !ok {
                arbiter.set_enabled(ty, false);
            }
        }

        // ── 5. Poll task ──────────────────────────────────────
        let poll_arbiter = Arc::clone(&arbiter);
        std::thread::Builder::new()
            .name("sensor-poll".into())
            .stack_size(POLL_TASK_STACK)
            .spawn(move || {
                let executor: LocalExecutor = LocalExecutor::new();
                let mut history: HistoryBuffer<64> = HistoryBuffer::new();
                futures_lite::future::block_on(
                    executor.run(poll_arbiter.run(&mut history)),
                );
            })
            .context("spawning sensor-poll thread failed")?;

        info!("System ready.");

        // ── 6. Status loop ────────────────────────────────────
        loop {
            std::thread::sleep(StdDuration::from_secs(30));
            let snap = arbiter.stats();
            if snap.errors > 0 {
                warn!("sensor errors so far: {}", snap.errors);
            }
            arbiter.dump_cache();
        }
    }
}
