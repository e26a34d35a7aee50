//! Sampling Loop
//!
//! Every interval the loop perturbs the current telemetry, publishes the new
//! record, scores it through the [`Dispatcher`] and appends the verdict to
//! history. The loop can be started and stopped at runtime; a stop cancels the
//! timer, and any verdict that arrives afterwards is discarded instead of
//! being appended.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AppState;
use crate::config::SamplingConfig;
use crate::dispatch::Dispatcher;
use crate::types::{HistoryEntry, TelemetryRecord};

// ============================================================================
// Perturbation
// ============================================================================

const WIND_STEP: f64 = 1.0;
const TEMPERATURE_STEP: f64 = 2.5;
const VIBRATION_STEP: f64 = 5.0;
const POWER_FACTOR_STEP: f64 = 0.05;
const FREQUENCY_STEP: f64 = 0.5;

/// Generator output per m/s of wind (kW).
const POWER_PER_WIND: f64 = 150.0;
const POWER_NOISE: f64 = 100.0;

const POWER_FACTOR_RANGE: (f64, f64) = (0.5, 1.0);
const FREQUENCY_RANGE: (f64, f64) = (45.0, 65.0);

/// Random walk applied to a record once per cycle.
///
/// Only wind speed, component temperatures, vibration, generator power, power
/// factor and frequency move; every other field is copied. Generator power is
/// re-derived from the new wind speed rather than walked.
pub fn perturb<R: Rng>(record: &TelemetryRecord, rng: &mut R) -> TelemetryRecord {
    let wind_speed = (record.wind_speed + rng.gen_range(-WIND_STEP..WIND_STEP)).max(0.0);
    let component_temperatures = (record.component_temperatures
        + rng.gen_range(-TEMPERATURE_STEP..TEMPERATURE_STEP))
    .max(0.0);
    let vibration_levels =
        (record.vibration_levels + rng.gen_range(-VIBRATION_STEP..VIBRATION_STEP)).max(0.0);
    let generator_power =
        (wind_speed * POWER_PER_WIND + rng.gen_range(-POWER_NOISE..POWER_NOISE)).max(0.0);
    let power_factor = (record.power_factor
        + rng.gen_range(-POWER_FACTOR_STEP..POWER_FACTOR_STEP))
    .clamp(POWER_FACTOR_RANGE.0, POWER_FACTOR_RANGE.1);
    let frequency = (record.frequency + rng.gen_range(-FREQUENCY_STEP..FREQUENCY_STEP))
        .clamp(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1);

    TelemetryRecord {
        wind_speed,
        component_temperatures,
        vibration_levels,
        generator_power,
        power_factor,
        frequency,
        ..record.clone()
    }
}

// ============================================================================
// Sampling Loop
// ============================================================================

struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Start/stop handle for the periodic sample-and-score task.
pub struct SamplingLoop {
    app_state: Arc<RwLock<AppState>>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    rng: Arc<Mutex<StdRng>>,
    /// Parent of every run's token, so process shutdown stops a running loop.
    shutdown: CancellationToken,
    running: Mutex<Option<RunHandle>>,
}

impl SamplingLoop {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        dispatcher: Arc<Dispatcher>,
        config: &SamplingConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let rng = match config.seed {
            // Offset so perturbation and scoring noise do not share a stream.
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            app_state,
            dispatcher,
            interval: config.interval(),
            rng: Arc::new(Mutex::new(rng)),
            shutdown,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.running.lock().unwrap_or_else(|e| {
            warn!("Sampling loop handle mutex was poisoned, recovering");
            e.into_inner()
        })
    }

    /// Spawn the loop. Returns `false` if it is already running.
    ///
    /// The first cycle fires one full interval after the call.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|h| !h.task.is_finished()) {
            debug!("Sampling loop already running");
            return false;
        }

        let cancel = self.shutdown.child_token();
        let worker = CycleWorker {
            app_state: Arc::clone(&self.app_state),
            dispatcher: Arc::clone(&self.dispatcher),
            rng: Arc::clone(&self.rng),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(self.interval));
        *running = Some(RunHandle { cancel, task });

        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "[SamplingLoop] Started"
        );
        true
    }

    /// Stop the loop. Returns `false` if it was not running.
    ///
    /// When this returns, no further history entry will be appended by the
    /// stopped run. A cycle already past its cancellation check completes
    /// its append before the state lock is released to us.
    pub async fn stop(&self) -> bool {
        let handle = self.lock_running().take();
        let Some(handle) = handle else {
            return false;
        };
        let was_running = !handle.task.is_finished();
        handle.cancel.cancel();

        // Barrier: wait out any cycle currently holding the write lock.
        drop(self.app_state.write().await);

        if was_running {
            info!("[SamplingLoop] Stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished() && !h.cancel.is_cancelled())
    }
}

/// State moved into one spawned run of the loop.
struct CycleWorker {
    app_state: Arc<RwLock<AppState>>,
    dispatcher: Arc<Dispatcher>,
    rng: Arc<Mutex<StdRng>>,
    cancel: CancellationToken,
}

impl CycleWorker {
    async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        // A cycle that overruns its slot does not trigger a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cycles: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.run_cycle().await;
            cycles += 1;
        }

        let stats = self.app_state.read().await.sampling.clone();
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 SAMPLING STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Cycles This Run:      {}", cycles);
        info!("   Cycles Completed:     {}", stats.cycles_completed);
        info!("   Cycles Failed:        {}", stats.cycles_failed);
        info!("   Discarded After Stop: {}", stats.discarded_after_stop);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    async fn run_cycle(&self) {
        if self.cancel.is_cancelled() {
            return;
        }

        let record = {
            let mut state = self.app_state.write().await;
            let next = {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                perturb(&state.telemetry, &mut *rng)
            };
            state.telemetry = next.clone();
            next
        };

        let outcome = self.dispatcher.predict(&record).await;

        let mut state = self.app_state.write().await;
        if self.cancel.is_cancelled() {
            state.sampling.discarded_after_stop += 1;
            debug!("Discarding verdict that arrived after stop");
            return;
        }

        match outcome {
            Ok(verdict) => {
                debug!(
                    label = %verdict.label,
                    probability = verdict.probability,
                    "Sampling cycle scored"
                );
                state.history.append(HistoryEntry::capture(&verdict, &record));
                state.prediction = Some(verdict);
                state.sampling.cycles_completed += 1;
                state.sampling.last_cycle_at = Some(Utc::now());
            }
            Err(e) => {
                warn!(error = %e, "Sampling cycle failed, telemetry kept");
                state.sampling.cycles_failed += 1;
            }
        }
    }
}
