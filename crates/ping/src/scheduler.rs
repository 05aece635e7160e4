//! Periodic driver for [`PingEngine`].
//!
//! The first tick runs immediately on start, then one per interval. A tick
//! that fails is logged and the loop carries on. `stop` waits for an
//! in-flight tick to finish; the loop only observes shutdown between ticks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::engine::PingEngine;

/// A spawned loop and the signal that ends it.
struct Running {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

pub struct PingScheduler {
    engine: Arc<PingEngine>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    stopping: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl PingScheduler {
    /// Uses the engine's configured tick interval.
    pub fn new(engine: Arc<PingEngine>, clock: Arc<dyn Clock>) -> Self {
        let interval = engine.config().tick_interval();
        Self::with_interval(engine, clock, interval)
    }

    pub fn with_interval(
        engine: Arc<PingEngine>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            interval,
            stopping: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    /// Spawn the loop. Returns `false` if it is already running.
    pub fn start(&self) -> bool {
        let Ok(mut running) = self.running.lock() else {
            return false;
        };
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            warn!("ping scheduler already running");
            return false;
        }

        self.stopping.store(false, Ordering::SeqCst);
        let engine = self.engine.clone();
        let clock = self.clock.clone();
        let shutdown = Arc::new(Notify::new());
        let loop_shutdown = shutdown.clone();
        let stopping = self.stopping.clone();
        let ticks = self.ticks.clone();
        let interval = self.interval;

        info!(interval_secs = interval.as_secs(), "ping scheduler starting");
        let handle = tokio::spawn(async move {
            run_loop(engine, clock, interval, loop_shutdown, stopping, ticks).await;
        });
        *running = Some(Running { handle, shutdown });
        true
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(Running { handle, shutdown }) = running {
            // notify_one keeps a permit if the loop is mid-tick.
            shutdown.notify_one();
            if let Err(e) = handle.await {
                error!(error = %e, "ping scheduler task panicked");
            }
        }
        info!(ticks = self.tick_count(), "ping scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|r| r.as_ref().is_some_and(|r| !r.handle.is_finished()))
            .unwrap_or(false)
    }

    /// Ticks completed (successfully or not) since construction.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

async fn run_loop(
    engine: Arc<PingEngine>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = ticker.tick() => {}
        }
        if stopping.load(Ordering::SeqCst) {
            break;
        }

        let now = clock.now();
        let started = Instant::now();
        match engine.tick(now).await {
            Ok(report) => {
                if let Some(reason) = report.skipped {
                    tracing::debug!(?reason, "tick skipped");
                }
            }
            Err(e) => error!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "tick failed"
            ),
        }
        ticks.fetch_add(1, Ordering::SeqCst);
    }
}
