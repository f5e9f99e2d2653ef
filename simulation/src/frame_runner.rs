//! Frame Runner - Background thread that runs simulation frames at a fixed interval
//!
//! The runner thread is the only writer of the world while it runs: each
//! frame it samples input, runs `SimulationWorld::frame`, and hands the
//! report to a callback.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::input::InputSnapshot;
use crate::world::{FrameReport, SimulationWorld};

pub struct FrameRunner {
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl FrameRunner {
    pub fn new() -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start running frames every `interval_ms` milliseconds.
    ///
    /// # Arguments
    /// * `world` - Shared simulation world
    /// * `interval_ms` - Target milliseconds between frames (40 = 25 fps)
    /// * `input` - Polled once per frame before the world update
    /// * `callback` - Receives each frame report
    pub fn start<I, F>(&mut self, world: Arc<Mutex<SimulationWorld>>, interval_ms: u64, input: I, callback: F)
    where
        I: Fn() -> InputSnapshot + Send + 'static,
        F: Fn(FrameReport) + Send + 'static,
    {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("Frame runner already running");
            return;
        }

        info!(interval_ms, "Starting frame runner");
        self.is_running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.is_running);

        let handle = thread::spawn(move || {
            let interval = Duration::from_millis(interval_ms);
            let mut last_frame = Instant::now();

            while running.load(Ordering::Relaxed) {
                let now = Instant::now();
                let delta_ms = now.duration_since(last_frame).as_millis().min(u32::MAX as u128) as u32;
                last_frame = now;

                let snapshot = input();
                let report = match world.lock() {
                    Ok(mut w) => w.frame(&snapshot, delta_ms),
                    Err(_) => {
                        warn!("Simulation world lock poisoned; stopping frame runner");
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                };

                callback(report);

                let spent = now.elapsed();
                if spent < interval {
                    thread::sleep(interval - spent);
                }
            }
            info!("Frame runner thread stopped");
        });

        self.thread_handle = Some(handle);
    }

    /// Stop running frames and wait for the current one to finish
    pub fn stop(&mut self) {
        if !self.is_running.load(Ordering::Relaxed) {
            return;
        }

        info!("Stopping frame runner...");
        self.is_running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join(); // Thread panic result intentionally ignored during shutdown
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Default for FrameRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
