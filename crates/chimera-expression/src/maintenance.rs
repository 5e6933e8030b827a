// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Background maintenance loop.
//!
//! Calls [`TraitExpressionEngine::tick`] on a fixed interval from a named
//! thread until stopped, dropped, or the engine is closed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::engine::TraitExpressionEngine;
use crate::error::{ExpressionError, ExpressionResult};

pub struct MaintenanceRunner {
    engine: Arc<TraitExpressionEngine>,
    interval: Duration,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    shutdown: Option<Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MaintenanceRunner {
    pub fn new(engine: Arc<TraitExpressionEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            shutdown: None,
            thread_handle: None,
        }
    }

    /// Runner using the engine's configured sweep interval
    pub fn from_engine(engine: Arc<TraitExpressionEngine>) -> Self {
        let interval = engine.config().sweep_interval;
        Self::new(engine, interval)
    }

    /// Start the maintenance loop in a background thread
    pub fn start(&mut self) -> ExpressionResult<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(ExpressionError::Maintenance(
                "maintenance loop already running".to_string(),
            ));
        }
        if self.engine.is_closed() {
            return Err(ExpressionError::Maintenance("engine is closed".to_string()));
        }

        let (sender, receiver) = channel::bounded::<()>(1);
        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let ticks = Arc::clone(&self.ticks);
        let interval = self.interval;

        self.running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("chimera-maintenance".to_string())
            .spawn(move || {
                loop {
                    match receiver.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if engine.is_closed() {
                        debug!(target: "chimera-expression", "Engine closed, maintenance loop exiting");
                        break;
                    }
                    engine.tick();
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
                running.store(false, Ordering::Release);
            });

        match handle {
            Ok(handle) => {
                self.shutdown = Some(sender);
                self.thread_handle = Some(handle);
                info!(target: "chimera-expression", "Maintenance loop started ({:?} interval)", self.interval);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(ExpressionError::Maintenance(format!(
                    "failed to spawn maintenance thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            // Full channel or exited loop both mean the signal is moot
            let _ = sender.try_send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(target: "chimera-expression", "Maintenance thread panicked during shutdown");
            } else {
                info!(target: "chimera-expression", "Maintenance loop stopped after {} ticks", self.ticks());
            }
        }
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Completed maintenance passes
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for MaintenanceRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
