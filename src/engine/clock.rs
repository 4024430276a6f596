use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use super::{Engine, TickSummary};
use crate::render::Renderer;

/// Fixed cadence for [`drive`].
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub interval: Duration,
    /// Stop after this many ticks; run until cancelled when `None`.
    pub ticks: Option<u64>,
}

impl Clock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticks: None,
        }
    }

    pub fn with_ticks(mut self, ticks: Option<u64>) -> Self {
        self.ticks = ticks;
        self
    }
}

/// Steps a shared engine on a timer. The lock is held for the whole step and
/// for `on_tick`, so a tick and a tool action never interleave and anything
/// `on_tick` publishes is ordered with the engine's own mutations.
pub async fn drive<R, F>(engine: Arc<Mutex<Engine<R>>>, clock: Clock, mut on_tick: F)
where
    R: Renderer,
    F: FnMut(&TickSummary),
{
    let mut interval = time::interval(clock.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval fires immediately.
    interval.tick().await;

    let mut completed = 0u64;
    loop {
        if clock.ticks.is_some_and(|limit| completed >= limit) {
            break;
        }
        interval.tick().await;
        match engine.lock() {
            Ok(mut guard) => {
                let summary = guard.step();
                on_tick(&summary);
            }
            Err(_) => {
                error!("engine lock poisoned, stopping clock");
                return;
            }
        }
        completed += 1;
    }
    info!(ticks = completed, "clock stopped");
}
