//! Cancellable periodic tasks driven by the session clock.
//!
//! A [`PeriodicTask`] wraps a repeating Bevy [`Timer`]. Systems advance it
//! with the frame delta; because virtual time is injectable
//! (`TimeUpdateStrategy::ManualDuration`), tests step it deterministically.

use std::time::Duration;

use bevy::prelude::*;

#[derive(Debug, Clone)]
pub struct PeriodicTask {
    timer: Timer,
    running: bool,
}

impl PeriodicTask {
    /// A stopped task with the given interval.
    pub fn new(interval: Duration) -> Self {
        let mut timer = Timer::new(interval, TimerMode::Repeating);
        timer.pause();
        Self {
            timer,
            running: false,
        }
    }

    /// Start counting a full interval from now. No-op when already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.timer.reset();
        self.timer.unpause();
        self.running = true;
    }

    /// Stop the task. Idempotent; pending progress is discarded so no firing
    /// can be observed after this call.
    pub fn stop(&mut self) {
        self.running = false;
        self.timer.pause();
        self.timer.reset();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.timer.duration()
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.timer.set_duration(interval);
    }

    /// Advance by `delta`; returns how many intervals completed. Always 0
    /// while stopped.
    pub fn tick(&mut self, delta: Duration) -> u32 {
        if !self.running {
            return 0;
        }
        self.timer.tick(delta);
        self.timer.times_finished_this_tick()
    }
}
