use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Highest speed; no delay between drawing steps.
pub const MAX_SPEED: u8 = 100;

#[derive(Debug)]
struct ControlState {
    paused: bool,
    stopped: bool,
    speed: u8,
}

/// Pause/resume/stop/speed switches shared between a running interpreter
/// and whoever controls it.
///
/// The interpreter polls [`Control::is_stopped`] at every node and calls
/// `settle` after every drawing side effect; `settle` sleeps according to
/// the speed and blocks while paused. A stop request wakes any waiter.
#[derive(Debug)]
pub struct Control {
    state: Mutex<ControlState>,
    changed: Condvar,
}

impl Default for Control {
    fn default() -> Self {
        Control::new(MAX_SPEED, false)
    }
}

impl Control {
    pub fn new(speed: u8, paused: bool) -> Self {
        Control {
            state: Mutex::new(ControlState {
                paused,
                stopped: false,
                speed: speed.min(MAX_SPEED),
            }),
            changed: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        self.update(|s| s.paused = true);
    }

    pub fn resume(&self) {
        self.update(|s| s.paused = false);
    }

    /// Requests the current run to end. The request holds until [`reset`];
    /// `Interpreter::run` resets at the start of every run.
    ///
    /// [`reset`]: Control::reset
    pub fn stop(&self) {
        self.update(|s| s.stopped = true);
    }

    /// Withdraws a stop request. Pause and speed are left as they are.
    pub fn reset(&self) {
        self.update(|s| s.stopped = false);
    }

    /// Sets the speed, clamped to [`MAX_SPEED`]. Speed 0 holds the turtle
    /// still until the speed is raised.
    pub fn set_speed(&self, speed: u8) {
        self.update(|s| s.speed = speed.min(MAX_SPEED));
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    pub fn speed(&self) -> u8 {
        self.lock().speed
    }

    /// Waits out the step delay and any pause. Returns `false` if a stop
    /// was requested.
    pub(crate) fn settle(&self) -> bool {
        let mut state = self.lock();

        let delay = Duration::from_millis(u64::from(MAX_SPEED - state.speed) * 10);
        let deadline = Instant::now() + delay;
        while !state.stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        while !state.stopped && (state.paused || state.speed == 0) {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.stopped
    }

    fn update(&self, change: impl FnOnce(&mut ControlState)) {
        let mut state = self.lock();
        change(&mut state);
        debug!(
            paused = state.paused,
            stopped = state.stopped,
            speed = state.speed,
            "control changed"
        );
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
