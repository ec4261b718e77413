//! Input activity detection.
//!
//! The [`ActivityDetector`] turns a stream of raw input notifications into a
//! coarse [`ActivityState`]. A short burst of input is treated as noise; only
//! input sustained past the activity threshold makes the user active, and a
//! gap longer than the idle threshold makes them idle again.
//!
//! The detector is fed from the input hook thread and read from the
//! heartbeat, so all state lives behind a single `parking_lot::Mutex`.

use super::clock::Clock;
use super::event::BreakId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Suspended,
    Idle,
    Noise,
    Active,
    ForcedIdle,
}

/// Timing thresholds of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Input gap after which a noise burst starts over.
    pub noise: Duration,
    /// Sustained input needed to become active.
    pub activity: Duration,
    /// Input gap after which an active user turns idle.
    pub idle: Duration,
    /// Minimum pointer movement in pixels that counts as input.
    pub sensitivity: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            noise: Duration::from_millis(9000),
            activity: Duration::from_millis(1000),
            idle: Duration::from_millis(5000),
            sensitivity: 3,
        }
    }
}

type ListenerCallback = Arc<dyn Fn() + Send + Sync>;

struct Listener {
    owner: BreakId,
    callback: ListenerCallback,
}

struct Inner {
    state: ActivityState,
    noise_micros: i64,
    activity_micros: i64,
    idle_micros: i64,
    sensitivity: i32,
    first_action: i64,
    last_action: i64,
    button_pressed: bool,
    listener: Option<Listener>,
}

impl Inner {
    /// Registers one qualifying input. Returns the listener to call, if any.
    fn action(&mut self, now: i64) -> Option<ListenerCallback> {
        match self.state {
            ActivityState::Suspended => return None,
            ActivityState::Idle | ActivityState::ForcedIdle => {
                self.first_action = now;
                self.last_action = now;
                self.state = if self.activity_micros == 0 {
                    ActivityState::Active
                } else {
                    ActivityState::Noise
                };
                debug!(state = ?self.state, "input after idle");
            }
            ActivityState::Noise => {
                if now - self.last_action > self.noise_micros {
                    self.first_action = now;
                } else if now - self.first_action >= self.activity_micros {
                    self.state = ActivityState::Active;
                    debug!("sustained input, user active");
                }
            }
            ActivityState::Active => {}
        }
        self.last_action = now;
        self.listener.as_ref().map(|listener| listener.callback.clone())
    }

    fn refresh(&mut self, now: i64) {
        if self.state == ActivityState::Active && now - self.last_action > self.idle_micros {
            self.state = ActivityState::Idle;
            debug!("no input for idle threshold, user idle");
        }
    }
}

pub struct ActivityDetector {
    clock: Clock,
    inner: Mutex<Inner>,
}

impl ActivityDetector {
    pub fn new(clock: Clock, thresholds: Thresholds) -> Self {
        let inner = Inner {
            state: ActivityState::Idle,
            noise_micros: thresholds.noise.as_micros() as i64,
            activity_micros: thresholds.activity.as_micros() as i64,
            idle_micros: thresholds.idle.as_micros() as i64,
            sensitivity: thresholds.sensitivity,
            first_action: 0,
            last_action: 0,
            button_pressed: false,
            listener: None,
        };
        Self {
            clock,
            inner: Mutex::new(inner),
        }
    }

    /// Replaces the thresholds. The state starts over from idle unless suspended.
    pub fn set_thresholds(&self, thresholds: Thresholds) {
        let mut inner = self.inner.lock();
        inner.noise_micros = thresholds.noise.as_micros() as i64;
        inner.activity_micros = thresholds.activity.as_micros() as i64;
        inner.idle_micros = thresholds.idle.as_micros() as i64;
        inner.sensitivity = thresholds.sensitivity;
        if inner.state != ActivityState::Suspended {
            inner.state = ActivityState::Idle;
        }
    }

    pub fn notify_mouse(&self, dx: i32, dy: i32, wheel: i32) {
        let now = self.clock.monotonic_micros();
        let callback = {
            let mut inner = self.inner.lock();
            let sensitivity = inner.sensitivity;
            let qualifies = dx.abs() >= sensitivity || dy.abs() >= sensitivity || wheel != 0 || inner.button_pressed;
            if qualifies {
                inner.action(now)
            } else {
                None
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn notify_button(&self, pressed: bool) {
        let now = self.clock.monotonic_micros();
        let callback = {
            let mut inner = self.inner.lock();
            inner.button_pressed = pressed;
            if pressed {
                inner.action(now)
            } else {
                None
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn notify_keyboard(&self) {
        let now = self.clock.monotonic_micros();
        let callback = self.inner.lock().action(now);
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Current state, with the idle timeout applied.
    pub fn query_state(&self) -> ActivityState {
        let now = self.clock.monotonic_micros();
        let mut inner = self.inner.lock();
        inner.refresh(now);
        inner.state
    }

    pub fn is_active(&self) -> bool {
        self.query_state() == ActivityState::Active
    }

    pub fn suspend(&self) {
        self.inner.lock().state = ActivityState::Suspended;
    }

    pub fn resume(&self) {
        self.inner.lock().state = ActivityState::Idle;
    }

    /// Declares the user idle until the next input. Ignored while suspended.
    ///
    /// `ForcedIdle` is not sticky: the next qualifying input leaves it the
    /// same way it leaves `Idle`, without waiting for [`resume`](Self::resume).
    pub fn force_idle(&self) {
        let mut inner = self.inner.lock();
        if inner.state != ActivityState::Suspended {
            inner.state = ActivityState::ForcedIdle;
            inner.last_action = 0;
        }
    }

    /// Installs the single input listener, replacing any previous one.
    pub fn set_listener<F>(&self, owner: BreakId, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.lock().listener = Some(Listener {
            owner,
            callback: Arc::new(callback),
        });
    }

    /// Removes the listener if `owner` installed it.
    pub fn clear_listener(&self, owner: BreakId) -> bool {
        let mut inner = self.inner.lock();
        let owned = inner.listener.as_ref().is_some_and(|listener| listener.owner == owner);
        if owned {
            inner.listener = None;
        }
        owned
    }

    pub fn listener_owner(&self) -> Option<BreakId> {
        self.inner.lock().listener.as_ref().map(|listener| listener.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::clock::SimulatedTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn detector() -> (Arc<SimulatedTime>, ActivityDetector) {
        let time = SimulatedTime::new(1_700_000_000);
        let detector = ActivityDetector::new(Clock::simulated(time.clone()), Thresholds::default());
        (time, detector)
    }

    #[test]
    fn sustained_input_becomes_active() {
        let (time, detector) = detector();
        assert_eq!(detector.query_state(), ActivityState::Idle);

        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Noise);

        time.advance_millis(500);
        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Noise);

        time.advance_millis(500);
        detector.notify_keyboard();
        assert!(detector.is_active());
    }

    #[test]
    fn long_gap_restarts_noise_window() {
        let (time, detector) = detector();
        detector.notify_keyboard();
        time.advance_millis(9500);
        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Noise);

        time.advance_millis(900);
        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Noise);

        time.advance_millis(100);
        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Active);
    }

    #[test]
    fn active_turns_idle_after_idle_threshold() {
        let (time, detector) = detector();
        detector.notify_keyboard();
        time.advance_secs(1);
        detector.notify_keyboard();
        assert!(detector.is_active());

        time.advance_secs(5);
        assert!(detector.is_active());
        time.advance_millis(1);
        assert_eq!(detector.query_state(), ActivityState::Idle);
    }

    #[test]
    fn zero_activity_threshold_is_immediately_active() {
        let (_time, detector) = detector();
        detector.set_thresholds(Thresholds {
            activity: Duration::ZERO,
            ..Thresholds::default()
        });
        detector.notify_keyboard();
        assert!(detector.is_active());
    }

    #[test]
    fn small_pointer_moves_are_ignored() {
        let (_time, detector) = detector();
        detector.notify_mouse(2, -2, 0);
        assert_eq!(detector.query_state(), ActivityState::Idle);

        detector.notify_mouse(0, 3, 0);
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn wheel_qualifies() {
        let (_time, detector) = detector();
        detector.notify_mouse(0, 0, 1);
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn button_press_qualifies() {
        let (_time, detector) = detector();
        detector.notify_button(false);
        assert_eq!(detector.query_state(), ActivityState::Idle);
        detector.notify_button(true);
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn suspended_ignores_input_until_resume() {
        let (_time, detector) = detector();
        detector.suspend();
        detector.notify_keyboard();
        detector.force_idle();
        assert_eq!(detector.query_state(), ActivityState::Suspended);

        detector.resume();
        assert_eq!(detector.query_state(), ActivityState::Idle);
    }

    #[test]
    fn forced_idle_is_left_on_fresh_input() {
        let (time, detector) = detector();
        detector.notify_keyboard();
        time.advance_secs(1);
        detector.notify_keyboard();
        detector.force_idle();
        assert_eq!(detector.query_state(), ActivityState::ForcedIdle);

        detector.notify_keyboard();
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn listener_runs_outside_the_lock() {
        let (_time, detector) = detector();
        let detector = Arc::new(detector);
        let calls = Arc::new(AtomicUsize::new(0));

        let reentrant = detector.clone();
        let counter = calls.clone();
        detector.set_listener(BreakId::Rest, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            reentrant.clear_listener(BreakId::Rest);
        });
        assert_eq!(detector.listener_owner(), Some(BreakId::Rest));

        detector.notify_keyboard();
        detector.notify_keyboard();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(detector.listener_owner(), None);
    }

    #[test]
    fn only_owner_clears_listener() {
        let (_time, detector) = detector();
        detector.set_listener(BreakId::Micro, || {});
        assert!(!detector.clear_listener(BreakId::Rest));
        assert_eq!(detector.listener_owner(), Some(BreakId::Micro));
        assert!(detector.clear_listener(BreakId::Micro));
    }
}
