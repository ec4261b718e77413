//! Global input hook feeding the activity detector.
//!
//! `rdev::listen` blocks for the lifetime of the hook, so it runs on its own
//! thread and is restarted after a second whenever it fails.

use super::activity::ActivityDetector;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error};
use rdev::{listen, Event, EventType};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Translates raw input events into detector notifications.
pub struct InputMonitor {
    detector: Arc<ActivityDetector>,
    last_position: Option<(f64, f64)>,
}

impl InputMonitor {
    pub fn new(detector: Arc<ActivityDetector>) -> Self {
        Self {
            detector,
            last_position: None,
        }
    }

    pub fn handle_event(&mut self, event: &EventType) {
        match *event {
            EventType::KeyPress(_) => self.detector.notify_keyboard(),
            EventType::KeyRelease(_) => {}
            EventType::ButtonPress(_) => self.detector.notify_button(true),
            EventType::ButtonRelease(_) => self.detector.notify_button(false),
            EventType::MouseMove { x, y } => {
                // The first position only sets the reference point.
                if let Some((last_x, last_y)) = self.last_position.replace((x, y)) {
                    self.detector.notify_mouse((x - last_x) as i32, (y - last_y) as i32, 0);
                }
            }
            EventType::Wheel { delta_x, delta_y } => {
                let wheel = if delta_y != 0 { delta_y } else { delta_x };
                self.detector.notify_mouse(0, 0, wheel.signum() as i32);
            }
        }
    }

    /// Starts listening on a background thread.
    pub fn spawn(detector: Arc<ActivityDetector>) -> JoinHandle<()> {
        thread::spawn(move || loop {
            let mut monitor = InputMonitor::new(detector.clone());
            msg_debug!(Message::MonitorStarted);
            match listen(move |event: Event| monitor.handle_event(&event.event_type)) {
                Ok(()) => break,
                Err(e) => {
                    msg_error!(Message::ErrorInRdevListener(format!("{:?}", e)));
                    thread::sleep(RETRY_DELAY);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::activity::{ActivityState, Thresholds};
    use crate::libs::clock::{Clock, SimulatedTime};
    use rdev::{Button, Key};

    fn monitor() -> (Arc<SimulatedTime>, Arc<ActivityDetector>, InputMonitor) {
        let time = SimulatedTime::new(1_700_000_000);
        let detector = Arc::new(ActivityDetector::new(Clock::simulated(time.clone()), Thresholds::default()));
        let monitor = InputMonitor::new(detector.clone());
        (time, detector, monitor)
    }

    #[test]
    fn key_press_counts_as_input() {
        let (_time, detector, mut monitor) = monitor();
        monitor.handle_event(&EventType::KeyRelease(Key::KeyA));
        assert_eq!(detector.query_state(), ActivityState::Idle);
        monitor.handle_event(&EventType::KeyPress(Key::KeyA));
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn small_pointer_moves_are_ignored() {
        let (_time, detector, mut monitor) = monitor();
        monitor.handle_event(&EventType::MouseMove { x: 100.0, y: 100.0 });
        monitor.handle_event(&EventType::MouseMove { x: 101.0, y: 102.0 });
        assert_eq!(detector.query_state(), ActivityState::Idle);
        monitor.handle_event(&EventType::MouseMove { x: 110.0, y: 102.0 });
        assert_eq!(detector.query_state(), ActivityState::Noise);
    }

    #[test]
    fn drag_counts_while_button_held() {
        let (time, detector, mut monitor) = monitor();
        monitor.handle_event(&EventType::ButtonPress(Button::Left));
        time.advance_secs(2);
        monitor.handle_event(&EventType::MouseMove { x: 0.0, y: 0.0 });
        monitor.handle_event(&EventType::MouseMove { x: 1.0, y: 0.0 });
        assert_eq!(detector.query_state(), ActivityState::Active);

        monitor.handle_event(&EventType::ButtonRelease(Button::Left));
        monitor.handle_event(&EventType::Wheel { delta_x: 0, delta_y: -1 });
        assert_eq!(detector.query_state(), ActivityState::Active);
    }
}
