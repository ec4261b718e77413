//! Where a timer gets its notion of "the user is active" from.

use super::activity::{ActivityDetector, ActivityState};
use super::event::BreakEvent;
use super::timer::BreakTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStage {
    Idle,
    Active,
    Prelude,
    Taking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivitySource {
    /// The shared input detector.
    Detector,
    /// Mirrors the micro-break timer: active unless it has been reset by rest.
    MicroBreakTimer { forced_idle: bool, suspended: bool },
    /// Reading mode: active from the first input until a break is taken.
    Reading { stage: ReadingStage, suspended: bool },
}

impl ActivitySource {
    pub fn micro_break_timer() -> Self {
        ActivitySource::MicroBreakTimer {
            forced_idle: false,
            suspended: false,
        }
    }

    pub fn reading() -> Self {
        ActivitySource::Reading {
            stage: ReadingStage::Idle,
            suspended: false,
        }
    }

    /// Current activity. `micro_timer` backs the micro-break proxy.
    pub fn state(&mut self, detector: &ActivityDetector, micro_timer: &BreakTimer) -> ActivityState {
        match self {
            ActivitySource::Detector => detector.query_state(),
            ActivitySource::MicroBreakTimer { forced_idle, suspended } => {
                if *suspended {
                    return ActivityState::Idle;
                }
                if *forced_idle {
                    let local = detector.query_state();
                    if matches!(local, ActivityState::Noise | ActivityState::Active) {
                        *forced_idle = false;
                    } else {
                        return ActivityState::Idle;
                    }
                }
                if !micro_timer.is_running() && micro_timer.elapsed_idle_time() >= micro_timer.auto_reset() {
                    ActivityState::Idle
                } else {
                    ActivityState::Active
                }
            }
            ActivitySource::Reading { stage, suspended } => {
                if *suspended {
                    return ActivityState::Idle;
                }
                if *stage == ReadingStage::Idle && detector.is_active() {
                    *stage = ReadingStage::Active;
                }
                match stage {
                    ReadingStage::Active | ReadingStage::Prelude => ActivityState::Active,
                    ReadingStage::Idle | ReadingStage::Taking => ActivityState::Idle,
                }
            }
        }
    }

    pub fn suspend(&mut self) {
        match self {
            ActivitySource::Detector => {}
            ActivitySource::MicroBreakTimer { suspended, .. } | ActivitySource::Reading { suspended, .. } => *suspended = true,
        }
    }

    pub fn resume(&mut self) {
        match self {
            ActivitySource::Detector => {}
            ActivitySource::MicroBreakTimer { suspended, .. } | ActivitySource::Reading { suspended, .. } => *suspended = false,
        }
    }

    pub fn force_idle(&mut self) {
        match self {
            ActivitySource::Detector => {}
            ActivitySource::MicroBreakTimer { forced_idle, .. } => *forced_idle = true,
            ActivitySource::Reading { stage, .. } => {
                if *stage == ReadingStage::Active {
                    *stage = ReadingStage::Idle;
                }
            }
        }
    }

    /// Lets reading mode follow the prelude and break windows.
    pub fn handle_break_event(&mut self, event: BreakEvent) {
        if let ActivitySource::Reading { stage, .. } = self {
            match event {
                BreakEvent::ShowPrelude => *stage = ReadingStage::Prelude,
                BreakEvent::ShowBreak | BreakEvent::ShowBreakForced => *stage = ReadingStage::Taking,
                BreakEvent::BreakIdle => {
                    *stage = match *stage {
                        ReadingStage::Prelude => ReadingStage::Active,
                        _ => ReadingStage::Idle,
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::activity::Thresholds;
    use crate::libs::clock::{Clock, SimulatedTime};
    use std::sync::Arc;

    fn setup() -> (Arc<SimulatedTime>, ActivityDetector, BreakTimer) {
        let time = SimulatedTime::new(1_700_000_000);
        let clock = Clock::simulated(time.clone());
        let detector = ActivityDetector::new(clock.clone(), Thresholds::default());
        let mut timer = BreakTimer::new("micro_pause", clock);
        timer.set_auto_reset(30);
        timer.enable();
        (time, detector, timer)
    }

    fn make_active(time: &SimulatedTime, detector: &ActivityDetector) {
        detector.notify_keyboard();
        time.advance_secs(1);
        detector.notify_keyboard();
    }

    #[test]
    fn micro_timer_proxy_tracks_rest() {
        let (time, detector, mut timer) = setup();
        let mut source = ActivitySource::micro_break_timer();
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);

        timer.process(ActivityState::Active);
        time.advance_secs(5);
        timer.process(ActivityState::Idle);
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);

        time.advance_secs(30);
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);
    }

    #[test]
    fn micro_timer_proxy_stays_idle_when_forced() {
        let (time, detector, mut timer) = setup();
        let mut source = ActivitySource::micro_break_timer();
        timer.process(ActivityState::Active);
        source.force_idle();
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);

        make_active(&time, &detector);
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);
    }

    #[test]
    fn reading_stays_active_until_break() {
        let (time, detector, timer) = setup();
        let mut source = ActivitySource::reading();
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);

        make_active(&time, &detector);
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);

        time.advance_secs(60);
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);

        source.handle_break_event(BreakEvent::ShowPrelude);
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);
        source.handle_break_event(BreakEvent::ShowBreak);
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);
        source.handle_break_event(BreakEvent::BreakIdle);
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);
    }

    #[test]
    fn suspended_sources_report_idle() {
        let (time, detector, timer) = setup();
        let mut source = ActivitySource::reading();
        make_active(&time, &detector);
        source.suspend();
        assert_eq!(source.state(&detector, &timer), ActivityState::Idle);
        source.resume();
        assert_eq!(source.state(&detector, &timer), ActivityState::Active);
    }
}
