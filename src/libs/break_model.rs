//! Prelude and break state machine for a single break.
//!
//! When its timer reaches the limit a break first shows a prelude that
//! escalates over 30 seconds. An idle user slides into the break itself; an
//! active user gets a short grace period (the delayed stage) before the
//! prelude is dismissed and the timer snoozed. Once the configured number of
//! preludes has been ignored the break is shown directly.
//!
//! The model never renders anything. Everything it wants done is queued as
//! [`BreakOutput`] values that the scheduler drains after each call.

use super::activity::ActivityDetector;
use super::event::{BreakEvent, BreakHint, BreakId, BreakOutput, PreludeProgressText, PreludeStage, WindowCommand};
use super::timer::BreakTimer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const PRELUDE_MOVE_OUT: i64 = 4;
const PRELUDE_WARN: i64 = 10;
const PRELUDE_ALERT: i64 = 20;
const PRELUDE_DECIDE: i64 = 30;
const DELAYED_TIMEOUT: i64 = 35;
const PRELUDE_PROGRESS_MAX: i64 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakStage {
    None,
    Prelude,
    Delayed,
    Taking,
    Snoozed,
}

pub struct BreakStateModel {
    id: BreakId,
    detector: Arc<ActivityDetector>,
    stage: BreakStage,
    hint: BreakHint,
    prelude_time: i64,
    prelude_count: i32,
    configured_max_preludes: i32,
    max_preludes: i32,
    forced_break: bool,
    fake_break: bool,
    fake_break_remaining: i64,
    user_abort: bool,
    delayed_abort: Arc<AtomicBool>,
    outputs: Vec<BreakOutput>,
}

impl BreakStateModel {
    pub fn new(id: BreakId, detector: Arc<ActivityDetector>, max_preludes: i32) -> Self {
        Self {
            id,
            detector,
            stage: BreakStage::None,
            hint: BreakHint::NORMAL,
            prelude_time: 0,
            prelude_count: 0,
            configured_max_preludes: max_preludes,
            max_preludes,
            forced_break: false,
            fake_break: false,
            fake_break_remaining: 0,
            user_abort: false,
            delayed_abort: Arc::new(AtomicBool::new(false)),
            outputs: Vec::new(),
        }
    }

    pub fn id(&self) -> BreakId {
        self.id
    }

    pub fn stage(&self) -> BreakStage {
        self.stage
    }

    pub fn is_taking(&self) -> bool {
        self.stage == BreakStage::Taking
    }

    /// A prelude or break is on screen or about to be.
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, BreakStage::None | BreakStage::Snoozed)
    }

    pub fn prelude_count(&self) -> i32 {
        self.prelude_count
    }

    pub fn max_preludes(&self) -> i32 {
        self.max_preludes
    }

    pub fn has_reached_max_preludes(&self) -> bool {
        self.max_preludes >= 0 && self.prelude_count >= self.max_preludes
    }

    pub fn is_fake_break(&self) -> bool {
        self.fake_break
    }

    pub fn is_forced(&self) -> bool {
        self.forced_break
    }

    pub fn hint(&self) -> BreakHint {
        self.hint
    }

    /// Sets the configured prelude budget. Negative means unlimited.
    pub fn set_max_preludes(&mut self, max_preludes: i32) {
        self.configured_max_preludes = max_preludes;
        self.max_preludes = max_preludes;
    }

    /// Borrows the smaller prelude budget of `other` for the next cycle.
    pub fn override_break(&mut self, other: BreakId, other_max_preludes: i32) {
        let mut max_preludes = self.configured_max_preludes;
        if other != self.id && other_max_preludes != -1 && (max_preludes < 0 || other_max_preludes < max_preludes) {
            max_preludes = other_max_preludes;
        }
        self.max_preludes = max_preludes;
    }

    /// Everything queued since the last call, oldest first.
    pub fn take_outputs(&mut self) -> Vec<BreakOutput> {
        std::mem::take(&mut self.outputs)
    }

    pub fn start_break(&mut self, timer: &BreakTimer) {
        if self.stage == BreakStage::Taking {
            return;
        }
        self.hint = BreakHint::NORMAL;
        self.forced_break = false;
        self.fake_break = false;
        self.prelude_time = 0;
        self.user_abort = false;
        self.delayed_abort.store(false, Ordering::SeqCst);

        if self.has_reached_max_preludes() {
            self.goto_stage(BreakStage::Taking, timer);
        } else {
            self.goto_stage(BreakStage::Prelude, timer);
        }
    }

    /// Opens the break window immediately, skipping any prelude.
    pub fn force_start_break(&mut self, hint: BreakHint, timer: &BreakTimer) {
        if self.stage == BreakStage::Taking {
            return;
        }
        self.hint = hint;
        self.forced_break = hint.intersects(BreakHint::USER_INITIATED | BreakHint::NATURAL_BREAK);
        self.fake_break = false;
        self.prelude_time = 0;
        self.user_abort = false;
        self.delayed_abort.store(false, Ordering::SeqCst);

        if timer.is_auto_reset_enabled() {
            let idle = timer.elapsed_idle_time();
            if idle >= timer.auto_reset() || !timer.is_enabled() {
                self.fake_break = true;
                self.fake_break_remaining = timer.auto_reset();
            }
        }

        self.goto_stage(BreakStage::Taking, timer);
    }

    pub fn postpone_break(&mut self, timer: &mut BreakTimer) {
        if self.stage != BreakStage::Taking {
            return;
        }
        self.user_abort = true;
        if !self.forced_break {
            if !self.fake_break {
                timer.snooze();
            }
            self.emit(BreakEvent::BreakPostponed);
        }
        self.stop_break(timer);
    }

    pub fn skip_break(&mut self, timer: &mut BreakTimer) {
        if self.stage != BreakStage::Taking {
            return;
        }
        self.user_abort = true;
        if self.id == BreakId::DailyLimit {
            timer.inhibit_snooze();
        } else {
            timer.reset();
        }
        self.emit(BreakEvent::BreakSkipped);
        self.stop_break(timer);
    }

    /// Dismisses a pending prelude; the timer's snooze brings it back.
    pub fn stop_prelude(&mut self, timer: &BreakTimer) {
        if matches!(self.stage, BreakStage::Prelude | BreakStage::Delayed) {
            self.goto_stage(BreakStage::Snoozed, timer);
        }
    }

    pub fn stop_break(&mut self, timer: &BreakTimer) {
        if self.stage == BreakStage::None {
            return;
        }
        self.hint = BreakHint::NORMAL;
        self.goto_stage(BreakStage::None, timer);
        self.prelude_count = 0;
        self.fake_break = false;
        self.emit(BreakEvent::BreakStop);
    }

    /// Advances the prelude or break by one second.
    pub fn process(&mut self, timer: &BreakTimer, user_active: bool) {
        self.prelude_time += 1;

        match self.stage {
            BreakStage::None | BreakStage::Snoozed => {}
            BreakStage::Delayed => {
                if self.prelude_time > DELAYED_TIMEOUT || self.delayed_abort.load(Ordering::SeqCst) {
                    self.goto_stage(BreakStage::Snoozed, timer);
                } else if !user_active {
                    self.goto_stage(BreakStage::Taking, timer);
                }
            }
            BreakStage::Prelude => {
                self.window(WindowCommand::Progress {
                    value: self.prelude_time,
                    max: PRELUDE_PROGRESS_MAX,
                });
                self.window(WindowCommand::Refresh);

                if !user_active {
                    if self.prelude_time >= PRELUDE_WARN {
                        self.goto_stage(BreakStage::Taking, timer);
                    }
                } else if self.prelude_time >= PRELUDE_DECIDE {
                    if self.max_preludes >= 0 && self.prelude_count > self.max_preludes {
                        self.goto_stage(BreakStage::Taking, timer);
                    } else {
                        self.goto_stage(BreakStage::Delayed, timer);
                    }
                } else if self.prelude_time == PRELUDE_ALERT {
                    self.window(WindowCommand::PreludeStage(PreludeStage::Alert));
                    self.window(WindowCommand::Refresh);
                } else if self.prelude_time == PRELUDE_WARN {
                    self.window(WindowCommand::PreludeStage(PreludeStage::Warn));
                    self.window(WindowCommand::Refresh);
                }

                if self.stage == BreakStage::Prelude && self.prelude_time == PRELUDE_MOVE_OUT {
                    self.window(WindowCommand::PreludeStage(PreludeStage::MoveOut));
                }
            }
            BreakStage::Taking => {
                self.break_window_update(timer);
                if self.stage == BreakStage::Taking {
                    self.window(WindowCommand::Refresh);
                }
            }
        }
    }

    fn goto_stage(&mut self, stage: BreakStage, timer: &BreakTimer) {
        let previous = self.stage;
        debug!(id = %self.id, from = ?previous, to = ?stage, "break stage");

        if previous == BreakStage::Delayed && stage != BreakStage::Delayed {
            self.detector.clear_listener(self.id);
        }

        match stage {
            BreakStage::Delayed => {
                self.delayed_abort.store(false, Ordering::SeqCst);
                let abort = self.delayed_abort.clone();
                self.detector.set_listener(self.id, move || abort.store(true, Ordering::SeqCst));
            }
            BreakStage::None => match previous {
                BreakStage::Prelude | BreakStage::Delayed => self.prelude_window_stop(),
                BreakStage::Taking => self.break_window_stop(timer),
                _ => {}
            },
            BreakStage::Snoozed => self.prelude_window_stop(),
            BreakStage::Prelude => self.prelude_window_start(),
            BreakStage::Taking => self.break_window_start(timer),
        }

        self.stage = stage;
    }

    fn break_window_start(&mut self, timer: &BreakTimer) {
        info!(id = %self.id, forced = self.forced_break, fake = self.fake_break, "showing break");
        self.window(WindowCommand::Hide);
        self.window(WindowCommand::CreateBreak(self.hint));
        self.stage = BreakStage::Taking;
        self.break_window_update(timer);
        self.window(WindowCommand::Show);
        self.window(WindowCommand::Refresh);
        if self.forced_break {
            self.emit(BreakEvent::ShowBreakForced);
        } else {
            self.emit(BreakEvent::ShowBreak);
        }
    }

    fn break_window_update(&mut self, timer: &BreakTimer) {
        let duration = timer.auto_reset();
        let idle = if self.fake_break {
            let idle = duration - self.fake_break_remaining;
            if self.fake_break_remaining <= 0 {
                self.stop_break(timer);
                return;
            }
            self.fake_break_remaining -= 1;
            idle
        } else {
            timer.elapsed_idle_time()
        };
        self.window(WindowCommand::Progress {
            value: idle.min(duration),
            max: duration,
        });
    }

    fn break_window_stop(&mut self, timer: &BreakTimer) {
        self.window(WindowCommand::Hide);
        if !self.fake_break && !self.user_abort && timer.elapsed_idle_time() >= timer.auto_reset() {
            info!(id = %self.id, "break taken");
            self.emit(BreakEvent::BreakTaken);
        }
        self.emit(BreakEvent::BreakIdle);
    }

    fn prelude_window_start(&mut self) {
        self.prelude_count += 1;
        self.prelude_time = 0;
        info!(id = %self.id, count = self.prelude_count, "showing prelude");

        self.window(WindowCommand::Hide);
        self.window(WindowCommand::CreatePrelude);
        self.window(WindowCommand::PreludeStage(PreludeStage::Initial));
        let text = if self.has_reached_max_preludes() {
            PreludeProgressText::BreakIn
        } else {
            PreludeProgressText::DisappearsIn
        };
        self.window(WindowCommand::PreludeProgressText(text));
        self.window(WindowCommand::Progress {
            value: self.prelude_time,
            max: PRELUDE_PROGRESS_MAX,
        });
        self.window(WindowCommand::Show);
        self.window(WindowCommand::Refresh);

        if self.prelude_count == 1 {
            self.emit(BreakEvent::BreakStart);
        }
        self.emit(BreakEvent::ShowPrelude);
    }

    fn prelude_window_stop(&mut self) {
        self.window(WindowCommand::Hide);
        if !self.forced_break {
            self.emit(BreakEvent::BreakIgnored);
        }
        self.emit(BreakEvent::BreakIdle);
    }

    fn emit(&mut self, event: BreakEvent) {
        self.outputs.push(BreakOutput::Event(event));
    }

    fn window(&mut self, command: WindowCommand) {
        self.outputs.push(BreakOutput::Window(command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::activity::{ActivityState, Thresholds};
    use crate::libs::clock::{Clock, SimulatedTime};

    struct Fixture {
        time: Arc<SimulatedTime>,
        detector: Arc<ActivityDetector>,
        timer: BreakTimer,
        model: BreakStateModel,
    }

    impl Fixture {
        fn new(id: BreakId, max_preludes: i32) -> Self {
            let time = SimulatedTime::new(1_700_000_000);
            let clock = Clock::simulated(time.clone());
            let detector = Arc::new(ActivityDetector::new(clock.clone(), Thresholds::default()));
            let mut timer = BreakTimer::new(id.name(), clock);
            timer.set_limit(100);
            timer.set_auto_reset(20);
            timer.set_snooze(50);
            timer.enable();
            let model = BreakStateModel::new(id, detector.clone(), max_preludes);
            Self {
                time,
                detector,
                timer,
                model,
            }
        }

        fn work(&mut self, secs: i64) {
            for _ in 0..secs {
                self.timer.process(ActivityState::Active);
                self.time.advance_secs(1);
            }
        }

        fn step(&mut self, user_active: bool) {
            let state = if user_active { ActivityState::Active } else { ActivityState::Idle };
            self.timer.process(state);
            self.model.process(&self.timer, user_active);
            self.time.advance_secs(1);
        }

        fn events(&mut self) -> Vec<BreakEvent> {
            self.model
                .take_outputs()
                .into_iter()
                .filter_map(|output| match output {
                    BreakOutput::Event(event) => Some(event),
                    BreakOutput::Window(_) => None,
                })
                .collect()
        }
    }

    #[test]
    fn first_start_shows_prelude() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.start_break(&f.timer);
        assert_eq!(f.model.stage(), BreakStage::Prelude);
        assert_eq!(f.model.prelude_count(), 1);
        assert!(f.model.is_active());
        assert_eq!(f.events(), vec![BreakEvent::BreakStart, BreakEvent::ShowPrelude]);
    }

    #[test]
    fn idle_user_slides_into_break() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.work(100);
        f.model.start_break(&f.timer);
        f.events();
        for _ in 0..9 {
            f.step(false);
            assert_eq!(f.model.stage(), BreakStage::Prelude);
        }
        f.step(false);
        assert!(f.model.is_taking());
        assert_eq!(f.events(), vec![BreakEvent::ShowBreak]);
    }

    #[test]
    fn active_user_is_delayed_then_snoozed() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.start_break(&f.timer);
        for _ in 0..29 {
            f.step(true);
        }
        assert_eq!(f.model.stage(), BreakStage::Prelude);
        f.step(true);
        assert_eq!(f.model.stage(), BreakStage::Delayed);
        assert_eq!(f.detector.listener_owner(), Some(BreakId::Micro));

        for _ in 0..5 {
            f.step(true);
            assert_eq!(f.model.stage(), BreakStage::Delayed);
        }
        f.step(true);
        assert_eq!(f.model.stage(), BreakStage::Snoozed);
        assert!(!f.model.is_active());
        assert_eq!(f.detector.listener_owner(), None);
        assert!(f.events().ends_with(&[BreakEvent::BreakIgnored, BreakEvent::BreakIdle]));
    }

    #[test]
    fn input_while_delayed_aborts() {
        let mut f = Fixture::new(BreakId::Rest, 3);
        f.model.start_break(&f.timer);
        for _ in 0..30 {
            f.step(true);
        }
        assert_eq!(f.model.stage(), BreakStage::Delayed);
        f.detector.notify_keyboard();
        f.step(true);
        assert_eq!(f.model.stage(), BreakStage::Snoozed);
    }

    #[test]
    fn exhausted_preludes_go_straight_to_break() {
        let mut f = Fixture::new(BreakId::Micro, 2);
        for cycle in 1..=2 {
            f.model.start_break(&f.timer);
            assert_eq!(f.model.stage(), BreakStage::Prelude);
            assert_eq!(f.model.prelude_count(), cycle);
            while f.model.stage() != BreakStage::Snoozed {
                f.step(true);
            }
        }
        f.events();

        f.model.start_break(&f.timer);
        assert!(f.model.is_taking());
        assert!(f.model.has_reached_max_preludes());
        assert_eq!(f.events(), vec![BreakEvent::ShowBreak]);
    }

    #[test]
    fn stop_break_is_idempotent() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.start_break(&f.timer);
        f.events();

        f.model.stop_break(&f.timer);
        assert_eq!(f.model.stage(), BreakStage::None);
        assert_eq!(f.model.prelude_count(), 0);
        let first = f.events();
        assert_eq!(first.iter().filter(|e| **e == BreakEvent::BreakStop).count(), 1);

        f.model.stop_break(&f.timer);
        assert_eq!(f.model.stage(), BreakStage::None);
        assert!(f.events().is_empty());
    }

    #[test]
    fn postpone_snoozes_timer() {
        let mut f = Fixture::new(BreakId::Micro, 0);
        f.work(110);
        f.model.start_break(&f.timer);
        assert!(f.model.is_taking());
        f.events();

        f.model.postpone_break(&mut f.timer);
        assert_eq!(f.model.stage(), BreakStage::None);
        assert_eq!(f.timer.elapsed_at_last_limit(), 110);
        assert_eq!(
            f.events(),
            vec![BreakEvent::BreakPostponed, BreakEvent::BreakIdle, BreakEvent::BreakStop]
        );
    }

    #[test]
    fn postpone_outside_break_is_noop() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.postpone_break(&mut f.timer);
        f.model.skip_break(&mut f.timer);
        assert_eq!(f.model.stage(), BreakStage::None);
        assert!(f.events().is_empty());
    }

    #[test]
    fn skip_resets_timer() {
        let mut f = Fixture::new(BreakId::Rest, 0);
        f.work(50);
        f.model.start_break(&f.timer);
        f.model.skip_break(&mut f.timer);
        assert_eq!(f.timer.elapsed_time(), 0);
        assert!(f.events().contains(&BreakEvent::BreakSkipped));
    }

    #[test]
    fn skip_daily_limit_inhibits_snooze() {
        let mut f = Fixture::new(BreakId::DailyLimit, 0);
        f.work(120);
        f.model.start_break(&f.timer);
        f.model.skip_break(&mut f.timer);
        assert!(f.timer.is_snooze_inhibited());
        assert_eq!(f.timer.elapsed_time(), 120);
    }

    #[test]
    fn rested_break_is_taken() {
        let mut f = Fixture::new(BreakId::Micro, 0);
        f.work(100);
        f.model.start_break(&f.timer);
        for _ in 0..20 {
            f.step(false);
        }
        f.events();
        f.model.stop_break(&f.timer);
        assert_eq!(
            f.events(),
            vec![BreakEvent::BreakTaken, BreakEvent::BreakIdle, BreakEvent::BreakStop]
        );
    }

    #[test]
    fn forced_break_after_rest_is_fake_and_ends_itself() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.force_start_break(BreakHint::USER_INITIATED, &f.timer);
        assert!(f.model.is_taking());
        assert!(f.model.is_forced());
        assert!(f.model.is_fake_break());
        assert_eq!(f.events(), vec![BreakEvent::ShowBreakForced]);

        for _ in 0..19 {
            f.step(false);
            assert!(f.model.is_taking());
        }
        f.step(false);
        assert_eq!(f.model.stage(), BreakStage::None);
        assert_eq!(f.events(), vec![BreakEvent::BreakIdle, BreakEvent::BreakStop]);
    }

    #[test]
    fn force_while_taking_is_noop() {
        let mut f = Fixture::new(BreakId::Micro, 0);
        f.work(100);
        f.model.start_break(&f.timer);
        f.events();
        f.model.force_start_break(BreakHint::USER_INITIATED, &f.timer);
        assert!(!f.model.is_forced());
        assert!(f.events().is_empty());
    }

    #[test]
    fn override_borrows_smaller_budget() {
        let mut f = Fixture::new(BreakId::Rest, 3);
        f.model.override_break(BreakId::Micro, 1);
        assert_eq!(f.model.max_preludes(), 1);
        f.model.override_break(BreakId::Micro, -1);
        assert_eq!(f.model.max_preludes(), 3);
        f.model.override_break(BreakId::Rest, 0);
        assert_eq!(f.model.max_preludes(), 3);
    }

    #[test]
    fn stop_prelude_snoozes() {
        let mut f = Fixture::new(BreakId::Micro, 3);
        f.model.start_break(&f.timer);
        f.events();
        f.model.stop_prelude(&f.timer);
        assert_eq!(f.model.stage(), BreakStage::Snoozed);
        assert_eq!(f.events(), vec![BreakEvent::BreakIgnored, BreakEvent::BreakIdle]);
    }
}
