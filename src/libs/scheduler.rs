//! The heartbeat scheduler.
//!
//! [`Scheduler`] owns the three break timers and state models, indexed by
//! [`BreakId`]. Once a second [`Scheduler::heartbeat`] samples the activity
//! detector, advances every timer, starts or stops breaks from the timer
//! events and steps every state model. Events queued by the models are
//! forwarded to the statistics, the insist policy and the frontend.
//!
//! Higher breaks outrank lower ones: a micro-pause never starts while a rest
//! break is showing, and a micro-pause that comes due shortly before the
//! rest break is folded into it.

use super::activity::{ActivityDetector, ActivityState};
use super::break_model::BreakStateModel;
use super::clock::Clock;
use super::config::{BreakConfig, Config};
use super::error::StateError;
use super::event::{BreakEvent, BreakFrontend, BreakHint, BreakId, BreakOutput};
use super::modes::{InsistPolicy, ModeChange, ModeDuration, Modes, OperationMode, UsageMode};
use super::source::ActivitySource;
use super::state::StateStore;
use super::statistics::Statistics;
use super::time_pred::ResetPredicate;
use super::timer::{BreakTimer, InsensitiveMode, TimerEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Heartbeats between two state file writes.
pub const SAVE_INTERVAL_TICKS: u64 = 60;

/// Extra seconds a micro-pause may precede the rest break and still be folded into it.
const ADVANCE_MARGIN: i64 = 30;

struct BreakSlot {
    timer: BreakTimer,
    model: BreakStateModel,
    enabled: bool,
    /// The timer follows the micro-break timer instead of the detector.
    uses_micro_activity: bool,
}

pub struct Scheduler {
    clock: Clock,
    detector: Arc<ActivityDetector>,
    breaks: [BreakSlot; 3],
    sources: [ActivitySource; 3],
    /// Source of the shared activity state: the detector, or reading mode.
    shared: ActivitySource,
    monitor_state: ActivityState,
    modes: Modes,
    statistics: Statistics,
    frontend: Box<dyn BreakFrontend>,
    store: Option<StateStore>,
    insist_policy: InsistPolicy,
    active_insist: Option<InsistPolicy>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(config: &Config, detector: Arc<ActivityDetector>, clock: Clock, frontend: Box<dyn BreakFrontend>) -> Self {
        let breaks_config = config.breaks();
        let slot = |id: BreakId| BreakSlot {
            timer: BreakTimer::new(id.name(), clock.clone()),
            model: BreakStateModel::new(id, detector.clone(), breaks_config.get(id).max_preludes),
            enabled: false,
            uses_micro_activity: false,
        };
        let breaks = [slot(BreakId::Micro), slot(BreakId::Rest), slot(BreakId::DailyLimit)];

        let mut scheduler = Self {
            modes: Modes::new(clock.clone()),
            statistics: Statistics::new(clock.real_secs()),
            clock,
            detector,
            breaks,
            sources: [ActivitySource::Detector, ActivitySource::Detector, ActivitySource::Detector],
            shared: ActivitySource::Detector,
            monitor_state: ActivityState::Idle,
            frontend,
            store: None,
            insist_policy: InsistPolicy::default(),
            active_insist: None,
            ticks: 0,
        };
        scheduler.apply_config(config, None);
        scheduler
    }

    /// Persists timer state through `store`.
    pub fn with_state_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Restores the saved timers, then writes a fresh state file.
    pub fn start(&mut self) {
        match self.load_state() {
            Ok(true) => info!("timer state restored"),
            Ok(false) => debug!("no saved timer state"),
            Err(e) => warn!(error = %e, "discarding saved timer state"),
        }
        if let Err(e) = self.save_state() {
            warn!(error = %e, "could not save timer state");
        }
    }

    pub fn shutdown(&mut self) -> Result<(), StateError> {
        info!("scheduler shutting down");
        self.save_state()
    }

    /// One tick of the scheduler. Call once per second.
    pub fn heartbeat(&mut self) {
        if let Some(change) = self.modes.heartbeat() {
            self.on_mode_change(change);
        }

        self.monitor_state = self.shared.state(&self.detector, &self.breaks[BreakId::Micro.index()].timer);
        self.process_timers();

        let user_active = self.monitor_state == ActivityState::Active;
        for id in BreakId::ALL {
            let slot = &mut self.breaks[id.index()];
            slot.model.process(&slot.timer, user_active);
            self.flush(id);
        }

        self.ticks += 1;
        if self.ticks % SAVE_INTERVAL_TICKS == 0 {
            self.update_overdue();
            if let Err(e) = self.save_state() {
                warn!(error = %e, "could not save timer state");
            }
        }
    }

    fn process_timers(&mut self) {
        let mut events = [TimerEvent::None; 3];

        for id in BreakId::ALL {
            self.sync_timer_enabled(id);
        }

        // Timers that follow the micro-break timer go after it.
        for pass in [false, true] {
            for id in BreakId::ALL {
                let i = id.index();
                if self.breaks[i].uses_micro_activity != pass {
                    continue;
                }
                let activity = if matches!(self.sources[i], ActivitySource::Detector) {
                    self.monitor_state
                } else {
                    self.sources[i].state(&self.detector, &self.breaks[BreakId::Micro.index()].timer)
                };
                events[i] = self.breaks[i].timer.process(activity);
            }
        }

        for id in BreakId::ALL.into_iter().rev() {
            let event = events[id.index()];
            if self.breaks[id.index()].enabled {
                self.timer_action(id, event);
            }
            if id == BreakId::DailyLimit && matches!(event, TimerEvent::Reset | TimerEvent::NaturalReset) {
                self.daily_reset();
            }
        }
    }

    fn timer_action(&mut self, id: BreakId, event: TimerEvent) {
        let i = id.index();
        match event {
            TimerEvent::LimitReached => {
                if self.modes.active() != OperationMode::Normal {
                    debug!(id = %id, mode = ?self.modes.active(), "limit reached outside normal mode");
                    return;
                }
                if !self.breaks[i].model.is_active() {
                    self.start_break(id);
                }
            }
            TimerEvent::NaturalReset | TimerEvent::Reset => {
                if event == TimerEvent::NaturalReset {
                    self.statistics.record_natural_reset(id);
                }
                // Also ends a snoozed prelude cycle.
                let slot = &mut self.breaks[i];
                slot.model.stop_break(&slot.timer);
                self.flush(id);
            }
            TimerEvent::None => {}
        }
    }

    /// Starts the prelude of `id` unless an equal or higher break is active.
    ///
    /// A micro-pause that would end within half a minute of the rest break
    /// starts the rest break instead, using the micro-pause's prelude budget.
    pub fn start_break(&mut self, id: BreakId) {
        if self.any_active_from(id) {
            debug!(id = %id, "break outranked");
            return;
        }

        if id == BreakId::Micro && self.breaks[BreakId::Rest.index()].enabled {
            let rest = &self.breaks[BreakId::Rest.index()].timer;
            if let (true, Some(next_limit)) = (rest.is_activity_sensitive(), rest.next_limit_time()) {
                let duration = self.breaks[BreakId::Micro.index()].timer.auto_reset();
                let now = self.clock.monotonic_secs();
                if now + duration + ADVANCE_MARGIN >= next_limit {
                    info!(next_limit, now, "advancing rest break over micro-pause");
                    let micro_max = self.breaks[BreakId::Micro.index()].model.max_preludes();
                    self.breaks[BreakId::Rest.index()].model.override_break(BreakId::Micro, micro_max);
                    self.launch_break(BreakId::Rest, true);
                    self.breaks[BreakId::Rest.index()].timer.snooze();
                    return;
                }
            }
        }

        self.launch_break(id, false);
    }

    fn launch_break(&mut self, id: BreakId, advanced: bool) {
        if self.any_active_from(id) {
            return;
        }
        if id == BreakId::Rest && !advanced {
            let own_max = self.breaks[id.index()].model.max_preludes();
            self.breaks[id.index()].model.override_break(id, own_max);
        }

        for lower in BreakId::ALL.into_iter().filter(|lower| *lower < id) {
            let slot = &mut self.breaks[lower.index()];
            if slot.model.is_active() {
                slot.model.stop_break(&slot.timer);
                self.flush(lower);
            }
        }

        let slot = &mut self.breaks[id.index()];
        slot.model.start_break(&slot.timer);
        self.flush(id);
    }

    fn any_active_from(&self, id: BreakId) -> bool {
        BreakId::ALL
            .into_iter()
            .filter(|other| *other >= id)
            .any(|other| self.breaks[other.index()].model.is_active())
    }

    /// Shows the break window of `id` right away, stopping any other
    /// prelude or break first.
    pub fn force_break(&mut self, id: BreakId, hint: BreakHint) {
        if self.is_taking(id) {
            return;
        }
        for other in BreakId::ALL.into_iter().filter(|other| *other != id) {
            let slot = &mut self.breaks[other.index()];
            if slot.model.is_active() {
                debug!(id = %id, stopped = %other, "forced break replaces active break");
                slot.model.stop_break(&slot.timer);
                self.flush(other);
            }
        }
        let slot = &mut self.breaks[id.index()];
        slot.model.force_start_break(hint, &slot.timer);
        self.flush(id);
    }

    pub fn postpone_break(&mut self, id: BreakId) {
        let slot = &mut self.breaks[id.index()];
        slot.model.postpone_break(&mut slot.timer);
        self.flush(id);
    }

    pub fn skip_break(&mut self, id: BreakId) {
        let slot = &mut self.breaks[id.index()];
        slot.model.skip_break(&mut slot.timer);
        self.flush(id);
    }

    pub fn stop_break(&mut self, id: BreakId) {
        let slot = &mut self.breaks[id.index()];
        slot.model.stop_break(&slot.timer);
        self.flush(id);
    }

    pub fn stop_prelude(&mut self, id: BreakId) {
        let slot = &mut self.breaks[id.index()];
        slot.model.stop_prelude(&slot.timer);
        self.flush(id);
    }

    pub fn stop_all_breaks(&mut self) {
        for id in BreakId::ALL {
            let slot = &mut self.breaks[id.index()];
            if slot.model.is_active() {
                slot.model.stop_break(&slot.timer);
                self.flush(id);
            }
        }
    }

    /// Declares the user idle everywhere until the next input.
    pub fn force_idle(&mut self) {
        self.detector.force_idle();
        self.shared.force_idle();
        for source in self.sources.iter_mut() {
            source.force_idle();
        }
        for slot in self.breaks.iter_mut() {
            slot.timer.force_idle();
        }
    }

    fn force_idle_for(&mut self, id: BreakId) {
        self.detector.force_idle();
        self.sources[id.index()].force_idle();
        for slot in self.breaks.iter_mut() {
            slot.timer.force_idle();
        }
    }

    pub fn set_insist_policy(&mut self, policy: InsistPolicy) {
        if self.active_insist.is_some() && self.insist_policy != policy {
            debug!(from = ?self.insist_policy, to = ?policy, "re-applying insist policy");
            self.defrost();
            self.insist_policy = policy;
            self.freeze();
        } else {
            self.insist_policy = policy;
        }
    }

    pub fn insist_policy(&self) -> InsistPolicy {
        self.insist_policy
    }

    /// Applies the insist policy while a break is on screen.
    fn freeze(&mut self) {
        match self.insist_policy {
            InsistPolicy::Ignore => self.detector.suspend(),
            InsistPolicy::Halt => self.set_freeze_all(true),
            InsistPolicy::Reset => {}
        }
        self.active_insist = Some(self.insist_policy);
    }

    fn defrost(&mut self) {
        match self.active_insist.take() {
            Some(InsistPolicy::Ignore) => {
                if self.modes.active() != OperationMode::Suspended {
                    self.detector.resume();
                }
            }
            Some(InsistPolicy::Halt) => self.set_freeze_all(false),
            _ => {}
        }
    }

    fn set_freeze_all(&mut self, freeze: bool) {
        for slot in self.breaks.iter_mut().filter(|slot| !slot.uses_micro_activity) {
            slot.timer.freeze(freeze);
        }
    }

    fn set_insensitive_mode_all(&mut self, mode: InsensitiveMode) {
        for slot in self.breaks.iter_mut() {
            slot.timer.set_insensitive_mode(mode);
        }
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) {
        if let Some(change) = self.modes.set_operation_mode(mode) {
            self.on_mode_change(change);
        }
    }

    /// Sets a regular mode that returns to normal after `minutes`, or at the
    /// next daily reset when `minutes` is -1.
    pub fn set_operation_mode_for(&mut self, mode: OperationMode, minutes: i64) {
        let duration = match minutes {
            -1 => ModeDuration::UntilTomorrow,
            m if m > 0 => ModeDuration::Minutes(m),
            _ => ModeDuration::Indefinite,
        };
        if let Some(change) = self.modes.set_operation_mode_for(mode, duration) {
            self.on_mode_change(change);
        }
    }

    pub fn set_operation_mode_override(&mut self, mode: OperationMode, id: &str) {
        if let Some(change) = self.modes.set_override(mode, id) {
            self.on_mode_change(change);
        }
    }

    pub fn remove_operation_mode_override(&mut self, id: &str) {
        if let Some(change) = self.modes.remove_override(id) {
            self.on_mode_change(change);
        }
    }

    fn on_mode_change(&mut self, change: ModeChange) {
        info!(from = ?change.previous, to = ?change.current, "operation mode changed");
        if change.current == OperationMode::Suspended {
            self.force_idle();
            self.detector.suspend();
            self.shared.suspend();
            for source in self.sources.iter_mut() {
                source.suspend();
            }
            self.stop_all_breaks();
            for slot in self.breaks.iter_mut().filter(|slot| slot.enabled) {
                slot.timer.set_insensitive_mode(InsensitiveMode::IdleAlways);
            }
        } else if change.previous == OperationMode::Suspended {
            self.stop_all_breaks();
            self.set_insensitive_mode_all(InsensitiveMode::IdleOnLimitReached);
            self.detector.resume();
            self.shared.resume();
            for source in self.sources.iter_mut() {
                source.resume();
            }
        }
        if change.current == OperationMode::Quiet {
            self.stop_all_breaks();
        }
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.modes.active()
    }

    pub fn regular_operation_mode(&self) -> OperationMode {
        self.modes.regular()
    }

    pub fn set_usage_mode(&mut self, usage: UsageMode) {
        if !self.modes.set_usage(usage) {
            return;
        }
        info!(usage = ?usage, "usage mode changed");
        self.shared = match usage {
            UsageMode::Reading => ActivitySource::reading(),
            UsageMode::Normal => ActivitySource::Detector,
        };
        if self.modes.active() == OperationMode::Suspended {
            self.shared.suspend();
        }
    }

    pub fn usage_mode(&self) -> UsageMode {
        self.modes.usage()
    }

    /// Applies `config`. With a changed key, only the settings under that
    /// key are touched; `None` applies everything.
    pub fn apply_config(&mut self, config: &Config, changed: Option<&str>) {
        let affects = |prefix: &str| changed.map_or(true, |key| key.starts_with(prefix));

        if affects("monitor") {
            self.detector.set_thresholds(config.monitor().thresholds());
        }

        let breaks = config.breaks();
        for id in BreakId::ALL {
            let break_config = breaks.get(id);
            if affects(&format!("timers/{}", id.name())) {
                self.configure_timer(id, break_config);
            }
            if affects(&format!("breaks/{}", id.name())) {
                self.configure_break(id, break_config);
            }
        }

        let general = config.general();
        if affects("general/operation-mode") {
            self.set_operation_mode(general.operation_mode);
        }
        if affects("general/usage-mode") {
            self.set_usage_mode(general.usage_mode);
        }
        if affects("general/insist-policy") {
            self.set_insist_policy(general.insist_policy);
        }
    }

    fn configure_timer(&mut self, id: BreakId, config: &BreakConfig) {
        let predicate = match config.reset_pred.trim() {
            "" => None,
            rule => match rule.parse::<ResetPredicate>() {
                Ok(predicate) => Some(predicate),
                Err(e) => {
                    warn!(id = %id, rule, error = %e, "ignoring reset rule");
                    None
                }
            },
        };

        let slot = &mut self.breaks[id.index()];
        slot.timer.set_limit(config.limit);
        slot.timer.set_auto_reset(config.auto_reset);
        slot.timer.set_auto_reset_predicate(predicate);
        slot.timer.set_snooze(config.snooze);

        if id == BreakId::DailyLimit {
            slot.uses_micro_activity = config.use_microbreak_activity;
            self.sources[id.index()] = if config.use_microbreak_activity {
                ActivitySource::micro_break_timer()
            } else {
                ActivitySource::Detector
            };
        }
        debug!(id = %id, limit = config.limit, auto_reset = config.auto_reset, "timer configured");
    }

    fn configure_break(&mut self, id: BreakId, config: &BreakConfig) {
        let slot = &mut self.breaks[id.index()];
        slot.enabled = config.enabled;
        slot.model.set_max_preludes(config.max_preludes);
        if !config.enabled {
            slot.model.stop_break(&slot.timer);
            self.flush(id);
        }
        self.sync_timer_enabled(id);
    }

    /// Matches the timer to the break's enabled flag. A disabled daily limit
    /// keeps counting; only its limit is switched off.
    fn sync_timer_enabled(&mut self, id: BreakId) {
        let slot = &mut self.breaks[id.index()];
        match (slot.enabled, id) {
            (true, BreakId::DailyLimit) => {
                slot.timer.enable();
                let has_limit = slot.timer.limit() > 0;
                if slot.timer.is_limit_enabled() != has_limit {
                    slot.timer.set_limit_enabled(has_limit);
                }
            }
            (true, _) => slot.timer.enable(),
            (false, BreakId::DailyLimit) => {
                // Usage is still counted for the reset rule and statistics.
                slot.timer.enable();
                if slot.timer.is_limit_enabled() {
                    slot.timer.set_limit_enabled(false);
                }
            }
            (false, _) => slot.timer.disable(),
        }
    }

    fn daily_reset(&mut self) {
        info!("daily reset");
        self.update_overdue();
        for slot in self.breaks.iter_mut() {
            slot.timer.daily_reset();
        }
        self.statistics.rotate(self.clock.real_secs());
        if let Some(change) = self.modes.daily_reset() {
            self.on_mode_change(change);
        }
        if let Err(e) = self.save_state() {
            warn!(error = %e, "could not save timer state");
        }
    }

    fn update_overdue(&mut self) {
        for id in BreakId::ALL {
            let overdue = self.breaks[id.index()].timer.total_overdue_time();
            self.statistics.set_overdue(id, overdue);
        }
    }

    /// Forwards everything the model of `id` queued.
    fn flush(&mut self, id: BreakId) {
        let outputs = self.breaks[id.index()].model.take_outputs();
        for output in outputs {
            match output {
                BreakOutput::Window(command) => self.frontend.window(id, command),
                BreakOutput::Event(event) => {
                    self.statistics.record(id, event);
                    self.on_break_event(id, event);
                    self.frontend.break_event(id, event);
                }
            }
        }
    }

    fn on_break_event(&mut self, id: BreakId, event: BreakEvent) {
        if self.modes.usage() == UsageMode::Reading {
            self.shared.handle_break_event(event);
        }

        match event {
            BreakEvent::ShowPrelude => self.set_insensitive_mode_all(InsensitiveMode::FollowIdle),
            BreakEvent::ShowBreak | BreakEvent::ShowBreakForced => {
                self.set_insensitive_mode_all(InsensitiveMode::FollowIdle);
                self.force_idle_for(id);
                self.breaks[id.index()].timer.stop();
                self.freeze();
            }
            BreakEvent::BreakIdle => {
                self.set_insensitive_mode_all(InsensitiveMode::IdleOnLimitReached);
                self.defrost();
                if id == BreakId::Micro && self.modes.usage() == UsageMode::Reading {
                    for slot in self.breaks.iter_mut() {
                        slot.timer.force_active();
                    }
                }
            }
            _ => {}
        }
    }

    pub fn save_state(&mut self) -> Result<(), StateError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let lines: Vec<String> = self.breaks.iter().map(|slot| slot.timer.serialize_state()).collect();
        store.write(self.clock.real_secs(), &lines)?;
        debug!(path = %store.path().display(), "timer state saved");
        Ok(())
    }

    /// Restores the timers from the state file. Returns whether a file was
    /// found. A damaged file changes nothing.
    pub fn load_state(&mut self) -> Result<bool, StateError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some(saved) = store.read()? else {
            return Ok(false);
        };
        for (name, snapshot) in &saved.timers {
            match BreakId::from_name(name) {
                Some(id) => self.breaks[id.index()].timer.restore(snapshot),
                None => debug!(timer = %name, "ignoring unknown timer in state file"),
            }
        }
        Ok(true)
    }

    pub fn timer(&self, id: BreakId) -> &BreakTimer {
        &self.breaks[id.index()].timer
    }

    pub fn timer_mut(&mut self, id: BreakId) -> &mut BreakTimer {
        &mut self.breaks[id.index()].timer
    }

    pub fn model(&self, id: BreakId) -> &BreakStateModel {
        &self.breaks[id.index()].model
    }

    pub fn is_enabled(&self, id: BreakId) -> bool {
        self.breaks[id.index()].enabled
    }

    pub fn is_active(&self, id: BreakId) -> bool {
        self.breaks[id.index()].model.is_active()
    }

    pub fn is_taking(&self, id: BreakId) -> bool {
        self.breaks[id.index()].model.is_taking()
    }

    pub fn elapsed_time(&self, id: BreakId) -> i64 {
        self.timer(id).elapsed_time()
    }

    pub fn elapsed_idle_time(&self, id: BreakId) -> i64 {
        self.timer(id).elapsed_idle_time()
    }

    pub fn limit(&self, id: BreakId) -> i64 {
        self.timer(id).limit()
    }

    pub fn auto_reset(&self, id: BreakId) -> i64 {
        self.timer(id).auto_reset()
    }

    pub fn total_overdue_time(&self, id: BreakId) -> i64 {
        self.timer(id).total_overdue_time()
    }

    pub fn is_user_active(&self) -> bool {
        self.monitor_state == ActivityState::Active
    }

    pub fn detector(&self) -> &Arc<ActivityDetector> {
        &self.detector
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::break_model::BreakStage;
    use crate::libs::clock::SimulatedTime;
    use crate::libs::config::MonitorConfig;
    use crate::libs::event::{NullFrontend, WindowCommand};
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<(BreakId, BreakEvent)>>>,
    }

    impl BreakFrontend for Recorder {
        fn window(&mut self, _id: BreakId, _command: WindowCommand) {}

        fn break_event(&mut self, id: BreakId, event: BreakEvent) {
            self.events.lock().push((id, event));
        }
    }

    struct Rig {
        time: Arc<SimulatedTime>,
        scheduler: Scheduler,
        events: Arc<Mutex<Vec<(BreakId, BreakEvent)>>>,
    }

    fn config(micro: (i64, i64), rest: (i64, i64)) -> Config {
        let mut config = Config::defaults();
        // Input counts as activity right away.
        config.monitor = Some(MonitorConfig {
            activity: 0,
            ..MonitorConfig::default()
        });
        let breaks = config.breaks.as_mut().unwrap();
        breaks.micro_pause.limit = micro.0;
        breaks.micro_pause.auto_reset = micro.1;
        breaks.rest_break.limit = rest.0;
        breaks.rest_break.auto_reset = rest.1;
        breaks.daily_limit.enabled = false;
        config
    }

    impl Rig {
        fn new(config: &Config) -> Self {
            let time = SimulatedTime::new(1_700_000_000);
            let clock = Clock::simulated(time.clone());
            let detector = Arc::new(ActivityDetector::new(clock.clone(), config.monitor().thresholds()));
            let recorder = Recorder::default();
            let events = recorder.events.clone();
            let scheduler = Scheduler::new(config, detector, clock, Box::new(recorder));
            Self { time, scheduler, events }
        }

        fn tick(&mut self, active: bool) {
            if active {
                self.scheduler.detector().notify_keyboard();
            }
            self.scheduler.heartbeat();
            self.time.advance_secs(1);
        }

        fn saw(&self, id: BreakId, event: BreakEvent) -> bool {
            self.events.lock().contains(&(id, event))
        }
    }

    #[test]
    fn limit_starts_prelude() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        for _ in 0..10 {
            rig.tick(true);
        }
        assert!(!rig.scheduler.is_active(BreakId::Micro));
        rig.tick(true);
        assert_eq!(rig.scheduler.model(BreakId::Micro).stage(), BreakStage::Prelude);
        assert!(rig.saw(BreakId::Micro, BreakEvent::BreakStart));
        assert_eq!(rig.scheduler.statistics().counters(BreakId::Micro).prompted, 1);
    }

    #[test]
    fn micro_pause_is_folded_into_close_rest_break() {
        let mut rig = Rig::new(&config((10, 180), (200, 600)));
        for _ in 0..=10 {
            rig.tick(true);
        }
        let micro = rig.scheduler.model(BreakId::Micro);
        assert_eq!(micro.stage(), BreakStage::None);
        assert_eq!(micro.prelude_count(), 0);
        assert_eq!(rig.scheduler.model(BreakId::Rest).stage(), BreakStage::Prelude);
        assert_eq!(rig.scheduler.timer(BreakId::Rest).elapsed_at_last_limit(), 10);
    }

    #[test]
    fn distant_rest_break_is_left_alone() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        for _ in 0..=10 {
            rig.tick(true);
        }
        assert!(rig.scheduler.is_active(BreakId::Micro));
        assert!(!rig.scheduler.is_active(BreakId::Rest));
    }

    #[test]
    fn higher_break_blocks_lower() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        rig.scheduler.force_break(BreakId::Rest, BreakHint::USER_INITIATED);
        assert!(rig.scheduler.is_taking(BreakId::Rest));
        rig.scheduler.start_break(BreakId::Micro);
        assert!(!rig.scheduler.is_active(BreakId::Micro));
    }

    #[test]
    fn rest_break_stops_active_micro_pause() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        rig.scheduler.start_break(BreakId::Micro);
        assert!(rig.scheduler.is_active(BreakId::Micro));
        rig.scheduler.start_break(BreakId::Rest);
        assert!(!rig.scheduler.is_active(BreakId::Micro));
        assert!(rig.scheduler.is_active(BreakId::Rest));
        assert!(rig.saw(BreakId::Micro, BreakEvent::BreakStop));
    }

    #[test]
    fn halt_freezes_timers_during_break() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        for _ in 0..5 {
            rig.tick(true);
        }
        rig.scheduler.force_break(BreakId::Micro, BreakHint::USER_INITIATED);
        assert!(rig.scheduler.timer(BreakId::Rest).is_frozen());

        let rest_elapsed = rig.scheduler.elapsed_time(BreakId::Rest);
        for _ in 0..3 {
            rig.tick(true);
        }
        assert_eq!(rig.scheduler.elapsed_time(BreakId::Rest), rest_elapsed);

        rig.scheduler.stop_break(BreakId::Micro);
        assert!(!rig.scheduler.timer(BreakId::Rest).is_frozen());
    }

    #[test]
    fn ignore_policy_suspends_detector() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        rig.scheduler.set_insist_policy(InsistPolicy::Ignore);
        rig.scheduler.force_break(BreakId::Micro, BreakHint::USER_INITIATED);
        assert_eq!(rig.scheduler.detector().query_state(), ActivityState::Suspended);

        rig.scheduler.set_insist_policy(InsistPolicy::Halt);
        assert_ne!(rig.scheduler.detector().query_state(), ActivityState::Suspended);
        assert!(rig.scheduler.timer(BreakId::Rest).is_frozen());

        rig.scheduler.stop_break(BreakId::Micro);
        assert!(!rig.scheduler.timer(BreakId::Rest).is_frozen());
    }

    #[test]
    fn suspended_mode_stops_breaks_and_counting() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        rig.scheduler.start_break(BreakId::Micro);
        rig.scheduler.set_operation_mode(OperationMode::Suspended);
        assert!(!rig.scheduler.is_active(BreakId::Micro));
        assert_eq!(rig.scheduler.detector().query_state(), ActivityState::Suspended);

        for _ in 0..20 {
            rig.tick(true);
        }
        assert_eq!(rig.scheduler.elapsed_time(BreakId::Micro), 0);

        rig.scheduler.set_operation_mode(OperationMode::Normal);
        assert_eq!(rig.scheduler.detector().query_state(), ActivityState::Idle);
    }

    #[test]
    fn quiet_mode_suppresses_new_breaks() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        rig.scheduler.set_operation_mode_override(OperationMode::Quiet, "presentation");
        for _ in 0..15 {
            rig.tick(true);
        }
        assert!(!rig.scheduler.is_active(BreakId::Micro));
        assert!(rig.scheduler.elapsed_time(BreakId::Micro) > 10);

        rig.scheduler.remove_operation_mode_override("presentation");
        assert_eq!(rig.scheduler.operation_mode(), OperationMode::Normal);
    }

    #[test]
    fn disabling_a_break_through_config() {
        let mut config = config((10, 5), (3000, 600));
        let mut rig = Rig::new(&config);
        rig.scheduler.start_break(BreakId::Micro);

        config.breaks.as_mut().unwrap().micro_pause.enabled = false;
        rig.scheduler.apply_config(&config, Some("breaks/micro_pause/enabled"));
        assert!(!rig.scheduler.is_enabled(BreakId::Micro));
        assert!(!rig.scheduler.is_active(BreakId::Micro));
        assert!(!rig.scheduler.timer(BreakId::Micro).is_enabled());
        assert!(rig.scheduler.is_enabled(BreakId::Rest));
    }

    #[test]
    fn forced_break_replaces_the_one_on_screen() {
        let mut config = config((100, 20), (3000, 600));
        config.breaks.as_mut().unwrap().daily_limit.enabled = true;
        let mut rig = Rig::new(&config);
        rig.tick(true);

        rig.scheduler.force_break(BreakId::Rest, BreakHint::USER_INITIATED);
        rig.scheduler.force_break(BreakId::Micro, BreakHint::USER_INITIATED);
        let taking: Vec<_> = BreakId::ALL.into_iter().filter(|id| rig.scheduler.is_taking(*id)).collect();
        assert_eq!(taking, vec![BreakId::Micro]);
        assert!(rig.saw(BreakId::Rest, BreakEvent::BreakStop));

        rig.scheduler.force_break(BreakId::DailyLimit, BreakHint::USER_INITIATED);
        let taking: Vec<_> = BreakId::ALL.into_iter().filter(|id| rig.scheduler.is_taking(*id)).collect();
        assert_eq!(taking, vec![BreakId::DailyLimit]);
        assert!(!rig.scheduler.is_active(BreakId::Micro));
    }

    #[test]
    fn reset_clears_a_snoozed_prelude_cycle() {
        let mut rig = Rig::new(&config((10, 5), (3000, 600)));
        for _ in 0..11 {
            rig.tick(true);
        }
        rig.scheduler.stop_prelude(BreakId::Micro);
        assert_eq!(rig.scheduler.model(BreakId::Micro).stage(), BreakStage::Snoozed);
        assert_eq!(rig.scheduler.model(BreakId::Micro).prelude_count(), 1);
        assert!(!rig.saw(BreakId::Micro, BreakEvent::BreakStop));

        for _ in 0..20 {
            rig.tick(false);
        }
        assert_eq!(rig.scheduler.elapsed_time(BreakId::Micro), 0);
        assert_eq!(rig.scheduler.model(BreakId::Micro).stage(), BreakStage::None);
        assert_eq!(rig.scheduler.model(BreakId::Micro).prelude_count(), 0);
        assert!(rig.saw(BreakId::Micro, BreakEvent::BreakStop));
    }

    #[test]
    fn bad_reset_rule_keeps_interval_reset() {
        let mut config = config((10, 5), (3000, 600));
        config.breaks.as_mut().unwrap().rest_break.reset_pred = "fortnight/4:00".to_string();
        let rig = Rig::new(&config);
        assert_eq!(rig.scheduler.timer(BreakId::Rest).reset_predicate(), None);
        assert_eq!(rig.scheduler.auto_reset(BreakId::Rest), 600);
    }

    #[test]
    fn null_frontend_is_enough() {
        let time = SimulatedTime::new(1_700_000_000);
        let clock = Clock::simulated(time);
        let detector = Arc::new(ActivityDetector::new(clock.clone(), Default::default()));
        let mut scheduler = Scheduler::new(&Config::default(), detector, clock, Box::new(NullFrontend));
        scheduler.heartbeat();
        assert!(scheduler.is_enabled(BreakId::DailyLimit));
        assert!(scheduler.save_state().is_ok());
    }
}
