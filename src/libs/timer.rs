//! Per-break countdown timer.
//!
//! A [`BreakTimer`] accrues active time while the user works and idle time
//! while they rest. It reports [`TimerEvent::LimitReached`] when the active
//! time hits the limit (and again every snooze interval after that), and a
//! reset once the user has rested for the auto-reset interval or a
//! wall-clock [`ResetPredicate`] comes due.
//!
//! All interval arithmetic is in whole seconds on the monotonic clock. The
//! `next_*` fields are caches derived from the other fields; every mutation
//! recomputes them through the `compute_*` helpers.

use super::activity::ActivityState;
use super::clock::Clock;
use super::error::StateError;
use super::time_pred::ResetPredicate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    None,
    LimitReached,
    /// The timer was reset while over its limit, or by a reset rule.
    Reset,
    /// The user rested long enough before the limit was exceeded.
    NaturalReset,
}

/// How an activity-insensitive timer reacts to the user's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsensitiveMode {
    /// Follow the user like a sensitive timer.
    FollowIdle,
    /// Once running, keep running until the limit or a reset.
    #[default]
    IdleOnLimitReached,
    /// Never accrue active time.
    IdleAlways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Invalid,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsensitiveState {
    Unknown,
    Idle,
    Active,
}

#[derive(Debug)]
pub struct BreakTimer {
    id: String,
    clock: Clock,

    enabled: bool,
    frozen: bool,
    state: RunState,

    limit_enabled: bool,
    limit: i64,
    auto_reset_enabled: bool,
    auto_reset: i64,
    reset_predicate: Option<ResetPredicate>,
    snooze: i64,
    snooze_inhibited: bool,

    activity_sensitive: bool,
    insensitive_mode: InsensitiveMode,
    insensitive_state: InsensitiveState,

    elapsed: i64,
    elapsed_idle: i64,
    elapsed_at_last_limit: i64,
    total_overdue: i64,

    last_start: Option<i64>,
    last_stop: Option<i64>,
    last_reset: Option<i64>,
    /// Wall-clock time of the last rule-based reset.
    last_pred_reset: Option<i64>,

    next_limit: Option<i64>,
    next_reset: Option<i64>,
    /// Wall-clock time at which the reset rule fires next.
    next_pred_reset: Option<i64>,
}

impl BreakTimer {
    pub fn new(id: impl Into<String>, clock: Clock) -> Self {
        Self {
            id: id.into(),
            clock,
            enabled: false,
            frozen: false,
            state: RunState::Invalid,
            limit_enabled: true,
            limit: 600,
            auto_reset_enabled: true,
            auto_reset: 120,
            reset_predicate: None,
            snooze: 60,
            snooze_inhibited: false,
            activity_sensitive: true,
            insensitive_mode: InsensitiveMode::default(),
            insensitive_state: InsensitiveState::Unknown,
            elapsed: 0,
            elapsed_idle: 0,
            elapsed_at_last_limit: 0,
            total_overdue: 0,
            last_start: None,
            last_stop: None,
            last_reset: None,
            last_pred_reset: None,
            next_limit: None,
            next_reset: None,
            next_pred_reset: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.snooze_inhibited = false;
        self.stop();

        // A fresh timer counts as fully rested.
        if self.is_auto_reset_enabled() && self.elapsed_time() == 0 {
            self.elapsed_idle = self.auto_reset;
        }
        if self.is_limit_enabled() && self.elapsed_time() >= self.limit {
            self.elapsed_at_last_limit = 0;
            self.compute_next_limit();
        }
        self.compute_next_reset();
        self.compute_next_pred_reset();
    }

    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.stop();
        self.enabled = false;
        self.last_start = None;
        self.last_stop = None;
        self.last_reset = None;
        self.next_limit = None;
        self.next_reset = None;
        self.state = RunState::Invalid;
    }

    pub fn start(&mut self) {
        if self.state == RunState::Running {
            return;
        }
        let now = self.clock.monotonic_secs();
        if self.frozen {
            if let Some(stop) = self.last_stop {
                self.elapsed_idle += now - stop;
            }
            self.last_start = None;
        } else {
            self.last_start = Some(now);
            self.elapsed_idle = 0;
        }
        self.last_stop = None;
        self.next_reset = None;
        self.state = RunState::Running;
        self.compute_next_limit();
    }

    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        let now = self.clock.monotonic_secs();
        self.last_stop = Some(now);
        if let Some(start) = self.last_start.take() {
            self.elapsed += now - start;
        }
        self.next_limit = None;
        self.state = RunState::Stopped;
        self.compute_next_reset();
    }

    /// Starts a new work interval. Overdue time is banked before clearing.
    pub fn reset(&mut self) {
        let now = self.clock.monotonic_secs();
        let elapsed = self.elapsed_time();
        if self.is_limit_enabled() && elapsed > self.limit {
            self.total_overdue += elapsed - self.limit;
        }

        self.elapsed = 0;
        self.elapsed_at_last_limit = 0;
        self.last_reset = Some(now);
        self.snooze_inhibited = false;
        self.next_reset = None;

        if self.state == RunState::Running {
            self.last_start = if self.frozen { None } else { Some(now) };
            self.last_stop = None;
            self.elapsed_idle = 0;
            self.compute_next_limit();
        } else {
            self.last_start = None;
            self.next_limit = None;
            if self.is_auto_reset_enabled() {
                self.elapsed_idle = self.auto_reset;
                self.last_stop = Some(now);
            }
        }

        self.compute_next_pred_reset();
    }

    /// Postpones the next limit notification by the snooze interval.
    pub fn snooze(&mut self) {
        if self.enabled {
            self.next_limit = None;
            self.elapsed_at_last_limit = self.elapsed_time();
            self.compute_next_limit();
        }
        if !self.activity_sensitive {
            self.insensitive_state = InsensitiveState::Active;
        }
    }

    /// Stops repeat notifications until the next reset.
    pub fn inhibit_snooze(&mut self) {
        self.snooze_inhibited = true;
        self.compute_next_limit();
    }

    pub fn freeze(&mut self, freeze: bool) {
        if !self.enabled || !self.activity_sensitive {
            return;
        }
        let now = self.clock.monotonic_secs();
        if freeze && !self.frozen {
            if self.state == RunState::Running {
                if let Some(start) = self.last_start.take() {
                    self.elapsed += now - start;
                }
            }
        } else if !freeze && self.frozen && self.state == RunState::Running {
            self.last_start = Some(now);
            self.elapsed_idle = 0;
        }
        self.frozen = freeze;
        self.compute_next_limit();
    }

    pub fn force_idle(&mut self) {
        if !self.activity_sensitive {
            self.insensitive_state = InsensitiveState::Idle;
        }
    }

    pub fn force_active(&mut self) {
        if !self.activity_sensitive {
            self.insensitive_state = InsensitiveState::Active;
        }
    }

    /// Clears the overdue accumulator. Called once a day.
    pub fn daily_reset(&mut self) {
        self.total_overdue = 0;
    }

    /// Advances the timer for one heartbeat given the user's activity.
    pub fn process(&mut self, activity: ActivityState) -> TimerEvent {
        let mut active = activity == ActivityState::Active;

        if !self.activity_sensitive {
            if self.insensitive_state != InsensitiveState::Unknown {
                match self.insensitive_mode {
                    InsensitiveMode::IdleAlways => active = false,
                    InsensitiveMode::IdleOnLimitReached if self.insensitive_state == InsensitiveState::Active => active = true,
                    _ => {}
                }
            }
            self.insensitive_state = if active {
                InsensitiveState::Active
            } else {
                InsensitiveState::Idle
            };
        }

        if self.enabled {
            if active && self.state != RunState::Running {
                self.start();
            } else if !active && self.state == RunState::Running {
                self.stop();
            }
        }

        let now = self.clock.monotonic_secs();
        let real_now = self.clock.real_secs();

        if self.next_pred_reset.is_some_and(|next| real_now >= next) {
            debug!(timer = %self.id, "reset rule fired");
            self.reset();
            self.last_pred_reset = Some(real_now);
            self.compute_next_pred_reset();
            if !self.activity_sensitive {
                self.insensitive_state = InsensitiveState::Idle;
                self.stop();
            }
            return TimerEvent::Reset;
        }

        if self.next_limit.is_some_and(|next| now >= next) {
            debug!(timer = %self.id, elapsed = self.elapsed_time(), "limit reached");
            self.next_limit = None;
            self.elapsed_at_last_limit = self.elapsed_time();
            self.compute_next_limit();
            if !self.activity_sensitive {
                self.insensitive_state = InsensitiveState::Idle;
            }
            return TimerEvent::LimitReached;
        }

        if self.next_reset.is_some_and(|next| now >= next) {
            let natural = self.is_limit_enabled() && self.limit >= self.elapsed_time();
            debug!(timer = %self.id, natural, "auto reset");
            self.next_reset = None;
            self.reset();
            if !self.activity_sensitive {
                self.insensitive_state = InsensitiveState::Idle;
            }
            return if natural {
                TimerEvent::NaturalReset
            } else {
                TimerEvent::Reset
            };
        }

        TimerEvent::None
    }

    pub fn set_limit(&mut self, limit: i64) {
        self.limit = limit;
        if self.elapsed_time() < limit {
            self.elapsed_at_last_limit = 0;
        }
        self.compute_next_limit();
    }

    pub fn set_limit_enabled(&mut self, enabled: bool) {
        self.limit_enabled = enabled;
        self.compute_next_limit();
    }

    pub fn set_auto_reset(&mut self, interval: i64) {
        if interval > self.auto_reset {
            self.snooze_inhibited = false;
        }
        self.auto_reset = interval;
        self.compute_next_reset();
    }

    pub fn set_auto_reset_enabled(&mut self, enabled: bool) {
        self.auto_reset_enabled = enabled;
        self.compute_next_reset();
    }

    pub fn set_auto_reset_predicate(&mut self, predicate: Option<ResetPredicate>) {
        self.reset_predicate = predicate;
        self.compute_next_pred_reset();
    }

    pub fn set_snooze(&mut self, interval: i64) {
        self.snooze = interval;
        self.compute_next_limit();
    }

    pub fn set_activity_sensitive(&mut self, sensitive: bool) {
        self.activity_sensitive = sensitive;
        self.insensitive_state = InsensitiveState::Unknown;
        if !sensitive {
            let elapsed = self.elapsed_time();
            if elapsed > 0 && (elapsed < self.limit || !self.is_limit_enabled()) {
                self.insensitive_state = InsensitiveState::Active;
            }
        }
    }

    pub fn set_insensitive_mode(&mut self, mode: InsensitiveMode) {
        self.insensitive_mode = mode;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_activity_sensitive(&self) -> bool {
        self.activity_sensitive
    }

    pub fn is_limit_enabled(&self) -> bool {
        self.limit_enabled && self.limit > 0
    }

    pub fn is_auto_reset_enabled(&self) -> bool {
        self.auto_reset_enabled && self.auto_reset > 0
    }

    pub fn is_snooze_inhibited(&self) -> bool {
        self.snooze_inhibited
    }

    /// Active time in the current interval, including the running stretch.
    pub fn elapsed_time(&self) -> i64 {
        let mut elapsed = self.elapsed;
        if self.enabled {
            if let Some(start) = self.last_start {
                elapsed += self.clock.monotonic_secs() - start;
            }
        }
        elapsed
    }

    pub fn elapsed_idle_time(&self) -> i64 {
        let mut idle = self.elapsed_idle;
        if self.enabled {
            if let Some(stop) = self.last_stop {
                idle += self.clock.monotonic_secs() - stop;
            }
        }
        idle
    }

    pub fn elapsed_at_last_limit(&self) -> i64 {
        self.elapsed_at_last_limit
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn auto_reset(&self) -> i64 {
        self.auto_reset
    }

    pub fn reset_predicate(&self) -> Option<ResetPredicate> {
        self.reset_predicate
    }

    pub fn snooze_interval(&self) -> i64 {
        self.snooze
    }

    /// Banked overdue time plus the current excess over the limit.
    pub fn total_overdue_time(&self) -> i64 {
        let elapsed = self.elapsed_time();
        let mut overdue = self.total_overdue;
        if self.is_limit_enabled() && elapsed > self.limit {
            overdue += elapsed - self.limit;
        }
        overdue
    }

    pub fn next_limit_time(&self) -> Option<i64> {
        self.next_limit
    }

    pub fn next_reset_time(&self) -> Option<i64> {
        self.next_reset
    }

    pub fn next_pred_reset_time(&self) -> Option<i64> {
        self.next_pred_reset
    }

    fn compute_next_limit(&mut self) {
        self.next_limit = None;
        if !self.enabled || self.state != RunState::Running || !self.is_limit_enabled() {
            return;
        }
        let Some(start) = self.last_start else {
            return;
        };
        if self.elapsed_time() >= self.limit {
            if !self.snooze_inhibited {
                self.next_limit = Some(start - self.elapsed + self.elapsed_at_last_limit + self.snooze);
            }
        } else {
            self.next_limit = Some(start + self.limit - self.elapsed);
        }
    }

    fn compute_next_reset(&mut self) {
        self.next_reset = None;
        if !self.enabled || self.state != RunState::Stopped || !self.is_auto_reset_enabled() {
            return;
        }
        let Some(stop) = self.last_stop else {
            return;
        };
        let next = stop + self.auto_reset - self.elapsed_idle;
        let stale = self.last_reset.is_some_and(|reset| next <= reset) || next <= stop;
        if !stale {
            self.next_reset = Some(next);
        }
    }

    fn compute_next_pred_reset(&mut self) {
        self.next_pred_reset = match self.reset_predicate {
            Some(predicate) => {
                let real_now = self.clock.real_secs();
                let last = *self.last_pred_reset.get_or_insert(real_now);
                Some(predicate.next_after(last, self.clock.local_offset(last)))
            }
            None => None,
        };
    }

    /// One-line snapshot for the state file.
    pub fn serialize_state(&self) -> String {
        let real_now = self.clock.real_secs();
        format!(
            "{} {} {} {} {} {} 0 {} {}",
            self.id,
            real_now,
            self.elapsed_time(),
            self.last_pred_reset.unwrap_or(0),
            self.total_overdue,
            u8::from(self.snooze_inhibited),
            self.elapsed_at_last_limit,
            self.clock.local_offset(real_now).local_minus_utc(),
        )
    }

    /// Restores a line written by [`Self::serialize_state`].
    pub fn deserialize_state(&mut self, line: &str, version: u32) -> Result<(), StateError> {
        let (id, fields) = line.trim().split_once(' ').ok_or_else(|| StateError::MalformedRecord {
            line: line.to_string(),
            reason: "missing fields".to_string(),
        })?;
        if id != self.id {
            return Err(StateError::MalformedRecord {
                line: line.to_string(),
                reason: format!("belongs to timer '{}'", id),
            });
        }
        let snapshot = TimerSnapshot::parse(fields, version)?;
        self.restore(&snapshot);
        Ok(())
    }

    pub fn restore(&mut self, snapshot: &TimerSnapshot) {
        let now = self.clock.monotonic_secs();
        let real_now = self.clock.real_secs();

        let last_pred_reset = snapshot.last_pred_reset.min(snapshot.saved_at);
        self.last_pred_reset = (last_pred_reset > 0).then_some(last_pred_reset);
        self.total_overdue = snapshot.total_overdue;
        self.snooze_inhibited = snapshot.snooze_inhibited;

        let stale = self.is_auto_reset_enabled() && real_now - snapshot.saved_at > self.auto_reset;
        if stale {
            debug!(timer = %self.id, saved_at = snapshot.saved_at, "saved state is stale");
            self.elapsed = 0;
            self.elapsed_idle = self.auto_reset;
        } else {
            self.elapsed = snapshot.elapsed;
            self.elapsed_idle = 0;
        }

        match self.state {
            RunState::Running => {
                self.last_start = Some(now);
                self.last_stop = None;
            }
            _ => {
                self.last_start = None;
                self.last_stop = Some(now);
            }
        }

        if self.is_limit_enabled() && self.elapsed_time() >= self.limit {
            self.elapsed_at_last_limit = snapshot.elapsed_at_last_limit;
        } else {
            self.elapsed_at_last_limit = 0;
        }
        self.compute_next_limit();
        self.compute_next_reset();
        self.compute_next_pred_reset();
    }
}

/// Parsed fields of one timer line in the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub saved_at: i64,
    pub elapsed: i64,
    pub last_pred_reset: i64,
    pub total_overdue: i64,
    pub snooze_inhibited: bool,
    pub elapsed_at_last_limit: i64,
    pub tz_offset: Option<i32>,
}

impl TimerSnapshot {
    /// Parses the fields after the timer id.
    pub fn parse(fields: &str, version: u32) -> Result<Self, StateError> {
        let malformed = |reason: &str| StateError::MalformedRecord {
            line: fields.to_string(),
            reason: reason.to_string(),
        };
        let values = fields
            .split_whitespace()
            .map(|field| field.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(&e.to_string()))?;

        let expected = if version >= 3 { 8 } else { 7 };
        if values.len() < expected {
            return Err(malformed(&format!("expected {} fields, found {}", expected, values.len())));
        }

        let snooze_inhibited = match values[4] {
            0 => false,
            1 => true,
            _ => return Err(malformed("snooze flag must be 0 or 1")),
        };

        let tz_offset = if version >= 3 {
            Some(i32::try_from(values[7]).map_err(|_| malformed("time zone offset out of range"))?)
        } else {
            None
        };

        Ok(Self {
            saved_at: values[0],
            elapsed: values[1],
            last_pred_reset: values[2],
            total_overdue: values[3],
            snooze_inhibited,
            elapsed_at_last_limit: values[6],
            tz_offset,
        })
    }
}
