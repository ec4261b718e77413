//! Operation and usage modes, and the insist policy.
//!
//! The operation mode decides whether breaks fire at all. A regular mode is
//! chosen by the user; named overrides (for example "presentation running")
//! can raise it temporarily, and the strongest of them wins.

use super::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Normal,
    Quiet,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UsageMode {
    #[default]
    Normal,
    Reading,
}

/// What user activity does while a break is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsistPolicy {
    /// Freeze the timers; activity during the break is not counted.
    #[default]
    Halt,
    /// Suspend the activity detector for the duration of the break.
    Ignore,
    /// Activity restarts the break countdown.
    Reset,
}

/// Change of the effective operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub previous: OperationMode,
    pub current: OperationMode,
}

/// How long a non-normal regular mode lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDuration {
    Indefinite,
    /// Until the next daily reset.
    UntilTomorrow,
    Minutes(i64),
}

#[derive(Debug)]
pub struct Modes {
    clock: Clock,
    regular: OperationMode,
    active: OperationMode,
    overrides: BTreeMap<String, OperationMode>,
    usage: UsageMode,
    duration: ModeDuration,
    /// Wall-clock time at which the regular mode returns to normal.
    auto_reset_at: Option<i64>,
}

impl Modes {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            regular: OperationMode::Normal,
            active: OperationMode::Normal,
            overrides: BTreeMap::new(),
            usage: UsageMode::Normal,
            duration: ModeDuration::Indefinite,
            auto_reset_at: None,
        }
    }

    pub fn active(&self) -> OperationMode {
        self.active
    }

    pub fn regular(&self) -> OperationMode {
        self.regular
    }

    pub fn usage(&self) -> UsageMode {
        self.usage
    }

    pub fn auto_reset_at(&self) -> Option<i64> {
        self.auto_reset_at
    }

    pub fn set_usage(&mut self, usage: UsageMode) -> bool {
        let changed = self.usage != usage;
        self.usage = usage;
        changed
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) -> Option<ModeChange> {
        self.set_operation_mode_for(mode, ModeDuration::Indefinite)
    }

    pub fn set_operation_mode_for(&mut self, mode: OperationMode, duration: ModeDuration) -> Option<ModeChange> {
        self.regular = mode;
        self.duration = duration;
        self.auto_reset_at = match (mode, duration) {
            (OperationMode::Normal, _) => None,
            (_, ModeDuration::Minutes(minutes)) if minutes > 0 => Some(self.clock.real_secs() + minutes * 60),
            _ => None,
        };
        info!(mode = ?mode, duration = ?duration, "operation mode set");
        self.update_active()
    }

    pub fn set_override(&mut self, mode: OperationMode, id: &str) -> Option<ModeChange> {
        if mode == OperationMode::Normal {
            return self.remove_override(id);
        }
        self.overrides.insert(id.to_string(), mode);
        self.update_active()
    }

    pub fn remove_override(&mut self, id: &str) -> Option<ModeChange> {
        self.overrides.remove(id);
        self.update_active()
    }

    /// Returns to normal once a timed mode has run out.
    pub fn heartbeat(&mut self) -> Option<ModeChange> {
        let expired = self.auto_reset_at.is_some_and(|at| self.clock.real_secs() >= at);
        if expired && self.regular != OperationMode::Normal {
            return self.set_operation_mode(OperationMode::Normal);
        }
        None
    }

    pub fn daily_reset(&mut self) -> Option<ModeChange> {
        if self.duration == ModeDuration::UntilTomorrow && self.regular != OperationMode::Normal {
            return self.set_operation_mode(OperationMode::Normal);
        }
        None
    }

    fn update_active(&mut self) -> Option<ModeChange> {
        let strongest = self.overrides.values().copied().max().unwrap_or(OperationMode::Normal);
        let next = self.regular.max(strongest);
        if next == self.active {
            return None;
        }
        let change = ModeChange {
            previous: self.active,
            current: next,
        };
        self.active = next;
        Some(change)
    }
}
