//! Break identities, lifecycle events and presenter commands.
//!
//! Break models never talk to a UI directly. They emit [`BreakEvent`]s for
//! statistics and sound cues and [`WindowCommand`]s for whatever draws the
//! prelude and break windows. The scheduler forwards both to a
//! [`BreakFrontend`].

use std::fmt;
use std::ops::BitOr;

/// The three break categories, ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BreakId {
    Micro,
    Rest,
    DailyLimit,
}

impl BreakId {
    pub const ALL: [BreakId; 3] = [BreakId::Micro, BreakId::Rest, BreakId::DailyLimit];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in configuration keys and the state file.
    pub fn name(self) -> &'static str {
        match self {
            BreakId::Micro => "micro_pause",
            BreakId::Rest => "rest_break",
            BreakId::DailyLimit => "daily_limit",
        }
    }

    pub fn from_name(name: &str) -> Option<BreakId> {
        BreakId::ALL.into_iter().find(|id| id.name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            BreakId::Micro => "Micro-break",
            BreakId::Rest => "Rest break",
            BreakId::DailyLimit => "Daily limit",
        }
    }
}

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a break window was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakHint(u8);

impl BreakHint {
    pub const NORMAL: BreakHint = BreakHint(0);
    pub const USER_INITIATED: BreakHint = BreakHint(1);
    pub const NATURAL_BREAK: BreakHint = BreakHint(2);

    pub fn contains(self, other: BreakHint) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: BreakHint) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for BreakHint {
    type Output = BreakHint;

    fn bitor(self, rhs: BreakHint) -> BreakHint {
        BreakHint(self.0 | rhs.0)
    }
}

/// Lifecycle notifications emitted by a break model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakEvent {
    /// First prelude of a break cycle.
    BreakStart,
    ShowPrelude,
    ShowBreak,
    ShowBreakForced,
    /// A prelude or break window went away.
    BreakIdle,
    BreakTaken,
    BreakSkipped,
    BreakPostponed,
    BreakIgnored,
    BreakStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreludeStage {
    Initial,
    MoveOut,
    Warn,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreludeProgressText {
    BreakIn,
    DisappearsIn,
    Silent,
}

/// Presenter instructions for the prelude and break windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    CreatePrelude,
    CreateBreak(BreakHint),
    Show,
    Hide,
    Refresh,
    PreludeStage(PreludeStage),
    PreludeProgressText(PreludeProgressText),
    Progress { value: i64, max: i64 },
}

/// Everything a break model produces, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOutput {
    Event(BreakEvent),
    Window(WindowCommand),
}

/// Consumer of break events and window commands.
///
/// Both methods default to doing nothing so a frontend only implements
/// what it renders.
pub trait BreakFrontend: Send {
    fn window(&mut self, _id: BreakId, _command: WindowCommand) {}

    fn break_event(&mut self, _id: BreakId, _event: BreakEvent) {}
}

/// Frontend that discards everything.
#[derive(Debug, Default)]
pub struct NullFrontend;

impl BreakFrontend for NullFrontend {}
