use super::config::BreaksConfig;
use super::event::BreakId;
use super::formatter::format_secs;
use super::state::SavedState;
use prettytable::{row, Table};

/// One table row per break, read from a saved state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRow {
    pub label: &'static str,
    pub enabled: bool,
    pub active: i64,
    pub limit: i64,
    pub overdue: i64,
    pub snooze_inhibited: bool,
}

impl TimerRow {
    pub fn remaining(&self) -> i64 {
        (self.limit - self.active).max(0)
    }

    /// Rows for every break in priority order. Breaks missing from the
    /// state file show zero elapsed time.
    pub fn collect(state: &SavedState, breaks: &BreaksConfig) -> Vec<TimerRow> {
        BreakId::ALL
            .into_iter()
            .map(|id| {
                let config = breaks.get(id);
                let snapshot = state.timer(id.name());
                TimerRow {
                    label: id.label(),
                    enabled: config.enabled,
                    active: snapshot.map_or(0, |s| s.elapsed),
                    limit: config.limit,
                    overdue: snapshot.map_or(0, |s| s.total_overdue),
                    snooze_inhibited: snapshot.is_some_and(|s| s.snooze_inhibited),
                }
            })
            .collect()
    }
}

pub struct View {}

impl View {
    pub fn timers(rows: &[TimerRow]) {
        let mut table = Table::new();

        table.add_row(row!["BREAK", "ENABLED", "ACTIVE", "LIMIT", "REMAINING", "OVERDUE", "SNOOZE INHIBITED"]);
        for timer in rows {
            table.add_row(row![
                timer.label,
                yes_no(timer.enabled),
                format_secs(timer.active),
                format_secs(timer.limit),
                format_secs(timer.remaining()),
                format_secs(timer.overdue),
                yes_no(timer.snooze_inhibited)
            ]);
        }
        table.printstd();
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::state::parse;

    #[test]
    fn rows_follow_break_priority() {
        let state = parse("WorkRaveState 3\n1710039540\nrest_break 1710039540 1260 0 30 1 0 0 3600\n").unwrap();
        let rows = TimerRow::collect(&state, &BreaksConfig::default());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, BreakId::Micro.label());
        assert_eq!(rows[0].active, 0);
        assert_eq!(rows[1].active, 1260);
        assert_eq!(rows[1].remaining(), 2700 - 1260);
        assert_eq!(rows[1].overdue, 30);
        assert!(rows[1].snooze_inhibited);
    }
}
