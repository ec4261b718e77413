//! Prints the timers as last saved by the watcher.

use crate::libs::clock::Clock;
use crate::libs::config::Config;
use crate::libs::event::BreakId;
use crate::libs::formatter::format_timestamp;
use crate::libs::messages::Message;
use crate::libs::state::{SavedState, StateStore};
use crate::libs::time_pred::ResetPredicate;
use crate::libs::view::{TimerRow, View};
use crate::{msg_bail_anyhow, msg_error_anyhow, msg_info, msg_print};
use anyhow::Result;
use chrono::FixedOffset;

pub fn cmd() -> Result<()> {
    let config = Config::read().map_err(|e| msg_error_anyhow!(Message::ConfigUnreadable(e.to_string())))?;
    let state = match StateStore::new()?.read() {
        Ok(Some(state)) => state,
        Ok(None) => {
            msg_info!(Message::StatusNoState);
            return Ok(());
        }
        Err(e) => msg_bail_anyhow!(Message::StatusStateUnreadable(e.to_string())),
    };

    msg_print!(Message::StatusHeader, true);
    View::timers(&TimerRow::collect(&state, &config.breaks()));
    msg_print!(Message::StatusSavedAt(format_timestamp(state.saved_at)));

    let clock = Clock::system();
    if let Some(next) = next_daily_reset(&state, &config, clock.local_offset(clock.real_secs())) {
        msg_print!(Message::StatusNextDailyReset(format_timestamp(next)));
    }
    Ok(())
}

/// When the daily limit's reset rule fires next, if it has a valid one.
pub fn next_daily_reset(state: &SavedState, config: &Config, offset: FixedOffset) -> Option<i64> {
    let rule = config.breaks().get(BreakId::DailyLimit).reset_pred.clone();
    let predicate = rule.trim().parse::<ResetPredicate>().ok()?;
    let last = state
        .timer(BreakId::DailyLimit.name())
        .map(|snapshot| snapshot.last_pred_reset)
        .filter(|&last| last > 0)
        .unwrap_or(state.saved_at);
    Some(predicate.next_after(last, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::state::parse;

    #[test]
    fn next_reset_follows_daily_rule() {
        // 2024-03-10 02:59:00 UTC
        let state = parse("WorkRaveState 3\n1710039540\ndaily_limit 1710039540 600 1710039540 0 0 0 0 0\n").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        let next = next_daily_reset(&state, &Config::defaults(), utc).unwrap();
        // day/4:00 on the same day
        assert_eq!(next, 1710043200);
    }

    #[test]
    fn no_rule_no_reset() {
        let state = parse("WorkRaveState 3\n100\n").unwrap();
        let mut config = Config::defaults();
        if let Some(breaks) = config.breaks.as_mut() {
            breaks.daily_limit.reset_pred.clear();
        }
        assert_eq!(next_daily_reset(&state, &config, FixedOffset::east_opt(0).unwrap()), None);
    }
}
