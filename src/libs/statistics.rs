//! Daily break counters fed by the break event stream.

use super::event::{BreakEvent, BreakId};
use chrono::{DateTime, Utc};

const HISTORY_DAYS: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakCounters {
    /// Break cycles that reached their first prelude.
    pub unique_breaks: u32,
    pub prompted: u32,
    pub taken: u32,
    pub natural_taken: u32,
    pub skipped: u32,
    pub postponed: u32,
    pub ignored: u32,
    pub overdue_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub start: DateTime<Utc>,
    pub breaks: [BreakCounters; 3],
}

impl DailyStats {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            breaks: Default::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Statistics {
    current: DailyStats,
    history: Vec<DailyStats>,
}

impl Statistics {
    pub fn new(now_secs: i64) -> Self {
        Self {
            current: DailyStats::new(to_datetime(now_secs)),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &DailyStats {
        &self.current
    }

    pub fn counters(&self, id: BreakId) -> &BreakCounters {
        &self.current.breaks[id.index()]
    }

    /// Finished days, most recent last.
    pub fn history(&self) -> &[DailyStats] {
        &self.history
    }

    pub fn record(&mut self, id: BreakId, event: BreakEvent) {
        let counters = &mut self.current.breaks[id.index()];
        match event {
            BreakEvent::BreakStart => counters.unique_breaks += 1,
            BreakEvent::ShowPrelude => counters.prompted += 1,
            BreakEvent::BreakTaken => counters.taken += 1,
            BreakEvent::BreakSkipped => counters.skipped += 1,
            BreakEvent::BreakPostponed => counters.postponed += 1,
            BreakEvent::BreakIgnored => counters.ignored += 1,
            _ => {}
        }
    }

    pub fn record_natural_reset(&mut self, id: BreakId) {
        self.current.breaks[id.index()].natural_taken += 1;
    }

    pub fn set_overdue(&mut self, id: BreakId, overdue_secs: i64) {
        self.current.breaks[id.index()].overdue_secs = overdue_secs;
    }

    /// Closes the current day and starts a fresh one.
    pub fn rotate(&mut self, now_secs: i64) {
        let finished = std::mem::replace(&mut self.current, DailyStats::new(to_datetime(now_secs)));
        self.history.push(finished);
        if self.history.len() > HISTORY_DAYS {
            self.history.remove(0);
        }
    }
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
