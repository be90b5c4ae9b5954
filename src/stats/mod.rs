//! Rolling usage statistics
//!
//! Daily login and registration counters for the last seven days,
//! persisted under the `authStats` key.

mod tracker;

pub use tracker::{StatsTracker, STATS};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const STATS_WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Login,
    Registration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsageStat {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub logins: u64,
    pub registrations: u64,
}

impl DailyUsageStat {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            logins: 0,
            registrations: 0,
        }
    }
}

/// At most [`STATS_WINDOW_DAYS`] entries, oldest first, one per date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DailyUsageStat>", into = "Vec<DailyUsageStat>")]
pub struct StatsWindow {
    entries: VecDeque<DailyUsageStat>,
}

impl StatsWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DailyUsageStat> {
        self.entries.iter()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyUsageStat> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Bumps the counter for `date`, creating its entry if needed.
    ///
    /// A new date on a full window evicts the oldest entry first. Returns
    /// `false` if `date` is older than everything in a full window, in which
    /// case nothing changes.
    pub fn record(&mut self, date: NaiveDate, kind: UsageKind) -> bool {
        let Some(entry) = self.entry_mut(date) else {
            return false;
        };
        match kind {
            UsageKind::Login => entry.logins += 1,
            UsageKind::Registration => entry.registrations += 1,
        }
        true
    }

    pub fn total_logins(&self) -> u64 {
        self.entries.iter().map(|e| e.logins).sum()
    }

    pub fn total_registrations(&self) -> u64 {
        self.entries.iter().map(|e| e.registrations).sum()
    }

    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            entries: self.entries.iter().cloned().collect(),
            total_logins: self.total_logins(),
            total_registrations: self.total_registrations(),
        }
    }

    fn entry_mut(&mut self, date: NaiveDate) -> Option<&mut DailyUsageStat> {
        if let Some(idx) = self.entries.iter().position(|e| e.date == date) {
            return self.entries.get_mut(idx);
        }

        let full = self.entries.len() >= STATS_WINDOW_DAYS;
        let idx = self.entries.partition_point(|e| e.date < date);
        if full && idx == 0 {
            return None;
        }
        if full {
            self.entries.pop_front();
        }
        let idx = if full { idx - 1 } else { idx };
        self.entries.insert(idx, DailyUsageStat::empty(date));
        self.entries.get_mut(idx)
    }
}

impl From<Vec<DailyUsageStat>> for StatsWindow {
    /// Sorts by date, merges repeated dates and keeps the newest days.
    fn from(mut raw: Vec<DailyUsageStat>) -> Self {
        raw.sort_by_key(|e| e.date);

        let mut entries: VecDeque<DailyUsageStat> = VecDeque::with_capacity(raw.len());
        for stat in raw {
            match entries.back_mut() {
                Some(last) if last.date == stat.date => {
                    last.logins += stat.logins;
                    last.registrations += stat.registrations;
                }
                _ => entries.push_back(stat),
            }
        }
        while entries.len() > STATS_WINDOW_DAYS {
            entries.pop_front();
        }
        Self { entries }
    }
}

impl From<StatsWindow> for Vec<DailyUsageStat> {
    fn from(window: StatsWindow) -> Self {
        window.entries.into()
    }
}

/// What the statistics panel shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub entries: Vec<DailyUsageStat>,
    pub total_logins: u64,
    pub total_registrations: u64,
}
