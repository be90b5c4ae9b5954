use super::{DailyUsageStat, StatsWindow, UsageKind, UsageSummary, STATS_WINDOW_DAYS};
use crate::error::StorageError;
use crate::storage::{PersistedSlot, StorageArea, STATS_KEY};
use chrono::{Duration, NaiveDate};
use rand::Rng;
use tracing::{debug, error, info};

pub const STATS: PersistedSlot<StatsWindow> = PersistedSlot::new(STATS_KEY);

#[derive(Clone)]
pub struct StatsTracker {
    area: StorageArea,
    seed_demo_data: bool,
}

impl StatsTracker {
    pub fn new(area: StorageArea, seed_demo_data: bool) -> Self {
        Self {
            area,
            seed_demo_data,
        }
    }

    /// Current window for display.
    ///
    /// Never fails: unreadable state shows as an empty window. When the slot
    /// is absent and demo seeding is on, a week of sample data ending at
    /// `today` is generated and persisted.
    pub async fn load(&self, today: NaiveDate) -> StatsWindow {
        match STATS.load_or_reset(&self.area).await {
            Ok(Some(window)) => window,
            Ok(None) if self.seed_demo_data => {
                let window = demo_window(today, &mut rand::thread_rng());
                info!("Seeding usage statistics with demo data");
                if let Err(e) = STATS.store(&self.area, &window).await {
                    error!("Failed to persist demo statistics: {}", e);
                }
                window
            }
            Ok(None) => StatsWindow::new(),
            Err(e) => {
                error!("Failed to load usage statistics: {}", e);
                StatsWindow::new()
            }
        }
    }

    pub async fn summary(&self, today: NaiveDate) -> UsageSummary {
        self.load(today).await.summary()
    }

    pub async fn record_login(&self, date: NaiveDate) -> Result<(), StorageError> {
        self.record(date, UsageKind::Login).await
    }

    pub async fn record_registration(&self, date: NaiveDate) -> Result<(), StorageError> {
        self.record(date, UsageKind::Registration).await
    }

    async fn record(&self, date: NaiveDate, kind: UsageKind) -> Result<(), StorageError> {
        let _lock = self.area.lock_writes().await;
        let mut window = STATS.load_or_reset(&self.area).await?.unwrap_or_default();

        if !window.record(date, kind) {
            debug!("Dropped {:?} for {}: older than the stats window", kind, date);
            return Ok(());
        }
        STATS.store(&self.area, &window).await
    }
}

fn demo_window(today: NaiveDate, rng: &mut impl Rng) -> StatsWindow {
    let days = STATS_WINDOW_DAYS as i64;
    let entries: Vec<DailyUsageStat> = (0..days)
        .rev()
        .map(|offset| DailyUsageStat {
            date: today - Duration::days(offset),
            logins: rng.gen_range(10..60),
            registrations: rng.gen_range(2..22),
        })
        .collect();
    StatsWindow::from(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Profile;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_record_persists() {
        let area = Profile::in_memory().open_tab();
        let tracker = StatsTracker::new(area.clone(), false);

        tracker.record_login(today()).await.unwrap();
        tracker.record_login(today()).await.unwrap();
        tracker.record_registration(today()).await.unwrap();

        let raw = area.get(STATS_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"[{"date":"2024-06-15","logins":2,"registrations":1}]"#);

        let summary = tracker.summary(today()).await;
        assert_eq!(summary.total_logins, 2);
        assert_eq!(summary.total_registrations, 1);
    }

    #[tokio::test]
    async fn test_absent_without_seeding_is_empty() {
        let area = Profile::in_memory().open_tab();
        let tracker = StatsTracker::new(area.clone(), false);

        assert!(tracker.load(today()).await.is_empty());
        assert_eq!(area.get(STATS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_demo_seed_on_first_read() {
        let area = Profile::in_memory().open_tab();
        let tracker = StatsTracker::new(area.clone(), true);

        let window = tracker.load(today()).await;
        assert_eq!(window.len(), STATS_WINDOW_DAYS);

        let dates: Vec<_> = window.entries().map(|e| e.date).collect();
        assert_eq!(dates.first(), Some(&(today() - Duration::days(6))));
        assert_eq!(dates.last(), Some(&today()));
        for entry in window.entries() {
            assert!((10..60).contains(&entry.logins));
            assert!((2..22).contains(&entry.registrations));
        }

        // Seeded once, then read back unchanged
        assert_eq!(tracker.load(today()).await, window);
    }

    #[tokio::test]
    async fn test_recording_does_not_seed() {
        let area = Profile::in_memory().open_tab();
        let tracker = StatsTracker::new(area, true);

        tracker.record_registration(today()).await.unwrap();
        let window = tracker.load(today()).await;
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_stats_recover() {
        let area = Profile::in_memory().open_tab();
        // Shape written by an older release: day-first dates
        area.set(STATS_KEY, r#"[{"date":"15-06-2024","logins":3,"registrations":1}]"#)
            .await
            .unwrap();
        let tracker = StatsTracker::new(area.clone(), false);

        assert!(tracker.load(today()).await.is_empty());

        tracker.record_login(today()).await.unwrap();
        let window = tracker.load(today()).await;
        assert_eq!(window.get(today()).map(|e| e.logins), Some(1));
    }
}
