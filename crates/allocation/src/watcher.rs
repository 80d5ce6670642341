//! Keeps overload alerts current as the in-memory store changes.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::NaiveDate;
use resman_core::ChangeEvent;
use resman_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::AllocationEngine;
use crate::report::OverloadAlert;

/// How often a watcher on [`WatchDate::Today`] checks for a new day.
pub const DEFAULT_DATE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Date the watcher evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchDate {
    /// Local date at the time of each computation
    #[default]
    Today,
    /// A fixed date
    Fixed(NaiveDate),
}

impl WatchDate {
    /// Resolve to a concrete date.
    pub fn resolve(&self) -> NaiveDate {
        match self {
            WatchDate::Today => chrono::Local::now().date_naive(),
            WatchDate::Fixed(date) => *date,
        }
    }
}

/// Overload alerts computed from one store revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadReport {
    /// Store revision the alerts were computed from
    pub revision: u64,
    /// Evaluated date
    pub date: NaiveDate,
    /// Overloaded members, in member order
    pub alerts: Vec<OverloadAlert>,
}

/// Recomputes overload alerts whenever workload-relevant data changes.
///
/// A watcher on [`WatchDate::Today`] also recomputes when the local date
/// rolls over, checked every `date_check_interval`.
#[derive(Debug, Clone)]
pub struct OverloadWatcher {
    engine: AllocationEngine,
    date: WatchDate,
    date_check_interval: Duration,
    today: fn() -> NaiveDate,
}

impl OverloadWatcher {
    /// Create a watcher.
    pub fn new(engine: AllocationEngine, date: WatchDate) -> Self {
        Self {
            engine,
            date,
            date_check_interval: DEFAULT_DATE_CHECK_INTERVAL,
            today: || WatchDate::Today.resolve(),
        }
    }

    /// Set how often the local date is checked.
    pub fn with_date_check_interval(mut self, interval: Duration) -> Self {
        self.date_check_interval = interval;
        self
    }

    fn resolve_date(&self) -> NaiveDate {
        match self.date {
            WatchDate::Today => (self.today)(),
            WatchDate::Fixed(date) => date,
        }
    }

    /// Compute a report from the store's current state.
    pub fn evaluate(&self, store: &MemoryStore) -> OverloadReport {
        let (revision, snapshot) = store.versioned();
        let date = self.resolve_date();
        let alerts = self
            .engine
            .overload_alerts(&snapshot.members, &snapshot.tasks, date);
        debug!(
            "Revision {}: {} overload alert(s) on {}",
            revision,
            alerts.len(),
            date
        );
        OverloadReport {
            revision,
            date,
            alerts,
        }
    }

    /// Start watching `store`.
    ///
    /// The receiver holds the latest report, starting with one computed
    /// immediately. The task ends once every receiver is dropped or the store
    /// itself is dropped.
    pub fn spawn(self, store: Arc<MemoryStore>) -> (watch::Receiver<OverloadReport>, JoinHandle<()>) {
        let mut changes = store.subscribe();
        let (tx, rx) = watch::channel(self.evaluate(&store));
        let store: Weak<MemoryStore> = Arc::downgrade(&store);

        let handle = tokio::spawn(async move {
            let follows_clock = self.date == WatchDate::Today;
            let mut ticker = tokio::time::interval(self.date_check_interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Overload watcher started");
            loop {
                let recompute = tokio::select! {
                    _ = tx.closed() => {
                        debug!("All report receivers dropped");
                        break;
                    }
                    event = changes.recv() => match event {
                        Ok(ChangeEvent { revision, kind, .. }) => {
                            kind.affects_workload() && revision > tx.borrow().revision
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Overload watcher missed {} change(s), recomputing", skipped);
                            true
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = ticker.tick(), if follows_clock => {
                        let today = self.resolve_date();
                        let rolled_over = today != tx.borrow().date;
                        if rolled_over {
                            debug!("Date rolled over to {}", today);
                        }
                        rolled_over
                    }
                };
                if !recompute {
                    continue;
                }

                let Some(store) = store.upgrade() else {
                    break;
                };
                tx.send_replace(self.evaluate(&store));
            }
            info!("Overload watcher stopped");
        });

        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use resman_core::{Assignment, Member, Project, Task, WorkingDays};
    use resman_storage::Storage;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    async fn next_report(rx: &mut watch::Receiver<OverloadReport>) -> OverloadReport {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("watcher did not publish in time")
            .unwrap();
        rx.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn test_watcher_tracks_store_changes() {
        let store = Arc::new(MemoryStore::new());
        let member = Member::new("Ana", 8.0);
        let project = Project::new("p");
        store.save_member(&member).await.unwrap();
        store.save_project(&project).await.unwrap();

        let watcher = OverloadWatcher::new(AllocationEngine::new(), WatchDate::Fixed(date(4)));
        let (mut rx, handle) = watcher.spawn(store.clone());

        let initial = rx.borrow_and_update().clone();
        assert_eq!(initial.revision, 2);
        assert_eq!(initial.date, date(4));
        assert!(initial.alerts.is_empty());

        let task = Task::new(project.id, "t", date(3), date(7), 50.0)
            .with_assignment(Assignment::new(member.id, WorkingDays::WEEKDAYS, 100.0));
        store.save_task(&task).await.unwrap();

        let report = next_report(&mut rx).await;
        assert_eq!(report.revision, 3);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].member_id, member.id);

        store.delete_task(task.id).await.unwrap();
        let report = next_report(&mut rx).await;
        assert_eq!(report.revision, 4);
        assert!(report.alerts.is_empty());

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_project_changes_do_not_recompute() {
        let store = Arc::new(MemoryStore::new());
        let watcher = OverloadWatcher::new(AllocationEngine::new(), WatchDate::Fixed(date(4)));
        let (mut rx, _handle) = watcher.spawn(store.clone());
        rx.borrow_and_update();

        store.save_project(&Project::new("p")).await.unwrap();
        store.save_member(&Member::new("Ana", 8.0)).await.unwrap();

        // Only the member change is published
        let report = next_report(&mut rx).await;
        assert_eq!(report.revision, 2);
    }

    static FAKE_DAY: AtomicU32 = AtomicU32::new(3);

    fn fake_today() -> NaiveDate {
        date(FAKE_DAY.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_watcher_follows_date_rollover() {
        let store = Arc::new(MemoryStore::new());
        let member = Member::new("Ana", 8.0);
        let project = Project::new("p");
        store.save_member(&member).await.unwrap();
        store.save_project(&project).await.unwrap();
        // Only Tuesday the 4th is overloaded
        let task = Task::new(project.id, "t", date(4), date(4), 12.0)
            .with_assignment(Assignment::new(member.id, WorkingDays::WEEKDAYS, 100.0));
        store.save_task(&task).await.unwrap();

        let mut watcher = OverloadWatcher::new(AllocationEngine::new(), WatchDate::Today)
            .with_date_check_interval(Duration::from_millis(10));
        watcher.today = fake_today;
        let (mut rx, _handle) = watcher.spawn(store.clone());

        let initial = rx.borrow_and_update().clone();
        assert_eq!(initial.date, date(3));
        assert!(initial.alerts.is_empty());

        FAKE_DAY.store(4, Ordering::SeqCst);
        let report = next_report(&mut rx).await;
        assert_eq!(report.date, date(4));
        assert_eq!(report.revision, initial.revision);
        assert_eq!(report.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_watcher_stops_when_store_dropped() {
        let store = Arc::new(MemoryStore::new());
        let watcher = OverloadWatcher::new(AllocationEngine::new(), WatchDate::Today);
        let (_rx, handle) = watcher.spawn(store.clone());

        drop(store);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
