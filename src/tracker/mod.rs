//! The day/activity state machine. A [DayTracker] owns the state store and a
//! clock, and is the only writer of the day state: it opens a day (anchoring
//! T0), records activities back-to-back against the anchor, and closes the
//! day after collecting progress for every unfinished to-do.

pub mod reminder;

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    store::{
        document::{CompletedFilter, TaskPatch},
        entities::{Activity, Category, Document, Settings, Task},
        json_store::StateStore,
    },
    utils::clock::Clock,
};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("a day is already in progress")]
    AlreadyStarted,
    #[error("no day is in progress")]
    DayNotStarted,
    #[error("missing or out-of-range progress for task {id} ({name})")]
    IncompleteProgress { id: u64, name: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Open/closed state of the current day, derived from the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    Closed,
    Open { t0: DateTime<Utc> },
}

pub struct DayTracker<S> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: StateStore> DayTracker<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current day state, after restart recovery.
    pub async fn current_state(&self) -> TrackerResult<DayState> {
        let doc = self.store.load().await?;
        Ok(day_state(&doc, self.clock.time()))
    }

    /// Opens a new day with the anchor set to now.
    pub async fn start_day(&self) -> TrackerResult<DateTime<Utc>> {
        let mut doc = self.store.load().await?;
        let now = self.clock.time();
        if let DayState::Open { .. } = day_state(&doc, now) {
            return Err(TrackerError::AlreadyStarted);
        }

        doc.open_day(now);
        self.store.save(&doc).await?;
        info!("Day started at {now}");
        Ok(now)
    }

    /// Records an activity spanning from the anchor to now, then re-anchors.
    /// Consecutive activities chain back-to-back with zero gaps by
    /// construction.
    pub async fn record_activity(
        &self,
        name: &str,
        category: Category,
    ) -> TrackerResult<Activity> {
        let mut doc = self.store.load().await?;
        let now = self.clock.time();
        let DayState::Open { t0 } = day_state(&doc, now) else {
            return Err(TrackerError::DayNotStarted);
        };

        // A manually moved anchor can sit ahead of the clock; never record a
        // negative span.
        let t1 = now.max(t0);
        let activity = Activity::new(mint_id(&doc, t1), name, category, t0, t1);
        debug!("Recording activity {activity:?}");
        doc.push_activity(activity.clone());
        doc.set_anchor(t1);
        self.store.save(&doc).await?;
        Ok(activity)
    }

    /// Closes the day. Every task still open must have a progress percentage
    /// in 0..=100 in `progress`; each pair is preserved as a zero-duration
    /// snapshot activity. The tasks themselves are left untouched.
    pub async fn end_day(&self, progress: &HashMap<u64, u8>) -> TrackerResult<Vec<Activity>> {
        let mut doc = self.store.load().await?;
        let now = self.clock.time();
        if day_state(&doc, now) == DayState::Closed {
            return Err(TrackerError::DayNotStarted);
        }

        let mut pairs = Vec::new();
        for task in doc.open_tasks() {
            match progress.get(&task.id) {
                Some(&value) if value <= 100 => pairs.push((task.clone(), value)),
                _ => {
                    return Err(TrackerError::IncompleteProgress {
                        id: task.id,
                        name: task.name.clone(),
                    });
                }
            }
        }

        let mut snapshots = Vec::new();
        for (task, value) in pairs {
            let snapshot =
                Activity::unfinished_snapshot(mint_id(&doc, now), &task, value, now);
            doc.push_activity(snapshot.clone());
            snapshots.push(snapshot);
        }

        doc.close_day();
        self.store.save(&doc).await?;
        info!("Day ended at {now} with {} unfinished tasks", snapshots.len());
        Ok(snapshots)
    }

    /// Overwrites the anchor. Part of the command surface so a resumed
    /// session can re-align after recovery.
    pub async fn update_t0(&self, t0: DateTime<Utc>) -> TrackerResult<()> {
        let mut doc = self.store.load().await?;
        doc.set_anchor(t0);
        self.store.save(&doc).await?;
        Ok(())
    }

    pub async fn add_task(&self, name: &str) -> TrackerResult<Task> {
        let mut doc = self.store.load().await?;
        let now = self.clock.time();
        let task = Task::new(mint_id(&doc, now), name, now);
        doc.push_task(task.clone());
        self.store.save(&doc).await?;
        Ok(task)
    }

    /// Moves a task to the completed collection. Unknown or already completed
    /// ids are a silent no-op, reported as `None`.
    pub async fn complete_task(&self, id: u64) -> TrackerResult<Option<Task>> {
        let mut doc = self.store.load().await?;
        let completed = doc.complete_task(id, self.clock.time()).cloned();
        if completed.is_some() {
            self.store.save(&doc).await?;
        }
        Ok(completed)
    }

    /// Removes a task from both collections. Absence is not an error.
    pub async fn delete_task(&self, id: u64) -> TrackerResult<()> {
        let mut doc = self.store.load().await?;
        doc.remove_task(id);
        self.store.save(&doc).await?;
        Ok(())
    }

    pub async fn rename_task(&self, id: u64, name: &str) -> TrackerResult<()> {
        let mut doc = self.store.load().await?;
        doc.update_task(
            id,
            TaskPatch {
                name: Some(name.to_string()),
            },
        );
        self.store.save(&doc).await?;
        Ok(())
    }

    pub async fn completed_tasks(
        &self,
        filter: Option<CompletedFilter>,
        now: DateTime<Local>,
    ) -> TrackerResult<Vec<Task>> {
        let doc = self.store.load().await?;
        Ok(doc
            .completed_in(filter, now)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn settings(&self) -> TrackerResult<Settings> {
        Ok(self.store.load().await?.settings)
    }

    pub async fn update_settings(&self, settings: Settings) -> TrackerResult<()> {
        let mut doc = self.store.load().await?;
        doc.set_settings(settings);
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Read-only view of the whole document, for status and report output.
    pub async fn snapshot(&self) -> TrackerResult<Document> {
        Ok(self.store.load().await?)
    }
}

/// Derives the day state from a document. When the open flag is set but the
/// anchor is missing (ungraceful shutdown), falls back to the last activity's
/// end time unless that activity carries the day-ended marker. The fallback
/// is best-effort, not authoritative.
pub fn day_state(doc: &Document, now: DateTime<Utc>) -> DayState {
    if !doc.app_state.current_day_started {
        return DayState::Closed;
    }
    let t0 = doc
        .app_state
        .current_t0
        .or_else(|| {
            doc.activities
                .last()
                .filter(|last| !last.day_ended)
                .map(|last| last.t1)
        })
        .unwrap_or(now);
    DayState::Open { t0 }
}

/// Ids are wall-clock milliseconds, bumped past the largest id already in the
/// document so several records minted in one millisecond stay distinct.
fn mint_id(doc: &Document, now: DateTime<Utc>) -> u64 {
    let base = now.timestamp_millis().max(0) as u64;
    let max_used = doc
        .activities
        .iter()
        .map(|a| a.id)
        .chain(doc.tasks.iter().map(|t| t.id))
        .chain(doc.completed_tasks.iter().map(|t| t.id))
        .max();
    match max_used {
        Some(max) if base <= max => max + 1,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;
    use tokio::time::Instant;

    use crate::{
        store::json_store::{JsonFileStore, MockStateStore},
        utils::logging::TEST_LOGGING,
    };

    use super::*;

    /// Clock whose time is advanced by hand.
    #[derive(Clone)]
    struct TestClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl TestClock {
        fn at(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    fn test_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn tracker_in(dir: &std::path::Path) -> (DayTracker<JsonFileStore>, TestClock) {
        *TEST_LOGGING;
        let clock = TestClock::at(test_start());
        let store = JsonFileStore::new(dir).unwrap();
        (DayTracker::new(store, Box::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn starting_twice_fails_without_state_effect() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, clock) = tracker_in(dir.path());

        let t0 = tracker.start_day().await?;
        clock.advance(Duration::minutes(3));
        let err = tracker.start_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyStarted));

        // The anchor still belongs to the first call.
        assert_eq!(tracker.current_state().await?, DayState::Open { t0 });
        Ok(())
    }

    #[tokio::test]
    async fn activities_chain_back_to_back() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, clock) = tracker_in(dir.path());

        tracker.start_day().await?;
        clock.advance(Duration::minutes(10) + Duration::seconds(30));
        let first = tracker.record_activity("standup", Category::Work).await?;
        clock.advance(Duration::minutes(5));
        let second = tracker.record_activity("coffee", Category::Rest).await?;

        assert_eq!(first.t1, second.t0);
        assert_eq!(first.t0, test_start());
        assert_eq!(first.duration, 10);
        assert_eq!(second.duration, 5);
        assert!(first.duration >= 0 && second.duration >= 0);
        assert_ne!(first.id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn moving_the_anchor_shifts_the_next_span() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, clock) = tracker_in(dir.path());

        tracker.start_day().await?;
        clock.advance(Duration::minutes(25));
        let moved = test_start() + Duration::minutes(10);
        tracker.update_t0(moved).await?;

        let activity = tracker.record_activity("standup", Category::Work).await?;
        assert_eq!(activity.t0, moved);
        assert_eq!(activity.duration, 15);
        Ok(())
    }

    #[tokio::test]
    async fn future_anchor_never_records_a_negative_span() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, clock) = tracker_in(dir.path());

        tracker.start_day().await?;
        clock.advance(Duration::minutes(5));
        let ahead = test_start() + Duration::hours(1);
        tracker.update_t0(ahead).await?;

        let activity = tracker.record_activity("standup", Category::Work).await?;
        assert_eq!(activity.t0, ahead);
        assert_eq!(activity.t1, ahead);
        assert_eq!(activity.duration, 0);
        Ok(())
    }

    #[tokio::test]
    async fn recording_needs_an_open_day() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, _) = tracker_in(dir.path());

        let err = tracker
            .record_activity("standup", Category::Work)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::DayNotStarted));

        let err = tracker.end_day(&HashMap::new()).await.unwrap_err();
        assert!(matches!(err, TrackerError::DayNotStarted));
        Ok(())
    }

    #[tokio::test]
    async fn end_day_demands_progress_for_open_tasks() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, _) = tracker_in(dir.path());

        tracker.start_day().await?;
        let task = tracker.add_task("write report").await?;

        let err = tracker.end_day(&HashMap::new()).await.unwrap_err();
        assert!(matches!(err, TrackerError::IncompleteProgress { id, .. } if id == task.id));

        let err = tracker
            .end_day(&HashMap::from([(task.id, 150u8)]))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::IncompleteProgress { .. }));

        // The failures must not have closed the day.
        assert!(matches!(
            tracker.current_state().await?,
            DayState::Open { .. }
        ));

        let snapshots = tracker.end_day(&HashMap::from([(task.id, 42u8)])).await?;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].progress, Some(42));
        assert_eq!(snapshots[0].duration, 0);
        assert_eq!(snapshots[0].t0, snapshots[0].t1);
        assert_eq!(snapshots[0].category, Category::Unfinished);
        assert_eq!(snapshots[0].related_task_id, Some(task.id));
        assert!(snapshots[0].day_ended);

        assert_eq!(tracker.current_state().await?, DayState::Closed);
        Ok(())
    }

    #[tokio::test]
    async fn end_day_snapshots_get_distinct_ids() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, _) = tracker_in(dir.path());

        tracker.start_day().await?;
        let a = tracker.add_task("one").await?;
        let b = tracker.add_task("two").await?;

        let snapshots = tracker
            .end_day(&HashMap::from([(a.id, 10u8), (b.id, 20u8)]))
            .await?;
        assert_eq!(snapshots.len(), 2);
        assert_ne!(snapshots[0].id, snapshots[1].id);
        Ok(())
    }

    #[tokio::test]
    async fn completing_a_task_twice_is_a_no_op() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tracker, _) = tracker_in(dir.path());

        let task = tracker.add_task("write report").await?;
        let completed = tracker.complete_task(task.id).await?.unwrap();
        assert!(completed.completed);
        assert!(completed.completed_at.is_some());

        assert!(tracker.complete_task(task.id).await?.is_none());
        let doc = tracker.snapshot().await?;
        assert_eq!(doc.completed_tasks.len(), 1);
        assert!(doc.tasks.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn restart_resumes_persisted_anchor() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        {
            let store = JsonFileStore::new(dir.path())?;
            let mut doc = Document::default();
            doc.open_day(anchor);
            store.save(&doc).await?;
        }

        // New tracker over the same directory, hours later.
        let clock = TestClock::at(anchor + Duration::hours(5));
        let tracker = DayTracker::new(JsonFileStore::new(dir.path())?, Box::new(clock));
        assert_eq!(
            tracker.current_state().await?,
            DayState::Open { t0: anchor }
        );
        Ok(())
    }

    #[test]
    fn missing_anchor_falls_back_to_last_activity() {
        let now = test_start();
        let t1 = now - Duration::hours(1);

        let mut doc = Document::default();
        doc.push_activity(Activity::new(1, "standup", Category::Work, t1 - Duration::minutes(15), t1));
        doc.app_state.current_day_started = true;
        doc.app_state.current_t0 = None;

        assert_eq!(day_state(&doc, now), DayState::Open { t0: t1 });

        // A day-ended marker on the last activity disables the inference.
        doc.activities.last_mut().unwrap().day_ended = true;
        assert_eq!(day_state(&doc, now), DayState::Open { t0: now });

        doc.app_state.current_day_started = false;
        assert_eq!(day_state(&doc, now), DayState::Closed);
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let mut store = MockStateStore::new();
        store
            .expect_load()
            .returning(|| Err(anyhow!("disk unplugged")));

        let tracker = DayTracker::new(store, Box::new(TestClock::at(test_start())));
        let err = tracker.start_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
    }

    #[tokio::test]
    async fn failed_save_leaves_error_to_caller() {
        let mut store = MockStateStore::new();
        store.expect_load().returning(|| Ok(Document::default()));
        store
            .expect_save()
            .returning(|_| Err(anyhow!("read-only filesystem")));

        let tracker = DayTracker::new(store, Box::new(TestClock::at(test_start())));
        let err = tracker.start_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
    }
}
