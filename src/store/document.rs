//! Pure in-memory operations over the persisted [Document]. Every mutation
//! here is followed by a whole-document rewrite through the store, so the
//! methods stay synchronous and storage-free.

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;

use crate::utils::time::{most_recent_sunday, yesterday_bounds};

use super::entities::{Activity, AppState, Document, Settings, Task};

/// Time windows for querying completed tasks. Boundaries are derived from the
/// local wall clock at call time; weeks start on Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletedFilter {
    Yesterday,
    ThisWeek,
    LastWeek,
}

/// Field-merge patch for [Task] records. Absent fields keep their value.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub name: Option<String>,
}

impl Document {
    /// Appends an activity. Uniqueness of the caller-supplied id is not
    /// checked here.
    pub fn push_activity(&mut self, activity: Activity) {
        self.activities.push(activity);
    }

    pub fn push_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Merges `patch` into the active task with the given id. Unknown ids are
    /// a silent no-op.
    pub fn update_task(&mut self, id: u64, patch: TaskPatch) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            if let Some(name) = patch.name {
                task.name = name;
            }
        }
    }

    /// Removes the task with the given id from both collections. Absence is
    /// not an error.
    pub fn remove_task(&mut self, id: u64) {
        self.tasks.retain(|t| t.id != id);
        self.completed_tasks.retain(|t| t.id != id);
    }

    /// Moves a task from the active to the completed collection, stamping
    /// `completed_at`. Returns the moved task, or `None` when the id is not
    /// an active task (repeat calls are no-ops).
    pub fn complete_task(&mut self, id: u64, now: DateTime<Utc>) -> Option<&Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        let mut task = self.tasks.remove(index);
        task.completed = true;
        task.completed_at = Some(now);
        self.completed_tasks.push(task);
        self.completed_tasks.last()
    }

    /// Active tasks that have not been completed yet.
    pub fn open_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.completed)
    }

    /// Completed tasks whose completion time falls into the requested window,
    /// or all of them without a filter.
    pub fn completed_in(
        &self,
        filter: Option<CompletedFilter>,
        now: DateTime<Local>,
    ) -> Vec<&Task> {
        let in_window = |completed_at: DateTime<Utc>| -> bool {
            let completed_at = completed_at.with_timezone(&Local);
            match filter {
                None => true,
                Some(CompletedFilter::Yesterday) => {
                    let (start, end) = yesterday_bounds(now);
                    completed_at >= start && completed_at < end
                }
                Some(CompletedFilter::ThisWeek) => {
                    completed_at >= most_recent_sunday(now) && completed_at <= now
                }
                Some(CompletedFilter::LastWeek) => {
                    let week_start = most_recent_sunday(now);
                    let previous_start = week_start - chrono::Duration::days(7);
                    completed_at >= previous_start && completed_at < week_start
                }
            }
        };

        self.completed_tasks
            .iter()
            .filter(|t| t.completed_at.is_some_and(in_window))
            .collect()
    }

    /// Replaces the settings singleton wholesale.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn open_day(&mut self, t0: DateTime<Utc>) {
        self.app_state = AppState {
            current_day_started: true,
            current_t0: Some(t0),
        };
    }

    pub fn close_day(&mut self) {
        self.app_state = AppState {
            current_day_started: false,
            current_t0: None,
        };
    }

    /// Advances the anchor without touching the open/closed flag.
    pub fn set_anchor(&mut self, t0: DateTime<Utc>) {
        self.app_state.current_t0 = Some(t0);
    }
}
