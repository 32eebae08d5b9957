use std::fmt::Display;

use ansi_term::Colour;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::utils::time::duration_minutes;

/// Category label attached to every activity. The set is closed;
/// [Category::Unfinished] is reserved for day-end progress snapshots and
/// cannot be picked when logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Study,
    Rest,
    Exercise,
    Entertainment,
    Other,
    #[value(skip)]
    Unfinished,
}

impl Category {
    pub fn colour(&self) -> Colour {
        match self {
            Category::Work => Colour::Blue,
            Category::Study => Colour::Green,
            Category::Rest => Colour::Yellow,
            Category::Exercise => Colour::Purple,
            Category::Entertainment => Colour::Red,
            Category::Other => Colour::White,
            Category::Unfinished => Colour::Fixed(8),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Work => "work",
            Category::Study => "study",
            Category::Rest => "rest",
            Category::Exercise => "exercise",
            Category::Entertainment => "entertainment",
            Category::Other => "other",
            Category::Unfinished => "unfinished",
        };
        write!(f, "{name}")
    }
}

/// A completed, timestamped unit of tracked time. Immutable once created;
/// activities form an append-only list ordered by creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: u64,
    pub name: String,
    pub category: Category,
    #[serde(rename = "T0")]
    pub t0: DateTime<Utc>,
    #[serde(rename = "T1")]
    pub t1: DateTime<Utc>,
    /// Whole minutes between t0 and t1, truncated.
    pub duration: i64,
    /// Completion percentage of the related task, only on day-end snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<u64>,
    /// Set on records written while closing a day. Read back during restart
    /// recovery as a hint that the preceding activities belong to a finished
    /// day.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub day_ended: bool,
}

impl Activity {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        category: Category,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            t0,
            t1,
            duration: duration_minutes(t0, t1),
            progress: None,
            related_task_id: None,
            day_ended: false,
        }
    }

    /// Zero-duration snapshot of an unfinished task, written while closing a
    /// day.
    pub fn unfinished_snapshot(id: u64, task: &Task, progress: u8, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: format!("Unfinished: {} ({progress}%)", task.name),
            category: Category::Unfinished,
            t0: now,
            t1: now,
            duration: 0,
            progress: Some(progress),
            related_task_id: Some(task.id),
            day_ended: true,
        }
    }
}

/// A to-do entry. Lives in exactly one of the two task collections of the
/// document; completing it moves it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub name: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: u64, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
            created_at,
            completed_at: None,
        }
    }
}

/// Singleton settings record, overwritten wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Minutes between reminder ticks while a day is open.
    pub reminder_interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminder_interval: 30,
        }
    }
}

/// The only cross-session state: whether a day is open and its anchor. Kept
/// so a restarted session can resume an unfinished day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub current_day_started: bool,
    #[serde(rename = "currentT0")]
    pub current_t0: Option<DateTime<Utc>>,
}

/// The whole persisted document. Every store operation is a read-modify-write
/// of one of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub app_state: AppState,
}
