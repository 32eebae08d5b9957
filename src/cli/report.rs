use std::collections::HashMap;
use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    store::{
        entities::{Activity, Category},
        json_store::StateStore,
    },
    tracker::DayTracker,
    utils::time::next_day_start,
};

use super::{
    day::{describe_activity, format_minutes},
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(super) enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. Start and end both set to 15/03/2025 cover that entire day"
    )]
    treat_as_days: bool,
    #[arg(long, help = "Total minutes per category instead of the timeline listing")]
    categories: bool,
}

const BAR_WIDTH: usize = 40;

/// Command to process `report`. Lists activities between `start_date` and
/// `end_date` either chronologically or summed up per category.
pub async fn process_report_command(
    tracker: &DayTracker<impl StateStore>,
    ReportCommand {
        start_date,
        end_date,
        date_style,
        treat_as_days,
        categories,
    }: ReportCommand,
) -> Result<()> {
    let (start, end) = parse_range(start_date, end_date, date_style, treat_as_days)?;

    let doc = tracker.snapshot().await?;
    let selected: Vec<&Activity> = doc
        .activities
        .iter()
        .filter(|a| {
            let t1 = a.t1.with_timezone(&Local);
            t1 >= start && t1 < end
        })
        .collect();

    if selected.is_empty() {
        println!("No activities between {} and {}.", start.format("%x %H:%M"), end.format("%x %H:%M"));
        return Ok(());
    }

    if categories {
        print_category_totals(&selected);
    } else {
        print_timeline(&selected);
    }
    Ok(())
}

/// Also provides sensible defaults: the current day.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();

    let mut start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now.beginning_of_day(),
    };
    let mut end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };
    if treat_as_days {
        start = start.beginning_of_day();
        end = next_day_start(end);
    }
    Ok((start, end))
}

/// Parses a single point in time the same way the range bounds are parsed.
pub(super) fn parse_moment(value: &str, date_style: DateStyle) -> Result<DateTime<Local>> {
    match parse_date_string(value, Local::now(), date_style.into()) {
        Ok(v) => Ok(v.with_timezone(&Local)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

fn print_timeline(selected: &[&Activity]) {
    let mut last_day = None;
    for activity in selected {
        // Day-end progress snapshots carry no time span; listed separately.
        if activity.progress.is_some() {
            continue;
        }
        let day = activity.t1.with_timezone(&Local).date_naive();
        if last_day != Some(day) {
            println!("{}", day.format("%x"));
            last_day = Some(day);
        }
        println!("  {}", describe_activity(activity));
    }

    let notes: Vec<_> = selected.iter().filter(|a| a.progress.is_some()).collect();
    if !notes.is_empty() {
        println!("Unfinished to-dos noted at day end:");
        for note in notes {
            println!("  {}", note.name);
        }
    }
}

fn print_category_totals(selected: &[&Activity]) {
    let totals = category_totals(selected);

    let mut entries: Vec<(Category, i64)> = totals.into_iter().collect();
    entries.sort_by_key(|(_, minutes)| std::cmp::Reverse(*minutes));
    let max = entries.first().map(|(_, m)| *m).unwrap_or(0).max(1);

    for (category, minutes) in entries {
        let width = (minutes * BAR_WIDTH as i64 / max) as usize;
        println!(
            "{:>13} {} {}",
            category.to_string(),
            category.colour().paint("█".repeat(width)),
            format_minutes(minutes)
        );
    }
}

fn category_totals(selected: &[&Activity]) -> HashMap<Category, i64> {
    let mut totals = HashMap::new();
    for activity in selected {
        *totals.entry(activity.category).or_insert(0) += activity.duration;
    }
    totals
}
