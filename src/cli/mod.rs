pub mod day;
pub mod report;
pub mod tasks;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use report::{parse_moment, process_report_command, DateStyle, ReportCommand};
use tasks::{process_task_command, TaskCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    store::{
        entities::{Category, Settings},
        json_store::JsonFileStore,
    },
    tracker::DayTracker,
    utils::{clock::DefaultClock, dir::create_application_default_path, logging::enable_logging},
};

#[derive(Parser, Debug)]
#[command(name = "Daylog", version, long_about = None)]
#[command(about = "Personal day tracking and to-do management", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start a new day, anchoring the first activity at now")]
    Start,
    #[command(about = "Record an activity spanning from the anchor to now")]
    Log {
        name: String,
        #[arg(short, long, value_enum, default_value_t = Category::Other)]
        category: Category,
    },
    #[command(about = "End the day, noting progress for every unfinished to-do")]
    End {
        #[arg(
            long = "progress",
            value_parser = parse_progress,
            help = "Progress of an unfinished to-do as ID=PERCENT. Repeat per to-do"
        )]
        progress: Vec<(u64, u8)>,
    },
    #[command(about = "Show the day state and today's activities")]
    Status,
    #[command(
        name = "t0",
        about = "Move the anchor the next activity will span from"
    )]
    T0 {
        #[arg(help = "New anchor. Examples are \"10:30\", \"1 hour ago\"")]
        when: String,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(subcommand, about = "Manage the to-do list")]
    Task(TaskCommand),
    #[command(about = "Review how time was spent over a date range")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Show or change settings")]
    Settings {
        #[arg(
            long = "reminder-interval",
            value_parser = clap::value_parser!(u32).range(1..=120),
            help = "Minutes between reminders while a day is open"
        )]
        reminder_interval: Option<u32>,
    },
    #[command(about = "Print a reminder every interval until the day ends or Ctrl-C")]
    Watch,
}

fn parse_progress(value: &str) -> Result<(u64, u8), String> {
    let (id, percent) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected ID=PERCENT, got {value}"))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("Bad to-do id {id}: {e}"))?;
    let percent = percent
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("Bad percentage {percent}: {e}"))?;
    if percent > 100 {
        return Err(format!("Progress must be within 0-100, got {percent}"));
    }
    Ok((id, percent))
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_path = args
        .dir
        .map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&application_path, logging_level, args.log)?;

    let store = JsonFileStore::new(&application_path)?;
    let tracker = DayTracker::new(store, Box::new(DefaultClock));

    match args.commands {
        Commands::Start => day::start(&tracker).await,
        Commands::Log { name, category } => day::log(&tracker, &name, category).await,
        Commands::End { progress } => day::end(&tracker, progress).await,
        Commands::Status => day::status(&tracker).await,
        Commands::T0 { when, date_style } => {
            let moment = parse_moment(&when, date_style)?;
            day::move_anchor(&tracker, moment).await
        }
        Commands::Task(command) => process_task_command(&tracker, command).await,
        Commands::Report { command } => process_report_command(&tracker, command).await,
        Commands::Settings { reminder_interval } => {
            match reminder_interval {
                Some(reminder_interval) => {
                    tracker
                        .update_settings(Settings { reminder_interval })
                        .await?;
                    println!("Reminder interval set to {reminder_interval} minutes");
                }
                None => {
                    let settings = tracker.settings().await?;
                    println!(
                        "Reminder interval: {} minutes",
                        settings.reminder_interval
                    );
                }
            }
            Ok(())
        }
        Commands::Watch => watch::run_watch(&tracker).await,
    }
}
