//! Handlers for the to-do list commands.

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;

use crate::{
    store::{document::CompletedFilter, entities::Task, json_store::StateStore},
    tracker::DayTracker,
};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    #[command(about = "Add a to-do")]
    Add { name: String },
    #[command(about = "Mark a to-do as completed")]
    Done { id: u64 },
    #[command(about = "Rename a to-do")]
    Edit {
        id: u64,
        #[arg(long)]
        name: String,
    },
    #[command(about = "Delete a to-do from both the open and the completed list")]
    Rm { id: u64 },
    #[command(about = "List to-dos")]
    List {
        #[arg(long, help = "Show completed to-dos instead of open ones")]
        completed: bool,
        #[arg(
            long,
            value_enum,
            help = "Time window for completed to-dos. Weeks start on Sunday"
        )]
        filter: Option<CompletedFilter>,
    },
}

pub async fn process_task_command(
    tracker: &DayTracker<impl StateStore>,
    command: TaskCommand,
) -> Result<()> {
    match command {
        TaskCommand::Add { name } => {
            let task = tracker.add_task(&name).await?;
            println!("Added to-do {}\t{}", task.id, task.name);
        }
        TaskCommand::Done { id } => match tracker.complete_task(id).await? {
            Some(task) => println!("Completed {}\t{}", task.id, task.name),
            None => println!("No open to-do with id {id}"),
        },
        TaskCommand::Edit { id, name } => {
            tracker.rename_task(id, &name).await?;
        }
        TaskCommand::Rm { id } => {
            tracker.delete_task(id).await?;
        }
        TaskCommand::List { completed, filter } => {
            if completed || filter.is_some() {
                let tasks = tracker.completed_tasks(filter, Local::now()).await?;
                print_tasks(&tasks, true);
            } else {
                let doc = tracker.snapshot().await?;
                let open: Vec<Task> = doc.open_tasks().cloned().collect();
                print_tasks(&open, false);
            }
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[Task], completed: bool) {
    if tasks.is_empty() {
        println!("Nothing here.");
        return;
    }
    for task in tasks {
        let stamp = if completed {
            task.completed_at.unwrap_or(task.created_at)
        } else {
            task.created_at
        };
        println!(
            "{}\t{}\t{}",
            task.id,
            stamp.with_timezone(&Local).format("%x %H:%M"),
            task.name
        );
    }
}
