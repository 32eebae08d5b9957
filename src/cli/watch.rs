//! Foreground reminder loop. Prints a nudge every reminder interval while the
//! day is open; stopped with Ctrl-C or by the day ending.

use ansi_term::Style;
use anyhow::Result;
use chrono::Local;
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    store::json_store::StateStore,
    tracker::{
        reminder::{ReminderEvent, ReminderModule},
        DayState, DayTracker,
    },
    utils::clock::DefaultClock,
};

pub async fn run_watch(tracker: &DayTracker<impl StateStore>) -> Result<()> {
    let DayState::Open { .. } = tracker.current_state().await? else {
        println!("No day in progress, nothing to watch.");
        return Ok(());
    };
    let settings = tracker.settings().await?;

    println!(
        "Reminding every {} minutes. Press Ctrl-C to stop.",
        settings.reminder_interval
    );

    let (sender, mut receiver) = mpsc::channel::<ReminderEvent>(4);
    let shutdown = CancellationToken::new();
    let module = ReminderModule::new(
        sender,
        shutdown.clone(),
        settings.reminder_interval,
        Box::new(DefaultClock),
    );

    let printer_shutdown = shutdown.clone();
    let printer = async move {
        let mut result = Ok(());
        while let Some(event) = receiver.recv().await {
            // The day may have been ended from another invocation.
            match tracker.current_state().await {
                Ok(DayState::Open { .. }) => {}
                Ok(DayState::Closed) => {
                    println!("The day has ended, stopping reminders.");
                    printer_shutdown.cancel();
                    break;
                }
                Err(e) => {
                    result = Err(e);
                    printer_shutdown.cancel();
                    break;
                }
            }
            let at = event.at.with_timezone(&Local);
            println!(
                "\u{7}{} it is {}, log what you have been doing",
                Style::new().bold().paint("Reminder:"),
                at.format("%H:%M")
            );
        }
        result
    };

    let (_, run_result, printer_result) =
        tokio::join!(detect_shutdown(shutdown), module.run(), printer);
    run_result?;
    printer_result?;
    Ok(())
}

/// Cancels the token once the process receives Ctrl-C; unblocks when someone
/// else cancels first.
async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => {},
    };
}
