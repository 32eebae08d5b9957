use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::clock::Clock;

/// A single reminder tick. The consumer decides how to surface it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub at: DateTime<Utc>,
}

/// Repeating reminder timer. Fires every `interval` while running; the only
/// state is active/inactive, controlled through the cancellation token.
pub struct ReminderModule {
    next: mpsc::Sender<ReminderEvent>,
    shutdown: CancellationToken,
    interval: Duration,
    clock: Box<dyn Clock>,
}

impl ReminderModule {
    pub fn new(
        next: mpsc::Sender<ReminderEvent>,
        shutdown: CancellationToken,
        interval_minutes: u32,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            shutdown,
            interval: Duration::from_secs(u64::from(interval_minutes) * 60),
            clock,
        }
    }

    /// Executes the timer event loop.
    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.clock.instant();
        loop {
            tick_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }

            let event = ReminderEvent {
                at: self.clock.time(),
            };
            debug!("Sending reminder {:?}", event);
            if self.next.send(event).await.is_err() {
                // Receiver gone means the consumer shut down first.
                info!("Reminder channel closed, stopping timer");
                return Ok(());
            }
        }
    }
}
