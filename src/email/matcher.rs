use std::sync::Arc;

use chrono::{DateTime, Datelike, Local};
use tracing::{debug, error, info};

use crate::db::Repository;
use crate::digest::DigestAssembler;
use crate::email::queue::DeliveryQueue;
use crate::error::{AppError, Result};
use crate::models::{weekday_code, Subscriber};

/// Subscribed users whose weekly schedule names this weekday and this exact
/// minute. Evaluated against the minute-resolution scheduler tick, so each
/// minute is checked once.
pub async fn find_due_subscribers(
    repository: &Repository,
    now: DateTime<Local>,
) -> Result<Vec<Subscriber>> {
    let weekday = weekday_code(now.weekday());
    let hhmm = now.format("%H:%M").to_string();
    repository.due_subscribers(weekday, &hhmm).await
}

/// Producer side of the delivery queue: assemble and enqueue a digest for
/// every subscriber due at `now`. Users with nothing to send are skipped;
/// other per-user failures are logged and the loop continues. Returns the
/// number of digests enqueued.
pub async fn enqueue_due_digests(
    repository: &Repository,
    assembler: &DigestAssembler,
    queue: &Arc<DeliveryQueue>,
    now: DateTime<Local>,
) -> Result<usize> {
    let due = find_due_subscribers(repository, now).await?;
    if due.is_empty() {
        return Ok(0);
    }

    info!(count = due.len(), "Subscribers due for delivery");
    let mut enqueued = 0usize;
    for subscriber in &due {
        match assembler.assemble(subscriber, now).await {
            Ok(digest) => {
                match queue
                    .enqueue(&subscriber.email, &digest.subject, &digest.html_body)
                    .await
                {
                    Ok(_) => enqueued += 1,
                    Err(e) => {
                        error!(email = %subscriber.email, error = %e, "Failed to enqueue digest; continuing")
                    }
                }
            }
            Err(AppError::NoContent) => {
                debug!(email = %subscriber.email, "No summaries for subscribed tags; skipping");
            }
            Err(e) => {
                error!(email = %subscriber.email, error = %e, "Failed to assemble digest; continuing");
            }
        }
    }
    Ok(enqueued)
}
