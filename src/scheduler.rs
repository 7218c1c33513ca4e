use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::App;
use crate::email::enqueue_due_digests;

/// Handle on the process-wide recurring trigger. `start` is idempotent:
/// while a scheduler is running, further calls return the same handle.
/// `stop` tears the loops down and frees the slot for a later `start`.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<Inner>,
}

struct Inner {
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

static ACTIVE: OnceLock<StdMutex<Option<SchedulerHandle>>> = OnceLock::new();

fn active_slot() -> &'static StdMutex<Option<SchedulerHandle>> {
    ACTIVE.get_or_init(|| StdMutex::new(None))
}

impl SchedulerHandle {
    pub fn start(app: Arc<App>) -> SchedulerHandle {
        let mut slot = active_slot().lock().expect("scheduler slot poisoned");
        if let Some(handle) = slot.as_ref() {
            info!("Scheduler already running");
            return handle.clone();
        }

        let tasks = vec![
            tokio::spawn(summary_loop(Arc::clone(&app))),
            tokio::spawn(delivery_loop(app)),
        ];

        let handle = SchedulerHandle {
            inner: Arc::new(Inner {
                tasks: StdMutex::new(tasks),
            }),
        };
        *slot = Some(handle.clone());
        info!("Scheduler started");
        handle
    }

    pub fn stop(&self) {
        let mut slot = active_slot().lock().expect("scheduler slot poisoned");
        for task in self.inner.tasks.lock().expect("task list poisoned").drain(..) {
            task.abort();
        }
        if slot
            .as_ref()
            .is_some_and(|handle| Arc::ptr_eq(&handle.inner, &self.inner))
        {
            *slot = None;
        }
        info!("Scheduler stopped");
    }
}

/// Fires the daily summary run when the local time reaches the configured
/// "HH:MM", then catches up articles missing their own summary. The loop
/// awaits its own work, so a run never overlaps itself.
async fn summary_loop(app: Arc<App>) {
    let mut last_fired: Option<String> = None;
    loop {
        sleep_to_next_minute().await;
        let now = Local::now();
        if now.format("%H:%M").to_string() != app.config.schedule.summary_time {
            continue;
        }
        let minute_key = now.format("%Y-%m-%d %H:%M").to_string();
        if last_fired.as_deref() == Some(minute_key.as_str()) {
            continue;
        }
        last_fired = Some(minute_key);

        if let Err(e) = app.orchestrator.run_for_all_tags(now).await {
            error!(error = %e, "Daily summary run failed");
        }
        if let Err(e) = app.backfill.summarize_pending_articles().await {
            error!(error = %e, "Article summary backfill failed");
        }
    }
}

/// Every minute: enqueue digests for subscribers due at this minute, then
/// drain the queue. Runs independently of the summary loop; the two touch
/// disjoint rows.
async fn delivery_loop(app: Arc<App>) {
    loop {
        sleep_to_next_minute().await;
        let now = Local::now();

        if let Err(e) = enqueue_due_digests(&app.repository, &app.assembler, &app.queue, now).await
        {
            error!(error = %e, "Digest enqueue pass failed");
        }
        if let Err(e) = app.queue.drain(app.config.schedule.drain_batch_size).await {
            error!(error = %e, "Queue drain failed");
        }
    }
}

async fn sleep_to_next_minute() {
    let ms_into_minute = Local::now().timestamp_millis().rem_euclid(60_000) as u64;
    tokio::time::sleep(Duration::from_millis(60_000 - ms_into_minute)).await;
}
