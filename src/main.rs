use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tracing::info;

mod ai;
mod app;
mod cli;
mod config;
mod db;
mod digest;
mod email;
mod error;
mod models;
mod scheduler;

use app::App;
use cli::{Cli, Command};
use config::Config;
use digest::{compose_letter, day_bounds, local_noon, TagDigestOutcome};
use error::{AppError, Result};
use scheduler::SchedulerHandle;

// Article batch size for the letter flow.
const LETTER_ARTICLE_LIMIT: i64 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let app = Arc::new(App::new(&config).await?);

    match cli.command {
        Command::Run => {
            let handle = SchedulerHandle::start(Arc::clone(&app));
            info!("Scheduler running; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            handle.stop();
        }

        Command::Summarize => {
            let report = app.orchestrator.run_for_all_tags(Local::now()).await?;
            println!(
                "Summaries: {} generated, {} skipped, {} without news, {} failed",
                report.generated, report.skipped, report.empty, report.failed
            );
        }

        Command::SummarizeTag { tag } => {
            match app.orchestrator.run_for_tag(&tag, Local::now()).await? {
                TagDigestOutcome::Generated { news_count } => {
                    println!("Summary for {tag} regenerated from {news_count} articles");
                }
                TagDigestOutcome::NoNews => {
                    println!("No articles for {tag} in the current window");
                }
            }
        }

        Command::Backfill => {
            let summarized = app.backfill.summarize_pending_articles().await?;
            let tagged = app.backfill.tag_pending_articles().await?;
            println!("Backfill: {summarized} articles summarized, {tagged} articles tagged");
        }

        Command::Drain => {
            let report = app.queue.drain(config.schedule.drain_batch_size).await?;
            println!("Drain: {} sent, {} failed", report.sent, report.failed);
        }

        Command::Show { date, tag } => {
            let reference = match &date {
                Some(s) => {
                    let day = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                        anyhow::anyhow!("invalid date {s:?} (expected YYYY-MM-DD): {e}")
                    })?;
                    local_noon(day)
                }
                None => Local::now(),
            };
            let (day_start, day_end) = day_bounds(reference);
            let summaries = app
                .repository
                .summaries_for_day(day_start, day_end, tag.as_deref())
                .await?;
            if summaries.is_empty() {
                println!("No summaries for {}", reference.format("%Y-%m-%d"));
            }
            for summary in summaries {
                println!(
                    "[{}] {} articles\n{}\n",
                    summary.tag, summary.news_count, summary.summary
                );
            }
        }

        Command::Send { email } => {
            let subscriber = app
                .repository
                .subscriber_by_email(&email)
                .await?
                .ok_or_else(|| AppError::UnknownSubscriber(email.clone()))?;

            match app.assembler.assemble(&subscriber, Local::now()).await {
                Ok(digest) => {
                    app.queue
                        .enqueue(&subscriber.email, &digest.subject, &digest.html_body)
                        .await?;
                    let report = app.queue.drain(config.schedule.drain_batch_size).await?;
                    println!(
                        "Digest for {email} enqueued; drain sent {}, failed {}",
                        report.sent, report.failed
                    );
                }
                Err(AppError::NoContent) => {
                    println!("Nothing to send: no summaries today for {email}'s tags");
                }
                Err(e) => return Err(e),
            }
        }

        Command::Letter { email } => {
            let subscriber = app
                .repository
                .subscriber_by_email(&email)
                .await?
                .ok_or_else(|| AppError::UnknownSubscriber(email.clone()))?;
            let articles = app.repository.latest_articles(LETTER_ARTICLE_LIMIT).await?;
            let letter = compose_letter(&*app.chat, &subscriber, &articles).await?;
            println!("{letter}");
        }
    }

    Ok(())
}
