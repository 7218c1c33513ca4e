use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::db::Repository;
use crate::digest::generator::{TagDigestGenerator, TagDigestOutcome};
use crate::digest::window::{day_bounds, rolling_window, summary_anchor};
use crate::error::Result;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub generated: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Drives the daily summary pass over every active tag.
pub struct Orchestrator {
    repository: Arc<Repository>,
    generator: TagDigestGenerator,
    anchor_hour: u32,
}

impl Orchestrator {
    pub fn new(repository: Arc<Repository>, generator: TagDigestGenerator, anchor_hour: u32) -> Self {
        Self {
            repository,
            generator,
            anchor_hour,
        }
    }

    /// Generate summaries for every active tag that does not already have one
    /// for the reference day. One tag's failure never stops the others; only
    /// failing to read the tag list at all aborts the run.
    pub async fn run_for_all_tags(&self, reference: DateTime<Local>) -> Result<RunReport> {
        let tags = self.repository.active_tags().await?;
        let (day_start, day_end) = day_bounds(reference);
        let (window_start, window_end) = rolling_window(reference, self.anchor_hour);
        let summary_date = summary_anchor(reference, self.anchor_hour);

        let mut report = RunReport::default();
        for tag in &tags {
            let exists = match self
                .repository
                .summary_exists_for_day(&tag.tag, day_start, day_end)
                .await
            {
                Ok(exists) => exists,
                Err(e) => {
                    report.failed += 1;
                    error!(tag = %tag.tag, error = %e, "Could not check existing summary; continuing");
                    continue;
                }
            };
            if exists {
                report.skipped += 1;
                debug!(tag = %tag.tag, "Summary already exists for today");
                continue;
            }

            match self
                .generator
                .summarize_tag(&tag.tag, window_start, window_end, summary_date)
                .await
            {
                Ok(TagDigestOutcome::Generated { .. }) => report.generated += 1,
                Ok(TagDigestOutcome::NoNews) => report.empty += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(tag = %tag.tag, error = %e, "Tag summary failed; continuing");
                }
            }
        }

        info!(
            tags = tags.len(),
            generated = report.generated,
            skipped = report.skipped,
            empty = report.empty,
            failed = report.failed,
            "Daily summary run complete"
        );
        Ok(report)
    }

    /// Forced regeneration for one tag: no exists-check, errors propagate.
    pub async fn run_for_tag(
        &self,
        tag: &str,
        reference: DateTime<Local>,
    ) -> Result<TagDigestOutcome> {
        let (window_start, window_end) = rolling_window(reference, self.anchor_hour);
        let summary_date = summary_anchor(reference, self.anchor_hour);
        self.generator
            .summarize_tag(tag, window_start, window_end, summary_date)
            .await
    }
}
