use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::ai::{
    article_payload, classify_prompt, extract_summary, extract_tags, ChatApi,
    ARTICLE_SUMMARY_PROMPT,
};
use crate::db::Repository;
use crate::error::Result;
use crate::models::Article;

// Max in-flight chat calls during the summary backfill.
const PARALLEL_SUMMARIES: usize = 4;

/// Catch-up passes over articles the crawler delivered without a summary or
/// tags. Separate from the daily digest path, which aggregates per tag.
pub struct Backfill {
    repository: Arc<Repository>,
    api: Arc<dyn ChatApi>,
}

impl Backfill {
    pub fn new(repository: Arc<Repository>, api: Arc<dyn ChatApi>) -> Self {
        Self { repository, api }
    }

    /// Summarize every article that has none yet. Per-article failures are
    /// logged and skipped. Returns the number of articles updated.
    pub async fn summarize_pending_articles(&self) -> Result<usize> {
        let pending = self.repository.articles_without_summary().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let total = pending.len();
        let updated: usize = stream::iter(pending)
            .map(|article| {
                let repository = Arc::clone(&self.repository);
                let api = Arc::clone(&self.api);
                async move {
                    match summarize_article(&*api, &article).await {
                        Ok(summary) => {
                            match repository.set_article_summary(article.id, summary).await {
                                Ok(()) => true,
                                Err(e) => {
                                    warn!(article_id = article.id, error = %e, "Failed to store article summary");
                                    false
                                }
                            }
                        }
                        Err(e) => {
                            warn!(article_id = article.id, error = %e, "Failed to summarize article; skipping");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(PARALLEL_SUMMARIES)
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await;

        info!(total, updated, "Article summary backfill complete");
        Ok(updated)
    }

    /// Classify every untagged article against the active tag vocabulary.
    pub async fn tag_pending_articles(&self) -> Result<usize> {
        let pending = self.repository.articles_without_tags().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let vocabulary: Vec<String> = self
            .repository
            .active_tags()
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect();
        let prompt = classify_prompt(&vocabulary);

        let total = pending.len();
        let mut updated = 0usize;
        for article in pending {
            let payload = article_payload(std::slice::from_ref(&article))?;
            match self.api.chat(&prompt, &payload).await.and_then(|c| extract_tags(&c)) {
                Ok(tags) if !tags.is_empty() => {
                    self.repository.set_article_tags(article.id, tags).await?;
                    updated += 1;
                }
                Ok(_) => {
                    warn!(article_id = article.id, "Classifier returned no tags; skipping");
                }
                Err(e) => {
                    warn!(article_id = article.id, error = %e, "Failed to classify article; skipping");
                }
            }
        }

        info!(total, updated, "Article tag backfill complete");
        Ok(updated)
    }
}

async fn summarize_article(api: &dyn ChatApi, article: &Article) -> Result<String> {
    let payload = article_payload(std::slice::from_ref(article))?;
    let content = api.chat(ARTICLE_SUMMARY_PROMPT, &payload).await?;
    extract_summary(&content)
}
