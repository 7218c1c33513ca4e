use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ai::{article_payload, digest_prompt, ChatApi};
use crate::db::Repository;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagDigestOutcome {
    Generated { news_count: i64 },
    /// No articles in the window. Absence of news is not a failure.
    NoNews,
}

/// Generates the per-tag daily summary: window query, one chat call, one
/// (date, tag) upsert.
pub struct TagDigestGenerator {
    repository: Arc<Repository>,
    api: Arc<dyn ChatApi>,
}

impl TagDigestGenerator {
    pub fn new(repository: Arc<Repository>, api: Arc<dyn ChatApi>) -> Self {
        Self { repository, api }
    }

    /// Summarize `tag` over [window_start, window_end] and upsert the result
    /// under `summary_date`. Re-running for the same (summary_date, tag)
    /// overwrites the previous row. Errors come back tagged with the tag
    /// they belong to.
    pub async fn summarize_tag(
        &self,
        tag: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        summary_date: DateTime<Utc>,
    ) -> Result<TagDigestOutcome> {
        self.summarize_tag_inner(tag, window_start, window_end, summary_date)
            .await
            .map_err(|e| e.for_tag(tag))
    }

    async fn summarize_tag_inner(
        &self,
        tag: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        summary_date: DateTime<Utc>,
    ) -> Result<TagDigestOutcome> {
        let articles = self
            .repository
            .articles_by_tag_in_window(tag, window_start, window_end)
            .await?;

        if articles.is_empty() {
            debug!(tag, "No articles in window");
            return Ok(TagDigestOutcome::NoNews);
        }

        let news_count = articles.len() as i64;
        let payload = article_payload(&articles)?;
        let summary = self.api.chat(&digest_prompt(tag), &payload).await?;

        self.repository
            .upsert_daily_summary(summary_date, tag, &summary, news_count)
            .await?;

        info!(tag, news_count, "Daily summary generated");
        Ok(TagDigestOutcome::Generated { news_count })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::NewArticle;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Chat stub: canned reply, optional per-tag failures, call counter.
    pub(crate) struct MockChat {
        pub reply: String,
        pub fail_for: Vec<String>,
        pub calls: AtomicUsize,
    }

    impl MockChat {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail_for: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing_for(mut self, tag: &str) -> Self {
            self.fail_for.push(format!("《{tag}》"));
            self
        }
    }

    #[async_trait]
    impl ChatApi for MockChat {
        async fn chat(&self, system_prompt: &str, _user_content: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for marker in &self.fail_for {
                if system_prompt.contains(marker) {
                    return Err(AppError::ExternalService {
                        service: "summarization API",
                        status: 500,
                        body: "boom".to_string(),
                    });
                }
            }
            Ok(self.reply.clone())
        }
    }

    fn article(tags: &[&str], published_at: DateTime<Utc>) -> NewArticle {
        NewArticle {
            title: "headline".to_string(),
            content: "body".to_string(),
            url: "https://news.example/a".to_string(),
            source: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            published_at,
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 8, 4, 6, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap();
        let date = Utc.with_ymd_and_hms(2026, 8, 5, 6, 0, 0).unwrap();
        (start, end, date)
    }

    #[tokio::test]
    async fn test_empty_window_is_a_no_op() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let api = Arc::new(MockChat::replying("unused"));
        let generator = TagDigestGenerator::new(repo.clone(), api.clone());
        let (start, end, date) = window();

        let outcome = generator.summarize_tag("IT", start, end, date).await.unwrap();
        assert_eq!(outcome, TagDigestOutcome::NoNews);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert!(repo
            .summaries_for_date(date, &["IT".to_string()])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_generates_and_upserts_summary() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let (start, end, date) = window();
        repo.insert_article(article(&["IT"], start + chrono::Duration::hours(2)))
            .await
            .unwrap();
        repo.insert_article(article(&["IT", "AI"], start + chrono::Duration::hours(4)))
            .await
            .unwrap();

        let api = Arc::new(MockChat::replying("《IT》 digest text"));
        let generator = TagDigestGenerator::new(repo.clone(), api);

        let outcome = generator.summarize_tag("IT", start, end, date).await.unwrap();
        assert_eq!(outcome, TagDigestOutcome::Generated { news_count: 2 });

        let rows = repo
            .summaries_for_date(date, &["IT".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "《IT》 digest text");
        assert_eq!(rows[0].news_count, 2);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_instead_of_duplicating() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let (start, end, date) = window();
        repo.insert_article(article(&["IT"], start + chrono::Duration::hours(2)))
            .await
            .unwrap();

        let generator =
            TagDigestGenerator::new(repo.clone(), Arc::new(MockChat::replying("first")));
        generator.summarize_tag("IT", start, end, date).await.unwrap();

        let generator =
            TagDigestGenerator::new(repo.clone(), Arc::new(MockChat::replying("second")));
        generator.summarize_tag("IT", start, end, date).await.unwrap();

        let rows = repo
            .summaries_for_date(date, &["IT".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "second");
    }

    #[tokio::test]
    async fn test_failures_carry_the_tag() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let (start, end, date) = window();
        repo.insert_article(article(&["IT"], start + chrono::Duration::hours(2)))
            .await
            .unwrap();

        let api = Arc::new(MockChat::replying("unused").failing_for("IT"));
        let generator = TagDigestGenerator::new(repo.clone(), api);

        let err = generator.summarize_tag("IT", start, end, date).await.unwrap_err();
        match err {
            AppError::TagSummary { tag, .. } => assert_eq!(tag, "IT"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(repo
            .summaries_for_date(date, &["IT".to_string()])
            .await
            .unwrap()
            .is_empty());
    }
}
