use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Article, DailySummary, EmailQueueItem, EmailStatus, NewArticle, Subscriber, Tag,
};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    #[allow(dead_code)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article operations

    #[allow(dead_code)]
    pub async fn insert_article(&self, article: NewArticle) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let tags_json = serde_json::to_string(&article.tags).unwrap_or_default();
                conn.execute(
                    r#"INSERT INTO articles (title, content, url, source, tags, published_at, crawled_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        article.title,
                        article.content,
                        article.url,
                        article.source,
                        tags_json,
                        article.published_at.to_rfc3339(),
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Articles carrying `tag` published inside [start, end], oldest first.
    pub async fn articles_by_tag_in_window(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        let tag = tag.to_string();
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, url, source, tags, published_at, crawled_at, summary
                       FROM articles
                       WHERE EXISTS (SELECT 1 FROM json_each(articles.tags) WHERE json_each.value = ?1)
                         AND published_at >= ?2 AND published_at <= ?3
                       ORDER BY published_at ASC"#,
                )?;
                let articles = stmt
                    .query_map(
                        params![tag, start.to_rfc3339(), end.to_rfc3339()],
                        |row| Ok(article_from_row(row)),
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn articles_without_summary(&self) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, url, source, tags, published_at, crawled_at, summary
                       FROM articles
                       WHERE summary IS NULL
                       ORDER BY published_at ASC"#,
                )?;
                let articles = stmt
                    .query_map([], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn articles_without_tags(&self) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, url, source, tags, published_at, crawled_at, summary
                       FROM articles
                       WHERE json_array_length(tags) = 0
                       ORDER BY published_at ASC"#,
                )?;
                let articles = stmt
                    .query_map([], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Most recently published articles, newest first. Backs the letter flow.
    pub async fn latest_articles(&self, limit: i64) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, url, source, tags, published_at, crawled_at, summary
                       FROM articles
                       ORDER BY published_at DESC
                       LIMIT ?1"#,
                )?;
                let articles = stmt
                    .query_map(params![limit], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn set_article_summary(&self, id: i64, summary: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET summary = ?1 WHERE id = ?2",
                    params![summary, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn set_article_tags(&self, id: i64, tags: Vec<String>) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tags_json = serde_json::to_string(&tags).unwrap_or_default();
                conn.execute(
                    "UPDATE articles SET tags = ?1 WHERE id = ?2",
                    params![tags_json, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Tag operations

    pub async fn active_tags(&self) -> Result<Vec<Tag>> {
        let tags = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT tag, is_active FROM tags WHERE is_active = 1 ORDER BY tag")?;
                let tags = stmt
                    .query_map([], |row| {
                        Ok(Tag {
                            tag: row.get(0)?,
                            is_active: row.get::<_, i64>(1)? != 0,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(tags)
            })
            .await?;
        Ok(tags)
    }

    #[allow(dead_code)]
    pub async fn upsert_tag(&self, tag: &str, is_active: bool) -> Result<()> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO tags (tag, is_active) VALUES (?1, ?2)
                       ON CONFLICT(tag) DO UPDATE SET is_active = excluded.is_active"#,
                    params![tag, is_active],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Daily summary operations

    /// Create or overwrite the summary for (date, tag). The UNIQUE(date, tag)
    /// constraint makes re-running a generation pass an overwrite, never a
    /// duplicate, even if two runs race.
    pub async fn upsert_daily_summary(
        &self,
        date: DateTime<Utc>,
        tag: &str,
        summary: &str,
        news_count: i64,
    ) -> Result<()> {
        let tag = tag.to_string();
        let summary = summary.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO daily_summaries (date, tag, summary, news_count, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)
                       ON CONFLICT(date, tag) DO UPDATE SET
                           summary = excluded.summary,
                           news_count = excluded.news_count"#,
                    params![
                        date.to_rfc3339(),
                        tag,
                        summary,
                        news_count,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn summary_exists_for_day(
        &self,
        tag: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<bool> {
        let tag = tag.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM daily_summaries WHERE tag = ?1 AND date >= ?2 AND date <= ?3",
                    params![tag, day_start.to_rfc3339(), day_end.to_rfc3339()],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Summaries for an exact anchor date, restricted to `tags`. Order is
    /// whatever the store returns; callers that care reorder themselves.
    pub async fn summaries_for_date(
        &self,
        date: DateTime<Utc>,
        tags: &[String],
    ) -> Result<Vec<DailySummary>> {
        let tags_json = serde_json::to_string(tags)?;
        let summaries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, date, tag, summary, news_count, created_at
                       FROM daily_summaries
                       WHERE date = ?1
                         AND EXISTS (SELECT 1 FROM json_each(?2) WHERE json_each.value = daily_summaries.tag)"#,
                )?;
                let summaries = stmt
                    .query_map(params![date.to_rfc3339(), tags_json], |row| {
                        Ok(summary_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    /// User-facing day query: every summary whose anchor falls inside the
    /// given day, optionally restricted to one tag, ordered by tag.
    pub async fn summaries_for_day(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        tag: Option<&str>,
    ) -> Result<Vec<DailySummary>> {
        let tag = tag.map(|t| t.to_string());
        let summaries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, date, tag, summary, news_count, created_at
                       FROM daily_summaries
                       WHERE date >= ?1 AND date <= ?2
                         AND (?3 IS NULL OR tag = ?3)
                       ORDER BY tag ASC"#,
                )?;
                let summaries = stmt
                    .query_map(
                        params![day_start.to_rfc3339(), day_end.to_rfc3339(), tag],
                        |row| Ok(summary_from_row(row)),
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    // Subscriber operations

    #[allow(dead_code)]
    pub async fn insert_subscriber(&self, sub: Subscriber) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let interest_json = serde_json::to_string(&sub.interest_tags).unwrap_or_default();
                let days_json =
                    serde_json::to_string(&sub.email_schedule_days).unwrap_or_default();
                conn.execute(
                    r#"INSERT INTO users (email, name, interest_tags, is_subscribed, email_schedule_days, email_schedule_time, ai_prompt)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        sub.email,
                        sub.name,
                        interest_json,
                        sub.is_subscribed,
                        days_json,
                        sub.email_schedule_time,
                        sub.ai_prompt,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Subscribed users whose schedule names this weekday and this exact
    /// "HH:MM" delivery time.
    pub async fn due_subscribers(&self, weekday: &str, hhmm: &str) -> Result<Vec<Subscriber>> {
        let weekday = weekday.to_string();
        let hhmm = hhmm.to_string();
        let subscribers = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, email, name, interest_tags, is_subscribed, email_schedule_days, email_schedule_time, ai_prompt
                       FROM users
                       WHERE is_subscribed = 1
                         AND EXISTS (SELECT 1 FROM json_each(users.email_schedule_days) WHERE json_each.value = ?1)
                         AND email_schedule_time = ?2"#,
                )?;
                let subscribers = stmt
                    .query_map(params![weekday, hhmm], |row| Ok(subscriber_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscribers)
            })
            .await?;
        Ok(subscribers)
    }

    pub async fn subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let email = email.to_string();
        let subscriber = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, email, name, interest_tags, is_subscribed, email_schedule_days, email_schedule_time, ai_prompt
                       FROM users WHERE email = ?1"#,
                )?;
                let subscriber = stmt
                    .query_row(params![email], |row| Ok(subscriber_from_row(row)))
                    .optional()?;
                Ok(subscriber)
            })
            .await?;
        Ok(subscriber)
    }

    // Email queue operations

    pub async fn enqueue_email(&self, recipient: &str, subject: &str, body: &str) -> Result<i64> {
        let recipient = recipient.to_string();
        let subject = subject.to_string();
        let body = body.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO email_queue (recipient, subject, body, status, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        recipient,
                        subject,
                        body,
                        EmailStatus::Pending.as_str(),
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Up to `limit` PENDING items, oldest first.
    pub async fn pending_emails(&self, limit: i64) -> Result<Vec<EmailQueueItem>> {
        let emails = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, recipient, subject, body, status, created_at, sent_at, failure_reason
                       FROM email_queue
                       WHERE status = ?1
                       ORDER BY created_at ASC, id ASC
                       LIMIT ?2"#,
                )?;
                let emails = stmt
                    .query_map(params![EmailStatus::Pending.as_str(), limit], |row| {
                        Ok(email_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(emails)
            })
            .await?;
        Ok(emails)
    }

    pub async fn mark_email_sent(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_queue SET status = ?1, sent_at = ?2 WHERE id = ?3",
                    params![EmailStatus::Sent.as_str(), Utc::now().to_rfc3339(), id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_email_failed(&self, id: i64, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_queue SET status = ?1, failure_reason = ?2 WHERE id = ?3",
                    params![EmailStatus::Failed.as_str(), reason, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn email_by_id(&self, id: i64) -> Result<Option<EmailQueueItem>> {
        let email = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, recipient, subject, body, status, created_at, sent_at, failure_reason
                       FROM email_queue WHERE id = ?1"#,
                )?;
                let email = stmt
                    .query_row(params![id], |row| Ok(email_from_row(row)))
                    .optional()?;
                Ok(email)
            })
            .await?;
        Ok(email)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn json_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        content: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        source: row.get(4).unwrap(),
        tags: json_list(&row.get::<_, String>(5).unwrap_or_default()),
        published_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        crawled_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        summary: row.get(8).unwrap(),
    }
}

fn summary_from_row(row: &Row) -> DailySummary {
    DailySummary {
        id: row.get(0).unwrap(),
        date: row
            .get::<_, String>(1)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        tag: row.get(2).unwrap(),
        summary: row.get(3).unwrap(),
        news_count: row.get(4).unwrap(),
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn subscriber_from_row(row: &Row) -> Subscriber {
    Subscriber {
        id: row.get(0).unwrap(),
        email: row.get(1).unwrap(),
        name: row.get(2).unwrap(),
        interest_tags: json_list(&row.get::<_, String>(3).unwrap_or_default()),
        is_subscribed: row.get::<_, i64>(4).unwrap() != 0,
        email_schedule_days: json_list(&row.get::<_, String>(5).unwrap_or_default()),
        email_schedule_time: row.get(6).unwrap(),
        ai_prompt: row.get(7).unwrap(),
    }
}

fn email_from_row(row: &Row) -> EmailQueueItem {
    EmailQueueItem {
        id: row.get(0).unwrap(),
        recipient: row.get(1).unwrap(),
        subject: row.get(2).unwrap(),
        body: row.get(3).unwrap(),
        status: EmailStatus::parse(&row.get::<_, String>(4).unwrap())
            .unwrap_or(EmailStatus::Pending),
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        sent_at: row
            .get::<_, Option<String>>(6)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        failure_reason: row.get(7).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(title: &str, tags: &[&str], published_at: DateTime<Utc>) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: format!("{title} body"),
            url: format!("https://news.example/{title}"),
            source: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            published_at,
        }
    }

    #[tokio::test]
    async fn test_articles_filtered_by_tag_and_window() {
        let repo = Repository::open_in_memory().await.unwrap();
        let base = Utc.with_ymd_and_hms(2026, 8, 5, 7, 0, 0).unwrap();

        repo.insert_article(article("in-window", &["IT"], base)).await.unwrap();
        repo.insert_article(article("wrong-tag", &["경제"], base)).await.unwrap();
        repo.insert_article(article("too-old", &["IT"], base - chrono::Duration::days(3)))
            .await
            .unwrap();

        let hits = repo
            .articles_by_tag_in_window(
                "IT",
                base - chrono::Duration::hours(1),
                base + chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "in-window");
        assert_eq!(hits[0].tags, vec!["IT"]);
    }

    #[tokio::test]
    async fn test_daily_summary_upsert_is_idempotent() {
        let repo = Repository::open_in_memory().await.unwrap();
        let date = Utc.with_ymd_and_hms(2026, 8, 5, 6, 0, 0).unwrap();

        repo.upsert_daily_summary(date, "IT", "first", 3).await.unwrap();
        repo.upsert_daily_summary(date, "IT", "second", 5).await.unwrap();

        let rows = repo
            .summaries_for_date(date, &["IT".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "second");
        assert_eq!(rows[0].news_count, 5);
    }

    #[tokio::test]
    async fn test_summary_exists_for_day() {
        let repo = Repository::open_in_memory().await.unwrap();
        let date = Utc.with_ymd_and_hms(2026, 8, 5, 6, 0, 0).unwrap();
        repo.upsert_daily_summary(date, "IT", "text", 1).await.unwrap();

        let day_start = Utc.with_ymd_and_hms(2026, 8, 5, 0, 0, 0).unwrap();
        let day_end = Utc.with_ymd_and_hms(2026, 8, 5, 23, 59, 59).unwrap();
        assert!(repo.summary_exists_for_day("IT", day_start, day_end).await.unwrap());
        assert!(!repo.summary_exists_for_day("경제", day_start, day_end).await.unwrap());
    }

    #[tokio::test]
    async fn test_due_subscribers_matches_day_and_minute() {
        let repo = Repository::open_in_memory().await.unwrap();
        let sub = Subscriber {
            id: 0,
            email: "a@example.com".to_string(),
            name: None,
            interest_tags: vec!["IT".to_string()],
            is_subscribed: true,
            email_schedule_days: vec!["mon".to_string(), "wed".to_string()],
            email_schedule_time: "08:30".to_string(),
            ai_prompt: None,
        };
        repo.insert_subscriber(sub.clone()).await.unwrap();
        repo.insert_subscriber(Subscriber {
            email: "unsubscribed@example.com".to_string(),
            is_subscribed: false,
            ..sub.clone()
        })
        .await
        .unwrap();
        repo.insert_subscriber(Subscriber {
            email: "other-time@example.com".to_string(),
            email_schedule_time: "09:00".to_string(),
            ..sub
        })
        .await
        .unwrap();

        let due = repo.due_subscribers("wed", "08:30").await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].email, "a@example.com");

        assert!(repo.due_subscribers("tue", "08:30").await.unwrap().is_empty());
        assert!(repo.due_subscribers("wed", "08:31").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_queue_lifecycle() {
        let repo = Repository::open_in_memory().await.unwrap();
        let first = repo.enqueue_email("a@example.com", "s", "b").await.unwrap();
        let second = repo.enqueue_email("b@example.com", "s", "b").await.unwrap();

        let pending = repo.pending_emails(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first);

        repo.mark_email_sent(first).await.unwrap();
        repo.mark_email_failed(second, "connection refused").await.unwrap();

        assert!(repo.pending_emails(10).await.unwrap().is_empty());
        let failed = repo.email_by_id(second).await.unwrap().unwrap();
        assert_eq!(failed.status, EmailStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("connection refused"));
        let sent = repo.email_by_id(first).await.unwrap().unwrap();
        assert_eq!(sent.status, EmailStatus::Sent);
        assert!(sent.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_active_tags_excludes_inactive() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_tag("IT", true).await.unwrap();
        repo.upsert_tag("스포츠", false).await.unwrap();

        let tags = repo.active_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "IT");
        assert!(tags[0].is_active);
    }

    #[tokio::test]
    async fn test_pending_emails_respects_batch_limit() {
        let repo = Repository::open_in_memory().await.unwrap();
        for i in 0..5 {
            repo.enqueue_email(&format!("u{i}@example.com"), "s", "b")
                .await
                .unwrap();
        }
        assert_eq!(repo.pending_emails(3).await.unwrap().len(), 3);
    }
}
