use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::db::Repository;
use crate::digest::window::summary_anchor;
use crate::error::{AppError, Result};
use crate::models::{DailySummary, Subscriber};

pub const DIGEST_SUBJECT: &str = "Today's AI news digest";

#[derive(Debug, Clone)]
pub struct Digest {
    pub subject: String,
    pub html_body: String,
}

/// Builds one subscriber's digest out of the day's per-tag summaries.
pub struct DigestAssembler {
    repository: Arc<Repository>,
    anchor_hour: u32,
}

impl DigestAssembler {
    pub fn new(repository: Arc<Repository>, anchor_hour: u32) -> Self {
        Self {
            repository,
            anchor_hour,
        }
    }

    /// Sections follow the subscriber's interest-tag order; tags without a
    /// summary today are dropped. An empty result is `NoContent`, which
    /// callers treat as "skip this user", not as a fault.
    pub async fn assemble(
        &self,
        subscriber: &Subscriber,
        reference: DateTime<Local>,
    ) -> Result<Digest> {
        let date = summary_anchor(reference, self.anchor_hour);
        let summaries = self
            .repository
            .summaries_for_date(date, &subscriber.interest_tags)
            .await?;

        let ordered: Vec<&DailySummary> = subscriber
            .interest_tags
            .iter()
            .filter_map(|tag| summaries.iter().find(|summary| &summary.tag == tag))
            .collect();

        if ordered.is_empty() {
            return Err(AppError::NoContent);
        }

        Ok(Digest {
            subject: DIGEST_SUBJECT.to_string(),
            html_body: render_digest(&ordered),
        })
    }
}

fn render_digest(sections: &[&DailySummary]) -> String {
    let body: String = sections
        .iter()
        .map(|summary| {
            format!(
                "<h2>{} news</h2>\n<p>{}</p>\n",
                escape_html(&summary.tag),
                summary.summary.replace('\n', "<br>\n")
            )
        })
        .collect();

    format!(
        r#"<html>
  <head>
    <style>
      body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }}
      h2 {{ color: #2c3e50; border-bottom: 2px solid #eee; padding-bottom: 10px; margin-top: 30px; }}
      a {{ color: #3498db; }}
    </style>
  </head>
  <body>
{body}  </body>
</html>"#
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ANCHOR_HOUR: u32 = 6;

    fn subscriber(interest_tags: &[&str]) -> Subscriber {
        Subscriber {
            id: 1,
            email: "reader@example.com".to_string(),
            name: Some("Reader".to_string()),
            interest_tags: interest_tags.iter().map(|t| t.to_string()).collect(),
            is_subscribed: true,
            email_schedule_days: vec!["mon".to_string()],
            email_schedule_time: "08:00".to_string(),
            ai_prompt: None,
        }
    }

    fn reference() -> DateTime<Local> {
        use chrono::Timelike;
        Local::now().with_hour(12).unwrap().with_minute(0).unwrap()
    }

    #[tokio::test]
    async fn test_sections_follow_interest_tag_order() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let date = summary_anchor(reference(), ANCHOR_HOUR);
        repo.upsert_daily_summary(date, "경제", "economy digest", 4)
            .await
            .unwrap();
        repo.upsert_daily_summary(date, "IT", "it digest", 2).await.unwrap();

        let assembler = DigestAssembler::new(repo, ANCHOR_HOUR);
        let digest = assembler
            .assemble(&subscriber(&["IT", "경제", "사회"]), reference())
            .await
            .unwrap();

        let it_pos = digest.html_body.find("IT news").unwrap();
        let economy_pos = digest.html_body.find("경제 news").unwrap();
        assert!(it_pos < economy_pos);
        assert!(!digest.html_body.contains("사회"));
        assert_eq!(digest.subject, DIGEST_SUBJECT);
    }

    #[tokio::test]
    async fn test_no_summaries_is_no_content() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let assembler = DigestAssembler::new(repo, ANCHOR_HOUR);

        let err = assembler
            .assemble(&subscriber(&["IT"]), reference())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoContent));
    }

    #[tokio::test]
    async fn test_other_days_summaries_are_ignored() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let stale = Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap();
        repo.upsert_daily_summary(stale, "IT", "old digest", 1)
            .await
            .unwrap();

        let assembler = DigestAssembler::new(repo, ANCHOR_HOUR);
        let err = assembler
            .assemble(&subscriber(&["IT"]), reference())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoContent));
    }

    #[test]
    fn test_render_wraps_sections_in_template() {
        let summary = DailySummary {
            id: 1,
            date: Utc::now(),
            tag: "IT".to_string(),
            summary: "line one\nline two".to_string(),
            news_count: 2,
            created_at: Utc::now(),
        };
        let html = render_digest(&[&summary]);
        assert!(html.contains("<h2>IT news</h2>"));
        assert!(html.contains("line one<br>\nline two"));
        assert!(html.contains("font-family: Arial"));
    }
}
