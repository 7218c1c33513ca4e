use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A crawled news article. The crawler that populates these rows lives
/// outside this crate; the digest pipeline reads them by tag and time window
/// and only ever writes back the per-article `summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub crawled_at: DateTime<Utc>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
}
