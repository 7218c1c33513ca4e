use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One AI-generated digest for a single tag on a single day.
///
/// `date` is the day's anchor timestamp (the configured anchor hour, not
/// midnight). Uniqueness on (date, tag) makes regeneration an overwrite
/// rather than a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub tag: String,
    pub summary: String,
    pub news_count: i64,
    pub created_at: DateTime<Utc>,
}
