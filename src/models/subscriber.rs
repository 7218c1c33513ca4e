use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// A user as the delivery pipeline sees them. Settings are mutated by the
/// account UI elsewhere; this crate only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    /// Subscribed tags in the user's preferred display order.
    pub interest_tags: Vec<String>,
    pub is_subscribed: bool,
    /// Subset of {"mon".."sun"}.
    pub email_schedule_days: Vec<String>,
    /// Delivery time as "HH:MM", 24-hour.
    pub email_schedule_time: String,
    /// Optional custom briefing prompt for the letter flow.
    pub ai_prompt: Option<String>,
}

/// Weekday code as stored in `email_schedule_days`.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}
