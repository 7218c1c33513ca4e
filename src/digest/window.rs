use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// The anchor timestamp a day's summaries are keyed to: the reference date
/// at the anchor hour, local time.
pub fn summary_anchor(reference: DateTime<Local>, anchor_hour: u32) -> DateTime<Utc> {
    local_at_hour(reference.date_naive(), anchor_hour)
}

/// Article selection window for a summary run: from yesterday's anchor hour
/// up to the reference instant. Anchoring at a pre-dawn hour instead of
/// midnight keeps news published late in the prior cycle inside the window.
pub fn rolling_window(
    reference: DateTime<Local>,
    anchor_hour: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_at_hour(reference.date_naive() - Duration::days(1), anchor_hour);
    (start, reference.with_timezone(&Utc))
}

/// [00:00:00, 23:59:59] of the reference's calendar day, local time.
pub fn day_bounds(reference: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = reference.date_naive();
    (
        local_at_hour(date, 0),
        local_at_hour(date, 0) + Duration::days(1) - Duration::seconds(1),
    )
}

/// Midday local instant for a calendar date; a safe reference point for
/// whole-day queries.
pub fn local_noon(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_hms_opt(12, 0, 0).expect("midday is a valid time");
    naive
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

fn local_at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .expect("hour is validated to be 0-23");
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
