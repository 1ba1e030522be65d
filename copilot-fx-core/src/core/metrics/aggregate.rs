use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use derive_more::Display;

use crate::core::metrics::DailyMetrics;

/// Summary statistics over a sequence of daily metric records.
#[derive(Debug, Display, Clone, PartialEq)]
#[display(fmt = "suggestions: {}, lines accepted: {}", total_suggestions, total_lines_accepted)]
pub struct SummaryStats {
    /// The total number of code suggestions within the records.
    pub total_suggestions: u64,
    /// The total number of accepted code lines within the records.
    pub total_lines_accepted: u64,
    /// The mean number of daily active users within the records.
    pub mean_active_users: f64,
    /// The acceptance rate percentage, [None] when no suggestions were made.
    pub acceptance_rate: Option<u32>,
}

/// The aggregated metrics of one calendar week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyMetrics {
    /// The last day (Sunday) of the week this bucket represents.
    pub week: NaiveDate,
    /// The total number of code suggestions within the week.
    pub total_suggestions: u64,
    /// The total number of accepted code lines within the week.
    pub total_lines_accepted: u64,
    /// The mean number of daily active users within the week.
    pub mean_active_users: f64,
    /// The acceptance rate percentage, [None] when no suggestions were made.
    pub acceptance_rate: Option<u32>,
}

/// Filter the given records to the inclusive `[start, end]` day range.
pub fn filter_range(records: &[DailyMetrics], start: NaiveDate, end: NaiveDate) -> Vec<DailyMetrics> {
    records
        .iter()
        .filter(|e| e.day >= start && e.day <= end)
        .cloned()
        .collect()
}

/// Compute the summary statistics over the given records.
pub fn summarize(records: &[DailyMetrics]) -> SummaryStats {
    let total_suggestions: u64 = records.iter().map(|e| e.total_suggestions_count).sum();
    let total_lines_accepted: u64 = records.iter().map(|e| e.total_lines_accepted).sum();

    SummaryStats {
        total_suggestions,
        total_lines_accepted,
        mean_active_users: mean_active_users(records),
        acceptance_rate: acceptance_rate(total_lines_accepted, total_suggestions),
    }
}

/// Bucket the given records into calendar weeks ending on Sunday.
///
/// Suggestion and accepted-line counters are summed per week, active users are averaged.
/// The returned buckets are ordered by week.
pub fn aggregate_weekly(records: &[DailyMetrics]) -> Vec<WeeklyMetrics> {
    let mut weeks: BTreeMap<NaiveDate, Vec<&DailyMetrics>> = BTreeMap::new();

    for record in records {
        weeks.entry(week_of(record.day)).or_default().push(record);
    }

    weeks
        .into_iter()
        .map(|(week, records)| {
            let total_suggestions: u64 = records.iter().map(|e| e.total_suggestions_count).sum();
            let total_lines_accepted: u64 = records.iter().map(|e| e.total_lines_accepted).sum();
            let active_users_sum: u64 = records.iter().map(|e| e.total_active_users).sum();

            WeeklyMetrics {
                week,
                total_suggestions,
                total_lines_accepted,
                mean_active_users: active_users_sum as f64 / records.len() as f64,
                acceptance_rate: acceptance_rate(total_lines_accepted, total_suggestions),
            }
        })
        .collect()
}

/// The acceptance rate percentage of the given counters.
///
/// The rate is `lines_accepted / suggestions * 100`, rounded half away from zero to an
/// integer percentage. Zero suggestions have no meaningful rate and return [None].
pub fn acceptance_rate(lines_accepted: u64, suggestions: u64) -> Option<u32> {
    if suggestions == 0 {
        return None;
    }

    Some((lines_accepted as f64 / suggestions as f64 * 100.0).round() as u32)
}

/// The Sunday ending the calendar week of the given day.
fn week_of(day: NaiveDate) -> NaiveDate {
    let days_until_sunday = 6 - day.weekday().num_days_from_monday() as i64;
    day + Duration::days(days_until_sunday)
}

fn mean_active_users(records: &[DailyMetrics]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }

    let total: u64 = records.iter().map(|e| e.total_active_users).sum();
    total as f64 / records.len() as f64
}
