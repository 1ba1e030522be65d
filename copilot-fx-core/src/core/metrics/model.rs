use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Represents the aggregated Copilot usage of an organization for one calendar day.
///
/// The `day` is the natural key of a record; a store holds at most one record per day.
/// Counters never carry a semantic difference between zero and missing, absent source
/// data is normalized to zero.
#[derive(Debug, Display, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[display(fmt = "day: {}, suggestions: {}, active users: {}", day, total_suggestions_count, total_active_users)]
pub struct DailyMetrics {
    /// The calendar day of the record, serialized as `YYYY-MM-DD`.
    pub day: NaiveDate,
    /// The total number of code suggestions shown.
    pub total_suggestions_count: u64,
    /// The total number of code suggestions accepted.
    pub total_acceptances_count: u64,
    /// The total number of code lines suggested.
    pub total_lines_suggested: u64,
    /// The total number of suggested code lines accepted.
    pub total_lines_accepted: u64,
    /// The total number of active users for the day.
    pub total_active_users: u64,
    /// The total number of chat suggestions accepted (insertions and copies).
    pub total_chat_acceptances: u64,
    /// The total number of chat turns.
    pub total_chat_turns: u64,
    /// The total number of active chat users for the day.
    pub total_active_chat_users: u64,
}

impl DailyMetrics {
    /// Create a new empty record for the given day with all counters at zero.
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            total_suggestions_count: 0,
            total_acceptances_count: 0,
            total_lines_suggested: 0,
            total_lines_accepted: 0,
            total_active_users: 0,
            total_chat_acceptances: 0,
            total_chat_turns: 0,
            total_active_chat_users: 0,
        }
    }
}
