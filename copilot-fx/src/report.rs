use chrono::NaiveDate;
use log::debug;

use copilot_fx_core::core::metrics::{aggregate_weekly, filter_range, summarize, MetricsReader};

/// Print a text report over the accumulated metrics history.
///
/// The reported range defaults to the full history when no explicit range is given.
pub fn run_report(reader: &MetricsReader, from: Option<NaiveDate>, to: Option<NaiveDate>, weekly: bool) {
    let history = reader.load_history();
    if history.is_empty() {
        println!("No metrics history found.");
        return;
    }

    let start = from.unwrap_or(history[0].day);
    let end = to.unwrap_or(history[history.len() - 1].day);
    debug!("Reporting metrics within {} - {}", start, end);

    let records = filter_range(&history, start, end);
    if records.is_empty() {
        println!("No metrics found within {} - {}.", start, end);
        return;
    }

    let stats = summarize(&records);
    println!("Metrics report {} - {}", start, end);
    println!("  Records:              {}", records.len());
    println!("  Total suggestions:    {}", stats.total_suggestions);
    println!("  Total lines accepted: {}", stats.total_lines_accepted);
    println!("  Mean active users:    {:.1}", stats.mean_active_users);
    println!("  Acceptance rate:      {}", format_rate(stats.acceptance_rate));

    if weekly {
        println!();
        println!(
            "  {:<12} {:>12} {:>15} {:>13} {:>6}",
            "Week", "Suggestions", "Lines accepted", "Active users", "Rate"
        );
        for week in aggregate_weekly(&records) {
            println!(
                "  {:<12} {:>12} {:>15} {:>13.1} {:>6}",
                week.week.to_string(),
                week.total_suggestions,
                week.total_lines_accepted,
                week.mean_active_users,
                format_rate(week.acceptance_rate)
            );
        }
    }
}

fn format_rate(rate: Option<u32>) -> String {
    rate.map(|e| format!("{}%", e)).unwrap_or_else(|| "n/a".to_string())
}
