use chrono::NaiveDate;

use crate::models::PriceUpdate;

/// Format a date for display, e.g. "June 1, 2024"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Short form used inside ranges, e.g. "Mar 5"
pub fn format_date_short(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// One-line description of an update for confirmation prompts
pub fn describe_update(update: &PriceUpdate) -> String {
    match *update {
        PriceUpdate::Single { date, rate } => format!("{} at {} per night", format_date(date), rate),
        PriceUpdate::Range {
            start_date,
            end_date,
            rate,
        } => {
            let nights = update.nights();
            format!(
                "{} - {} ({} night{}) at {} per night",
                format_date_short(start_date),
                format_date(end_date),
                nights,
                if nights == 1 { "" } else { "s" },
                rate
            )
        }
    }
}
