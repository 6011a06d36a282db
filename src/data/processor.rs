//! Data Processor Module
//! Handles date parsing, month derivation and the high-rating filter.

use super::record::{Month, ReviewTable};
use crate::error::ReportError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a review date. Times of day are dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

impl ReviewTable {
    /// Parse every `date` and attach the derived day and month. Rows with an
    /// empty date get no month.
    ///
    /// All dates are parsed before any row is touched, so a failure leaves
    /// the table as it was.
    pub fn add_month_column(&mut self) -> Result<(), ReportError> {
        let days = self
            .reviews
            .iter()
            .enumerate()
            .map(|(i, review)| {
                review
                    .date
                    .as_deref()
                    .map(|raw| {
                        parse_date(raw).ok_or_else(|| {
                            ReportError::Format(format!(
                                "row {}: cannot parse date {:?}",
                                i + 1,
                                raw
                            ))
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (review, day) in self.reviews.iter_mut().zip(days) {
            review.day = day;
            review.month = day.map(Month::of);
        }
        self.has_month = true;
        Ok(())
    }

    /// Independent copy of the rows rated strictly above `threshold`, in
    /// source order. Rows without a rating never qualify. Parsed dates are
    /// rewritten as `YYYY-MM-DD`.
    pub fn high_rated(&self, threshold: f64) -> ReviewTable {
        let reviews = self
            .reviews
            .iter()
            .filter(|r| r.rating.is_some_and(|v| v > threshold))
            .cloned()
            .map(|mut r| {
                if let Some(day) = r.day {
                    r.date = Some(day.format("%Y-%m-%d").to_string());
                }
                r
            })
            .collect();

        ReviewTable {
            columns: self.columns.clone(),
            extra_columns: self.extra_columns.clone(),
            reviews,
            integral_ratings: self.integral_ratings,
            has_month: self.has_month,
        }
    }
}
