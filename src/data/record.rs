//! Review record and table types.

use chrono::{Datelike, NaiveDate};
use std::fmt;

pub const PRODUCT_COLUMN: &str = "product_name";
pub const RATING_COLUMN: &str = "rating";
pub const DATE_COLUMN: &str = "date";
pub const MONTH_COLUMN: &str = "month";

/// A single value from a column the pipeline does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Rating cell, printed without a fraction when the source column was integral.
    pub fn rating(value: f64, integral: bool) -> Self {
        if integral && value.fract() == 0.0 {
            Cell::Int(value as i64)
        } else {
            Cell::Float(value)
        }
    }

    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, |s| Cell::Text(s.to_string()))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => f.write_str(&format_float(*v)),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => Ok(()),
        }
    }
}

/// Render a float the way a float column prints: whole values keep a `.0`.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// Calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One customer review. Empty cells in the file are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub product_name: Option<String>,
    pub rating: Option<f64>,
    /// Raw date text as read from the file.
    pub date: Option<String>,
    /// Values of the remaining input columns, aligned with
    /// [`ReviewTable::extra_columns`].
    pub extra: Vec<Cell>,
    pub day: Option<NaiveDate>,
    pub month: Option<Month>,
}

impl Review {
    pub fn new(product_name: impl Into<String>, rating: f64, date: impl Into<String>) -> Self {
        Self {
            product_name: Some(product_name.into()),
            rating: Some(rating),
            date: Some(date.into()),
            extra: Vec::new(),
            day: None,
            month: None,
        }
    }
}

/// The loaded reviews, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTable {
    pub(crate) columns: Vec<String>,
    pub(crate) extra_columns: Vec<String>,
    pub(crate) reviews: Vec<Review>,
    pub(crate) integral_ratings: bool,
    pub(crate) has_month: bool,
}

impl ReviewTable {
    pub fn new(
        columns: Vec<String>,
        extra_columns: Vec<String>,
        reviews: Vec<Review>,
        integral_ratings: bool,
    ) -> Self {
        Self {
            columns,
            extra_columns,
            reviews,
            integral_ratings,
            has_month: false,
        }
    }

    /// Build a table with only the three required columns.
    pub fn from_reviews(reviews: Vec<Review>) -> Self {
        let integral = reviews
            .iter()
            .all(|r| r.rating.map_or(true, |v| v.fract() == 0.0));
        let columns = [PRODUCT_COLUMN, RATING_COLUMN, DATE_COLUMN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self::new(columns, Vec::new(), reviews, integral)
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn integral_ratings(&self) -> bool {
        self.integral_ratings
    }

    pub fn has_month(&self) -> bool {
        self.has_month
    }

    /// Column names in output order: the input header, then `month` once derived.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.columns.clone();
        if self.has_month {
            names.push(MONTH_COLUMN.to_string());
        }
        names
    }

    /// One row of cells matching [`Self::column_names`].
    pub fn row_cells(&self, review: &Review) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .columns
            .iter()
            .map(|name| match name.as_str() {
                PRODUCT_COLUMN => Cell::text(review.product_name.as_deref()),
                RATING_COLUMN => review
                    .rating
                    .map_or(Cell::Empty, |v| Cell::rating(v, self.integral_ratings)),
                DATE_COLUMN => Cell::text(review.date.as_deref()),
                other => self
                    .extra_columns
                    .iter()
                    .position(|c| c == other)
                    .and_then(|i| review.extra.get(i).cloned())
                    .unwrap_or(Cell::Empty),
            })
            .collect();
        if self.has_month {
            cells.push(
                review
                    .month
                    .map(|m| Cell::Text(m.to_string()))
                    .unwrap_or(Cell::Empty),
            );
        }
        cells
    }

    /// Sum of every present rating.
    pub fn total_rating(&self) -> f64 {
        self.reviews.iter().filter_map(|r| r.rating).sum()
    }
}
