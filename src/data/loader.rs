//! CSV Data Loader Module
//! Handles CSV file loading and conversion into review records using Polars.

use super::record::{DATE_COLUMN, PRODUCT_COLUMN, RATING_COLUMN};
use super::{Cell, Review, ReviewTable};
use crate::error::ReportError;
use polars::prelude::*;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Handles CSV file loading with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Read the CSV at `path` into a DataFrame with inferred column types.
    pub fn read_frame(path: &Path) -> Result<DataFrame, ReportError> {
        // Surface missing or unreadable files before Polars folds them into
        // a generic compute error.
        let meta = std::fs::metadata(path).map_err(|e| ReportError::data_access(path, e))?;
        if !meta.is_file() {
            return Err(ReportError::data_access(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        File::open(path).map_err(|e| ReportError::data_access(path, e))?;

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        debug!(rows = df.height(), columns = df.width(), "csv parsed");
        Ok(df)
    }

    /// Load a CSV file and convert it to a review table.
    pub fn load_csv(path: &Path) -> Result<(DataFrame, ReviewTable), ReportError> {
        let df = Self::read_frame(path)?;
        let table = Self::to_table(&df)?;
        Ok((df, table))
    }

    /// Convert a DataFrame into typed review records, keeping row order.
    ///
    /// Empty `product_name`, `rating` or `date` cells are kept as `None`.
    pub fn to_table(df: &DataFrame) -> Result<ReviewTable, ReportError> {
        let product = Self::required(df, PRODUCT_COLUMN)?.cast(&DataType::String)?;
        let rating_col = Self::required(df, RATING_COLUMN)?;
        let date = Self::required(df, DATE_COLUMN)?.cast(&DataType::String)?;

        if df.height() > 0 && !Self::is_numeric(rating_col.dtype()) {
            return Err(ReportError::Format(format!(
                "column '{RATING_COLUMN}' is {} but must be numeric",
                rating_col.dtype()
            )));
        }
        // Integer columns with gaps print as floats.
        let integral_ratings =
            Self::is_integer(rating_col.dtype()) && rating_col.null_count() == 0;
        let rating = rating_col.cast(&DataType::Float64)?;

        let products = product.str()?;
        let ratings = rating.f64()?;
        let dates = date.str()?;

        let extra_columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| ![PRODUCT_COLUMN, RATING_COLUMN, DATE_COLUMN].contains(&name.as_str()))
            .collect();
        let extras = extra_columns
            .iter()
            .map(|name| df.column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut reviews = Vec::with_capacity(df.height());
        let mut incomplete = 0usize;
        for i in 0..df.height() {
            let review = Review {
                product_name: products.get(i).map(str::to_string),
                rating: ratings.get(i),
                date: dates.get(i).map(str::to_string),
                extra: extras
                    .iter()
                    .map(|col| col.get(i).map(Self::cell))
                    .collect::<Result<Vec<_>, _>>()?,
                day: None,
                month: None,
            };
            if review.product_name.is_none() || review.rating.is_none() || review.date.is_none() {
                incomplete += 1;
            }
            reviews.push(review);
        }
        if incomplete > 0 {
            warn!(rows = incomplete, "reviews with empty product, rating or date cells");
        }

        let columns = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Ok(ReviewTable::new(
            columns,
            extra_columns,
            reviews,
            integral_ratings,
        ))
    }

    /// First `rows` rows, formatted for the console.
    pub fn preview(df: &DataFrame, rows: usize) -> String {
        format!("{}", df.head(Some(rows)))
    }

    /// Column names, non-null counts and dtypes, one line per column.
    pub fn column_summary(df: &DataFrame) -> String {
        let height = df.height();
        let mut lines = vec![
            format!("{} entries, {} columns", height, df.width()),
            " #   Column               Non-Null Count  Dtype".to_string(),
            "---  ------               --------------  -----".to_string(),
        ];
        lines.extend(df.get_columns().iter().enumerate().map(|(i, col)| {
            format!(
                " {:<3} {:<20} {:>6} non-null     {}",
                i,
                col.name().as_str(),
                height - col.null_count(),
                col.dtype()
            )
        }));
        lines.join("\n") + "\n"
    }

    fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ReportError> {
        df.column(name)
            .map_err(|_| ReportError::Format(format!("missing required column '{name}'")))
    }

    fn is_integer(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    fn is_numeric(dtype: &DataType) -> bool {
        Self::is_integer(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
    }

    fn cell(value: AnyValue) -> Cell {
        match value {
            AnyValue::Null => Cell::Empty,
            AnyValue::Int8(_)
            | AnyValue::Int16(_)
            | AnyValue::Int32(_)
            | AnyValue::Int64(_)
            | AnyValue::UInt8(_)
            | AnyValue::UInt16(_)
            | AnyValue::UInt32(_)
            | AnyValue::UInt64(_) => value.extract::<i64>().map(Cell::Int).unwrap_or(Cell::Empty),
            AnyValue::Float32(v) => Cell::Float(v as f64),
            AnyValue::Float64(v) => Cell::Float(v),
            AnyValue::String(s) => Cell::Text(s.to_string()),
            AnyValue::StringOwned(s) => Cell::Text(s.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}
