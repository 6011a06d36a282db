//! Rating Aggregator Module
//! Per-product totals and means, and the monthly rating trend.

use crate::data::{Month, ReviewTable};
use crate::error::ReportError;
use std::collections::{BTreeMap, HashMap};

/// Summary statistic for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotal {
    pub product_name: String,
    pub value: f64,
}

/// Total rating for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub month: Month,
    pub total: f64,
}

/// Decimal places kept for per-product means.
pub const MEAN_DECIMALS: i32 = 2;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub struct RatingAggregator;

impl RatingAggregator {
    /// Present ratings grouped by product, groups in first-seen order.
    ///
    /// Rows without a product are skipped. A product whose ratings are all
    /// empty still gets a group, with no values.
    fn group_by_product(table: &ReviewTable) -> Vec<(String, Vec<f64>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

        for review in table.reviews() {
            let Some(name) = review.product_name.as_deref() else {
                continue;
            };
            let slot = *index.entry(name).or_insert_with(|| {
                groups.push((name.to_string(), Vec::new()));
                groups.len() - 1
            });
            if let Some(rating) = review.rating {
                groups[slot].1.push(rating);
            }
        }
        groups
    }

    /// Stable descending sort; ties keep first-seen order.
    fn sort_descending(totals: &mut [ProductTotal]) {
        totals.sort_by(|a, b| b.value.total_cmp(&a.value));
    }

    /// Total rating per product, highest first.
    pub fn sum_by_product(table: &ReviewTable) -> Vec<ProductTotal> {
        let mut totals: Vec<ProductTotal> = Self::group_by_product(table)
            .into_iter()
            .map(|(product_name, ratings)| ProductTotal {
                product_name,
                value: ratings.iter().sum(),
            })
            .collect();
        Self::sort_descending(&mut totals);
        totals
    }

    /// Mean rating per product, highest first, rounded to two decimals.
    ///
    /// Ordering uses the unrounded mean so products whose means round to the
    /// same value still rank by their exact mean. Products without any rating
    /// have no mean and are left out.
    pub fn mean_by_product(table: &ReviewTable) -> Vec<ProductTotal> {
        let mut means: Vec<ProductTotal> = Self::group_by_product(table)
            .into_iter()
            .filter(|(_, ratings)| !ratings.is_empty())
            .map(|(product_name, ratings)| ProductTotal {
                product_name,
                value: ratings.iter().sum::<f64>() / ratings.len() as f64,
            })
            .collect();
        Self::sort_descending(&mut means);
        for m in &mut means {
            m.value = round_to(m.value, MEAN_DECIMALS);
        }
        means
    }

    /// Total rating per month in chronological order. Rows without a month
    /// are skipped.
    ///
    /// Requires [`ReviewTable::add_month_column`] to have run.
    pub fn sum_by_month(table: &ReviewTable) -> Result<Vec<MonthlyTotal>, ReportError> {
        if !table.has_month() {
            return Err(ReportError::Format(
                "month column has not been derived from dates".into(),
            ));
        }

        let mut by_month: BTreeMap<Month, f64> = BTreeMap::new();
        for review in table.reviews() {
            if let Some(month) = review.month {
                *by_month.entry(month).or_insert(0.0) += review.rating.unwrap_or(0.0);
            }
        }

        Ok(by_month
            .into_iter()
            .map(|(month, total)| MonthlyTotal { month, total })
            .collect())
    }
}
