//! Stats module - rating aggregation

mod aggregator;

pub use aggregator::{MonthlyTotal, ProductTotal, RatingAggregator};
