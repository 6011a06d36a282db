//! Report settings. Every run uses the defaults below; nothing is read
//! from the command line or the environment.

use std::path::PathBuf;

pub const INPUT_PATH: &str = "customer_reviews.csv";
pub const CHART_PATH: &str = "reviews.png";
pub const WORKBOOK_PATH: &str = "Analyze product reviews.xlsx";

/// Ratings strictly above this are exported as "most rated".
pub const HIGH_RATING_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub input_path: PathBuf,
    pub chart_path: PathBuf,
    pub workbook_path: PathBuf,
    pub high_rating_threshold: f64,
    pub preview_rows: usize,
    /// Figure size in inches (width, height).
    pub figure_size: (f64, f64),
    pub dpi: u32,
    /// Open the saved chart in the system image viewer.
    pub show_chart: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(INPUT_PATH),
            chart_path: PathBuf::from(CHART_PATH),
            workbook_path: PathBuf::from(WORKBOOK_PATH),
            high_rating_threshold: HIGH_RATING_THRESHOLD,
            preview_rows: 5,
            figure_size: (10.0, 5.0),
            dpi: 300,
            show_chart: true,
        }
    }
}
