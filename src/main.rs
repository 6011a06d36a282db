//! Review Insights - customer review analysis report
//!
//! Loads customer reviews from CSV, aggregates ratings per product and per
//! month, charts the monthly trend and exports an Excel summary.

mod charts;
mod config;
mod data;
mod error;
mod stats;
mod workbook;

use anyhow::{Context, Result};
use charts::{ChartRenderer, ChartStyle};
use config::ReportConfig;
use data::DataLoader;
use stats::RatingAggregator;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use workbook::WorkbookExporter;

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    run(&ReportConfig::default())
}

fn run(config: &ReportConfig) -> Result<()> {
    // Load
    info!(path = %config.input_path.display(), "loading reviews");
    let (df, mut table) = DataLoader::load_csv(&config.input_path).context("load stage failed")?;

    println!("Display five lines:");
    println!("\n{}\n", DataLoader::preview(&df, config.preview_rows));
    println!("Column information:");
    println!("\n{}", DataLoader::column_summary(&df));

    info!(
        rows = table.len(),
        total_rating = table.total_rating(),
        "reviews loaded"
    );

    // Aggregate
    let totals = RatingAggregator::sum_by_product(&table);
    let means = RatingAggregator::mean_by_product(&table);
    table.add_month_column().context("aggregate stage failed")?;
    let monthly = RatingAggregator::sum_by_month(&table).context("aggregate stage failed")?;
    info!(
        products = totals.len(),
        months = monthly.len(),
        "aggregates computed"
    );

    // Visualize
    let style = ChartStyle {
        figure_size: config.figure_size,
        dpi: config.dpi,
        ..ChartStyle::default()
    };
    let chart_path = ChartRenderer::render_monthly_trend(&monthly, &style, &config.chart_path)
        .context("render stage failed")?;
    info!(path = %chart_path.display(), dpi = style.dpi, "chart saved");
    if config.show_chart {
        ChartRenderer::show(&chart_path);
    }

    // Export
    let high_rated = table.high_rated(config.high_rating_threshold);
    let sheets = WorkbookExporter::report_sheets(
        &high_rated,
        &means,
        &totals,
        table.integral_ratings(),
    );
    WorkbookExporter::export(&sheets, &config.workbook_path).context("export stage failed")?;
    info!(
        path = %config.workbook_path.display(),
        high_rated = high_rated.len(),
        "workbook saved"
    );

    Ok(())
}
