//! Excel workbook export.
//! Writes the filtered reviews and both product aggregates as named sheets,
//! with every column sized to its widest value.

use crate::data::{Cell, ReviewTable};
use crate::error::ReportError;
use crate::stats::ProductTotal;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};
use std::path::Path;
use tracing::debug;

pub const HIGH_RATED_SHEET: &str = "Most_rated_products";
pub const MEAN_SHEET: &str = "average_product_rating";
pub const SUM_SHEET: &str = "product_evaluation";

/// Extra characters added to every column's content width.
pub const COLUMN_PADDING: usize = 2;

/// One named sheet of header plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Every column of the table, in table order.
    pub fn from_table(name: &str, table: &ReviewTable) -> Self {
        Self {
            name: name.to_string(),
            headers: table.column_names(),
            rows: table
                .reviews()
                .iter()
                .map(|r| table.row_cells(r))
                .collect(),
        }
    }

    /// A `product_name` / `rating` pair per product.
    pub fn from_totals(name: &str, totals: &[ProductTotal], integral: bool) -> Self {
        Self {
            name: name.to_string(),
            headers: vec!["product_name".to_string(), "rating".to_string()],
            rows: totals
                .iter()
                .map(|t| {
                    vec![
                        Cell::Text(t.product_name.clone()),
                        Cell::rating(t.value, integral),
                    ]
                })
                .collect(),
        }
    }

    /// Width per column: the longer of header and widest rendered value,
    /// plus [`COLUMN_PADDING`].
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                longest.max(header.chars().count()) + COLUMN_PADDING
            })
            .collect()
    }
}

pub struct WorkbookExporter;

impl WorkbookExporter {
    /// The three report sheets in output order. `integral_totals` is the
    /// rating column type of the table the totals were summed from.
    pub fn report_sheets(
        high_rated: &ReviewTable,
        means: &[ProductTotal],
        totals: &[ProductTotal],
        integral_totals: bool,
    ) -> Vec<Sheet> {
        vec![
            Sheet::from_table(HIGH_RATED_SHEET, high_rated),
            Sheet::from_totals(MEAN_SHEET, means, false),
            Sheet::from_totals(SUM_SHEET, totals, integral_totals),
        ]
    }

    /// Write `sheets` to `path`, replacing any existing file.
    pub fn export(sheets: &[Sheet], path: &Path) -> Result<(), ReportError> {
        let mut workbook = Self::build(sheets).map_err(|e| ReportError::from_xlsx(path, e))?;
        workbook
            .save(path)
            .map_err(|e| ReportError::from_xlsx(path, e))?;
        debug!(path = %path.display(), sheets = sheets.len(), "workbook saved");
        Ok(())
    }

    fn build(sheets: &[Sheet]) -> Result<Workbook, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
            }

            for (row_idx, row) in sheet.rows.iter().enumerate() {
                let excel_row = (row_idx + 1) as u32;
                for (col_idx, cell) in row.iter().enumerate() {
                    let col = col_idx as u16;
                    match cell {
                        Cell::Int(v) => {
                            worksheet.write_number(excel_row, col, *v as f64)?;
                        }
                        Cell::Float(v) => {
                            worksheet.write_number(excel_row, col, *v)?;
                        }
                        Cell::Text(s) => {
                            worksheet.write_string(excel_row, col, s)?;
                        }
                        Cell::Empty => {}
                    }
                }
            }

            for (col, width) in sheet.column_widths().into_iter().enumerate() {
                worksheet.set_column_width(col as u16, width as f64)?;
            }
        }

        Ok(workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Review;
    use crate::stats::RatingAggregator;
    use tempfile::TempDir;

    fn scenario() -> ReviewTable {
        let mut table = ReviewTable::from_reviews(vec![
            Review::new("A", 5.0, "2024-01-01"),
            Review::new("A", 1.0, "2024-01-15"),
            Review::new("B", 4.0, "2024-02-01"),
        ]);
        table.add_month_column().unwrap();
        table
    }

    fn sheets(table: &ReviewTable) -> Vec<Sheet> {
        WorkbookExporter::report_sheets(
            &table.high_rated(3.0),
            &RatingAggregator::mean_by_product(table),
            &RatingAggregator::sum_by_product(table),
            table.integral_ratings(),
        )
    }

    #[test]
    fn test_report_sheet_names_and_order() {
        let names: Vec<String> = sheets(&scenario()).into_iter().map(|s| s.name).collect();
        assert_eq!(names, [HIGH_RATED_SHEET, MEAN_SHEET, SUM_SHEET]);
    }

    #[test]
    fn test_high_rated_sheet_contents() {
        let sheet = &sheets(&scenario())[0];
        assert_eq!(sheet.headers, ["product_name", "rating", "date", "month"]);
        assert_eq!(
            sheet.rows,
            vec![
                vec![
                    Cell::Text("A".into()),
                    Cell::Int(5),
                    Cell::Text("2024-01-01".into()),
                    Cell::Text("2024-01".into()),
                ],
                vec![
                    Cell::Text("B".into()),
                    Cell::Int(4),
                    Cell::Text("2024-02-01".into()),
                    Cell::Text("2024-02".into()),
                ],
            ]
        );
    }

    #[test]
    fn test_aggregate_sheets() {
        let all = sheets(&scenario());
        assert_eq!(all[1].headers, ["product_name", "rating"]);
        assert_eq!(all[1].rows[0], vec![Cell::Text("B".into()), Cell::Float(4.0)]);
        assert_eq!(all[2].rows[0], vec![Cell::Text("A".into()), Cell::Int(6)]);
    }

    #[test]
    fn test_sum_sheet_follows_source_table_type() {
        let table = scenario();
        let totals = RatingAggregator::sum_by_product(&table);
        let mut filtered = table.high_rated(3.0);
        filtered.integral_ratings = false;

        let all = WorkbookExporter::report_sheets(&filtered, &[], &totals, true);
        assert_eq!(all[2].rows[0][1], Cell::Int(6));
        let all = WorkbookExporter::report_sheets(&filtered, &[], &totals, false);
        assert_eq!(all[2].rows[0][1], Cell::Float(6.0));
    }

    #[test]
    fn test_exported_workbook_holds_three_named_sheets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.xlsx");
        WorkbookExporter::export(&sheets(&scenario()), &path).unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
            "xl/worksheets/sheet3.xml",
        ] {
            assert!(names.contains(&part), "{part}");
        }

        let mut workbook_xml = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("xl/workbook.xml").unwrap(),
            &mut workbook_xml,
        )
        .unwrap();
        let positions: Vec<usize> = [HIGH_RATED_SHEET, MEAN_SHEET, SUM_SHEET]
            .iter()
            .map(|name| workbook_xml.find(&format!("name=\"{name}\"")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_column_widths_use_longest_of_header_and_values() {
        let sheet = Sheet {
            name: "s".into(),
            headers: vec!["product_name".into(), "rating".into(), "x".into()],
            rows: vec![
                vec![
                    Cell::Text("Ultra Wide Monitor 34in".into()),
                    Cell::Float(4.25),
                    Cell::Empty,
                ],
                vec![Cell::Text("Mouse".into()), Cell::Float(3.0), Cell::Empty],
            ],
        };
        // 23 chars of product name, header "rating" beats "4.25", "x" beats empty
        assert_eq!(sheet.column_widths(), vec![25, 8, 3]);
    }

    #[test]
    fn test_column_widths_of_empty_sheet() {
        let sheet = Sheet::from_totals(MEAN_SHEET, &[], false);
        assert_eq!(sheet.column_widths(), vec![14, 8]);
    }

    #[test]
    fn test_export_writes_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Analyze product reviews.xlsx");
        let report = sheets(&scenario());

        WorkbookExporter::export(&report, &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        assert_eq!(&first[0..2], b"PK");

        WorkbookExporter::export(&report, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 100);
    }

    #[test]
    fn test_export_to_missing_directory_is_data_access_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        let err = WorkbookExporter::export(&sheets(&scenario()), &path).unwrap_err();
        assert!(matches!(err, ReportError::DataAccess { .. }));
    }

    #[test]
    fn test_sheets_are_deterministic() {
        let table = scenario();
        assert_eq!(sheets(&table), sheets(&table));
        assert_eq!(
            RatingAggregator::sum_by_month(&table).unwrap(),
            RatingAggregator::sum_by_month(&table).unwrap()
        );
    }
}
