//! Static Chart Renderer
//! Draws the monthly rating trend and writes it as a PNG.
//!
//! Layout:
//! 1. Title centered above the plot
//! 2. Line with circle markers, one point per month, grid on both axes
//! 3. Month labels under the x-axis, rotated 45° counter-clockwise
//! 4. Axis descriptions "Month" / "Total Ratings"
//!
//! Plotters only rotates text in quarter turns, so tick labels are drawn
//! into their own small bitmaps and composited onto the chart afterwards.

use crate::error::ReportError;
use crate::stats::MonthlyTotal;
use image::{imageops, Rgb, RgbImage};
use plotters::prelude::*;
use png::{BitDepth, ColorType, Encoder, EncodingError, PixelDimensions, Unit};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// Colors
const LINE: RGBColor = RGBColor(31, 119, 180);
const GRID: RGBColor = RGBColor(176, 176, 176);

/// Counter-clockwise rotation of x tick labels, in degrees.
pub const TICK_ROTATION: f64 = 45.0;
/// Channel value below which a pixel counts as drawn content.
const BACKGROUND_CUTOFF: u8 = 250;

/// Fixed appearance of the trend chart.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Inches.
    pub figure_size: (f64, f64),
    pub dpi: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: "Evaluations over time".to_string(),
            x_label: "Month".to_string(),
            y_label: "Total Ratings".to_string(),
            figure_size: (10.0, 5.0),
            dpi: 300,
        }
    }
}

impl ChartStyle {
    /// Convert typographic points to pixels at this DPI.
    pub fn px(&self, points: f64) -> u32 {
        (points * self.dpi as f64 / 72.0).round().max(1.0) as u32
    }

    /// Physical resolution recorded in the PNG header.
    pub fn pixels_per_meter(&self) -> u32 {
        (self.dpi as f64 / 0.0254).round() as u32
    }

    /// Plot canvas in pixels, before room is added for rotated labels.
    pub fn canvas_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_size;
        (
            (w * self.dpi as f64).round() as u32,
            (h * self.dpi as f64).round() as u32,
        )
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Render(e.to_string())
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Render the monthly totals to `path` as a PNG. Returns the written path.
    pub fn render_monthly_trend(
        data: &[MonthlyTotal],
        style: &ChartStyle,
        path: &Path,
    ) -> Result<PathBuf, ReportError> {
        if data.is_empty() {
            return Err(ReportError::EmptyInput("chart"));
        }

        let img = Self::draw(data, style)?;
        let pad = (0.1 * style.dpi as f64).round() as u32;
        let (x, y, w, h) =
            Self::content_bounds(&img, pad).unwrap_or((0, 0, img.width(), img.height()));
        let cropped = imageops::crop_imm(&img, x, y, w, h).to_image();

        Self::write_png(&cropped, style.pixels_per_meter(), path)?;

        debug!(width = w, height = h, "chart cropped");
        Ok(path.to_path_buf())
    }

    /// Open the saved chart in the system image viewer.
    pub fn show(path: &Path) {
        if let Err(e) = open::that(path) {
            warn!(path = %path.display(), error = %e, "could not open chart viewer");
        }
    }

    /// Encode `img` as an 8-bit RGB PNG with its physical resolution set.
    pub fn write_png(img: &RgbImage, pixels_per_meter: u32, path: &Path) -> Result<(), ReportError> {
        let png_err = |e: EncodingError| match e {
            EncodingError::IoError(source) => ReportError::data_access(path, source),
            other => render_err(other),
        };

        let file = File::create(path).map_err(|e| ReportError::data_access(path, e))?;
        let mut encoder = Encoder::new(BufWriter::new(file), img.width(), img.height());
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_pixel_dims(Some(PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: Unit::Meter,
        }));

        let mut writer = encoder.write_header().map_err(png_err)?;
        writer.write_image_data(img.as_raw()).map_err(png_err)?;
        writer.finish().map_err(png_err)
    }

    fn draw(data: &[MonthlyTotal], style: &ChartStyle) -> Result<RgbImage, ReportError> {
        let (width, plot_height) = style.canvas_size();
        let labels: Vec<String> = data.iter().map(|m| m.month.to_string()).collect();

        let tick_font = FontDesc::new(FontFamily::SansSerif, style.px(10.0) as f64, FontStyle::Normal);
        let label_boxes = labels
            .iter()
            .map(|l| tick_font.box_size(l))
            .collect::<Result<Vec<_>, _>>()
            .map_err(render_err)?;
        let rotated_height = label_boxes
            .iter()
            .map(|&(w, h)| Self::rotated_extent(w + 4, h + 4, TICK_ROTATION).1)
            .max()
            .unwrap_or(0);

        let tick_pad = style.px(3.5);
        let desc_height = style.px(14.0);
        let label_area = rotated_height + tick_pad + desc_height;
        let height = plot_height + rotated_height;

        let (y_lo, y_hi) = Self::value_range(data);
        let n = data.len();
        let x_margin = ((n - 1) as f64 * 0.05).max(0.5);
        let x_range = -x_margin..(n - 1) as f64 + x_margin;

        let mut buffer = vec![255u8; (width * height * 3) as usize];
        let ticks: Vec<(i32, i32)> = {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let font_px = style.px(10.0) as f64;
            let mut chart = ChartBuilder::on(&root)
                .caption(&style.title, ("sans-serif", style.px(12.0) as f64))
                .margin(style.px(10.0))
                .x_label_area_size(label_area)
                .y_label_area_size(style.px(40.0))
                .build_cartesian_2d(x_range, y_lo..y_hi)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_label_formatter(&|_: &f64| String::new())
                .set_tick_mark_size(LabelAreaPosition::Bottom, 0)
                .y_label_formatter(&|v: &f64| Self::format_tick(*v))
                .label_style(("sans-serif", font_px))
                .axis_desc_style(("sans-serif", font_px))
                .x_desc(style.x_label.as_str())
                .y_desc(style.y_label.as_str())
                .bold_line_style(GRID.stroke_width(style.px(0.8)))
                .max_light_lines(0)
                .axis_style(BLACK.stroke_width(style.px(0.8)))
                .draw()
                .map_err(render_err)?;

            // Vertical grid lines at each month.
            chart
                .draw_series((0..n).map(|i| {
                    PathElement::new(
                        vec![(i as f64, y_lo), (i as f64, y_hi)],
                        GRID.stroke_width(style.px(0.8)),
                    )
                }))
                .map_err(render_err)?;

            let points: Vec<(f64, f64)> = data
                .iter()
                .enumerate()
                .map(|(i, m)| (i as f64, m.total))
                .collect();
            chart
                .draw_series(LineSeries::new(
                    points.iter().copied(),
                    LINE.stroke_width(style.px(1.5)),
                ))
                .map_err(render_err)?;
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&p| Circle::new(p, style.px(3.0), LINE.filled())),
                )
                .map_err(render_err)?;

            let ticks: Vec<(i32, i32)> = (0..n)
                .map(|i| chart.backend_coord(&(i as f64, y_lo)))
                .collect();
            let tick_len = style.px(3.5) as i32;
            for &(x, y) in &ticks {
                root.draw(&PathElement::new(
                    vec![(x, y), (x, y + tick_len)],
                    BLACK.stroke_width(style.px(0.8)),
                ))
                .map_err(render_err)?;
            }

            root.present().map_err(render_err)?;
            ticks
        };

        let mut img = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ReportError::Render("chart buffer size mismatch".into()))?;

        for ((label, &(w, h)), &(x, y)) in labels.iter().zip(&label_boxes).zip(&ticks) {
            let glyphs = Self::text_bitmap(label, &tick_font, w + 4, h + 4)?;
            Self::blit_rotated(
                &mut img,
                &glyphs,
                TICK_ROTATION,
                x as i64,
                (y + tick_pad as i32) as i64,
            );
        }
        Ok(img)
    }

    /// Y-axis range with a 5% margin on each side.
    fn value_range(data: &[MonthlyTotal]) -> (f64, f64) {
        let min = data.iter().map(|m| m.total).fold(f64::INFINITY, f64::min);
        let max = data.iter().map(|m| m.total).fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        let pad = if span > 0.0 {
            span * 0.05
        } else {
            (max.abs() * 0.05).max(1.0)
        };
        (min - pad, max + pad)
    }

    fn format_tick(v: f64) -> String {
        if v.fract().abs() < 1e-9 {
            format!("{v:.0}")
        } else {
            format!("{v:.1}")
        }
    }

    /// Render `text` black-on-white into its own bitmap.
    fn text_bitmap(text: &str, font: &FontDesc, w: u32, h: u32) -> Result<RgbImage, ReportError> {
        let mut buffer = vec![255u8; (w * h * 3) as usize];
        {
            let area = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
            let style = TextStyle::from(font.clone()).color(&BLACK);
            area.draw_text(text, &style, (2, 2)).map_err(render_err)?;
            area.present().map_err(render_err)?;
        }
        RgbImage::from_raw(w, h, buffer)
            .ok_or_else(|| ReportError::Render("label buffer size mismatch".into()))
    }

    /// Bounding box size of a `w` x `h` rectangle rotated by `degrees`.
    pub fn rotated_extent(w: u32, h: u32, degrees: f64) -> (u32, u32) {
        let theta = degrees.to_radians();
        let (c, s) = (theta.cos().abs(), theta.sin().abs());
        let (w, h) = (w as f64, h as f64);
        ((w * c + h * s).round() as u32, (w * s + h * c).round() as u32)
    }

    /// Composite `src` onto `dst` rotated counter-clockwise by `degrees`.
    ///
    /// The rotated bounding box is centred on `center_x` with its top edge at
    /// `top`. Destination pixels only ever get darker.
    pub fn blit_rotated(dst: &mut RgbImage, src: &RgbImage, degrees: f64, center_x: i64, top: i64) {
        let (sw, sh) = (src.width() as f64, src.height() as f64);
        let (bw, bh) = Self::rotated_extent(src.width(), src.height(), degrees);
        let theta = degrees.to_radians();
        let (cos, sin) = (theta.cos(), theta.sin());
        let left = center_x - bw as i64 / 2;

        for dy in 0..bh {
            for dx in 0..bw {
                let u = dx as f64 + 0.5 - bw as f64 / 2.0;
                let v = dy as f64 + 0.5 - bh as f64 / 2.0;
                let sx = u * cos - v * sin + sw / 2.0;
                let sy = u * sin + v * cos + sh / 2.0;
                if sx < 0.0 || sy < 0.0 || sx >= sw || sy >= sh {
                    continue;
                }
                let (tx, ty) = (left + dx as i64, top + dy as i64);
                if tx < 0 || ty < 0 || tx >= dst.width() as i64 || ty >= dst.height() as i64 {
                    continue;
                }

                let s = src.get_pixel(sx as u32, sy as u32);
                let d = dst.get_pixel_mut(tx as u32, ty as u32);
                *d = Rgb([d[0].min(s[0]), d[1].min(s[1]), d[2].min(s[2])]);
            }
        }
    }

    /// Box around everything that is not background, grown by `pad` and
    /// clamped to the image. `None` for a blank image.
    pub fn content_bounds(img: &RgbImage, pad: u32) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;

        for (x, y, p) in img.enumerate_pixels() {
            if p.0.iter().any(|&c| c < BACKGROUND_CUTOFF) {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if !found {
            return None;
        }

        let x0 = min_x.saturating_sub(pad);
        let y0 = min_y.saturating_sub(pad);
        let x1 = (max_x + pad).min(img.width() - 1);
        let y1 = (max_y + pad).min(img.height() - 1);
        Some((x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dark_pixels(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_style_defaults() {
        let style = ChartStyle::default();
        assert_eq!(style.canvas_size(), (3000, 1500));
        assert_eq!(style.px(72.0), 300);
        assert_eq!(style.title, "Evaluations over time");
        assert_eq!(style.x_label, "Month");
        assert_eq!(style.y_label, "Total Ratings");
    }

    #[test]
    fn test_empty_series_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.png");
        let err = ChartRenderer::render_monthly_trend(&[], &ChartStyle::default(), &path)
            .unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput(_)));
        assert!(!path.exists());
    }

    fn png_info(path: &Path) -> (u32, u32, PixelDimensions) {
        let reader = png::Decoder::new(File::open(path).unwrap())
            .read_info()
            .unwrap();
        let info = reader.info();
        (info.width, info.height, info.pixel_dims.unwrap())
    }

    #[test]
    fn test_write_png_records_dpi() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.png");
        let img = RgbImage::from_pixel(4, 3, Rgb([0, 0, 0]));
        let ppm = ChartStyle::default().pixels_per_meter();
        assert_eq!(ppm, 11811);

        ChartRenderer::write_png(&img, ppm, &path).unwrap();
        let (w, h, dims) = png_info(&path);
        assert_eq!((w, h), (4, 3));
        assert_eq!((dims.xppu, dims.yppu), (11811, 11811));
        assert!(matches!(dims.unit, Unit::Meter));
    }

    #[test]
    fn test_write_png_to_missing_directory_is_data_access_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("tiny.png");
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let err = ChartRenderer::write_png(&img, 11811, &path).unwrap_err();
        assert!(matches!(err, ReportError::DataAccess { .. }));
    }

    #[test]
    fn test_render_monthly_trend_writes_cropped_300_dpi_png() {
        use crate::data::Month;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.png");
        let data: Vec<MonthlyTotal> = (1..=6)
            .map(|m| MonthlyTotal {
                month: Month { year: 2024, month: m },
                total: (m * 3 % 7) as f64,
            })
            .collect();

        let written =
            ChartRenderer::render_monthly_trend(&data, &ChartStyle::default(), &path).unwrap();
        assert_eq!(written, path);

        let (w, h, dims) = png_info(&path);
        assert!(w > 1000 && w <= 3000, "width {w}");
        assert!(h > 500 && h < 2500, "height {h}");
        assert_eq!((dims.xppu, dims.yppu), (11811, 11811));
    }

    #[test]
    fn test_rotated_extent() {
        assert_eq!(ChartRenderer::rotated_extent(10, 2, 0.0), (10, 2));
        assert_eq!(ChartRenderer::rotated_extent(10, 2, 90.0), (2, 10));
        // (10 + 2) * cos 45°
        assert_eq!(ChartRenderer::rotated_extent(10, 2, 45.0), (8, 8));
    }

    #[test]
    fn test_blit_without_rotation_copies_pixels() {
        let mut dst = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        let src = RgbImage::from_pixel(10, 2, Rgb([0, 0, 0]));
        ChartRenderer::blit_rotated(&mut dst, &src, 0.0, 10, 4);
        let dark = dark_pixels(&dst);
        assert_eq!(dark.len(), 20);
        assert!(dark.iter().all(|&(x, y)| (5..15).contains(&x) && (4..6).contains(&y)));
    }

    #[test]
    fn test_blit_quarter_turn_stands_bar_upright() {
        let mut dst = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        let src = RgbImage::from_pixel(10, 2, Rgb([0, 0, 0]));
        ChartRenderer::blit_rotated(&mut dst, &src, 90.0, 10, 0);
        let dark = dark_pixels(&dst);
        assert_eq!(dark.len(), 20);
        assert!(dark.iter().all(|&(x, y)| (9..11).contains(&x) && y < 10));
    }

    #[test]
    fn test_blit_never_lightens() {
        let mut dst = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let src = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        ChartRenderer::blit_rotated(&mut dst, &src, TICK_ROTATION, 4, 0);
        assert_eq!(dark_pixels(&dst).len(), 64);
    }

    #[test]
    fn test_content_bounds_pads_and_clamps() {
        let mut img = RgbImage::from_pixel(100, 50, Rgb([255, 255, 255]));
        img.put_pixel(10, 20, Rgb([0, 0, 0]));
        img.put_pixel(30, 25, Rgb([0, 0, 0]));
        assert_eq!(
            ChartRenderer::content_bounds(&img, 5),
            Some((5, 15, 31, 16))
        );

        img.put_pixel(99, 49, Rgb([10, 10, 10]));
        assert_eq!(
            ChartRenderer::content_bounds(&img, 5),
            Some((5, 15, 95, 35))
        );
    }

    #[test]
    fn test_content_bounds_blank_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        assert_eq!(ChartRenderer::content_bounds(&img, 3), None);
    }

    #[test]
    fn test_value_range_and_ticks() {
        use crate::data::Month;
        let data = vec![
            MonthlyTotal { month: Month { year: 2024, month: 1 }, total: 10.0 },
            MonthlyTotal { month: Month { year: 2024, month: 2 }, total: 30.0 },
        ];
        assert_eq!(ChartRenderer::value_range(&data), (9.0, 31.0));

        let flat = vec![MonthlyTotal { month: Month { year: 2024, month: 1 }, total: 4.0 }];
        assert_eq!(ChartRenderer::value_range(&flat), (3.0, 5.0));

        assert_eq!(ChartRenderer::format_tick(12.0), "12");
        assert_eq!(ChartRenderer::format_tick(12.5), "12.5");
    }
}
