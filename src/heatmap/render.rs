use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, register_font};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::{HOUR_SLOTS, HeatmapMatrix, NYE_HOURS};

const TITLE: &str = "Hourly Pedestrian Traffic on New Year's Eve at Limmatquai (17:00-07:00)";
const FONT_FAMILY: &str = "sans-serif";

/// Font file currently registered under [`FONT_FAMILY`].
static REGISTERED_FONT: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Yellow-orange-red ramp, low to high.
const COLOR_STOPS: [(u8, u8, u8); 5] = [
    (255, 255, 204),
    (254, 217, 118),
    (253, 141, 60),
    (227, 26, 28),
    (128, 0, 38),
];

/// Draws a [`HeatmapMatrix`] to an image file.
pub trait HeatmapRenderer {
    fn render(&self, matrix: &HeatmapMatrix, path: &Path) -> Result<()>;
}

/// PNG output through `plotters`, 15 × 8 inches at 300 DPI by default.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
    pub font_path: PathBuf,
}

impl PlottersRenderer {
    pub fn new(font_path: impl Into<PathBuf>) -> Self {
        Self {
            width: 4500,
            height: 2400,
            font_path: font_path.into(),
        }
    }

    /// Registers the font file with plotters unless it is already the
    /// registered one, so repeated renders read and leak it only once.
    fn load_font(&self) -> Result<()> {
        let mut registered = REGISTERED_FONT
            .lock()
            .map_err(|_| anyhow!("font registry lock poisoned"))?;
        if registered.as_deref() == Some(self.font_path.as_path()) {
            return Ok(());
        }

        let bytes = std::fs::read(&self.font_path)
            .with_context(|| format!("reading font {}", self.font_path.display()))?;
        // plotters keeps registered fonts for the life of the process.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        register_font(FONT_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| anyhow!("{} is not a usable font", self.font_path.display()))?;

        debug!(font = %self.font_path.display(), "Font registered");
        *registered = Some(self.font_path.clone());
        Ok(())
    }
}

impl HeatmapRenderer for PlottersRenderer {
    #[tracing::instrument(skip(self, matrix), fields(seasons = matrix.seasons().len()))]
    fn render(&self, matrix: &HeatmapMatrix, path: &Path) -> Result<()> {
        if matrix.is_empty() {
            return Err(anyhow!("nothing to render"));
        }
        self.load_font()?;

        let (w, h) = (self.width as i32, self.height as i32);
        let unit = (h / 100).max(4);
        let (left, right, top, bottom) = (unit * 14, unit * 16, unit * 8, unit * 9);

        let rows = matrix.seasons().len() as i32;
        let cols = HOUR_SLOTS as i32;
        let cell_w = (w - left - right) / cols;
        let cell_h = (h - top - bottom) / rows;
        let grid_right = left + cell_w * cols;
        let grid_bottom = top + cell_h * rows;
        let max = matrix.max_value();

        let font = |size: i32| (FONT_FAMILY, size as f64).into_font();
        let centered = Pos::new(HPos::Center, VPos::Center);

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        root.draw(&Text::new(
            TITLE,
            (w / 2, top / 2),
            font(unit * 2).color(&BLACK).pos(centered),
        ))?;

        for (r, (season, values)) in matrix.seasons().iter().zip(matrix.rows()).enumerate() {
            let y0 = top + cell_h * r as i32;

            root.draw(&Text::new(
                season.to_string(),
                (left - unit, y0 + cell_h / 2),
                font(unit * 3 / 2)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Right, VPos::Center)),
            ))?;

            for (c, value) in values.iter().enumerate() {
                let x0 = left + cell_w * c as i32;
                let fraction = if max > 0.0 { value / max } else { 0.0 };
                root.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                    color_at(fraction).filled(),
                ))?;

                let ink = if fraction > 0.6 { &WHITE } else { &BLACK };
                root.draw(&Text::new(
                    format!("{value:.0}"),
                    (x0 + cell_w / 2, y0 + cell_h / 2),
                    font(unit * 5 / 4).color(ink).pos(centered),
                ))?;
            }
        }

        for (c, hour) in NYE_HOURS.iter().enumerate() {
            root.draw(&Text::new(
                hour.to_string(),
                (left + cell_w * c as i32 + cell_w / 2, grid_bottom + unit * 2),
                font(unit * 3 / 2).color(&BLACK).pos(centered),
            ))?;
        }

        root.draw(&Text::new(
            "Hour of Day",
            ((left + grid_right) / 2, grid_bottom + unit * 5),
            font(unit * 3 / 2).color(&BLACK).pos(centered),
        ))?;
        root.draw(&Text::new(
            "New Year's Eve",
            (left - unit, top - unit * 2),
            font(unit * 3 / 2)
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;

        // Color bar, high values on top.
        let bar_x0 = grid_right + unit * 3;
        let bar_x1 = bar_x0 + unit * 2;
        let bar_height = grid_bottom - top;
        let steps = 100;
        for step in 0..steps {
            let y0 = top + bar_height * step / steps;
            let y1 = top + bar_height * (step + 1) / steps;
            let fraction = 1.0 - step as f64 / (steps - 1) as f64;
            root.draw(&Rectangle::new(
                [(bar_x0, y0), (bar_x1, y1)],
                color_at(fraction).filled(),
            ))?;
        }
        for (fraction, y) in [(1.0, top), (0.5, top + bar_height / 2), (0.0, grid_bottom)] {
            root.draw(&Text::new(
                format!("{:.0}", max * fraction),
                (bar_x1 + unit, y),
                font(unit * 5 / 4)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Left, VPos::Center)),
            ))?;
        }
        root.draw(&Text::new(
            "Total Pedestrians",
            (bar_x0 + unit, top - unit * 2),
            font(unit * 3 / 2).color(&BLACK).pos(centered),
        ))?;

        root.present()?;
        debug!(width = self.width, height = self.height, "Heatmap drawn");
        info!(path = %path.display(), "Heatmap saved");
        Ok(())
    }
}

/// Color for a value at `fraction` of the maximum, clamped to `[0, 1]`.
pub(crate) fn color_at(fraction: f64) -> RGBColor {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let scaled = fraction * (COLOR_STOPS.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(COLOR_STOPS.len() - 2);
    let t = scaled - lower as f64;

    let (r0, g0, b0) = COLOR_STOPS[lower];
    let (r1, g1, b1) = COLOR_STOPS[lower + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;

    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CombinedFrame;
    use crate::config::DEFAULT_FONT_PATH;
    use crate::types::fixtures::observation;

    /// A TrueType font on this machine, if any.
    fn system_font() -> Option<PathBuf> {
        let path = std::env::var("HEATMAP_FONT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FONT_PATH));
        path.is_file().then_some(path)
    }

    fn two_season_matrix() -> HeatmapMatrix {
        HeatmapMatrix::from_frame(&CombinedFrame {
            observations: vec![
                observation("33", "2019-12-31T23:00", Some(120.0), Some(80.0)),
                observation("3279", "2020-01-01T00:00", Some(300.0), None),
                observation("33", "2021-01-01T02:00", None, Some(45.0)),
            ],
        })
    }

    #[test]
    fn test_color_ramp_endpoints() {
        assert_eq!(color_at(0.0), RGBColor(255, 255, 204));
        assert_eq!(color_at(1.0), RGBColor(128, 0, 38));
        assert_eq!(color_at(0.5), RGBColor(253, 141, 60));
    }

    #[test]
    fn test_color_ramp_clamps() {
        assert_eq!(color_at(-3.0), color_at(0.0));
        assert_eq!(color_at(7.0), color_at(1.0));
        assert_eq!(color_at(f64::NAN), color_at(0.0));
    }

    #[test]
    fn test_render_without_font_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("heatmap.png");
        let matrix = HeatmapMatrix::from_frame(&CombinedFrame {
            observations: vec![observation("33", "2019-12-31T23:00", Some(3.0), None)],
        });
        let renderer = PlottersRenderer::new(dir.path().join("missing.ttf"));

        assert!(renderer.render(&matrix, &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_render_empty_matrix_fails() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlottersRenderer::new("/nonexistent.ttf");
        let matrix = HeatmapMatrix::from_frame(&CombinedFrame::default());

        assert!(renderer.render(&matrix, &dir.path().join("x.png")).is_err());
    }

    #[test]
    fn test_render_writes_png_with_system_font() {
        let Some(font) = system_font() else {
            eprintln!("no TrueType font available, skipping");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("limmatquai_hourly_heatmap.png");
        let matrix = two_season_matrix();
        assert_eq!(matrix.seasons().len(), 2);

        PlottersRenderer::new(font).render(&matrix, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.len() > 8);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_font_registered_once_across_renders() {
        let Some(font) = system_font() else {
            eprintln!("no TrueType font available, skipping");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlottersRenderer {
            width: 900,
            height: 480,
            font_path: font.clone(),
        };
        let matrix = two_season_matrix();

        renderer.render(&matrix, &dir.path().join("first.png")).unwrap();
        renderer.render(&matrix, &dir.path().join("second.png")).unwrap();

        assert!(dir.path().join("second.png").metadata().unwrap().len() > 0);
        assert_eq!(REGISTERED_FONT.lock().unwrap().as_deref(), Some(font.as_path()));
    }
}
