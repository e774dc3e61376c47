//! Contracts for the runtime's external collaborators.
//!
//! Concrete output encoders (PostScript, PDF, SVG, raster) and dataset
//! drivers live outside this repository; the interpreter only ever talks
//! to the [`PageDevice`] and [`Dataset`] traits defined here. The crate
//! also ships a [`recording::RecordingDevice`] op-log encoder used by the
//! CLI and the test suites, and an in-memory dataset.
//!
//! The `save_state`/`restore_state` pair is an explicit handshake:
//! `restore_state` returns true only when the encoder fully restored the
//! previously saved attributes, and callers must reflush otherwise.

use core_path::transform::Rect;
use core_path::{Path, clip};
use core_value::Value;
use core_value::error::Result;

pub mod attributes;
pub mod dataset;
pub mod recording;

pub use attributes::{ClipPath, ClipSide, Color, FontStyle, Justify, LineCap, LineJoin, Linestyle};
pub use dataset::{Dataset, DatasetFactory, MemoryDataset, MemoryDatasetFactory};

/// Output encoder contract; one page at a time.
pub trait PageDevice {
    #[allow(clippy::too_many_arguments)]
    fn open_page(
        &mut self,
        format: &str,
        dest: &str,
        width_mm: f64,
        height_mm: f64,
        resolution_dpi: f64,
        extras: &str,
    ) -> Result<()>;

    fn close_page(&mut self) -> Result<()>;

    fn set_color_attribute(&mut self, color: Color) -> Result<()>;
    fn set_blend_attribute(&mut self, mode: &str) -> Result<()>;
    fn set_linestyle_attribute(&mut self, style: &Linestyle) -> Result<()>;
    fn set_font_attribute(&mut self, font: &FontStyle) -> Result<()>;
    fn set_justify_attribute(&mut self, justify: Justify) -> Result<()>;
    fn set_clip_attribute(&mut self, paths: &[ClipPath]) -> Result<()>;

    fn save_state(&mut self) -> Result<()>;
    /// True when the previously saved attribute state was fully restored;
    /// false obliges the caller to reflush whatever it needs.
    fn restore_state(&mut self) -> Result<bool>;

    fn stroke(&mut self, shape: &Path, xml_attrs: Option<&str>) -> Result<()>;
    fn fill(&mut self, shape: &Path, xml_attrs: Option<&str>) -> Result<()>;
    fn clip(&mut self, shape: &Path, side: ClipSide) -> Result<()>;

    fn draw_icon(
        &mut self,
        points: &[(f64, f64)],
        image: &str,
        size_mm: f64,
        rotation: f64,
        scaling: f64,
    ) -> Result<()>;
    fn draw_eps(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        size_mm: f64,
        rotation: f64,
        scaling: f64,
    ) -> Result<()>;
    fn draw_svg(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        size_mm: f64,
        rotation: f64,
        scaling: f64,
    ) -> Result<()>;
    fn draw_pdf(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        size_mm: f64,
        rotation: f64,
        scaling: f64,
    ) -> Result<()>;
    fn draw_geo_image(&mut self, filename: &str, extents: Rect, extras: &str) -> Result<()>;

    fn label(&mut self, points: &[(f64, f64)], text: &str) -> Result<()>;
    fn add_svg_code(&mut self, xml: &str) -> Result<()>;
    fn gradient_fill(&mut self, shape: &Path, vertical: bool, c1: Color, c2: Color) -> Result<()>;
    /// Format-specific interactivity hook; the code string passes through
    /// uninterpreted.
    fn set_event_script(&mut self, shape: &Path, code: &str) -> Result<()>;

    fn page_mask(&mut self) -> &mut PageMask;

    /// Approximate (width, height) of rendered text in millimetres.
    /// Encoders with a font database override this; the default estimates
    /// from the font size.
    fn string_dimension(&self, text: &str, font: &FontStyle) -> (f64, f64) {
        let mut max_chars = 0usize;
        let mut lines = 0usize;
        for line in text.split('\n') {
            max_chars = max_chars.max(line.chars().count());
            lines += 1;
        }
        (
            max_chars as f64 * font.size * 0.6,
            lines.max(1) as f64 * font.size * font.line_spacing,
        )
    }
}

/// Creates encoders by format name; installed into the interpreter by the
/// host.
pub trait DeviceFactory {
    fn create(&self, format: &str) -> Result<Box<dyn PageDevice>>;
}

/// Per-page protect/unprotect bitmap at one-millimetre cells.
#[derive(Debug, Clone)]
pub struct PageMask {
    columns: usize,
    rows: usize,
    cells: Vec<bool>,
}

impl PageMask {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        let columns = (width_mm.ceil().max(1.0)) as usize;
        let rows = (height_mm.ceil().max(1.0)) as usize;
        Self {
            columns,
            rows,
            cells: vec![false; columns * rows],
        }
    }

    fn cell_range(&self, rect: Rect) -> (usize, usize, usize, usize) {
        let rect = rect.normalised();
        let c1 = (rect.x1.floor().max(0.0) as usize).min(self.columns);
        let c2 = (rect.x2.ceil().max(0.0) as usize).min(self.columns);
        let r1 = (rect.y1.floor().max(0.0) as usize).min(self.rows);
        let r2 = (rect.y2.ceil().max(0.0) as usize).min(self.rows);
        (c1, c2, r1, r2)
    }

    pub fn set_rect(&mut self, rect: Rect, value: bool) {
        let (c1, c2, r1, r2) = self.cell_range(rect);
        for row in r1..r2 {
            for col in c1..c2 {
                self.cells[row * self.columns + col] = value;
            }
        }
    }

    /// Mark cells whose centre falls inside the shape.
    pub fn set_path(&mut self, shape: &Path, value: bool) {
        let Some(bbox) = shape.bounding_box() else {
            return;
        };
        let flat = shape.flattened(0.5);
        let (c1, c2, r1, r2) = self.cell_range(bbox);
        for row in r1..r2 {
            for col in c1..c2 {
                let x = col as f64 + 0.5;
                let y = row as f64 + 0.5;
                if clip::point_inside_flattened(&flat, x, y) {
                    self.cells[row * self.columns + col] = value;
                }
            }
        }
    }

    pub fn is_all_zero_rect(&self, rect: Rect) -> bool {
        let (c1, c2, r1, r2) = self.cell_range(rect);
        for row in r1..r2 {
            for col in c1..c2 {
                if self.cells[row * self.columns + col] {
                    return false;
                }
            }
        }
        true
    }

    pub fn is_all_zero_path(&self, shape: &Path) -> bool {
        match shape.bounding_box() {
            Some(bbox) => self.is_all_zero_rect(bbox),
            None => true,
        }
    }
}

/// A fetched dataset row.
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_rect_set_and_query() {
        let mut mask = PageMask::new(100.0, 100.0);
        assert!(mask.is_all_zero_rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        mask.set_rect(Rect::new(10.0, 10.0, 20.0, 20.0), true);
        assert!(!mask.is_all_zero_rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(mask.is_all_zero_rect(Rect::new(50.0, 50.0, 60.0, 60.0)));
        mask.set_rect(Rect::new(10.0, 10.0, 20.0, 20.0), false);
        assert!(mask.is_all_zero_rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn mask_path_marks_interior_only() {
        let mut mask = PageMask::new(50.0, 50.0);
        let mut shape = Path::new();
        shape.move_to(10.0, 10.0, 0.0);
        shape.line_to(30.0, 10.0).unwrap();
        shape.line_to(30.0, 30.0).unwrap();
        shape.line_to(10.0, 30.0).unwrap();
        shape.close_path();
        mask.set_path(&shape, true);
        assert!(!mask.is_all_zero_rect(Rect::new(15.0, 15.0, 25.0, 25.0)));
        assert!(mask.is_all_zero_rect(Rect::new(35.0, 35.0, 45.0, 45.0)));
    }
}
