//! An op-log output encoder.
//!
//! Records every contract call in order, for the test suites to assert on
//! and for the CLI to dump as a readable trace. Attribute restoration on
//! `restore_state` is configurable so tests can exercise both sides of the
//! save/restore handshake.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::fs;
use std::rc::Rc;

use core_path::transform::Rect;
use core_path::Path;
use core_value::error::{MapyrusError, Result};
use tracing::debug;

use crate::attributes::{ClipPath, ClipSide, Color, FontStyle, Justify, Linestyle};
use crate::{DeviceFactory, PageDevice, PageMask};

/// One recorded contract call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    OpenPage {
        format: String,
        dest: String,
        width: f64,
        height: f64,
        resolution: f64,
    },
    ClosePage,
    SetColor(Color),
    SetBlend(String),
    SetLinestyle(Linestyle),
    SetFont(FontStyle),
    SetJustify(Justify),
    SetClip(usize),
    SaveState,
    RestoreState(bool),
    Stroke {
        vertices: usize,
    },
    Fill {
        vertices: usize,
        bounds: Option<(f64, f64, f64, f64)>,
    },
    Clip {
        side: ClipSide,
        vertices: usize,
    },
    Label {
        points: Vec<(f64, f64)>,
        text: String,
    },
    DrawIcon {
        points: usize,
        image: String,
        size: f64,
    },
    DrawFile {
        kind: &'static str,
        filename: String,
        points: usize,
    },
    DrawGeoImage {
        filename: String,
    },
    SvgCode(String),
    GradientFill {
        vertical: bool,
        c1: Color,
        c2: Color,
    },
    EventScript(String),
}

/// Shared, inspectable op log.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    ops: Rc<RefCell<Vec<DeviceOp>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<DeviceOp> {
        self.ops.borrow().clone()
    }

    pub fn push(&self, op: DeviceOp) {
        self.ops.borrow_mut().push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.borrow().is_empty()
    }
}

pub struct RecordingDevice {
    log: RecordingLog,
    /// What `restore_state` reports; false forces callers down the reflush
    /// branch of the handshake.
    restores_cleanly: bool,
    save_depth: usize,
    mask: PageMask,
    dump_dest: Option<String>,
}

impl RecordingDevice {
    pub fn new(log: RecordingLog) -> Self {
        Self {
            log,
            restores_cleanly: true,
            save_depth: 0,
            mask: PageMask::new(1.0, 1.0),
            dump_dest: None,
        }
    }

    pub fn with_restore_behaviour(log: RecordingLog, restores_cleanly: bool) -> Self {
        Self {
            restores_cleanly,
            ..Self::new(log)
        }
    }

    fn shape_vertices(shape: &Path) -> usize {
        shape.move_to_count() + shape.line_to_count()
    }
}

impl PageDevice for RecordingDevice {
    fn open_page(
        &mut self,
        format: &str,
        dest: &str,
        width_mm: f64,
        height_mm: f64,
        resolution_dpi: f64,
        _extras: &str,
    ) -> Result<()> {
        self.mask = PageMask::new(width_mm, height_mm);
        if !dest.is_empty() && dest != "-" {
            self.dump_dest = Some(dest.to_string());
        }
        self.log.push(DeviceOp::OpenPage {
            format: format.to_string(),
            dest: dest.to_string(),
            width: width_mm,
            height: height_mm,
            resolution: resolution_dpi,
        });
        Ok(())
    }

    fn close_page(&mut self) -> Result<()> {
        self.log.push(DeviceOp::ClosePage);
        if let Some(dest) = self.dump_dest.take() {
            let mut out = String::new();
            for op in self.log.ops() {
                let _ = writeln!(out, "{op:?}");
            }
            fs::write(&dest, out)
                .map_err(|e| MapyrusError::Io(format!("cannot write {dest}: {e}")))?;
            debug!(target: "device.recording", dest = dest.as_str(), "trace_written");
        }
        Ok(())
    }

    fn set_color_attribute(&mut self, color: Color) -> Result<()> {
        self.log.push(DeviceOp::SetColor(color));
        Ok(())
    }

    fn set_blend_attribute(&mut self, mode: &str) -> Result<()> {
        self.log.push(DeviceOp::SetBlend(mode.to_string()));
        Ok(())
    }

    fn set_linestyle_attribute(&mut self, style: &Linestyle) -> Result<()> {
        self.log.push(DeviceOp::SetLinestyle(style.clone()));
        Ok(())
    }

    fn set_font_attribute(&mut self, font: &FontStyle) -> Result<()> {
        self.log.push(DeviceOp::SetFont(font.clone()));
        Ok(())
    }

    fn set_justify_attribute(&mut self, justify: Justify) -> Result<()> {
        self.log.push(DeviceOp::SetJustify(justify));
        Ok(())
    }

    fn set_clip_attribute(&mut self, paths: &[ClipPath]) -> Result<()> {
        self.log.push(DeviceOp::SetClip(paths.len()));
        Ok(())
    }

    fn save_state(&mut self) -> Result<()> {
        self.save_depth += 1;
        self.log.push(DeviceOp::SaveState);
        Ok(())
    }

    fn restore_state(&mut self) -> Result<bool> {
        self.save_depth = self.save_depth.saturating_sub(1);
        self.log.push(DeviceOp::RestoreState(self.restores_cleanly));
        Ok(self.restores_cleanly)
    }

    fn stroke(&mut self, shape: &Path, _xml_attrs: Option<&str>) -> Result<()> {
        self.log.push(DeviceOp::Stroke {
            vertices: Self::shape_vertices(shape),
        });
        Ok(())
    }

    fn fill(&mut self, shape: &Path, _xml_attrs: Option<&str>) -> Result<()> {
        self.log.push(DeviceOp::Fill {
            vertices: Self::shape_vertices(shape),
            bounds: shape.bounding_box().map(|b| (b.x1, b.y1, b.x2, b.y2)),
        });
        Ok(())
    }

    fn clip(&mut self, shape: &Path, side: ClipSide) -> Result<()> {
        self.log.push(DeviceOp::Clip {
            side,
            vertices: Self::shape_vertices(shape),
        });
        Ok(())
    }

    fn draw_icon(
        &mut self,
        points: &[(f64, f64)],
        image: &str,
        size_mm: f64,
        _rotation: f64,
        _scaling: f64,
    ) -> Result<()> {
        self.log.push(DeviceOp::DrawIcon {
            points: points.len(),
            image: image.to_string(),
            size: size_mm,
        });
        Ok(())
    }

    fn draw_eps(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        _size_mm: f64,
        _rotation: f64,
        _scaling: f64,
    ) -> Result<()> {
        self.log.push(DeviceOp::DrawFile {
            kind: "eps",
            filename: filename.to_string(),
            points: points.len(),
        });
        Ok(())
    }

    fn draw_svg(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        _size_mm: f64,
        _rotation: f64,
        _scaling: f64,
    ) -> Result<()> {
        self.log.push(DeviceOp::DrawFile {
            kind: "svg",
            filename: filename.to_string(),
            points: points.len(),
        });
        Ok(())
    }

    fn draw_pdf(
        &mut self,
        points: &[(f64, f64)],
        filename: &str,
        _size_mm: f64,
        _rotation: f64,
        _scaling: f64,
    ) -> Result<()> {
        self.log.push(DeviceOp::DrawFile {
            kind: "pdf",
            filename: filename.to_string(),
            points: points.len(),
        });
        Ok(())
    }

    fn draw_geo_image(&mut self, filename: &str, _extents: Rect, _extras: &str) -> Result<()> {
        self.log.push(DeviceOp::DrawGeoImage {
            filename: filename.to_string(),
        });
        Ok(())
    }

    fn label(&mut self, points: &[(f64, f64)], text: &str) -> Result<()> {
        self.log.push(DeviceOp::Label {
            points: points.to_vec(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn add_svg_code(&mut self, xml: &str) -> Result<()> {
        self.log.push(DeviceOp::SvgCode(xml.to_string()));
        Ok(())
    }

    fn gradient_fill(&mut self, _shape: &Path, vertical: bool, c1: Color, c2: Color) -> Result<()> {
        self.log.push(DeviceOp::GradientFill { vertical, c1, c2 });
        Ok(())
    }

    fn set_event_script(&mut self, _shape: &Path, code: &str) -> Result<()> {
        self.log.push(DeviceOp::EventScript(code.to_string()));
        Ok(())
    }

    fn page_mask(&mut self) -> &mut PageMask {
        &mut self.mask
    }
}

/// Factory handing every created device the same shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    log: RecordingLog,
    restores_cleanly: bool,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self {
            log: RecordingLog::new(),
            restores_cleanly: true,
        }
    }

    pub fn with_restore_behaviour(restores_cleanly: bool) -> Self {
        Self {
            log: RecordingLog::new(),
            restores_cleanly,
        }
    }

    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }
}

impl DeviceFactory for RecordingFactory {
    fn create(&self, _format: &str) -> Result<Box<dyn PageDevice>> {
        Ok(Box::new(RecordingDevice::with_restore_behaviour(
            self.log.clone(),
            self.restores_cleanly,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_record_in_order() {
        let log = RecordingLog::new();
        let mut dev = RecordingDevice::new(log.clone());
        dev.open_page("svg", "-", 100.0, 100.0, 300.0, "").unwrap();
        dev.set_color_attribute(Color::BLACK).unwrap();
        dev.label(&[(50.0, 50.0)], "Hi").unwrap();
        dev.close_page().unwrap();
        let ops = log.ops();
        assert!(matches!(ops[0], DeviceOp::OpenPage { .. }));
        assert!(matches!(ops[1], DeviceOp::SetColor(_)));
        assert!(matches!(
            &ops[2],
            DeviceOp::Label { text, points } if text == "Hi" && points[0] == (50.0, 50.0)
        ));
        assert!(matches!(ops[3], DeviceOp::ClosePage));
    }

    #[test]
    fn restore_reports_configured_behaviour() {
        let log = RecordingLog::new();
        let mut dev = RecordingDevice::with_restore_behaviour(log, false);
        dev.save_state().unwrap();
        assert!(!dev.restore_state().unwrap());
    }
}
