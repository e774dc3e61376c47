//! Graphical and variable state for one procedure frame.
//!
//! A context owns the attributes the six-bit dirty protocol tracks, the
//! user and world transforms, the current path (possibly shared with the
//! parent frame until first mutation), the active clip list, and the
//! frame's variables. Frames are created either fresh (the global bottom
//! frame) or as clones of their parent on procedure entry.
//!
//! Path lifecycle across frames:
//! 1. A child starts with `path = None` and the parent's path remembered
//!    as `existing_path` (read-through).
//! 2. Queries read `path` falling back to `existing_path`.
//! 3. The first mutation copies the parent's path into a frame-owned one;
//!    `clear_path` instead resets an owned path or detaches the parent
//!    reference.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use core_device::{
    ClipPath, ClipSide, Color, Dataset, FontStyle, Justify, Linestyle, PageDevice, Row,
};
use core_path::transform::{AffineTransform, Rect};
use core_path::Path;
use core_value::Value;
use core_value::error::{MapyrusError, Result};
use core_value::numeric::doubles_equal;
use tracing::{debug, trace};

use crate::attributes::AttributeMask;
use crate::units::WorldUnits;

/// Millimetres per inch, for resolution conversion.
pub const MM_PER_INCH: f64 = 25.4;

/// Flattening tolerance used before any page is opened.
const DEFAULT_RESOLUTION_MM: f64 = 0.1;

/// The open output page, shared by every frame on the stack.
pub struct PageState {
    pub device: Box<dyn PageDevice>,
    pub format: String,
    pub width: f64,
    pub height: f64,
    pub resolution_dpi: f64,
    pub open: bool,
}

impl PageState {
    /// Millimetres per device pixel.
    pub fn resolution_mm(&self) -> f64 {
        if self.resolution_dpi > 0.0 {
            MM_PER_INCH / self.resolution_dpi
        } else {
            DEFAULT_RESOLUTION_MM
        }
    }
}

pub type PageRef = Rc<RefCell<PageState>>;

/// External page content formats placed by `eps`/`svg`/`pdf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDrawKind {
    Eps,
    Svg,
    Pdf,
}

/// An open dataset with one row of read-ahead so scripts can test for
/// remaining rows before fetching.
pub struct DatasetHandle {
    dataset: Box<dyn Dataset>,
    next_row: Option<Row>,
}

impl DatasetHandle {
    pub fn open(mut dataset: Box<dyn Dataset>) -> Result<Self> {
        let next_row = dataset.fetch()?;
        Ok(Self { dataset, next_row })
    }

    pub fn field_names(&self) -> &[String] {
        self.dataset.field_names()
    }

    pub fn has_more(&self) -> bool {
        self.next_row.is_some()
    }

    pub fn fetch(&mut self) -> Result<Option<Row>> {
        let row = self.next_row.take();
        if row.is_some() {
            self.next_row = self.dataset.fetch()?;
        }
        Ok(row)
    }

    pub fn close(&mut self) {
        self.dataset.close();
        self.next_row = None;
    }
}

pub struct Context {
    color: Color,
    blend: String,
    linestyle: Linestyle,
    font: FontStyle,
    justify: Justify,

    ctm: AffineTransform,
    scaling: f64,
    rotation: f64,
    world_ctm: Option<AffineTransform>,
    world_extents: Option<Rect>,
    world_units: Option<WorldUnits>,
    world_scale: Option<f64>,

    page: Option<PageRef>,
    output_defined: bool,
    dataset: Option<DatasetHandle>,

    path: Option<Rc<Path>>,
    existing_path: Option<Rc<Path>>,
    clip_paths: Vec<ClipPath>,

    vars: AHashMap<String, Value>,
    local_names: AHashSet<String>,

    pending: AttributeMask,
    changed: AttributeMask,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            color: Color::BLACK,
            blend: "Normal".to_string(),
            linestyle: Linestyle::default(),
            font: FontStyle::default(),
            justify: Justify::default(),
            ctm: AffineTransform::identity(),
            scaling: 1.0,
            rotation: 0.0,
            world_ctm: None,
            world_extents: None,
            world_units: None,
            world_scale: None,
            page: None,
            output_defined: false,
            dataset: None,
            path: None,
            existing_path: None,
            clip_paths: Vec::new(),
            vars: AHashMap::new(),
            local_names: AHashSet::new(),
            // Force the first drawing command to flush everything.
            pending: AttributeMask::all_attributes(),
            changed: AttributeMask::empty(),
        }
    }

    /// Frame clone on procedure entry. Shares attribute values and the
    /// output handle (with a `save_state` on it), clones the CTM by value,
    /// shares the parent path read-through, copies the clip list, and
    /// resets variables.
    pub fn from_parent(parent: &mut Context) -> Result<Self> {
        if let Some(page) = &parent.page {
            page.borrow_mut().device.save_state()?;
        }
        Ok(Self {
            color: parent.color,
            blend: parent.blend.clone(),
            linestyle: parent.linestyle.clone(),
            font: parent.font.clone(),
            justify: parent.justify,
            ctm: parent.ctm,
            scaling: parent.scaling,
            rotation: parent.rotation,
            world_ctm: parent.world_ctm,
            world_extents: parent.world_extents,
            world_units: parent.world_units,
            world_scale: parent.world_scale,
            page: parent.page.clone(),
            output_defined: false,
            dataset: None,
            path: None,
            existing_path: parent.path.clone().or_else(|| parent.existing_path.clone()),
            clip_paths: parent.clip_paths.clone(),
            vars: AHashMap::new(),
            local_names: AHashSet::new(),
            pending: parent.pending,
            changed: AttributeMask::empty(),
        })
    }

    /// Close whatever this frame owns: its dataset, and the page only if
    /// this frame opened it.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.dataset.as_mut() {
            handle.close();
        }
        self.dataset = None;
        if self.output_defined
            && let Some(page) = &self.page
        {
            let mut page = page.borrow_mut();
            if page.open {
                page.open = false;
                page.device.close_page()?;
            }
        }
        self.page = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute protocol.
    // ------------------------------------------------------------------

    fn mark(&mut self, bit: AttributeMask) {
        self.pending |= bit;
        self.changed |= bit;
    }

    pub fn pending_mask(&self) -> AttributeMask {
        self.pending
    }

    pub fn changed_mask(&self) -> AttributeMask {
        self.changed
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = AttributeMask::empty();
    }

    pub(crate) fn inherit_pending(&mut self, mask: AttributeMask) {
        self.pending |= mask;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.mark(AttributeMask::COLOR);
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_blend(&mut self, mode: impl Into<String>) {
        self.blend = mode.into();
        self.mark(AttributeMask::BLEND);
    }

    pub fn set_linestyle(&mut self, style: Linestyle) {
        self.linestyle = style;
        self.mark(AttributeMask::LINESTYLE);
    }

    pub fn linestyle(&self) -> &Linestyle {
        &self.linestyle
    }

    pub fn set_font(&mut self, font: FontStyle) {
        self.font = font;
        self.mark(AttributeMask::FONT);
    }

    pub fn font(&self) -> &FontStyle {
        &self.font
    }

    pub fn set_justify(&mut self, justify: Justify) {
        self.justify = justify;
        self.mark(AttributeMask::JUSTIFY);
    }

    pub fn justify(&self) -> Justify {
        self.justify
    }

    /// Emit `pending ∩ needed` to the encoder and clear those bits.
    pub fn flush_attributes(&mut self, needed: AttributeMask) -> Result<()> {
        let Some(page) = &self.page else {
            return Err(MapyrusError::NoOutput);
        };
        let emit = self.pending & needed;
        if emit.is_empty() {
            return Ok(());
        }
        let mut page = page.borrow_mut();
        if !page.open {
            return Err(MapyrusError::NoOutput);
        }
        trace!(target: "context.attrs", mask = emit.bits(), "flush");
        if emit.contains(AttributeMask::COLOR) {
            page.device.set_color_attribute(self.color)?;
        }
        if emit.contains(AttributeMask::BLEND) {
            page.device.set_blend_attribute(&self.blend)?;
        }
        if emit.contains(AttributeMask::LINESTYLE) {
            page.device.set_linestyle_attribute(&self.linestyle)?;
        }
        if emit.contains(AttributeMask::FONT) {
            page.device.set_font_attribute(&self.font)?;
        }
        if emit.contains(AttributeMask::JUSTIFY) {
            page.device.set_justify_attribute(self.justify)?;
        }
        if emit.contains(AttributeMask::CLIP) {
            page.device.set_clip_attribute(&self.clip_paths)?;
        }
        self.pending &= !emit;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Output page.
    // ------------------------------------------------------------------

    pub fn set_page(&mut self, page: PageState) {
        self.page = Some(Rc::new(RefCell::new(page)));
        self.output_defined = true;
        // A fresh page needs every attribute flushed again.
        self.pending = AttributeMask::all_attributes();
    }

    pub fn page(&self) -> Option<&PageRef> {
        self.page.as_ref()
    }

    pub fn output_defined(&self) -> bool {
        self.output_defined
    }

    pub fn has_open_page(&self) -> bool {
        self.page
            .as_ref()
            .is_some_and(|p| p.borrow().open)
    }

    pub fn end_page(&mut self) -> Result<()> {
        let Some(page) = &self.page else {
            return Err(MapyrusError::NoOutput);
        };
        let mut page = page.borrow_mut();
        if !page.open {
            return Err(MapyrusError::NoOutput);
        }
        page.open = false;
        page.device.close_page()
    }

    /// Flattening tolerance: one device pixel, or a conservative default
    /// before any page exists.
    pub fn resolution_mm(&self) -> f64 {
        self.page
            .as_ref()
            .map(|p| p.borrow().resolution_mm())
            .unwrap_or(DEFAULT_RESOLUTION_MM)
    }

    // ------------------------------------------------------------------
    // Transforms.
    // ------------------------------------------------------------------

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.ctm.translate(dx, dy);
    }

    pub fn scale(&mut self, factor: f64) {
        self.ctm.scale(factor);
        self.scaling *= factor;
    }

    pub fn rotate(&mut self, angle: f64) {
        self.ctm.rotate(angle);
        self.rotation += angle;
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Replace the CTM for per-moveto dispatch: origin translated to the
    /// given page point, axes rotated. World transforms do not apply in
    /// dispatch frames; the point is already in page coordinates.
    pub fn set_dispatch_transform(&mut self, px: f64, py: f64, rotation: f64) {
        let mut ctm = AffineTransform::translation(px, py);
        ctm.rotate(rotation);
        self.ctm = ctm;
        self.rotation = rotation;
        self.world_ctm = None;
        self.world_extents = None;
        self.world_scale = None;
    }

    fn combined_transform(&self) -> AffineTransform {
        match &self.world_ctm {
            Some(world) => self.ctm.concatenated(world),
            None => self.ctm,
        }
    }

    /// Forward transform: world (or user) coordinates to page millimetres.
    pub fn transform_to_page(&self, x: f64, y: f64) -> (f64, f64) {
        self.combined_transform().transform_point(x, y)
    }

    /// Inverse transform back into world coordinates.
    pub fn transform_to_worlds(&self, px: f64, py: f64) -> Result<(f64, f64)> {
        Ok(self.combined_transform().inverse()?.transform_point(px, py))
    }

    /// Establish the world-to-page mapping. With distortion disallowed the
    /// smaller-ratio world dimension is expanded, preserving the world
    /// midpoint, so aspect matches the page region.
    pub fn set_worlds(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        page_region: Option<(f64, f64, f64, f64)>,
        units: WorldUnits,
        allow_distortion: bool,
    ) -> Result<()> {
        let Some(page) = &self.page else {
            return Err(MapyrusError::NoOutput);
        };
        let (page_width, page_height) = {
            let p = page.borrow();
            (p.width, p.height)
        };
        if doubles_equal(x1, x2) || doubles_equal(y1, y2) {
            return Err(MapyrusError::ZeroWorldRange);
        }
        let (px1, py1, px2, py2) = page_region.unwrap_or((0.0, 0.0, page_width, page_height));
        if px1 >= px2
            || py1 >= py2
            || px1 < 0.0
            || py1 < 0.0
            || px2 > page_width
            || py2 > page_height
        {
            return Err(MapyrusError::InvalidPageRange);
        }

        let (mut wx1, mut wy1, mut wx2, mut wy2) = (x1, y1, x2, y2);
        if !allow_distortion {
            let world_w = (wx2 - wx1).abs();
            let world_h = (wy2 - wy1).abs();
            let page_w = px2 - px1;
            let page_h = py2 - py1;
            let world_aspect = world_h / world_w;
            let page_aspect = page_h / page_w;
            if world_aspect > page_aspect {
                // World is taller than the page region: widen it.
                let needed = world_h / page_aspect;
                let mid = (wx1 + wx2) / 2.0;
                let half = needed / 2.0 * (wx2 - wx1).signum();
                wx1 = mid - half;
                wx2 = mid + half;
            } else {
                let needed = world_w * page_aspect;
                let mid = (wy1 + wy2) / 2.0;
                let half = needed / 2.0 * (wy2 - wy1).signum();
                wy1 = mid - half;
                wy2 = mid + half;
            }
        }

        let world = Rect::new(wx1, wy1, wx2, wy2);
        let region = Rect::new(px1, py1, px2, py2);
        self.world_ctm = Some(AffineTransform::rect_to_rect(world, region));
        self.world_extents = Some(world);
        self.world_units = Some(units);
        let scale = (wx2 - wx1).abs() * units.millimetres_per_unit() / (px2 - px1);
        self.world_scale = Some(scale);
        debug!(
            target: "context.worlds",
            scale,
            width = (wx2 - wx1).abs(),
            "worlds_set"
        );
        Ok(())
    }

    pub fn world_extents(&self) -> Option<Rect> {
        self.world_extents
    }

    pub fn world_scale(&self) -> Option<f64> {
        self.world_scale
    }

    pub fn world_units(&self) -> Option<WorldUnits> {
        self.world_units
    }

    pub fn has_worlds(&self) -> bool {
        self.world_ctm.is_some()
    }

    // ------------------------------------------------------------------
    // Path construction.
    // ------------------------------------------------------------------

    /// Read-through view: this frame's path, else the parent's.
    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref().or(self.existing_path.as_deref())
    }

    /// First mutation copies the parent's path into this frame.
    fn writable_path(&mut self) -> &mut Path {
        if self.path.is_none() {
            let base = match &self.existing_path {
                Some(shared) => (**shared).clone(),
                None => Path::new(),
            };
            self.path = Some(Rc::new(base));
        }
        // The frame owns this Rc exclusively while it executes; make_mut
        // only copies if a child still holds a reference.
        match self.path.as_mut() {
            Some(rc) => Rc::make_mut(rc),
            None => unreachable!("path was just materialised"),
        }
    }

    /// Replace the whole path (sample/stripe/parallel/... results).
    pub fn replace_path(&mut self, path: Path) {
        self.path = Some(Rc::new(path));
    }

    pub fn clear_path(&mut self) {
        if let Some(rc) = self.path.as_mut() {
            Rc::make_mut(rc).clear();
        } else {
            // Detach the parent's path without touching it.
            self.existing_path = None;
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        let (px, py) = self.transform_to_page(x, y);
        let rotation = self.rotation;
        self.writable_path().move_to(px, py, rotation);
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        let (px, py) = self.transform_to_page(x, y);
        self.writable_path().line_to(px, py)
    }

    /// Relative line: the offset is taken in user space at the current
    /// point, via the inverse transform.
    pub fn rline_to(&mut self, dx: f64, dy: f64) -> Result<()> {
        let (cx, cy) = self
            .current_path()
            .and_then(Path::current_point)
            .ok_or(MapyrusError::NoMoveTo)?;
        let (ux, uy) = self.transform_to_worlds(cx, cy)?;
        self.line_to(ux + dx, uy + dy)
    }

    pub fn arc_to(&mut self, direction: f64, cx: f64, cy: f64, ex: f64, ey: f64) -> Result<()> {
        let (pcx, pcy) = self.transform_to_page(cx, cy);
        let (pex, pey) = self.transform_to_page(ex, ey);
        self.writable_path().arc_to(direction, pcx, pcy, pex, pey)
    }

    pub fn curve_to(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
    ) -> Result<()> {
        let (p1x, p1y) = self.transform_to_page(x1, y1);
        let (p2x, p2y) = self.transform_to_page(x2, y2);
        let (px, py) = self.transform_to_page(x, y);
        self.writable_path().curve_to(p1x, p1y, p2x, p2y, px, py)
    }

    /// Closed ellipse inscribed in the user-space box, rotated with the
    /// CTM.
    pub fn ellipse_to(&mut self, xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<()> {
        let t = self.combined_transform();
        let (cx, cy) = t.transform_point((xmin + xmax) / 2.0, (ymin + ymax) / 2.0);
        let (axx, axy) = t.transform_distance((xmax - xmin) / 2.0, 0.0);
        let (ayx, ayy) = t.transform_distance(0.0, (ymax - ymin) / 2.0);
        let rx = (axx * axx + axy * axy).sqrt();
        let ry = (ayx * ayx + ayy * ayy).sqrt();
        let rotation = axy.atan2(axx);
        self.writable_path()
            .ellipse(cx - rx, cy - ry, cx + rx, cy + ry, rotation);
        Ok(())
    }

    pub fn sine_wave_to(&mut self, x: f64, y: f64, repeats: f64, amplitude: f64) -> Result<()> {
        let (px, py) = self.transform_to_page(x, y);
        let amplitude = amplitude * self.scaling;
        self.writable_path().sine_wave_to(px, py, repeats, amplitude)
    }

    pub fn close_path(&mut self) {
        self.writable_path().close_path();
    }

    /// Shift every vertex by a user-space offset.
    pub fn shift_path(&mut self, dx: f64, dy: f64) {
        let (pdx, pdy) = self.ctm.transform_distance(dx, dy);
        if let Some(path) = self.current_path() {
            let shifted = path.translated(pdx, pdy);
            self.replace_path(shifted);
        }
    }

    // ------------------------------------------------------------------
    // Drawing.
    // ------------------------------------------------------------------

    fn page_for_drawing(&self) -> Result<&PageRef> {
        match &self.page {
            Some(page) if page.borrow().open => Ok(page),
            _ => Err(MapyrusError::NoOutput),
        }
    }

    pub fn stroke(&mut self, xml_attrs: Option<&str>) -> Result<()> {
        self.flush_attributes(
            AttributeMask::COLOR
                | AttributeMask::BLEND
                | AttributeMask::LINESTYLE
                | AttributeMask::CLIP,
        )?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path()
            && !path.is_empty()
        {
            page.borrow_mut().device.stroke(path, xml_attrs)?;
        }
        Ok(())
    }

    pub fn fill(&mut self, xml_attrs: Option<&str>) -> Result<()> {
        self.flush_attributes(
            AttributeMask::COLOR | AttributeMask::BLEND | AttributeMask::CLIP,
        )?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path()
            && !path.is_empty()
        {
            page.borrow_mut().device.fill(path, xml_attrs)?;
        }
        Ok(())
    }

    pub fn gradient_fill(&mut self, vertical: bool, c1: Color, c2: Color) -> Result<()> {
        self.flush_attributes(AttributeMask::BLEND | AttributeMask::CLIP)?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path()
            && !path.is_empty()
        {
            page.borrow_mut()
                .device
                .gradient_fill(path, vertical, c1, c2)?;
        }
        Ok(())
    }

    /// Add the current path to the clip list; drawing from here on is
    /// limited to the inside (or outside) of it.
    pub fn clip(&mut self, side: ClipSide) -> Result<()> {
        let path = self
            .current_path()
            .cloned()
            .ok_or(MapyrusError::NoMoveTo)?;
        self.clip_paths.push(ClipPath { path, side });
        self.mark(AttributeMask::CLIP);
        Ok(())
    }

    pub fn clip_paths(&self) -> &[ClipPath] {
        &self.clip_paths
    }

    pub fn label(&mut self, text: &str) -> Result<()> {
        self.flush_attributes(
            AttributeMask::FONT
                | AttributeMask::JUSTIFY
                | AttributeMask::COLOR
                | AttributeMask::BLEND
                | AttributeMask::CLIP,
        )?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path() {
            let points = path.move_tos();
            if !points.is_empty() {
                page.borrow_mut().device.label(&points, text)?;
            }
        }
        Ok(())
    }

    pub fn protect_region(&mut self, region: Option<Rect>) -> Result<()> {
        self.set_mask_region(region, true)
    }

    pub fn unprotect_region(&mut self, region: Option<Rect>) -> Result<()> {
        self.set_mask_region(region, false)
    }

    fn set_mask_region(&mut self, region: Option<Rect>, value: bool) -> Result<()> {
        let page = self.page_for_drawing()?;
        let mut page = page.borrow_mut();
        match region {
            Some(rect) => page.device.page_mask().set_rect(rect, value),
            None => {
                if let Some(path) = self.current_path() {
                    page.device.page_mask().set_path(path, value);
                }
            }
        }
        Ok(())
    }

    pub fn is_protected(&self, region: Option<Rect>) -> Result<bool> {
        let page = self.page_for_drawing()?;
        let mut page = page.borrow_mut();
        let clear = match region {
            Some(rect) => page.device.page_mask().is_all_zero_rect(rect),
            None => match self.current_path() {
                Some(path) => page.device.page_mask().is_all_zero_path(path),
                None => true,
            },
        };
        Ok(!clear)
    }

    /// Draw an image at each moveto point; the image reference passes
    /// through to the encoder uninterpreted.
    pub fn draw_icon(&mut self, image: &str, size_mm: f64) -> Result<()> {
        self.flush_attributes(AttributeMask::BLEND | AttributeMask::CLIP)?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path() {
            let points = path.move_tos();
            if !points.is_empty() {
                page.borrow_mut().device.draw_icon(
                    &points,
                    image,
                    size_mm,
                    self.rotation,
                    self.scaling,
                )?;
            }
        }
        Ok(())
    }

    /// Place external EPS / SVG / PDF content at each moveto point.
    pub fn draw_file(&mut self, kind: FileDrawKind, filename: &str, size_mm: f64) -> Result<()> {
        self.flush_attributes(AttributeMask::BLEND | AttributeMask::CLIP)?;
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path() {
            let points = path.move_tos();
            if points.is_empty() {
                return Ok(());
            }
            let mut page = page.borrow_mut();
            match kind {
                FileDrawKind::Eps => page.device.draw_eps(
                    &points,
                    filename,
                    size_mm,
                    self.rotation,
                    self.scaling,
                )?,
                FileDrawKind::Svg => page.device.draw_svg(
                    &points,
                    filename,
                    size_mm,
                    self.rotation,
                    self.scaling,
                )?,
                FileDrawKind::Pdf => page.device.draw_pdf(
                    &points,
                    filename,
                    size_mm,
                    self.rotation,
                    self.scaling,
                )?,
            }
        }
        Ok(())
    }

    /// Draw a georeferenced image over the current world extents.
    pub fn draw_geo_image(&mut self, filename: &str, extras: &str) -> Result<()> {
        let extents = self.world_extents.ok_or_else(|| {
            MapyrusError::UnexpectedValues("geoimage needs world coordinates set".to_string())
        })?;
        let (px1, py1) = self.transform_to_page(extents.x1, extents.y1);
        let (px2, py2) = self.transform_to_page(extents.x2, extents.y2);
        self.flush_attributes(AttributeMask::BLEND | AttributeMask::CLIP)?;
        let page = self.page_for_drawing()?;
        page.borrow_mut()
            .device
            .draw_geo_image(filename, Rect::new(px1, py1, px2, py2).normalised(), extras)
    }

    pub fn add_svg_code(&mut self, xml: &str) -> Result<()> {
        let page = self.page_for_drawing()?;
        page.borrow_mut().device.add_svg_code(xml)
    }

    pub fn set_event_script(&mut self, code: &str) -> Result<()> {
        let page = self.page_for_drawing()?;
        if let Some(path) = self.current_path() {
            page.borrow_mut().device.set_event_script(path, code)?;
        }
        Ok(())
    }

    /// Rendered size of text under the current font, from the encoder's
    /// metrics.
    pub fn string_dimension(&self, text: &str) -> Result<(f64, f64)> {
        let page = self.page_for_drawing()?;
        let dim = page.borrow().device.string_dimension(text, &self.font);
        Ok(dim)
    }

    // ------------------------------------------------------------------
    // Dataset.
    // ------------------------------------------------------------------

    pub fn set_dataset(&mut self, handle: DatasetHandle) {
        self.dataset = Some(handle);
    }

    pub fn dataset(&self) -> Option<&DatasetHandle> {
        self.dataset.as_ref()
    }

    pub fn dataset_mut(&mut self) -> Option<&mut DatasetHandle> {
        self.dataset.as_mut()
    }

    // ------------------------------------------------------------------
    // Variables.
    // ------------------------------------------------------------------

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn declare_local(&mut self, name: &str) {
        self.local_names.insert(name.to_string());
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.local_names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_device::recording::{DeviceOp, RecordingDevice, RecordingLog};

    fn page_context(log: &RecordingLog) -> Context {
        let mut device = RecordingDevice::new(log.clone());
        device
            .open_page("recording", "-", 100.0, 100.0, 254.0, "")
            .unwrap();
        let mut ctx = Context::new();
        ctx.set_page(PageState {
            device: Box::new(device),
            format: "recording".to_string(),
            width: 100.0,
            height: 100.0,
            resolution_dpi: 254.0,
            open: true,
        });
        ctx
    }

    #[test]
    fn defaults_match_contract() {
        let ctx = Context::new();
        assert_eq!(ctx.color(), Color::BLACK);
        assert_eq!(ctx.linestyle().width, 0.1);
        assert_eq!(ctx.font().size, 5.0);
        assert_eq!(ctx.pending_mask(), AttributeMask::all_attributes());
        assert_eq!(ctx.changed_mask(), AttributeMask::empty());
    }

    #[test]
    fn flush_emits_only_needed_pending_bits() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        let before = log.len();
        ctx.flush_attributes(AttributeMask::COLOR | AttributeMask::LINESTYLE)
            .unwrap();
        let ops = log.ops();
        let emitted: Vec<_> = ops[before..].iter().collect();
        assert_eq!(emitted.len(), 2);
        // Pending bits for those attributes are now clear; flushing again
        // emits nothing.
        let before = log.len();
        ctx.flush_attributes(AttributeMask::COLOR).unwrap();
        assert_eq!(log.len(), before);
        // An untouched attribute still flushes on demand.
        ctx.flush_attributes(AttributeMask::FONT).unwrap();
        assert!(matches!(log.ops().last(), Some(DeviceOp::SetFont(_))));
    }

    #[test]
    fn setters_mark_pending_and_changed() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        ctx.flush_attributes(AttributeMask::all_attributes()).unwrap();
        assert_eq!(ctx.pending_mask(), AttributeMask::empty());
        ctx.set_color(Color::rgb(255, 0, 0));
        assert!(ctx.pending_mask().contains(AttributeMask::COLOR));
        assert!(ctx.changed_mask().contains(AttributeMask::COLOR));
    }

    #[test]
    fn path_is_shared_until_written() {
        let mut parent = Context::new();
        parent.move_to(10.0, 10.0);
        parent.line_to(20.0, 10.0).unwrap();
        let parent_path = parent.current_path().cloned();

        let mut child = Context::from_parent(&mut parent).unwrap();
        // Query reads through to the parent's path.
        assert_eq!(child.current_path().cloned(), parent_path);
        // Mutation copies; the parent's path is untouched.
        child.line_to(30.0, 30.0).unwrap();
        assert_eq!(parent.current_path().cloned(), parent_path);
        assert_eq!(
            child.current_path().map(|p| p.line_to_count()),
            Some(2)
        );
    }

    #[test]
    fn clear_path_detaches_parent_reference() {
        let mut parent = Context::new();
        parent.move_to(1.0, 1.0);
        let mut child = Context::from_parent(&mut parent).unwrap();
        child.clear_path();
        assert!(child.current_path().is_none());
        assert!(parent.current_path().is_some());
    }

    #[test]
    fn world_transform_maps_midpoint_to_page_centre() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        ctx.set_worlds(0.0, 0.0, 1000.0, 1000.0, None, WorldUnits::Metres, false)
            .unwrap();
        assert_eq!(ctx.transform_to_page(500.0, 500.0), (50.0, 50.0));
        // 1000 m on a 100 mm page: scale denominator 10 000.
        assert_eq!(ctx.world_scale(), Some(10_000.0));
        // Round trip back to world coordinates.
        let (wx, wy) = ctx.transform_to_worlds(50.0, 50.0).unwrap();
        assert!(core_value::numeric::doubles_equal(wx, 500.0));
        assert!(core_value::numeric::doubles_equal(wy, 500.0));
    }

    #[test]
    fn aspect_correction_expands_narrow_dimension() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        // World 1000x500 on a square page: height expands to 1000,
        // midpoint preserved.
        ctx.set_worlds(0.0, 0.0, 1000.0, 500.0, None, WorldUnits::Metres, false)
            .unwrap();
        let extents = ctx.world_extents().unwrap();
        assert_eq!(extents.y1, -250.0);
        assert_eq!(extents.y2, 750.0);
        assert_eq!(extents.x1, 0.0);
    }

    #[test]
    fn distortion_allowed_uses_rect_verbatim() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        ctx.set_worlds(0.0, 0.0, 1000.0, 500.0, None, WorldUnits::Metres, true)
            .unwrap();
        let extents = ctx.world_extents().unwrap();
        assert_eq!((extents.y1, extents.y2), (0.0, 500.0));
    }

    #[test]
    fn zero_world_range_rejected() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        assert!(matches!(
            ctx.set_worlds(5.0, 0.0, 5.0, 10.0, None, WorldUnits::Metres, false),
            Err(MapyrusError::ZeroWorldRange)
        ));
    }

    #[test]
    fn drawing_without_page_is_no_output() {
        let mut ctx = Context::new();
        ctx.move_to(0.0, 0.0);
        assert!(matches!(ctx.stroke(None), Err(MapyrusError::NoOutput)));
    }

    #[test]
    fn stroke_flushes_then_draws() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        ctx.move_to(0.0, 0.0);
        ctx.line_to(10.0, 0.0).unwrap();
        ctx.stroke(None).unwrap();
        let ops = log.ops();
        let stroke_at = ops
            .iter()
            .position(|o| matches!(o, DeviceOp::Stroke { .. }))
            .unwrap();
        assert!(
            ops[..stroke_at]
                .iter()
                .any(|o| matches!(o, DeviceOp::SetLinestyle(_))),
            "linestyle must flush before stroke: {ops:?}"
        );
        // Label needs FONT too, which stroke did not flush.
        ctx.label("Hi").unwrap();
        let ops = log.ops();
        assert!(ops.iter().any(|o| matches!(o, DeviceOp::SetFont(_))));
    }

    #[test]
    fn rline_continues_in_user_space() {
        let log = RecordingLog::new();
        let mut ctx = page_context(&log);
        ctx.scale(2.0);
        ctx.move_to(5.0, 5.0);
        ctx.rline_to(1.0, 0.0).unwrap();
        let path = ctx.current_path().unwrap();
        // moveTo lands at (10,10); a 1-unit user offset is 2 mm.
        assert_eq!(path.end_point(), Some((12.0, 10.0)));
    }
}
