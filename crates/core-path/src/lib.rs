//! Geometric path engine.
//!
//! All coordinates are page millimetres; callers transform world and user
//! coordinates before appending. A path is an ordered sequence of
//! sub-paths, each opened by a moveto that carries a rotation (radians)
//! used by per-moveto procedure dispatch. Arcs and ellipses are converted
//! to cubic segments on append; measurements and rewriting operations work
//! on the form flattened at the current page resolution.
//!
//! Invariants:
//! * A lineto/curve/arc without a current point is an error.
//! * `close_path` connects back to the last moveto and never opens a new
//!   sub-path.
//! * Cumulative length is cached per (tolerance, value) and invalidated by
//!   any mutation.

use std::cell::Cell;
use std::f64::consts::PI;

use core_value::error::{MapyrusError, Result};
use core_value::numeric::fmod_positive;

pub mod clip;
pub mod flatten;
pub mod sinkhole;
pub mod transform;

pub use transform::{AffineTransform, Rect};

use flatten::{Flattened, flatten, polyline_length, ring_area};

/// One appended path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Move { x: f64, y: f64, rotation: f64 },
    Line { x: f64, y: f64 },
    Cubic { x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64 },
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
    move_count: usize,
    line_count: usize,
    subpath_start: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
    length_cache: Cell<Option<(f64, f64)>>,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to_count(&self) -> usize {
        self.move_count
    }

    /// Count of drawing segments (lines, curve subdivisions) appended.
    pub fn line_to_count(&self) -> usize {
        self.line_count
    }

    pub fn current_point(&self) -> Option<(f64, f64)> {
        self.current
    }

    fn invalidate(&mut self) {
        self.length_cache.set(None);
    }

    pub fn move_to(&mut self, x: f64, y: f64, rotation: f64) {
        self.segments.push(PathSegment::Move { x, y, rotation });
        self.move_count += 1;
        self.subpath_start = Some((x, y));
        self.current = Some((x, y));
        self.invalidate();
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(MapyrusError::NoMoveTo);
        }
        self.push_line(x, y);
        Ok(())
    }

    /// Append a line without the current-point check; rewriting operations
    /// use this after emitting their own moveto.
    pub(crate) fn push_line(&mut self, x: f64, y: f64) {
        self.segments.push(PathSegment::Line { x, y });
        self.line_count += 1;
        self.current = Some((x, y));
        self.invalidate();
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(MapyrusError::NoBezierStart);
        }
        self.push_cubic(x1, y1, x2, y2, x, y);
        Ok(())
    }

    fn push_cubic(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.segments.push(PathSegment::Cubic { x1, y1, x2, y2, x3, y3 });
        self.line_count += 1;
        self.current = Some((x3, y3));
        self.invalidate();
    }

    /// Circular arc from the current point, sweeping around (cx, cy) to the
    /// angle of (ex, ey). Direction +1 is clockwise, -1 counter-clockwise;
    /// a coincident start and end sweeps a full circle.
    pub fn arc_to(&mut self, direction: f64, cx: f64, cy: f64, ex: f64, ey: f64) -> Result<()> {
        let (sx, sy) = self.current.ok_or(MapyrusError::NoArcStart)?;
        let radius = ((sx - cx).powi(2) + (sy - cy).powi(2)).sqrt();
        if radius == 0.0 {
            return Ok(());
        }
        let start_angle = (sy - cy).atan2(sx - cx);
        let end_angle = (ey - cy).atan2(ex - cx);
        let sweep = if direction >= 0.0 {
            // Clockwise: decreasing angle.
            let s = fmod_positive(start_angle - end_angle, 2.0 * PI);
            if s == 0.0 { -2.0 * PI } else { -s }
        } else {
            let s = fmod_positive(end_angle - start_angle, 2.0 * PI);
            if s == 0.0 { 2.0 * PI } else { s }
        };
        let chunks = (sweep.abs() / (PI / 2.0)).ceil().max(1.0) as usize;
        let step = sweep / chunks as f64;
        let mut a0 = start_angle;
        for _ in 0..chunks {
            let a1 = a0 + step;
            // Cubic approximation of an arc of extent `step`.
            let k = 4.0 / 3.0 * (step / 4.0).tan();
            let (s0, c0) = a0.sin_cos();
            let (s1, c1) = a1.sin_cos();
            let p0 = (cx + radius * c0, cy + radius * s0);
            let p3 = (cx + radius * c1, cy + radius * s1);
            let p1 = (p0.0 - k * radius * s0, p0.1 + k * radius * c0);
            let p2 = (p3.0 + k * radius * s1, p3.1 - k * radius * c1);
            self.push_cubic(p1.0, p1.1, p2.0, p2.1, p3.0, p3.1);
            a0 = a1;
        }
        Ok(())
    }

    /// Append a closed ellipse inscribed in the given box, rotated about
    /// its centre.
    pub fn ellipse(&mut self, xmin: f64, ymin: f64, xmax: f64, ymax: f64, rotation: f64) {
        const K: f64 = 0.552_284_749_830_793_4;
        let cx = (xmin + xmax) / 2.0;
        let cy = (ymin + ymax) / 2.0;
        let rx = (xmax - xmin) / 2.0;
        let ry = (ymax - ymin) / 2.0;
        let (sin, cos) = rotation.sin_cos();
        let rot = |x: f64, y: f64| -> (f64, f64) {
            let dx = x - cx;
            let dy = y - cy;
            (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
        };
        // Control net for four quarter arcs, start at the +x extreme.
        let pts = [
            (cx + rx, cy),
            (cx + rx, cy + K * ry),
            (cx + K * rx, cy + ry),
            (cx, cy + ry),
            (cx - K * rx, cy + ry),
            (cx - rx, cy + K * ry),
            (cx - rx, cy),
            (cx - rx, cy - K * ry),
            (cx - K * rx, cy - ry),
            (cx, cy - ry),
            (cx + K * rx, cy - ry),
            (cx + rx, cy - K * ry),
        ];
        let start = rot(pts[0].0, pts[0].1);
        self.move_to(start.0, start.1, rotation);
        for quarter in 0..4 {
            let c1 = rot(pts[quarter * 3 + 1].0, pts[quarter * 3 + 1].1);
            let c2 = rot(pts[quarter * 3 + 2].0, pts[quarter * 3 + 2].1);
            let end = rot(
                pts[(quarter * 3 + 3) % 12].0,
                pts[(quarter * 3 + 3) % 12].1,
            );
            self.push_cubic(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
        }
        self.close_path();
    }

    /// Sine wave from the current point to (x, y): twenty linear segments
    /// per repeat, partial final period allowed, amplitude perpendicular to
    /// the baseline.
    pub fn sine_wave_to(&mut self, x: f64, y: f64, repeats: f64, amplitude: f64) -> Result<()> {
        const SEGMENTS_PER_PERIOD: f64 = 20.0;
        let (sx, sy) = self.current.ok_or(MapyrusError::NoSineWaveStart)?;
        if repeats <= 0.0 {
            return Err(MapyrusError::UnexpectedValues(
                "sine wave repeat count must be positive".to_string(),
            ));
        }
        let dx = x - sx;
        let dy = y - sy;
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return Ok(());
        }
        let (nx, ny) = (-dy / len, dx / len);
        let n = (repeats * SEGMENTS_PER_PERIOD).ceil().max(1.0) as usize;
        for i in 1..=n {
            let t = i as f64 / n as f64;
            let wave = amplitude * (2.0 * PI * repeats * t).sin();
            self.push_line(sx + dx * t + nx * wave, sy + dy * t + ny * wave);
        }
        Ok(())
    }

    /// Close the current sub-path back to its moveto; no-op without one.
    pub fn close_path(&mut self) {
        if let Some(start) = self.subpath_start {
            self.segments.push(PathSegment::Close);
            self.current = Some(start);
            self.invalidate();
        }
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.move_count = 0;
        self.line_count = 0;
        self.subpath_start = None;
        self.current = None;
        self.invalidate();
    }

    pub fn move_tos(&self) -> Vec<(f64, f64)> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Move { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    pub fn move_to_rotations(&self) -> Vec<f64> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Move { rotation, .. } => Some(*rotation),
                _ => None,
            })
            .collect()
    }

    /// Bounding box over endpoints and curve control points.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut bbox: Option<Rect> = None;
        let mut grow = |x: f64, y: f64| {
            if let Some(r) = bbox.as_mut() {
                r.expand_to(x, y);
            } else {
                bbox = Some(Rect::new(x, y, x, y));
            }
        };
        for seg in &self.segments {
            match *seg {
                PathSegment::Move { x, y, .. } | PathSegment::Line { x, y } => grow(x, y),
                PathSegment::Cubic { x1, y1, x2, y2, x3, y3 } => {
                    grow(x1, y1);
                    grow(x2, y2);
                    grow(x3, y3);
                }
                PathSegment::Close => {}
            }
        }
        bbox
    }

    pub fn flattened(&self, tolerance: f64) -> Flattened {
        flatten(self, tolerance)
    }

    /// Cumulative length at the given flattening tolerance, cached.
    pub fn length(&self, tolerance: f64) -> f64 {
        if let Some((tol, len)) = self.length_cache.get()
            && tol == tolerance
        {
            return len;
        }
        let flat = flatten(self, tolerance);
        let len = flat
            .subpaths
            .iter()
            .map(|s| polyline_length(&s.points))
            .sum();
        self.length_cache.set(Some((tolerance, len)));
        len
    }

    /// Signed area; positive is counter-clockwise. Every sub-path is
    /// treated as a ring.
    pub fn area(&self, tolerance: f64) -> f64 {
        flatten(self, tolerance)
            .subpaths
            .iter()
            .map(|s| ring_area(&s.points))
            .sum()
    }

    pub fn is_clockwise(&self, tolerance: f64) -> bool {
        self.area(tolerance) < 0.0
    }

    /// Area-weighted centroid; (0, 0) for an empty path, mean of vertices
    /// for zero-area paths.
    pub fn centroid(&self, tolerance: f64) -> (f64, f64) {
        let flat = flatten(self, tolerance);
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for sub in &flat.subpaths {
            let pts = &sub.points;
            if pts.len() < 3 {
                continue;
            }
            for i in 0..pts.len() {
                let (ax, ay) = pts[i];
                let (bx, by) = pts[(i + 1) % pts.len()];
                let cross = ax * by - bx * ay;
                area_sum += cross;
                cx += (ax + bx) * cross;
                cy += (ay + by) * cross;
            }
        }
        if area_sum.abs() > 1e-12 {
            return (cx / (3.0 * area_sum), cy / (3.0 * area_sum));
        }
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for (x, y) in flat.all_points() {
            sx += x;
            sy += y;
            n += 1;
        }
        if n == 0 { (0.0, 0.0) } else { (sx / n as f64, sy / n as f64) }
    }

    pub fn start_point(&self) -> Option<(f64, f64)> {
        self.segments.iter().find_map(|s| match s {
            PathSegment::Move { x, y, .. } => Some((*x, *y)),
            _ => None,
        })
    }

    pub fn end_point(&self) -> Option<(f64, f64)> {
        self.current
    }

    /// Tangent direction at the start of the first sub-path, radians.
    pub fn start_angle(&self, tolerance: f64) -> f64 {
        let flat = flatten(self, tolerance);
        for sub in &flat.subpaths {
            if sub.points.len() >= 2 {
                let (ax, ay) = sub.points[0];
                let (bx, by) = sub.points[1];
                return (by - ay).atan2(bx - ax);
            }
        }
        0.0
    }

    /// Tangent direction at the end of the last sub-path, radians.
    pub fn end_angle(&self, tolerance: f64) -> f64 {
        let flat = flatten(self, tolerance);
        for sub in flat.subpaths.iter().rev() {
            if sub.points.len() >= 2 {
                let (ax, ay) = sub.points[sub.points.len() - 2];
                let (bx, by) = sub.points[sub.points.len() - 1];
                return (by - ay).atan2(bx - ax);
            }
        }
        0.0
    }

    /// Replace with isolated moveto points every `spacing` along the path,
    /// the first at `offset`, each carrying the local tangent angle.
    pub fn sample(&self, spacing: f64, offset: f64, tolerance: f64) -> Result<Path> {
        if spacing <= 0.0 {
            return Err(MapyrusError::UnexpectedValues(
                "sample spacing must be positive".to_string(),
            ));
        }
        let flat = flatten(self, tolerance);
        let mut out = Path::new();
        for sub in &flat.subpaths {
            if sub.points.len() < 2 {
                if let Some(&(x, y)) = sub.points.first() {
                    out.move_to(x, y, sub.rotation);
                }
                continue;
            }
            let total = polyline_length(&sub.points);
            let mut target = offset;
            while target < 0.0 {
                target += spacing;
            }
            let mut seg = 0usize;
            let mut seg_start = 0.0;
            while target <= total + 1e-9 {
                while seg < sub.points.len() - 2 {
                    let len = segment_length(sub.points[seg], sub.points[seg + 1]);
                    if seg_start + len >= target - 1e-9 {
                        break;
                    }
                    seg_start += len;
                    seg += 1;
                }
                let (ax, ay) = sub.points[seg];
                let (bx, by) = sub.points[seg + 1];
                let len = segment_length((ax, ay), (bx, by));
                let t = if len > 0.0 {
                    ((target - seg_start) / len).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let angle = (by - ay).atan2(bx - ax);
                out.move_to(ax + t * (bx - ax), ay + t * (by - ay), angle);
                target += spacing;
            }
        }
        Ok(out)
    }

    /// Replace a polygon with parallel lines covering its bounding box at
    /// the given spacing and angle (radians, 0 = horizontal).
    pub fn stripe(&self, spacing: f64, angle: f64) -> Result<Path> {
        if spacing <= 0.0 {
            return Err(MapyrusError::UnexpectedValues(
                "stripe spacing must be positive".to_string(),
            ));
        }
        let mut out = Path::new();
        let Some(bbox) = self.bounding_box() else {
            return Ok(out);
        };
        let (cx, cy) = bbox.center();
        let reach = (bbox.width().powi(2) + bbox.height().powi(2)).sqrt() / 2.0 + spacing;
        let (sin, cos) = angle.sin_cos();
        let mut t = -reach;
        while t <= reach {
            let ox = -sin * t;
            let oy = cos * t;
            out.move_to(cx + ox - cos * reach, cy + oy - sin * reach, angle);
            out.push_line(cx + ox + cos * reach, cy + oy + sin * reach);
            t += spacing;
        }
        Ok(out)
    }

    /// Offset by each signed distance (positive to the right of travel),
    /// joining segment offsets at miters.
    pub fn parallel(&self, distances: &[f64], tolerance: f64) -> Path {
        let flat = flatten(self, tolerance);
        let mut out = Path::new();
        for &d in distances {
            for sub in &flat.subpaths {
                if sub.points.len() < 2 {
                    continue;
                }
                let ring = sub.is_ring();
                let mut pts = sub.points.clone();
                if ring && pts.len() > 1 && pts.first() == pts.last() {
                    pts.pop();
                }
                let offset = offset_polyline(&pts, d, ring);
                if offset.len() < 2 {
                    continue;
                }
                out.move_to(offset[0].0, offset[0].1, sub.rotation);
                for &(x, y) in &offset[1..] {
                    out.push_line(x, y);
                }
                if ring {
                    out.close_path();
                }
            }
        }
        out
    }

    /// Pick sub-arcs by arc-length parameters measured continuously along
    /// the flattened path.
    pub fn select(&self, offsets: &[f64], lengths: &[f64], tolerance: f64) -> Path {
        let flat = flatten(self, tolerance);
        let mut out = Path::new();
        for (i, &from) in offsets.iter().enumerate() {
            let len = lengths.get(i).copied().unwrap_or(0.0);
            if len <= 0.0 {
                continue;
            }
            extract_range(&flat, from, from + len, &mut out);
        }
        out
    }

    /// Reverse the direction of every sub-path (flattened form).
    pub fn reversed(&self, tolerance: f64) -> Path {
        let flat = flatten(self, tolerance);
        let mut out = Path::new();
        for sub in flat.subpaths.iter().rev() {
            let mut pts: Vec<(f64, f64)> = sub.points.clone();
            pts.reverse();
            let Some(&(x, y)) = pts.first() else { continue };
            out.move_to(x, y, sub.rotation);
            for &(px, py) in &pts[1..] {
                out.push_line(px, py);
            }
            if sub.closed {
                out.close_path();
            }
        }
        out
    }

    /// Shift every vertex by (dx, dy) in page coordinates.
    pub fn translated(&self, dx: f64, dy: f64) -> Path {
        let mut out = Path::new();
        out.segments = self
            .segments
            .iter()
            .map(|seg| match *seg {
                PathSegment::Move { x, y, rotation } => PathSegment::Move {
                    x: x + dx,
                    y: y + dy,
                    rotation,
                },
                PathSegment::Line { x, y } => PathSegment::Line { x: x + dx, y: y + dy },
                PathSegment::Cubic { x1, y1, x2, y2, x3, y3 } => PathSegment::Cubic {
                    x1: x1 + dx,
                    y1: y1 + dy,
                    x2: x2 + dx,
                    y2: y2 + dy,
                    x3: x3 + dx,
                    y3: y3 + dy,
                },
                PathSegment::Close => PathSegment::Close,
            })
            .collect();
        out.move_count = self.move_count;
        out.line_count = self.line_count;
        out.subpath_start = self.subpath_start.map(|(x, y)| (x + dx, y + dy));
        out.current = self.current.map(|(x, y)| (x + dx, y + dy));
        out
    }

    /// Clip against an axis-aligned rectangle; see [`clip::guillotine`].
    pub fn guillotine(&self, rect: Rect, tolerance: f64) -> Path {
        clip::guillotine(self, rect, tolerance)
    }

    /// Representative interior point; see [`sinkhole::find`].
    pub fn sinkhole(&self, tolerance: f64) -> Option<(f64, f64)> {
        sinkhole::find(self, tolerance)
    }
}

fn segment_length(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn offset_polyline(points: &[(f64, f64)], distance: f64, ring: bool) -> Vec<(f64, f64)> {
    // Offset line per segment: (point + normal * d) at both ends, normals
    // to the right of the travel direction.
    let mut segs: Vec<((f64, f64), (f64, f64))> = Vec::new();
    let count = if ring { points.len() } else { points.len() - 1 };
    for i in 0..count {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let len = segment_length(a, b);
        if len == 0.0 {
            continue;
        }
        let nx = (b.1 - a.1) / len * distance;
        let ny = -(b.0 - a.0) / len * distance;
        segs.push(((a.0 + nx, a.1 + ny), (b.0 + nx, b.1 + ny)));
    }
    if segs.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(points.len());
    if !ring {
        out.push(segs[0].0);
    } else if let Some(p) = miter(segs[segs.len() - 1], segs[0]) {
        out.push(p);
    } else {
        out.push(segs[0].0);
    }
    for w in segs.windows(2) {
        out.push(miter(w[0], w[1]).unwrap_or(w[1].0));
    }
    if !ring {
        out.push(segs[segs.len() - 1].1);
    }
    out
}

/// Intersection of the infinite lines through two offset segments.
fn miter(a: ((f64, f64), (f64, f64)), b: ((f64, f64), (f64, f64))) -> Option<(f64, f64)> {
    let (p1, p2) = a;
    let (p3, p4) = b;
    let v1 = (p2.0 - p1.0, p2.1 - p1.1);
    let v2 = (p4.0 - p3.0, p4.1 - p3.1);
    let denom = v1.0 * v2.1 - v1.1 * v2.0;
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((p3.0 - p1.0) * v2.1 - (p3.1 - p1.1) * v2.0) / denom;
    Some((p1.0 + t * v1.0, p1.1 + t * v1.1))
}

fn extract_range(flat: &Flattened, from: f64, to: f64, out: &mut Path) {
    let mut cum = 0.0;
    for sub in &flat.subpaths {
        let mut started = false;
        for w in sub.points.windows(2) {
            let len = segment_length(w[0], w[1]);
            let seg_from = cum;
            let seg_to = cum + len;
            if len > 0.0 && seg_to > from && seg_from < to {
                let t0 = ((from - seg_from) / len).clamp(0.0, 1.0);
                let t1 = ((to - seg_from) / len).clamp(0.0, 1.0);
                let (ax, ay) = w[0];
                let (bx, by) = w[1];
                let p0 = (ax + t0 * (bx - ax), ay + t0 * (by - ay));
                let p1 = (ax + t1 * (bx - ax), ay + t1 * (by - ay));
                if !started {
                    out.move_to(p0.0, p0.1, sub.rotation);
                    started = true;
                }
                out.push_line(p1.0, p1.1);
            }
            cum = seg_to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_value::numeric::doubles_equal;

    const TOL: f64 = 0.01;

    #[test]
    fn line_without_move_fails() {
        let mut p = Path::new();
        assert!(matches!(p.line_to(1.0, 1.0), Err(MapyrusError::NoMoveTo)));
        assert!(matches!(
            p.curve_to(0.0, 0.0, 1.0, 1.0, 2.0, 0.0),
            Err(MapyrusError::NoBezierStart)
        ));
        assert!(matches!(
            p.arc_to(1.0, 0.0, 0.0, 1.0, 0.0),
            Err(MapyrusError::NoArcStart)
        ));
    }

    #[test]
    fn counts_track_segments() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(5.0, 0.0).unwrap();
        p.move_to(10.0, 0.0, 0.0);
        assert_eq!(p.move_to_count(), 2);
        assert_eq!(p.line_to_count(), 1);
    }

    #[test]
    fn full_circle_arc_length() {
        let mut p = Path::new();
        p.move_to(10.0, 0.0, 0.0);
        p.arc_to(1.0, 0.0, 0.0, 10.0, 0.0).unwrap();
        let len = p.length(0.001);
        let expect = 2.0 * PI * 10.0;
        assert!((len - expect).abs() < 0.05, "length {len} vs {expect}");
    }

    #[test]
    fn square_area_and_centroid() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(10.0, 0.0).unwrap();
        p.line_to(10.0, 10.0).unwrap();
        p.line_to(0.0, 10.0).unwrap();
        p.close_path();
        assert!(doubles_equal(p.area(TOL), 100.0));
        assert!(!p.is_clockwise(TOL));
        let (cx, cy) = p.centroid(TOL);
        assert!(doubles_equal(cx, 5.0) && doubles_equal(cy, 5.0));
    }

    #[test]
    fn empty_path_centroid_is_origin() {
        assert_eq!(Path::new().centroid(TOL), (0.0, 0.0));
    }

    #[test]
    fn sample_count_tracks_length() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(100.0, 0.0).unwrap();
        let sampled = p.sample(10.0, 0.0, TOL).unwrap();
        assert_eq!(sampled.move_to_count(), 11);
        assert_eq!(sampled.line_to_count(), 0);
        // Each sample carries the tangent of the horizontal baseline.
        assert!(sampled.move_to_rotations().iter().all(|r| *r == 0.0));
    }

    #[test]
    fn sample_rejects_non_positive_spacing() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(10.0, 0.0).unwrap();
        assert!(p.sample(0.0, 0.0, TOL).is_err());
    }

    #[test]
    fn parallel_offsets_straight_line() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(10.0, 0.0).unwrap();
        let off = p.parallel(&[2.0, -2.0], TOL);
        assert_eq!(off.move_to_count(), 2);
        let moves = off.move_tos();
        // Right of eastward travel is negative y.
        assert!(doubles_equal(moves[0].1, -2.0));
        assert!(doubles_equal(moves[1].1, 2.0));
    }

    #[test]
    fn select_extracts_sub_arc() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(100.0, 0.0).unwrap();
        let sel = p.select(&[20.0], &[30.0], TOL);
        assert_eq!(sel.start_point(), Some((20.0, 0.0)));
        assert_eq!(sel.end_point(), Some((50.0, 0.0)));
        assert!(doubles_equal(sel.length(TOL), 30.0));
    }

    #[test]
    fn reversed_swaps_endpoints() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(10.0, 0.0).unwrap();
        p.line_to(10.0, 5.0).unwrap();
        let r = p.reversed(TOL);
        assert_eq!(r.start_point(), Some((10.0, 5.0)));
        assert_eq!(r.end_point(), Some((0.0, 0.0)));
    }

    #[test]
    fn sine_wave_segment_count() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.sine_wave_to(100.0, 0.0, 2.0, 5.0).unwrap();
        assert_eq!(p.line_to_count(), 40);
        let (ex, ey) = p.end_point().unwrap();
        assert!(doubles_equal(ex, 100.0));
        assert!(ey.abs() < 1e-9);
    }

    #[test]
    fn stripe_covers_box() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(20.0, 0.0).unwrap();
        p.line_to(20.0, 20.0).unwrap();
        p.line_to(0.0, 20.0).unwrap();
        p.close_path();
        let stripes = p.stripe(5.0, 0.0).unwrap();
        assert!(stripes.move_to_count() >= 5);
        assert_eq!(stripes.move_to_count(), stripes.line_to_count());
    }

    #[test]
    fn translated_shifts_everything() {
        let mut p = Path::new();
        p.move_to(1.0, 2.0, 0.3);
        p.line_to(3.0, 4.0).unwrap();
        let t = p.translated(10.0, 20.0);
        assert_eq!(t.start_point(), Some((11.0, 22.0)));
        assert_eq!(t.end_point(), Some((13.0, 24.0)));
        assert_eq!(t.move_to_rotations(), vec![0.3]);
    }

    #[test]
    fn ellipse_is_closed_and_sized() {
        let mut p = Path::new();
        p.ellipse(0.0, 0.0, 20.0, 10.0, 0.0);
        assert_eq!(p.move_to_count(), 1);
        let area = p.area(0.001).abs();
        let expect = PI * 10.0 * 5.0;
        assert!((area - expect).abs() < 0.5, "area {area} vs {expect}");
    }
}
