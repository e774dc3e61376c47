//! Curve flattening at a resolution-derived tolerance.
//!
//! Cubic segments subdivide recursively until both control points lie
//! within the tolerance of the chord. The flattened form is what every
//! measurement (length, area, centroid, angles) and every rewriting
//! operation works on; tolerance is the current page resolution in
//! millimetres so output never shows facets coarser than a device pixel.

use crate::{Path, PathSegment};

/// One flattened sub-path: straight-line points only.
#[derive(Debug, Clone)]
pub struct SubPath {
    pub points: Vec<(f64, f64)>,
    /// Rotation carried by the opening moveto, radians.
    pub rotation: f64,
    /// True when the sub-path ended with an explicit close.
    pub closed: bool,
}

impl SubPath {
    /// Closed either explicitly or because the endpoints coincide.
    pub fn is_ring(&self) -> bool {
        if self.closed {
            return true;
        }
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) if self.points.len() > 2 => {
                core_value::numeric::doubles_equal(a.0, b.0)
                    && core_value::numeric::doubles_equal(a.1, b.1)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub subpaths: Vec<SubPath>,
}

impl Flattened {
    pub fn all_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.subpaths.iter().flat_map(|s| s.points.iter().copied())
    }
}

/// Flatten a path's segments at the given tolerance (mm).
pub fn flatten(path: &Path, tolerance: f64) -> Flattened {
    let tolerance = if tolerance > 0.0 { tolerance } else { 0.1 };
    let mut out = Flattened::default();
    let mut current: Option<SubPath> = None;
    for seg in path.segments() {
        match *seg {
            PathSegment::Move { x, y, rotation } => {
                // An isolated moveto point is still a sub-path.
                if let Some(sub) = current.take() {
                    out.subpaths.push(sub);
                }
                current = Some(SubPath {
                    points: vec![(x, y)],
                    rotation,
                    closed: false,
                });
            }
            PathSegment::Line { x, y } => {
                if let Some(sub) = current.as_mut() {
                    sub.points.push((x, y));
                }
            }
            PathSegment::Cubic {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
            } => {
                if let Some(sub) = current.as_mut()
                    && let Some(&(sx, sy)) = sub.points.last()
                {
                    flatten_cubic(sx, sy, x1, y1, x2, y2, x3, y3, tolerance, 0, &mut sub.points);
                }
            }
            PathSegment::Close => {
                if let Some(sub) = current.as_mut() {
                    if let (Some(&first), Some(&last)) = (sub.points.first(), sub.points.last())
                        && (first != last)
                    {
                        sub.points.push(first);
                    }
                    sub.closed = true;
                }
            }
        }
    }
    if let Some(sub) = current.take() {
        out.subpaths.push(sub);
    }
    out
}

const MAX_DEPTH: u32 = 24;

#[allow(clippy::too_many_arguments)]
fn flatten_cubic(
    sx: f64,
    sy: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    tolerance: f64,
    depth: u32,
    out: &mut Vec<(f64, f64)>,
) {
    if depth >= MAX_DEPTH || cubic_is_flat(sx, sy, x1, y1, x2, y2, x3, y3, tolerance) {
        out.push((x3, y3));
        return;
    }
    // de Casteljau split at t = 0.5.
    let ax = (sx + x1) / 2.0;
    let ay = (sy + y1) / 2.0;
    let bx = (x1 + x2) / 2.0;
    let by = (y1 + y2) / 2.0;
    let cx = (x2 + x3) / 2.0;
    let cy = (y2 + y3) / 2.0;
    let abx = (ax + bx) / 2.0;
    let aby = (ay + by) / 2.0;
    let bcx = (bx + cx) / 2.0;
    let bcy = (by + cy) / 2.0;
    let mx = (abx + bcx) / 2.0;
    let my = (aby + bcy) / 2.0;
    flatten_cubic(sx, sy, ax, ay, abx, aby, mx, my, tolerance, depth + 1, out);
    flatten_cubic(mx, my, bcx, bcy, cx, cy, x3, y3, tolerance, depth + 1, out);
}

#[allow(clippy::too_many_arguments)]
fn cubic_is_flat(
    sx: f64,
    sy: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    tolerance: f64,
) -> bool {
    point_line_distance(x1, y1, sx, sy, x3, y3) <= tolerance
        && point_line_distance(x2, y2, sx, sy, x3, y3) <= tolerance
}

fn point_line_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Length of a polyline.
pub fn polyline_length(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| {
            let (ax, ay) = w[0];
            let (bx, by) = w[1];
            ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
        })
        .sum()
}

/// Signed shoelace area of a ring; positive is counter-clockwise. The ring
/// is closed implicitly.
pub fn ring_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let (ax, ay) = points[i];
        let (bx, by) = points[(i + 1) % points.len()];
        sum += ax * by - bx * ay;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Path;

    #[test]
    fn line_path_flattens_verbatim() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(10.0, 0.0).unwrap();
        p.line_to(10.0, 10.0).unwrap();
        let flat = flatten(&p, 0.1);
        assert_eq!(flat.subpaths.len(), 1);
        assert_eq!(flat.subpaths[0].points, vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn cubic_flattens_within_tolerance() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.curve_to(0.0, 10.0, 10.0, 10.0, 10.0, 0.0).unwrap();
        let flat = flatten(&p, 0.01);
        let pts = &flat.subpaths[0].points;
        assert!(pts.len() > 4, "expected subdivision, got {} points", pts.len());
        assert_eq!(*pts.last().unwrap(), (10.0, 0.0));
    }

    #[test]
    fn close_repeats_first_point() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(5.0, 0.0).unwrap();
        p.line_to(5.0, 5.0).unwrap();
        p.close_path();
        let flat = flatten(&p, 0.1);
        assert!(flat.subpaths[0].closed);
        assert_eq!(*flat.subpaths[0].points.last().unwrap(), (0.0, 0.0));
    }

    #[test]
    fn shoelace_signs() {
        let ccw = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert_eq!(ring_area(&ccw), 100.0);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_eq!(ring_area(&cw), -100.0);
    }
}
