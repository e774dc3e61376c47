//! Rectangle clipping (guillotine) and point-in-polygon tests.
//!
//! Closed sub-paths clip with Sutherland–Hodgman against each rectangle
//! edge in turn; open sub-paths clip segment-by-segment (Liang–Barsky) and
//! re-chain into contiguous runs. Points-only paths keep the points that
//! fall inside. When the path's bounding box is entirely inside or outside
//! the rectangle the whole computation short-circuits.

use core_value::numeric::doubles_equal;
use tracing::trace;

use crate::flatten::{Flattened, flatten};
use crate::transform::Rect;
use crate::Path;

/// Clip a path against an axis-aligned rectangle, flattening curves at the
/// given tolerance. Boundaries are inclusive.
pub fn guillotine(path: &Path, rect: Rect, tolerance: f64) -> Path {
    let rect = rect.normalised();
    let Some(bbox) = path.bounding_box() else {
        return Path::new();
    };
    if rect.contains_rect(&bbox) {
        trace!(target: "path.clip", "bbox_inside_short_circuit");
        return path.clone();
    }
    if !rect.intersects(&bbox) {
        trace!(target: "path.clip", "bbox_outside_short_circuit");
        return Path::new();
    }
    if path.line_to_count() == 0 && path.move_to_count() > 0 {
        let mut out = Path::new();
        let rotations = path.move_to_rotations();
        for (i, (x, y)) in path.move_tos().into_iter().enumerate() {
            if rect.contains(x, y) {
                out.move_to(x, y, rotations.get(i).copied().unwrap_or(0.0));
            }
        }
        return out;
    }

    let flat = flatten(path, tolerance);
    let mut out = Path::new();
    for sub in &flat.subpaths {
        if sub.points.len() < 2 {
            if let Some(&(x, y)) = sub.points.first()
                && rect.contains(x, y)
            {
                out.move_to(x, y, sub.rotation);
            }
            continue;
        }
        if sub.is_ring() {
            let mut ring = sub.points.clone();
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            let clipped = clip_ring(&ring, rect);
            if clipped.len() >= 3 {
                out.move_to(clipped[0].0, clipped[0].1, sub.rotation);
                for &(x, y) in &clipped[1..] {
                    out.push_line(x, y);
                }
                out.close_path();
            }
        } else {
            clip_polyline(&sub.points, rect, sub.rotation, &mut out);
        }
    }
    out
}

/// Even-odd test against every sub-path treated as a ring.
pub fn point_inside(path: &Path, x: f64, y: f64, tolerance: f64) -> bool {
    point_inside_flattened(&flatten(path, tolerance), x, y)
}

pub fn point_inside_flattened(flat: &Flattened, x: f64, y: f64) -> bool {
    let mut inside = false;
    for sub in &flat.subpaths {
        let pts = &sub.points;
        if pts.len() < 3 {
            continue;
        }
        for i in 0..pts.len() {
            let (ax, ay) = pts[i];
            let (bx, by) = pts[(i + 1) % pts.len()];
            if (ay > y) != (by > y) {
                let xint = ax + (y - ay) * (bx - ax) / (by - ay);
                if xint > x {
                    inside = !inside;
                }
            }
        }
    }
    inside
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

const EDGES: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

impl Edge {
    fn inside(self, p: (f64, f64), rect: Rect) -> bool {
        match self {
            Edge::Left => p.0 >= rect.x1,
            Edge::Right => p.0 <= rect.x2,
            Edge::Bottom => p.1 >= rect.y1,
            Edge::Top => p.1 <= rect.y2,
        }
    }

    fn intersect(self, a: (f64, f64), b: (f64, f64), rect: Rect) -> (f64, f64) {
        let (boundary, vertical) = match self {
            Edge::Left => (rect.x1, true),
            Edge::Right => (rect.x2, true),
            Edge::Bottom => (rect.y1, false),
            Edge::Top => (rect.y2, false),
        };
        if vertical {
            let t = (boundary - a.0) / (b.0 - a.0);
            (boundary, a.1 + t * (b.1 - a.1))
        } else {
            let t = (boundary - a.1) / (b.1 - a.1);
            (a.0 + t * (b.0 - a.0), boundary)
        }
    }
}

fn clip_ring(points: &[(f64, f64)], rect: Rect) -> Vec<(f64, f64)> {
    let mut poly = points.to_vec();
    for edge in EDGES {
        if poly.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(poly.len() + 4);
        for i in 0..poly.len() {
            let s = poly[i];
            let e = poly[(i + 1) % poly.len()];
            let s_in = edge.inside(s, rect);
            let e_in = edge.inside(e, rect);
            if e_in {
                if !s_in {
                    next.push(edge.intersect(s, e, rect));
                }
                next.push(e);
            } else if s_in {
                next.push(edge.intersect(s, e, rect));
            }
        }
        poly = next;
    }
    dedupe_consecutive(&mut poly);
    poly
}

fn dedupe_consecutive(points: &mut Vec<(f64, f64)>) {
    points.dedup_by(|a, b| doubles_equal(a.0, b.0) && doubles_equal(a.1, b.1));
    if points.len() > 1 {
        let first = points[0];
        let last = points[points.len() - 1];
        if doubles_equal(first.0, last.0) && doubles_equal(first.1, last.1) {
            points.pop();
        }
    }
}

/// Liang–Barsky clip of one segment; None when fully outside.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    rect: Rect,
) -> Option<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let checks = [
        (-dx, a.0 - rect.x1),
        (dx, rect.x2 - a.0),
        (-dy, a.1 - rect.y1),
        (dy, rect.y2 - a.1),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

fn clip_polyline(points: &[(f64, f64)], rect: Rect, rotation: f64, out: &mut Path) {
    let mut last_end: Option<(f64, f64)> = None;
    for w in points.windows(2) {
        match clip_segment(w[0], w[1], rect) {
            Some((p0, p1)) => {
                let contiguous = last_end.is_some_and(|le| {
                    doubles_equal(le.0, p0.0) && doubles_equal(le.1, p0.1)
                });
                if !contiguous {
                    out.move_to(p0.0, p0.1, rotation);
                }
                out.push_line(p1.0, p1.1);
                last_end = Some(p1);
            }
            None => {
                last_end = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x1: f64, y1: f64, x2: f64, y2: f64) -> Path {
        let mut p = Path::new();
        p.move_to(x1, y1, 0.0);
        p.line_to(x2, y1).unwrap();
        p.line_to(x2, y2).unwrap();
        p.line_to(x1, y2).unwrap();
        p.close_path();
        p
    }

    #[test]
    fn square_clipped_to_inner_rect_corners() {
        let p = square(0.0, 0.0, 10.0, 10.0);
        let clipped = guillotine(&p, Rect::new(2.0, 2.0, 8.0, 8.0), 0.01);
        let flat = clipped.flattened(0.01);
        assert_eq!(flat.subpaths.len(), 1);
        let mut pts = flat.subpaths[0].points.clone();
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(pts, vec![(2.0, 2.0), (2.0, 8.0), (8.0, 2.0), (8.0, 8.0)]);
    }

    #[test]
    fn fully_inside_is_unchanged() {
        let p = square(3.0, 3.0, 6.0, 6.0);
        let clipped = guillotine(&p, Rect::new(0.0, 0.0, 10.0, 10.0), 0.01);
        assert_eq!(clipped, p);
    }

    #[test]
    fn disjoint_yields_empty() {
        let p = square(20.0, 20.0, 30.0, 30.0);
        let clipped = guillotine(&p, Rect::new(0.0, 0.0, 10.0, 10.0), 0.01);
        assert!(clipped.is_empty());
    }

    #[test]
    fn points_only_filtering() {
        let mut p = Path::new();
        p.move_to(1.0, 1.0, 0.5);
        p.move_to(15.0, 1.0, 0.6);
        p.move_to(5.0, 5.0, 0.7);
        let clipped = guillotine(&p, Rect::new(0.0, 0.0, 10.0, 10.0), 0.01);
        assert_eq!(clipped.move_tos(), vec![(1.0, 1.0), (5.0, 5.0)]);
        assert_eq!(clipped.move_to_rotations(), vec![0.5, 0.7]);
    }

    #[test]
    fn open_polyline_chains_runs() {
        let mut p = Path::new();
        p.move_to(-5.0, 5.0, 0.0);
        p.line_to(5.0, 5.0).unwrap();
        p.line_to(15.0, 5.0).unwrap();
        let clipped = guillotine(&p, Rect::new(0.0, 0.0, 10.0, 10.0), 0.01);
        // Two source segments clip into one contiguous run.
        assert_eq!(clipped.move_to_count(), 1);
        assert_eq!(clipped.start_point(), Some((0.0, 5.0)));
        assert_eq!(clipped.end_point(), Some((10.0, 5.0)));
    }

    #[test]
    fn point_in_polygon_even_odd() {
        let p = square(0.0, 0.0, 10.0, 10.0);
        assert!(point_inside(&p, 5.0, 5.0, 0.01));
        assert!(!point_inside(&p, 15.0, 5.0, 0.01));
    }
}
