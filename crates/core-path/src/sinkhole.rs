//! Representative interior point of a polygon by raster erosion.
//!
//! The polygon is scan-filled (even-odd) into a 64x64 bit grid, then eroded
//! by repeatedly clearing every set pixel with fewer than four set
//! 4-neighbours, recording the order pixels are cleared. The Nth-last
//! cleared pixel (N = 10) maps back through the rasterisation affine to a
//! point deep inside the polygon; taking the Nth-last instead of the very
//! last avoids degenerate single-pixel tails. With no pixel ever set the
//! bounding-box centre is returned.
//!
//! The grid is process-wide scratch state guarded by a mutex: one sinkhole
//! computation runs at a time.

use std::sync::Mutex;

use tracing::trace;

use crate::Path;
use crate::flatten::flatten;

const GRID_SIZE: usize = 64;
const LAST_PIXELS: usize = 10;

struct RasterScratch {
    cur: [u64; GRID_SIZE],
    next: [u64; GRID_SIZE],
}

static SCRATCH: Mutex<RasterScratch> = Mutex::new(RasterScratch {
    cur: [0; GRID_SIZE],
    next: [0; GRID_SIZE],
});

/// Interior point of the path's polygon, or `None` for an empty path.
pub fn find(path: &Path, tolerance: f64) -> Option<(f64, f64)> {
    let flat = flatten(path, tolerance);
    let mut bbox: Option<crate::Rect> = None;
    for (x, y) in flat.all_points() {
        if let Some(r) = bbox.as_mut() {
            r.expand_to(x, y);
        } else {
            bbox = Some(crate::Rect::new(x, y, x, y));
        }
    }
    let bbox = bbox?;
    if bbox.width() == 0.0 || bbox.height() == 0.0 {
        return Some(bbox.center());
    }
    let cell_w = bbox.width() / GRID_SIZE as f64;
    let cell_h = bbox.height() / GRID_SIZE as f64;

    let mut scratch = match SCRATCH.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    scratch.cur = [0; GRID_SIZE];

    // Even-odd scanline fill at row centres.
    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..GRID_SIZE {
        let yc = bbox.y1 + (row as f64 + 0.5) * cell_h;
        crossings.clear();
        for sub in &flat.subpaths {
            let pts = &sub.points;
            if pts.len() < 3 {
                continue;
            }
            for i in 0..pts.len() {
                let (ax, ay) = pts[i];
                let (bx, by) = pts[(i + 1) % pts.len()];
                if (ay > yc) != (by > yc) {
                    crossings.push(ax + (yc - ay) * (bx - ax) / (by - ay));
                }
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for pair in crossings.chunks_exact(2) {
            let (x0, x1) = (pair[0], pair[1]);
            for col in 0..GRID_SIZE {
                let xc = bbox.x1 + (col as f64 + 0.5) * cell_w;
                if xc >= x0 && xc <= x1 {
                    scratch.cur[row] |= 1u64 << col;
                }
            }
        }
    }

    if scratch.cur.iter().all(|row| *row == 0) {
        trace!(target: "path.sinkhole", "no_pixels_set_fallback_to_bbox_centre");
        return Some(bbox.center());
    }

    // Erosion passes with simultaneous update.
    let mut cleared: Vec<(usize, usize)> = Vec::new();
    loop {
        scratch.next = scratch.cur;
        let mut any_cleared = false;
        let mut any_left = false;
        for row in 0..GRID_SIZE {
            let bits = scratch.cur[row];
            if bits == 0 {
                continue;
            }
            for col in 0..GRID_SIZE {
                if bits & (1u64 << col) == 0 {
                    continue;
                }
                let mut neighbours = 0;
                if col > 0 && bits & (1u64 << (col - 1)) != 0 {
                    neighbours += 1;
                }
                if col + 1 < GRID_SIZE && bits & (1u64 << (col + 1)) != 0 {
                    neighbours += 1;
                }
                if row > 0 && scratch.cur[row - 1] & (1u64 << col) != 0 {
                    neighbours += 1;
                }
                if row + 1 < GRID_SIZE && scratch.cur[row + 1] & (1u64 << col) != 0 {
                    neighbours += 1;
                }
                if neighbours < 4 {
                    scratch.next[row] &= !(1u64 << col);
                    cleared.push((col, row));
                    any_cleared = true;
                } else {
                    any_left = true;
                }
            }
        }
        scratch.cur = scratch.next;
        if !any_left {
            break;
        }
        if !any_cleared {
            // A configuration erosion cannot reduce; drain in scan order.
            for row in 0..GRID_SIZE {
                for col in 0..GRID_SIZE {
                    if scratch.cur[row] & (1u64 << col) != 0 {
                        cleared.push((col, row));
                    }
                }
            }
            break;
        }
    }

    let idx = cleared.len().saturating_sub(LAST_PIXELS);
    let (col, row) = cleared[idx];
    trace!(
        target: "path.sinkhole",
        cleared = cleared.len(),
        col,
        row,
        "sinkhole_pixel"
    );
    Some((
        bbox.x1 + (col as f64 + 0.5) * cell_w,
        bbox.y1 + (row as f64 + 0.5) * cell_h,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(cx: f64, cy: f64, r: f64) -> Path {
        let mut p = Path::new();
        p.move_to(cx + r, cy, 0.0);
        p.arc_to(1.0, cx, cy, cx + r, cy).unwrap();
        p.close_path();
        p
    }

    #[test]
    fn circle_sinkhole_is_near_centre() {
        let p = circle(50.0, 50.0, 30.0);
        let (x, y) = find(&p, 0.1).unwrap();
        // Within two raster cells of the true centre.
        let cell = 60.0 / GRID_SIZE as f64;
        assert!((x - 50.0).abs() <= 2.0 * cell, "x off centre: {x}");
        assert!((y - 50.0).abs() <= 2.0 * cell, "y off centre: {y}");
    }

    #[test]
    fn result_stays_in_bounding_box() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0, 0.0);
        p.line_to(40.0, 0.0).unwrap();
        p.line_to(40.0, 10.0).unwrap();
        p.line_to(0.0, 10.0).unwrap();
        p.close_path();
        let (x, y) = find(&p, 0.1).unwrap();
        assert!((0.0..=40.0).contains(&x));
        assert!((0.0..=10.0).contains(&y));
    }

    #[test]
    fn empty_path_has_no_sinkhole() {
        assert!(find(&Path::new(), 0.1).is_none());
    }

    #[test]
    fn degenerate_area_falls_back_to_centre() {
        let mut p = Path::new();
        p.move_to(0.0, 5.0, 0.0);
        p.line_to(10.0, 5.0).unwrap();
        let (x, y) = find(&p, 0.1).unwrap();
        assert_eq!((x, y), (5.0, 5.0));
    }
}
