//! 2D affine transforms and axis-aligned rectangles.
//!
//! The transform maps user coordinates to page millimetres:
//! `px = xx*x + xy*y + tx`, `py = yx*x + yy*y + ty`. Mutating operations
//! compose so the new operation applies to incoming coordinates first
//! (`self = self ∘ op`), matching how a script's `scale` and `rotate`
//! commands accumulate.

use core_value::error::{MapyrusError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            xx: 1.0,
            yx: 0.0,
            xy: 0.0,
            yy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    /// Map a world rectangle onto a page rectangle (both corners given as
    /// (x1, y1)-(x2, y2), y increasing upwards on the page).
    pub fn rect_to_rect(world: Rect, page: Rect) -> Self {
        let sx = page.width() / world.width();
        let sy = page.height() / world.height();
        Self {
            xx: sx,
            yx: 0.0,
            xy: 0.0,
            yy: sy,
            tx: page.x1 - world.x1 * sx,
            ty: page.y1 - world.y1 * sy,
        }
    }

    /// Compose a translation applied to incoming coordinates first.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.tx += self.xx * dx + self.xy * dy;
        self.ty += self.yx * dx + self.yy * dy;
    }

    /// Compose a uniform scale applied to incoming coordinates first.
    pub fn scale(&mut self, factor: f64) {
        self.xx *= factor;
        self.yx *= factor;
        self.xy *= factor;
        self.yy *= factor;
    }

    /// Compose a rotation (radians, counter-clockwise) applied to incoming
    /// coordinates first.
    pub fn rotate(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        let xx = self.xx * c + self.xy * s;
        let xy = -self.xx * s + self.xy * c;
        let yx = self.yx * c + self.yy * s;
        let yy = -self.yx * s + self.yy * c;
        self.xx = xx;
        self.xy = xy;
        self.yx = yx;
        self.yy = yy;
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.xx * x + self.xy * y + self.tx,
            self.yx * x + self.yy * y + self.ty,
        )
    }

    /// Transform a distance vector: linear part only, no translation.
    pub fn transform_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.xx * dx + self.xy * dy, self.yx * dx + self.yy * dy)
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        if det == 0.0 {
            return Err(MapyrusError::ZeroWorldRange);
        }
        let inv = 1.0 / det;
        Ok(Self {
            xx: self.yy * inv,
            xy: -self.xy * inv,
            yx: -self.yx * inv,
            yy: self.xx * inv,
            tx: (self.xy * self.ty - self.yy * self.tx) * inv,
            ty: (self.yx * self.tx - self.xx * self.ty) * inv,
        })
    }

    /// Rotation of the x axis under this transform, radians.
    pub fn rotation_angle(&self) -> f64 {
        self.yx.atan2(self.xx)
    }

    /// Compose: `self ∘ other` (other applies to incoming coordinates
    /// first).
    pub fn concatenated(&self, other: &Self) -> Self {
        Self {
            xx: self.xx * other.xx + self.xy * other.yx,
            yx: self.yx * other.xx + self.yy * other.yx,
            xy: self.xx * other.xy + self.xy * other.yy,
            yy: self.yx * other.xy + self.yy * other.yy,
            tx: self.xx * other.tx + self.xy * other.ty + self.tx,
            ty: self.yx * other.tx + self.yy * other.ty + self.ty,
        }
    }
}

/// Axis-aligned rectangle with `x1 <= x2`, `y1 <= y2` after `normalised`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn normalised(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.x1, other.y1) && self.contains(other.x2, other.y2)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && self.y1 <= other.y2 && other.y1 <= self.y2
    }

    pub fn expand_to(&mut self, x: f64, y: f64) {
        self.x1 = self.x1.min(x);
        self.y1 = self.y1.min(y);
        self.x2 = self.x2.max(x);
        self.y2 = self.y2.max(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_value::numeric::doubles_equal;

    #[test]
    fn translate_then_scale_composes_in_user_order() {
        let mut t = AffineTransform::identity();
        t.translate(10.0, 0.0);
        t.scale(2.0);
        // Incoming point scales first, then the earlier translation applies.
        assert_eq!(t.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn point_round_trip_through_inverse() {
        let mut t = AffineTransform::identity();
        t.translate(10.0, 20.0);
        t.rotate(0.7);
        t.scale(2.5);
        let inv = t.inverse().unwrap();
        let (px, py) = t.transform_point(3.0, -4.0);
        let (x, y) = inv.transform_point(px, py);
        assert!(doubles_equal(x, 3.0), "x was {x}");
        assert!(doubles_equal(y, -4.0), "y was {y}");
    }

    #[test]
    fn rotation_angle_reported() {
        let mut t = AffineTransform::identity();
        t.rotate(std::f64::consts::FRAC_PI_3);
        assert!(doubles_equal(t.rotation_angle(), std::f64::consts::FRAC_PI_3));
    }

    #[test]
    fn rect_to_rect_maps_corners() {
        let t = AffineTransform::rect_to_rect(
            Rect::new(0.0, 0.0, 1000.0, 500.0),
            Rect::new(0.0, 0.0, 100.0, 50.0),
        );
        assert_eq!(t.transform_point(0.0, 0.0), (0.0, 0.0));
        assert_eq!(t.transform_point(1000.0, 500.0), (100.0, 50.0));
        assert_eq!(t.transform_point(500.0, 250.0), (50.0, 25.0));
    }

    #[test]
    fn distance_ignores_translation() {
        let mut t = AffineTransform::identity();
        t.translate(100.0, 100.0);
        t.scale(2.0);
        assert_eq!(t.transform_distance(3.0, 0.0), (6.0, 0.0));
    }
}
