//! Built-in shape constructions.
//!
//! All coordinates are user-space; the context applies the current
//! transforms. Fixed control points:
//! * `circle` is a single 360-degree arc.
//! * `triangle`/`pentagon`/`hexagon` are regular polygons with the first
//!   vertex at angle pi/2, counter-clockwise.
//! * `star` alternates outer vertices at radius r with inner vertices at
//!   r*sin(a/2)/sin(pi - a/2 - b/2), where a = pi/n is the point angle and
//!   b = 2*pi/n the angle between adjacent points.
//! * `raindrop` joins the two tangents from the apex at (x, y+2r) to the
//!   circle of radius r about (x, y); the tangent points sit at 30 and
//!   150 degrees.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use core_context::Context;
use core_value::error::{MapyrusError, Result};

fn positive(value: f64, what: &str) -> Result<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(MapyrusError::UnexpectedValues(format!(
            "{what} must be positive"
        )))
    }
}

pub(crate) fn box_shape(ctx: &mut Context, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y1)?;
    ctx.line_to(x2, y2)?;
    ctx.line_to(x1, y2)?;
    ctx.close_path();
    Ok(())
}

pub(crate) fn rounded_box(
    ctx: &mut Context,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    radius: Option<f64>,
) -> Result<()> {
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    let shortest = (x2 - x1).min(y2 - y1);
    let r = radius
        .unwrap_or(shortest / 5.0)
        .min(shortest / 2.0);
    let r = positive(r, "corner radius")?;
    ctx.move_to(x1 + r, y1);
    ctx.line_to(x2 - r, y1)?;
    ctx.arc_to(-1.0, x2 - r, y1 + r, x2, y1 + r)?;
    ctx.line_to(x2, y2 - r)?;
    ctx.arc_to(-1.0, x2 - r, y2 - r, x2 - r, y2)?;
    ctx.line_to(x1 + r, y2)?;
    ctx.arc_to(-1.0, x1 + r, y2 - r, x1, y2 - r)?;
    ctx.line_to(x1, y1 + r)?;
    ctx.arc_to(-1.0, x1 + r, y1 + r, x1 + r, y1)?;
    ctx.close_path();
    Ok(())
}

/// Front face plus top and side parallelograms offset at 45 degrees.
pub(crate) fn box3d(
    ctx: &mut Context,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    depth: Option<f64>,
) -> Result<()> {
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    let depth = positive(depth.unwrap_or(((x2 - x1).min(y2 - y1)) / 5.0), "depth")?;
    let dx = depth * FRAC_1_SQRT_2;
    let dy = depth * FRAC_1_SQRT_2;
    box_shape(ctx, x1, y1, x2, y2)?;
    // Top face.
    ctx.move_to(x1, y2);
    ctx.line_to(x1 + dx, y2 + dy)?;
    ctx.line_to(x2 + dx, y2 + dy)?;
    ctx.line_to(x2, y2)?;
    ctx.close_path();
    // Side face.
    ctx.move_to(x2, y1);
    ctx.line_to(x2 + dx, y1 + dy)?;
    ctx.line_to(x2 + dx, y2 + dy)?;
    ctx.line_to(x2, y2)?;
    ctx.close_path();
    Ok(())
}

pub(crate) fn circle(ctx: &mut Context, x: f64, y: f64, radius: f64) -> Result<()> {
    let r = positive(radius, "radius")?;
    ctx.move_to(x + r, y);
    ctx.arc_to(1.0, x, y, x + r, y)?;
    ctx.close_path();
    Ok(())
}

pub(crate) fn ellipse_shape(
    ctx: &mut Context,
    x: f64,
    y: f64,
    x_diameter: f64,
    y_diameter: f64,
) -> Result<()> {
    let xd = positive(x_diameter, "diameter")?;
    let yd = positive(y_diameter, "diameter")?;
    ctx.ellipse_to(x - xd / 2.0, y - yd / 2.0, x + xd / 2.0, y + yd / 2.0)
}

/// Elliptical top and bottom joined by straight sides.
pub(crate) fn cylinder(ctx: &mut Context, x: f64, y: f64, radius: f64, height: f64) -> Result<()> {
    let r = positive(radius, "radius")?;
    let h = positive(height, "height")?;
    let ry = r * 0.35;
    ctx.ellipse_to(x - r, y - ry, x + r, y + ry)?;
    ctx.ellipse_to(x - r, y + h - ry, x + r, y + h + ry)?;
    ctx.move_to(x - r, y);
    ctx.line_to(x - r, y + h)?;
    ctx.move_to(x + r, y);
    ctx.line_to(x + r, y + h)?;
    Ok(())
}

pub(crate) fn raindrop(ctx: &mut Context, x: f64, y: f64, radius: f64) -> Result<()> {
    let r = positive(radius, "radius")?;
    let apex = (x, y + 2.0 * r);
    let right = (x + r * (PI / 6.0).cos(), y + r * (PI / 6.0).sin());
    let left = (x + r * (5.0 * PI / 6.0).cos(), y + r * (5.0 * PI / 6.0).sin());
    ctx.move_to(apex.0, apex.1);
    ctx.line_to(right.0, right.1)?;
    // Sweep clockwise through the bottom of the circle to the left
    // tangent point.
    ctx.arc_to(1.0, x, y, left.0, left.1)?;
    ctx.close_path();
    Ok(())
}

/// Pie slice from `angle1` sweeping `sweep` degrees (positive is
/// counter-clockwise).
pub(crate) fn wedge(
    ctx: &mut Context,
    x: f64,
    y: f64,
    radius: f64,
    angle1: f64,
    sweep: f64,
) -> Result<()> {
    let r = positive(radius, "radius")?;
    let a1 = angle1.to_radians();
    let a2 = (angle1 + sweep).to_radians();
    ctx.move_to(x, y);
    ctx.line_to(x + r * a1.cos(), y + r * a1.sin())?;
    let direction = if sweep >= 0.0 { -1.0 } else { 1.0 };
    ctx.arc_to(direction, x, y, x + r * a2.cos(), y + r * a2.sin())?;
    ctx.close_path();
    Ok(())
}

/// Line-segment spiral from the outer radius down to the centre, twenty
/// segments per revolution.
pub(crate) fn spiral(
    ctx: &mut Context,
    x: f64,
    y: f64,
    radius: f64,
    revolutions: f64,
    start_angle: f64,
) -> Result<()> {
    const SEGMENTS_PER_REVOLUTION: f64 = 20.0;
    let r = positive(radius, "radius")?;
    let revs = positive(revolutions, "revolutions")?;
    let segments = (revs * SEGMENTS_PER_REVOLUTION).ceil().max(1.0) as usize;
    let a0 = start_angle.to_radians();
    for i in 0..=segments {
        let t = i as f64 / segments as f64;
        let angle = a0 + t * revs * 2.0 * PI;
        let rr = r * (1.0 - t);
        let px = x + rr * angle.cos();
        let py = y + rr * angle.sin();
        if i == 0 {
            ctx.move_to(px, py);
        } else {
            ctx.line_to(px, py)?;
        }
    }
    Ok(())
}

pub(crate) fn regular_polygon(
    ctx: &mut Context,
    x: f64,
    y: f64,
    radius: f64,
    sides: usize,
) -> Result<()> {
    let r = positive(radius, "radius")?;
    for i in 0..sides {
        let angle = PI / 2.0 + i as f64 * 2.0 * PI / sides as f64;
        let px = x + r * angle.cos();
        let py = y + r * angle.sin();
        if i == 0 {
            ctx.move_to(px, py);
        } else {
            ctx.line_to(px, py)?;
        }
    }
    ctx.close_path();
    Ok(())
}

pub(crate) fn star(ctx: &mut Context, x: f64, y: f64, radius: f64, points: f64) -> Result<()> {
    let r = positive(radius, "radius")?;
    let n = points.round();
    if n < 3.0 || !core_value::numeric::doubles_equal(points, n) {
        return Err(MapyrusError::UnexpectedValues(
            "star needs a whole number of points, at least 3".to_string(),
        ));
    }
    let n = n as usize;
    let beta = 2.0 * PI / n as f64;
    let alpha = PI / n as f64;
    let inner = r * (alpha / 2.0).sin() / (PI - alpha / 2.0 - beta / 2.0).sin();
    for i in 0..n {
        let outer_angle = PI / 2.0 + i as f64 * beta;
        let ox = x + r * outer_angle.cos();
        let oy = y + r * outer_angle.sin();
        if i == 0 {
            ctx.move_to(ox, oy);
        } else {
            ctx.line_to(ox, oy)?;
        }
        let inner_angle = outer_angle + beta / 2.0;
        ctx.line_to(x + inner * inner_angle.cos(), y + inner * inner_angle.sin())?;
    }
    ctx.close_path();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_context::Context;

    #[test]
    fn circle_has_expected_area() {
        let mut ctx = Context::new();
        circle(&mut ctx, 0.0, 0.0, 10.0).unwrap();
        let area = ctx.current_path().unwrap().area(0.001).abs();
        let expect = PI * 100.0;
        assert!((area - expect).abs() < 1.0, "area {area} vs {expect}");
    }

    #[test]
    fn triangle_first_vertex_is_at_top() {
        let mut ctx = Context::new();
        regular_polygon(&mut ctx, 0.0, 0.0, 5.0, 3).unwrap();
        let start = ctx.current_path().unwrap().start_point().unwrap();
        assert!((start.0).abs() < 1e-9);
        assert!((start.1 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn star_alternates_radii() {
        let mut ctx = Context::new();
        star(&mut ctx, 0.0, 0.0, 10.0, 5.0).unwrap();
        let path = ctx.current_path().unwrap();
        // 5 outer + 5 inner vertices.
        assert_eq!(path.move_to_count() + path.line_to_count(), 10);
        // Inner radius for a five-pointed star with point angle 36 deg.
        let alpha = PI / 5.0;
        let beta = 2.0 * PI / 5.0;
        let expect = 10.0 * (alpha / 2.0).sin() / (PI - alpha / 2.0 - beta / 2.0).sin();
        let flat = path.flattened(0.01);
        let min_radius = flat
            .subpaths
            .iter()
            .flat_map(|s| s.points.iter())
            .map(|(px, py)| (px * px + py * py).sqrt())
            .fold(f64::INFINITY, f64::min);
        assert!((min_radius - expect).abs() < 1e-6, "{min_radius} vs {expect}");
    }

    #[test]
    fn wedge_is_closed_slice() {
        let mut ctx = Context::new();
        wedge(&mut ctx, 0.0, 0.0, 10.0, 0.0, 90.0).unwrap();
        let area = ctx.current_path().unwrap().area(0.001).abs();
        let expect = PI * 100.0 / 4.0;
        assert!((area - expect).abs() < 0.5, "area {area} vs {expect}");
    }

    #[test]
    fn zero_radius_rejected() {
        let mut ctx = Context::new();
        assert!(circle(&mut ctx, 0.0, 0.0, 0.0).is_err());
        assert!(star(&mut ctx, 0.0, 0.0, 5.0, 2.0).is_err());
    }
}
