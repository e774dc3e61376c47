//! Flat geometry buffer encoding.
//!
//! A geometry value is a `Vec<f64>` laid out as:
//! * simple types: `[type, count, (op, x, y) * count]`
//! * multi types / collections: `[type, children, child...child]` where each
//!   child is itself a complete encoding, stored contiguously.
//!
//! Per-vertex ops are `OP_MOVETO` (0) and `OP_LINETO` (1). Invariants:
//! counts always match the actual vertex totals, and a simple geometry's
//! first vertex op is a moveto.

use crate::error::{MapyrusError, Result};
use crate::numeric::format_number;

/// Vertex op tag: begin a sub-path.
pub const OP_MOVETO: f64 = 0.0;
/// Vertex op tag: continue the current sub-path.
pub const OP_LINETO: f64 = 1.0;

/// Geometry type tags stored in the first slot of each encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    Collection = 7,
}

impl GeometryType {
    pub fn from_tag(tag: f64) -> Result<Self> {
        match tag as i64 {
            1 => Ok(Self::Point),
            2 => Ok(Self::LineString),
            3 => Ok(Self::Polygon),
            4 => Ok(Self::MultiPoint),
            5 => Ok(Self::MultiLineString),
            6 => Ok(Self::MultiPolygon),
            7 => Ok(Self::Collection),
            _ => Err(MapyrusError::UnexpectedValues(format!(
                "unknown geometry type tag {tag}"
            ))),
        }
    }

    pub fn is_multi(self) -> bool {
        matches!(
            self,
            Self::MultiPoint | Self::MultiLineString | Self::MultiPolygon | Self::Collection
        )
    }

    fn wkt_name(self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::Collection => "GEOMETRYCOLLECTION",
        }
    }
}

/// Encode a single point.
pub fn point(x: f64, y: f64) -> Vec<f64> {
    vec![GeometryType::Point as i64 as f64, 1.0, OP_MOVETO, x, y]
}

/// Encode a line string through the given points.
pub fn line_string(points: &[(f64, f64)]) -> Vec<f64> {
    let mut buf = Vec::with_capacity(2 + points.len() * 3);
    buf.push(GeometryType::LineString as i64 as f64);
    buf.push(points.len() as f64);
    for (i, (x, y)) in points.iter().enumerate() {
        buf.push(if i == 0 { OP_MOVETO } else { OP_LINETO });
        buf.push(*x);
        buf.push(*y);
    }
    buf
}

/// Encode a polygon from rings; the first vertex of each ring gets a moveto.
pub fn polygon(rings: &[Vec<(f64, f64)>]) -> Vec<f64> {
    let total: usize = rings.iter().map(Vec::len).sum();
    let mut buf = Vec::with_capacity(2 + total * 3);
    buf.push(GeometryType::Polygon as i64 as f64);
    buf.push(total as f64);
    for ring in rings {
        for (i, (x, y)) in ring.iter().enumerate() {
            buf.push(if i == 0 { OP_MOVETO } else { OP_LINETO });
            buf.push(*x);
            buf.push(*y);
        }
    }
    buf
}

/// Length in slots of the encoding starting at `buf[0]`, children included.
pub fn encoded_len(buf: &[f64]) -> Result<usize> {
    if buf.len() < 2 {
        return Err(MapyrusError::UnexpectedValues(
            "truncated geometry".to_string(),
        ));
    }
    let geom_type = GeometryType::from_tag(buf[0])?;
    let count = buf[1] as usize;
    if geom_type.is_multi() {
        let mut offset = 2;
        for _ in 0..count {
            if offset > buf.len() {
                return Err(MapyrusError::UnexpectedValues(
                    "truncated geometry".to_string(),
                ));
            }
            offset += encoded_len(&buf[offset..])?;
        }
        Ok(offset)
    } else {
        Ok(2 + count * 3)
    }
}

/// Check counts against actual totals through all nesting levels.
pub fn validate(buf: &[f64]) -> Result<()> {
    let len = encoded_len(buf)?;
    if len != buf.len() {
        return Err(MapyrusError::UnexpectedValues(format!(
            "geometry length {} does not match encoded count {}",
            buf.len(),
            len
        )));
    }
    Ok(())
}

/// Total number of vertices, children included.
pub fn coordinate_count(buf: &[f64]) -> Result<usize> {
    let geom_type = GeometryType::from_tag(buf[0])?;
    let count = buf[1] as usize;
    if geom_type.is_multi() {
        let mut total = 0;
        let mut offset = 2;
        for _ in 0..count {
            total += coordinate_count(&buf[offset..])?;
            offset += encoded_len(&buf[offset..])?;
        }
        Ok(total)
    } else {
        Ok(count)
    }
}

/// Flatten to `(op, x, y)` triples across all nesting levels, in order.
pub fn vertices(buf: &[f64]) -> Result<Vec<(f64, f64, f64)>> {
    let mut out = Vec::new();
    collect_vertices(buf, &mut out)?;
    Ok(out)
}

fn collect_vertices(buf: &[f64], out: &mut Vec<(f64, f64, f64)>) -> Result<()> {
    let geom_type = GeometryType::from_tag(buf[0])?;
    let count = buf[1] as usize;
    if geom_type.is_multi() {
        let mut offset = 2;
        for _ in 0..count {
            collect_vertices(&buf[offset..], out)?;
            offset += encoded_len(&buf[offset..])?;
        }
    } else {
        if buf.len() < 2 + count * 3 {
            return Err(MapyrusError::UnexpectedValues(
                "truncated geometry".to_string(),
            ));
        }
        for i in 0..count {
            let base = 2 + i * 3;
            out.push((buf[base], buf[base + 1], buf[base + 2]));
        }
    }
    Ok(())
}

/// OGC well-known-text form.
pub fn wkt(buf: &[f64]) -> Result<String> {
    let mut out = String::new();
    write_wkt(buf, &mut out)?;
    Ok(out)
}

fn write_wkt(buf: &[f64], out: &mut String) -> Result<()> {
    let geom_type = GeometryType::from_tag(buf[0])?;
    let count = buf[1] as usize;
    out.push_str(geom_type.wkt_name());
    if count == 0 {
        out.push_str(" EMPTY");
        return Ok(());
    }
    out.push_str(" (");
    match geom_type {
        GeometryType::Point => {
            write_coord(buf[3], buf[4], out);
        }
        GeometryType::LineString | GeometryType::MultiPoint => {
            // MultiPoint children are single points; print them flat.
            let verts = vertices(buf)?;
            for (i, (_, x, y)) in verts.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_coord(*x, *y, out);
            }
        }
        GeometryType::Polygon => {
            write_rings(&buf[2..2 + count * 3], count, out);
        }
        GeometryType::MultiLineString => {
            let mut offset = 2;
            for i in 0..count {
                if i > 0 {
                    out.push_str(", ");
                }
                let child = &buf[offset..];
                let n = child[1] as usize;
                out.push('(');
                for v in 0..n {
                    if v > 0 {
                        out.push_str(", ");
                    }
                    write_coord(child[3 + v * 3], child[4 + v * 3], out);
                }
                out.push(')');
                offset += encoded_len(child)?;
            }
        }
        GeometryType::MultiPolygon => {
            let mut offset = 2;
            for i in 0..count {
                if i > 0 {
                    out.push_str(", ");
                }
                let child = &buf[offset..];
                let n = child[1] as usize;
                out.push('(');
                write_rings(&child[2..2 + n * 3], n, out);
                out.push(')');
                offset += encoded_len(child)?;
            }
        }
        GeometryType::Collection => {
            let mut offset = 2;
            for i in 0..count {
                if i > 0 {
                    out.push_str(", ");
                }
                write_wkt(&buf[offset..], out)?;
                offset += encoded_len(&buf[offset..])?;
            }
        }
    }
    out.push(')');
    Ok(())
}

fn write_rings(slots: &[f64], count: usize, out: &mut String) {
    let mut open = false;
    for i in 0..count {
        let op = slots[i * 3];
        if op == OP_MOVETO {
            if open {
                out.push_str("), ");
            }
            out.push('(');
            open = true;
        } else {
            out.push_str(", ");
        }
        write_coord(slots[i * 3 + 1], slots[i * 3 + 2], out);
    }
    if open {
        out.push(')');
    }
}

fn write_coord(x: f64, y: f64, out: &mut String) {
    out.push_str(&format_number(x));
    out.push(' ');
    out.push_str(&format_number(y));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trip() {
        let p = point(3.0, 4.5);
        validate(&p).unwrap();
        assert_eq!(coordinate_count(&p).unwrap(), 1);
        assert_eq!(wkt(&p).unwrap(), "POINT (3 4.5)");
    }

    #[test]
    fn line_string_wkt() {
        let ls = line_string(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0)]);
        validate(&ls).unwrap();
        assert_eq!(wkt(&ls).unwrap(), "LINESTRING (0 0, 10 0, 10 5)");
    }

    #[test]
    fn polygon_with_hole() {
        let poly = polygon(&[
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)],
            vec![(2.0, 2.0), (4.0, 2.0), (2.0, 4.0), (2.0, 2.0)],
        ]);
        validate(&poly).unwrap();
        assert_eq!(
            wkt(&poly).unwrap(),
            "POLYGON ((0 0, 10 0, 10 10, 0 0), (2 2, 4 2, 2 4, 2 2))"
        );
    }

    #[test]
    fn collection_nests() {
        let mut buf = vec![GeometryType::Collection as i64 as f64, 2.0];
        buf.extend(point(1.0, 2.0));
        buf.extend(line_string(&[(0.0, 0.0), (1.0, 1.0)]));
        validate(&buf).unwrap();
        assert_eq!(coordinate_count(&buf).unwrap(), 3);
        assert_eq!(
            wkt(&buf).unwrap(),
            "GEOMETRYCOLLECTION (POINT (1 2), LINESTRING (0 0, 1 1))"
        );
    }

    #[test]
    fn bad_counts_rejected() {
        let buf = vec![GeometryType::LineString as i64 as f64, 3.0, 0.0, 1.0, 2.0];
        assert!(validate(&buf).is_err());
    }
}
