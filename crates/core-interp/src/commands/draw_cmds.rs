//! Commands that emit to the output encoder.

use core_context::{ContextStack, FileDrawKind, color};
use core_device::ClipSide;
use core_lang::CommandKind;
use core_path::transform::Rect;
use core_value::Value;
use core_value::error::{MapyrusError, Result};

use super::{expect_args, num, string};

const DEFAULT_PLACEMENT_SIZE_MM: f64 = 10.0;

pub(crate) fn dispatch(kind: CommandKind, args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    use CommandKind::*;
    match kind {
        Stroke => {
            expect_args(args, 0, 1, "stroke")?;
            let xml = optional_string(args, 0)?;
            ctx.top_mut().stroke(xml.as_deref())
        }
        Fill => {
            expect_args(args, 0, 1, "fill")?;
            let xml = optional_string(args, 0)?;
            ctx.top_mut().fill(xml.as_deref())
        }
        GradientFill => {
            expect_args(args, 2, 3, "gradientfill")?;
            let current = ctx.top().color();
            let c1 = color::lookup(&string(args, 0)?, current)?;
            let c2 = color::lookup(&string(args, 1)?, current)?;
            let vertical = match args.get(2) {
                Some(v) => v.as_string()?.eq_ignore_ascii_case("vertical"),
                None => false,
            };
            ctx.top_mut().gradient_fill(vertical, c1, c2)
        }
        Clip => {
            expect_args(args, 1, 1, "clip")?;
            let side = match string(args, 0)?.to_lowercase().as_str() {
                "inside" => ClipSide::Inside,
                "outside" => ClipSide::Outside,
                other => {
                    return Err(MapyrusError::WrongParameters(format!(
                        "clip expects inside or outside, got {other}"
                    )));
                }
            };
            ctx.top_mut().clip(side)
        }
        Protect => {
            let region = mask_region(args, ctx, "protect")?;
            ctx.top_mut().protect_region(region)
        }
        Unprotect => {
            let region = mask_region(args, ctx, "unprotect")?;
            ctx.top_mut().unprotect_region(region)
        }
        Label => {
            if args.is_empty() {
                return Err(MapyrusError::WrongParameters(
                    "label expects text".to_string(),
                ));
            }
            let mut text = String::new();
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    text.push(' ');
                }
                text.push_str(&arg.as_string()?);
            }
            ctx.top_mut().label(&text)
        }
        FlowLabel => flow_label(args, ctx),
        Icon => {
            expect_args(args, 1, 2, "icon")?;
            let image = string(args, 0)?;
            let size = match args.get(1) {
                Some(v) => v.as_number()?,
                None => DEFAULT_PLACEMENT_SIZE_MM,
            };
            ctx.top_mut().draw_icon(&image, size)
        }
        GeoImage => {
            expect_args(args, 1, 2, "geoimage")?;
            let filename = string(args, 0)?;
            let extras = optional_string(args, 1)?.unwrap_or_default();
            ctx.top_mut().draw_geo_image(&filename, &extras)
        }
        Eps => placed_file(args, ctx, FileDrawKind::Eps, "eps"),
        Svg => placed_file(args, ctx, FileDrawKind::Svg, "svg"),
        Pdf => placed_file(args, ctx, FileDrawKind::Pdf, "pdf"),
        SvgCode => {
            expect_args(args, 1, 1, "svgcode")?;
            ctx.top_mut().add_svg_code(&string(args, 0)?)
        }
        Table => table(args, ctx),
        Tree => tree(args, ctx),
        EventScript => {
            expect_args(args, 1, 1, "eventscript")?;
            ctx.top_mut().set_event_script(&string(args, 0)?)
        }
        other => Err(MapyrusError::WrongParameters(format!(
            "unhandled drawing command {other:?}"
        ))),
    }
}

fn optional_string(args: &[Value], index: usize) -> Result<Option<String>> {
    match args.get(index) {
        Some(v) => Ok(Some(v.as_string()?)),
        None => Ok(None),
    }
}

/// `protect`/`unprotect` take either no arguments (current path) or a
/// rectangle in user coordinates.
fn mask_region(args: &[Value], ctx: &ContextStack, command: &str) -> Result<Option<Rect>> {
    match args.len() {
        0 => Ok(None),
        4 => {
            let top = ctx.top();
            let (x1, y1) = top.transform_to_page(num(args, 0)?, num(args, 1)?);
            let (x2, y2) = top.transform_to_page(num(args, 2)?, num(args, 3)?);
            Ok(Some(Rect::new(x1, y1, x2, y2).normalised()))
        }
        _ => Err(MapyrusError::WrongParameters(format!(
            "{command} expects no arguments or a rectangle"
        ))),
    }
}

fn placed_file(
    args: &[Value],
    ctx: &mut ContextStack,
    kind: FileDrawKind,
    command: &str,
) -> Result<()> {
    expect_args(args, 1, 2, command)?;
    let filename = string(args, 0)?;
    let size = match args.get(1) {
        Some(v) => v.as_number()?,
        None => DEFAULT_PLACEMENT_SIZE_MM,
    };
    ctx.top_mut().draw_file(kind, &filename, size)
}

/// `flowlabel offset, text...`: characters placed individually along the
/// current path, each rotated to the local tangent.
fn flow_label(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    if args.len() < 2 {
        return Err(MapyrusError::WrongParameters(
            "flowlabel expects an offset and text".to_string(),
        ));
    }
    let start_offset = num(args, 0)?;
    let mut text = String::new();
    for (i, arg) in args[1..].iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(&arg.as_string()?);
    }

    let top = ctx.top_mut();
    let tolerance = top.resolution_mm();
    let Some(original) = top.current_path().cloned() else {
        return Ok(());
    };
    let flat = original.flattened(tolerance);
    let base_font = top.font().clone();
    let mut offset = start_offset * top.scaling();
    let result = (|| -> Result<()> {
        for ch in text.chars() {
            let glyph = ch.to_string();
            let (advance, _) = top.string_dimension(&glyph)?;
            let Some(((x, y), angle)) = point_at_length(&flat, offset + advance / 2.0) else {
                break;
            };
            let mut font = base_font.clone();
            font.rotation += angle;
            top.set_font(font);
            let mut point = core_path::Path::new();
            point.move_to(x, y, angle);
            top.replace_path(point);
            top.label(&glyph)?;
            offset += advance;
        }
        Ok(())
    })();
    // The path and font are state the caller still sees; put them back.
    top.replace_path(original);
    top.set_font(base_font);
    result
}

fn point_at_length(
    flat: &core_path::flatten::Flattened,
    target: f64,
) -> Option<((f64, f64), f64)> {
    let mut cum = 0.0;
    for sub in &flat.subpaths {
        for w in sub.points.windows(2) {
            let (ax, ay) = w[0];
            let (bx, by) = w[1];
            let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
            if len > 0.0 && cum + len >= target {
                let t = ((target - cum) / len).clamp(0.0, 1.0);
                return Some((
                    (ax + t * (bx - ax), ay + t * (by - ay)),
                    (by - ay).atan2(bx - ax),
                ));
            }
            cum += len;
        }
    }
    None
}

/// `table "extras", column-map...`: draws each map as a column of boxed
/// cells, keys in insertion order, starting at the current point.
fn table(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    if args.len() < 2 {
        return Err(MapyrusError::WrongParameters(
            "table expects extras and at least one column".to_string(),
        ));
    }
    let _extras = string(args, 0)?;
    let mut columns = Vec::new();
    for arg in &args[1..] {
        match arg {
            Value::Map(map) => columns.push(map.clone()),
            _ => return Err(MapyrusError::WrongTypes),
        }
    }

    let top = ctx.top_mut();
    let origin = top
        .current_path()
        .and_then(|p| p.start_point())
        .unwrap_or((0.0, 0.0));
    let row_height = top.font().size * 1.5;
    let padding = top.font().size * 0.4;

    let mut x = origin.0;
    let original = top.current_path().cloned();
    let result = (|| -> Result<()> {
        for column in &columns {
            // Column width fits the widest cell.
            let mut width: f64 = row_height;
            let mut cells = Vec::new();
            for key in column.keys_in_insertion_order() {
                let value = column
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Value::Str(String::new()));
                let text = value.as_string()?;
                let (w, _) = top.string_dimension(&text)?;
                width = width.max(w + 2.0 * padding);
                cells.push(text);
            }
            for (row, text) in cells.iter().enumerate() {
                let cell_top = origin.1 - row as f64 * row_height;
                let mut cell = core_path::Path::new();
                cell.move_to(x, cell_top - row_height, 0.0);
                cell.line_to(x + width, cell_top - row_height)?;
                cell.line_to(x + width, cell_top)?;
                cell.line_to(x, cell_top)?;
                cell.close_path();
                top.replace_path(cell);
                top.stroke(None)?;
                let mut anchor = core_path::Path::new();
                anchor.move_to(x + padding, cell_top - row_height + padding, 0.0);
                top.replace_path(anchor);
                top.label(text)?;
            }
            x += width;
        }
        Ok(())
    })();
    match original {
        Some(path) => top.replace_path(path),
        None => top.clear_path(),
    }
    result
}

/// `tree "extras", map`: indented hierarchy, one line per entry, nested
/// maps indented one level deeper.
fn tree(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    expect_args(args, 2, 2, "tree")?;
    let _extras = string(args, 0)?;
    let Value::Map(map) = &args[1] else {
        return Err(MapyrusError::WrongTypes);
    };

    let top = ctx.top_mut();
    let origin = top
        .current_path()
        .and_then(|p| p.start_point())
        .unwrap_or((0.0, 0.0));
    let row_height = top.font().size * 1.5;
    let indent = top.font().size;
    let original = top.current_path().cloned();

    let mut line = 0usize;
    let result = draw_tree_level(top, map, origin, indent, row_height, 0, &mut line);
    match original {
        Some(path) => top.replace_path(path),
        None => top.clear_path(),
    }
    result
}

fn draw_tree_level(
    top: &mut core_context::Context,
    map: &core_value::ValueMap,
    origin: (f64, f64),
    indent: f64,
    row_height: f64,
    depth: usize,
    line: &mut usize,
) -> Result<()> {
    for key in map.keys_in_insertion_order() {
        let x = origin.0 + depth as f64 * indent;
        let y = origin.1 - *line as f64 * row_height;
        *line += 1;
        let mut anchor = core_path::Path::new();
        anchor.move_to(x, y, 0.0);
        top.replace_path(anchor);
        match map.get(&key) {
            Some(Value::Map(child)) => {
                top.label(&key)?;
                draw_tree_level(top, child, origin, indent, row_height, depth + 1, line)?;
            }
            Some(value) => {
                let text = format!("{key} {}", value.as_string()?);
                top.label(&text)?;
            }
            None => {}
        }
    }
    Ok(())
}
