//! Path construction and rewriting commands.

use core_context::ContextStack;
use core_lang::CommandKind;
use core_path::transform::Rect;
use core_value::Value;
use core_value::error::{MapyrusError, Result};

use super::{expect_args, num};
use crate::shapes;

pub(crate) fn dispatch(kind: CommandKind, args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    use CommandKind::*;
    match kind {
        ClearPath => {
            expect_args(args, 0, 0, "clearpath")?;
            ctx.top_mut().clear_path();
            Ok(())
        }
        Move => coordinate_pairs(args, "move", ctx, |top, x, y| {
            top.move_to(x, y);
            Ok(())
        }),
        Draw => coordinate_pairs(args, "draw", ctx, |top, x, y| top.line_to(x, y)),
        Rdraw => coordinate_pairs(args, "rdraw", ctx, |top, dx, dy| top.rline_to(dx, dy)),
        Arc => {
            expect_args(args, 5, 5, "arc")?;
            let direction = num(args, 0)?;
            ctx.top_mut().arc_to(
                direction,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                num(args, 4)?,
            )
        }
        Bezier => {
            expect_args(args, 6, 6, "bezier")?;
            ctx.top_mut().curve_to(
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                num(args, 4)?,
                num(args, 5)?,
            )
        }
        Ellipse => {
            expect_args(args, 4, 4, "ellipse")?;
            shapes::ellipse_shape(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
            )
        }
        SineWave => {
            expect_args(args, 4, 4, "sinewave")?;
            ctx.top_mut().sine_wave_to(
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
            )
        }
        ClosePath => {
            expect_args(args, 0, 0, "closepath")?;
            ctx.top_mut().close_path();
            Ok(())
        }
        AddPath => {
            if args.is_empty() {
                return Err(MapyrusError::WrongParameters(
                    "addpath expects at least one geometry argument".to_string(),
                ));
            }
            for arg in args {
                let buf = arg.as_geometry()?;
                core_value::geometry::validate(buf)?;
                let top = ctx.top_mut();
                for (op, x, y) in core_value::geometry::vertices(buf)? {
                    if op == core_value::geometry::OP_MOVETO {
                        top.move_to(x, y);
                    } else {
                        top.line_to(x, y)?;
                    }
                }
            }
            Ok(())
        }
        ShiftPath => {
            expect_args(args, 2, 2, "shiftpath")?;
            let (dx, dy) = (num(args, 0)?, num(args, 1)?);
            ctx.top_mut().shift_path(dx, dy);
            Ok(())
        }

        Box_ => {
            expect_args(args, 4, 4, "box")?;
            shapes::box_shape(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
            )
        }
        RoundedBox => {
            expect_args(args, 4, 5, "roundedbox")?;
            let radius = if args.len() > 4 { Some(num(args, 4)?) } else { None };
            shapes::rounded_box(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                radius,
            )
        }
        Box3d => {
            expect_args(args, 4, 5, "box3d")?;
            let depth = if args.len() > 4 { Some(num(args, 4)?) } else { None };
            shapes::box3d(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                depth,
            )
        }
        Circle => {
            expect_args(args, 3, 3, "circle")?;
            shapes::circle(ctx.top_mut(), num(args, 0)?, num(args, 1)?, num(args, 2)?)
        }
        Cylinder => {
            expect_args(args, 4, 4, "cylinder")?;
            shapes::cylinder(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
            )
        }
        Raindrop => {
            expect_args(args, 3, 3, "raindrop")?;
            shapes::raindrop(ctx.top_mut(), num(args, 0)?, num(args, 1)?, num(args, 2)?)
        }
        Wedge => {
            expect_args(args, 5, 5, "wedge")?;
            shapes::wedge(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                num(args, 4)?,
            )
        }
        Spiral => {
            expect_args(args, 4, 5, "spiral")?;
            let start_angle = if args.len() > 4 { num(args, 4)? } else { 0.0 };
            shapes::spiral(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
                start_angle,
            )
        }
        Hexagon => regular(args, ctx, 6, "hexagon"),
        Pentagon => regular(args, ctx, 5, "pentagon"),
        Triangle => regular(args, ctx, 3, "triangle"),
        Star => {
            expect_args(args, 4, 4, "star")?;
            shapes::star(
                ctx.top_mut(),
                num(args, 0)?,
                num(args, 1)?,
                num(args, 2)?,
                num(args, 3)?,
            )
        }

        SamplePath => {
            expect_args(args, 2, 2, "samplepath")?;
            let spacing = num(args, 0)?;
            let offset = num(args, 1)?;
            let top = ctx.top_mut();
            let scale = top.scaling();
            let tolerance = top.resolution_mm();
            if let Some(path) = top.current_path() {
                let sampled = path.sample(spacing * scale, offset * scale, tolerance)?;
                top.replace_path(sampled);
            }
            Ok(())
        }
        StripePath => {
            expect_args(args, 2, 2, "stripepath")?;
            let spacing = num(args, 0)?;
            let angle = num(args, 1)?;
            let top = ctx.top_mut();
            let scale = top.scaling();
            if let Some(path) = top.current_path() {
                let striped = path.stripe(spacing * scale, angle + top.rotation())?;
                top.replace_path(striped);
            }
            Ok(())
        }
        ParallelPath => {
            if args.is_empty() {
                return Err(MapyrusError::WrongParameters(
                    "parallelpath expects at least one distance".to_string(),
                ));
            }
            let mut distances = Vec::with_capacity(args.len());
            for i in 0..args.len() {
                distances.push(num(args, i)?);
            }
            let top = ctx.top_mut();
            let scale = top.scaling();
            for d in &mut distances {
                *d *= scale;
            }
            let tolerance = top.resolution_mm();
            if let Some(path) = top.current_path() {
                let offset = path.parallel(&distances, tolerance);
                top.replace_path(offset);
            }
            Ok(())
        }
        SelectPath => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err(MapyrusError::WrongParameters(
                    "selectpath expects offset, length pairs".to_string(),
                ));
            }
            let mut offsets = Vec::new();
            let mut lengths = Vec::new();
            let mut i = 0;
            while i < args.len() {
                offsets.push(num(args, i)?);
                lengths.push(num(args, i + 1)?);
                i += 2;
            }
            let top = ctx.top_mut();
            let scale = top.scaling();
            for v in offsets.iter_mut().chain(lengths.iter_mut()) {
                *v *= scale;
            }
            let tolerance = top.resolution_mm();
            if let Some(path) = top.current_path() {
                let selected = path.select(&offsets, &lengths, tolerance);
                top.replace_path(selected);
            }
            Ok(())
        }
        ReversePath => {
            expect_args(args, 0, 0, "reversepath")?;
            let top = ctx.top_mut();
            let tolerance = top.resolution_mm();
            if let Some(path) = top.current_path() {
                let reversed = path.reversed(tolerance);
                top.replace_path(reversed);
            }
            Ok(())
        }
        Sinkhole => {
            expect_args(args, 0, 0, "sinkhole")?;
            let top = ctx.top_mut();
            let tolerance = top.resolution_mm();
            let point = top.current_path().and_then(|p| p.sinkhole(tolerance));
            match point {
                Some((x, y)) => {
                    let mut point = core_path::Path::new();
                    point.move_to(x, y, 0.0);
                    top.replace_path(point);
                }
                None => top.clear_path(),
            }
            Ok(())
        }
        Guillotine => {
            expect_args(args, 4, 4, "guillotine")?;
            let top = ctx.top_mut();
            let (x1, y1) = top.transform_to_page(num(args, 0)?, num(args, 1)?);
            let (x2, y2) = top.transform_to_page(num(args, 2)?, num(args, 3)?);
            let tolerance = top.resolution_mm();
            if let Some(path) = top.current_path() {
                let clipped = path.guillotine(Rect::new(x1, y1, x2, y2), tolerance);
                top.replace_path(clipped);
            }
            Ok(())
        }

        other => Err(MapyrusError::WrongParameters(format!(
            "unhandled path command {other:?}"
        ))),
    }
}

fn regular(args: &[Value], ctx: &mut ContextStack, sides: usize, command: &str) -> Result<()> {
    expect_args(args, 3, 3, command)?;
    shapes::regular_polygon(
        ctx.top_mut(),
        num(args, 0)?,
        num(args, 1)?,
        num(args, 2)?,
        sides,
    )
}

fn coordinate_pairs(
    args: &[Value],
    command: &str,
    ctx: &mut ContextStack,
    mut apply: impl FnMut(&mut core_context::Context, f64, f64) -> Result<()>,
) -> Result<()> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(MapyrusError::WrongParameters(format!(
            "{command} expects coordinate pairs"
        )));
    }
    let mut i = 0;
    while i < args.len() {
        let x = num(args, i)?;
        let y = num(args, i + 1)?;
        apply(ctx.top_mut(), x, y)?;
        i += 2;
    }
    Ok(())
}
