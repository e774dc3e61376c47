//! Legend rendering.
//!
//! `legend size` walks the current path's moveto points and, for each
//! accumulated entry in turn: pushes a frame translated to the point,
//! draws the description label offset 1.1 * size, builds a synthetic
//! sample path at the origin (point, horizontal line, zigzag or box of
//! `size`), and re-invokes the stored procedure block with its captured
//! arguments. Box entries get a black outline after the block runs.
//! Legend additions are suppressed for the duration so labels drawn here
//! cannot enqueue new entries.

use core_context::{ContextStack, LegendKind};
use core_device::{Color, Justify};
use core_value::error::{MapyrusError, Result};
use tracing::debug;

use crate::Interpreter;

pub(crate) fn render(interp: &mut Interpreter, size: f64, ctx: &mut ContextStack) -> Result<()> {
    if size <= 0.0 {
        return Err(MapyrusError::UnexpectedValues(
            "legend size must be positive".to_string(),
        ));
    }
    let points = match ctx.top().current_path() {
        Some(path) => path.move_tos(),
        None => Vec::new(),
    };
    let count = points.len().min(ctx.legend().len());
    debug!(target: "interp.legend", entries = ctx.legend().len(), drawn = count, "legend");
    ctx.legend_mut().ignore_additions();
    let result = render_entries(interp, size, &points[..count], ctx);
    ctx.legend_mut().accept_additions();
    result
}

fn render_entries(
    interp: &mut Interpreter,
    size: f64,
    points: &[(f64, f64)],
    ctx: &mut ContextStack,
) -> Result<()> {
    for &(px, py) in points {
        let Some(entry) = ctx.legend_mut().pop_first() else {
            break;
        };
        ctx.push()?;
        let result = (|| -> Result<()> {
            {
                let top = ctx.top_mut();
                top.set_dispatch_transform(px, py, 0.0);
                // Description sits to the right of the sample, vertically
                // centred on it.
                top.set_justify(Justify::LEFT | Justify::MIDDLE);
                top.clear_path();
                top.move_to(1.1 * size, size / 2.0);
                top.label(&entry.description)?;
                top.clear_path();
                build_sample_path(top, entry.kind, size)?;
            }
            interp.call_block(&entry.block_name, entry.args.clone(), ctx)?;
            if entry.kind == LegendKind::Box {
                let top = ctx.top_mut();
                top.set_color(Color::BLACK);
                top.clear_path();
                build_sample_path(top, LegendKind::Box, size)?;
                top.stroke(None)?;
            }
            Ok(())
        })();
        let popped = ctx.pop();
        result?;
        popped?;
    }
    Ok(())
}

fn build_sample_path(
    top: &mut core_context::Context,
    kind: LegendKind,
    size: f64,
) -> Result<()> {
    match kind {
        LegendKind::Point => {
            top.move_to(size / 2.0, size / 2.0);
        }
        LegendKind::Line => {
            top.move_to(0.0, size / 2.0);
            top.line_to(size, size / 2.0)?;
        }
        LegendKind::Zigzag => {
            top.move_to(0.0, size / 2.0);
            top.line_to(size * 0.25, size * 0.75)?;
            top.line_to(size * 0.5, size * 0.25)?;
            top.line_to(size * 0.75, size * 0.75)?;
            top.line_to(size, size / 2.0)?;
        }
        LegendKind::Box => {
            top.move_to(0.0, 0.0);
            top.line_to(size, 0.0)?;
            top.line_to(size, size)?;
            top.line_to(0.0, size)?;
            top.close_path();
        }
    }
    Ok(())
}
