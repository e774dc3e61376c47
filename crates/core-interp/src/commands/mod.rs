//! Built-in command dispatch.
//!
//! One entry point, [`dispatch`], fanning out to focused submodules:
//! * `path_cmds` — path construction and rewriting
//! * `attr_cmds` — colour, styles, transforms and world setup
//! * `draw_cmds` — everything that emits to the output encoder
//! * `page_cmds` — pages, printing, datasets, eval, legend
//!
//! Every command validates its argument count and value ranges here or in
//! its submodule and fails with a specific error kind; the interpreter
//! rewraps whatever escapes with the statement's `filename:line:` prefix.

use core_context::ContextStack;
use core_lang::CommandKind;
use core_value::Value;
use core_value::error::{MapyrusError, Result};

use crate::Interpreter;

mod attr_cmds;
mod draw_cmds;
mod page_cmds;
mod path_cmds;

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    kind: CommandKind,
    args: Vec<Value>,
    ctx: &mut ContextStack,
) -> Result<()> {
    use CommandKind::*;
    match kind {
        ClearPath | Move | Draw | Rdraw | Arc | Bezier | Ellipse | SineWave | ClosePath
        | AddPath | ShiftPath | Box_ | RoundedBox | Box3d | Circle | Cylinder | Raindrop
        | Wedge | Spiral | Hexagon | Pentagon | Triangle | Star | SamplePath | StripePath
        | ParallelPath | SelectPath | ReversePath | Sinkhole | Guillotine => {
            path_cmds::dispatch(kind, &args, ctx)
        }
        Color | Blend | Linestyle | Font | Justify | Worlds | Project | Scale | Rotate => {
            attr_cmds::dispatch(kind, &args, ctx)
        }
        Stroke | Fill | GradientFill | Clip | Protect | Unprotect | Label | FlowLabel | Icon
        | GeoImage | Eps | Svg | SvgCode | Pdf | Table | Tree | EventScript => {
            draw_cmds::dispatch(kind, &args, ctx)
        }
        NewPage | EndPage | MimeType | Print | Eval | Dataset | Fetch | Key | Legend => {
            page_cmds::dispatch(interp, kind, args, ctx)
        }
    }
}

/// Argument-count check shared by every command.
pub(crate) fn expect_args(args: &[Value], min: usize, max: usize, command: &str) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(MapyrusError::WrongParameters(format!(
            "{command} expects {}{} argument{}, got {}",
            min,
            if max > min {
                format!(" to {max}")
            } else {
                String::new()
            },
            if max == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn num(args: &[Value], index: usize) -> Result<f64> {
    args.get(index)
        .ok_or(MapyrusError::WrongCoordinate)?
        .as_number()
}

pub(crate) fn string(args: &[Value], index: usize) -> Result<String> {
    args.get(index)
        .ok_or_else(|| MapyrusError::WrongParameters("missing argument".to_string()))?
        .as_string()
}
