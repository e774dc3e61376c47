//! Page lifecycle, printing, datasets, `eval` and the legend commands.

use core_context::{ContextStack, DatasetHandle, LegendEntry, LegendKind, PageState};
use core_lang::{CommandKind, Preprocessor};
use core_value::Value;
use core_value::error::{MapyrusError, Result};
use tracing::{debug, info};

use super::{expect_args, num, string};
use crate::{Interpreter, legend_render};

const DEFAULT_RESOLUTION_DPI: f64 = 300.0;

pub(crate) fn dispatch(
    interp: &mut Interpreter,
    kind: CommandKind,
    args: Vec<Value>,
    ctx: &mut ContextStack,
) -> Result<()> {
    use CommandKind::*;
    match kind {
        NewPage => new_page(&args, ctx, interp),
        EndPage => {
            expect_args(&args, 0, 0, "endpage")?;
            ctx.top_mut().end_page()
        }
        MimeType => {
            expect_args(&args, 1, 1, "mimetype")?;
            interp.set_mime_type(string(&args, 0)?);
            Ok(())
        }
        Print => {
            let mut line = String::new();
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                line.push_str(&arg.as_string()?);
            }
            line.push('\n');
            interp.write_stdout(&line)
        }
        Eval => {
            expect_args(&args, 1, 1, "eval")?;
            let source = string(&args, 0)?;
            let statements = core_lang::parse_source(Preprocessor::from_string("eval", &source))?;
            interp.execute(&statements, ctx)
        }
        Dataset => {
            expect_args(&args, 2, 3, "dataset")?;
            let kind = string(&args, 0)?;
            let name = string(&args, 1)?;
            let extras = match args.get(2) {
                Some(v) => v.as_string()?,
                None => String::new(),
            };
            let dataset = interp.dataset_factory().open(&kind, &name, &extras)?;
            let handle = DatasetHandle::open(dataset)?;
            debug!(target: "interp.dataset", kind = kind.as_str(), name = name.as_str(), "dataset_opened");
            ctx.top_mut().set_dataset(handle);
            Ok(())
        }
        Fetch => {
            expect_args(&args, 0, 0, "fetch")?;
            let (fields, row) = {
                let handle = ctx.nearest_dataset_mut().ok_or_else(|| {
                    MapyrusError::UnexpectedValues("no dataset is open".to_string())
                })?;
                let fields: Vec<String> = handle.field_names().to_vec();
                let row = handle.fetch()?.ok_or_else(|| {
                    MapyrusError::UnexpectedValues("no more rows to fetch".to_string())
                })?;
                (fields, row)
            };
            for (field, value) in fields.iter().zip(row) {
                ctx.define_variable(field, value);
            }
            Ok(())
        }
        Key => {
            expect_args(&args, 2, 2, "key")?;
            let kind = LegendKind::from_name(&string(&args, 0)?)?;
            let description = string(&args, 1)?;
            let (block_name, block_args) = interp.current_call().ok_or_else(|| {
                MapyrusError::WrongParameters(
                    "key is only valid inside a procedure block".to_string(),
                )
            })?;
            let entry = LegendEntry {
                kind,
                description,
                block_name: block_name.to_string(),
                args: block_args.to_vec(),
                reference_count: 1,
            };
            ctx.legend_mut().add(entry);
            Ok(())
        }
        Legend => {
            expect_args(&args, 1, 1, "legend")?;
            let size = num(&args, 0)?;
            legend_render::render(interp, size, ctx)
        }
        other => Err(MapyrusError::WrongParameters(format!(
            "unhandled page command {other:?}"
        ))),
    }
}

/// `newpage format, destination, width, height [, extras...]`. Extras are
/// `key=value` strings; `resolution=DPI` is understood here, everything
/// else passes through to the encoder.
fn new_page(args: &[Value], ctx: &mut ContextStack, interp: &mut Interpreter) -> Result<()> {
    if args.len() < 4 {
        return Err(MapyrusError::WrongParameters(
            "newpage expects format, destination, width, height".to_string(),
        ));
    }
    let format = string(args, 0)?;
    let dest = string(args, 1)?;
    let width = num(args, 2)?;
    let height = num(args, 3)?;
    if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
        return Err(MapyrusError::InvalidPageRange);
    }
    let mut resolution = DEFAULT_RESOLUTION_DPI;
    let mut extras = String::new();
    for arg in &args[4..] {
        let text = arg.as_string()?;
        match text.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("resolution") => {
                resolution = value
                    .trim()
                    .parse()
                    .map_err(|_| MapyrusError::InvalidNumber(value.to_string()))?;
            }
            _ => {
                if !extras.is_empty() {
                    extras.push(' ');
                }
                extras.push_str(&text);
            }
        }
    }
    let mut device = interp.device_factory().create(&format)?;
    device.open_page(&format, &dest, width, height, resolution, &extras)?;
    info!(
        target: "interp.page",
        format = format.as_str(),
        width,
        height,
        resolution,
        "page_opened"
    );
    ctx.top_mut().set_page(PageState {
        device,
        format,
        width,
        height,
        resolution_dpi: resolution,
        open: true,
    });
    Ok(())
}
