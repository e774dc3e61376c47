//! Colour, style, transform and world-coordinate commands.

use core_context::{ContextStack, WorldUnits, color};
use core_device::{Color, FontStyle, Justify, LineCap, LineJoin, Linestyle};
use core_lang::CommandKind;
use core_value::Value;
use core_value::error::{MapyrusError, Result};
use smallvec::SmallVec;

use super::{expect_args, num, string};

pub(crate) fn dispatch(kind: CommandKind, args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    match kind {
        CommandKind::Color => set_color(args, ctx),
        CommandKind::Blend => {
            expect_args(args, 1, 1, "blend")?;
            ctx.top_mut().set_blend(string(args, 0)?);
            Ok(())
        }
        CommandKind::Linestyle => set_linestyle(args, ctx),
        CommandKind::Font => set_font(args, ctx),
        CommandKind::Justify => set_justify(args, ctx),
        CommandKind::Worlds => set_worlds(args, ctx),
        CommandKind::Project => {
            expect_args(args, 2, 2, "project")?;
            let from = string(args, 0)?;
            let to = string(args, 1)?;
            // Reprojection engines are host collaborators; the runtime
            // only supports the identity projection.
            if from.eq_ignore_ascii_case(&to) {
                Ok(())
            } else {
                Err(MapyrusError::InvalidFormat(format!(
                    "no projection available from {from} to {to}"
                )))
            }
        }
        CommandKind::Scale => {
            expect_args(args, 1, 1, "scale")?;
            let factor = num(args, 0)?;
            if factor == 0.0 {
                return Err(MapyrusError::UnexpectedValues(
                    "scale factor cannot be zero".to_string(),
                ));
            }
            ctx.top_mut().scale(factor);
            Ok(())
        }
        CommandKind::Rotate => {
            expect_args(args, 1, 1, "rotate")?;
            let degrees = num(args, 0)?;
            ctx.top_mut().rotate(degrees.to_radians());
            Ok(())
        }
        other => Err(MapyrusError::WrongParameters(format!(
            "unhandled attribute command {other:?}"
        ))),
    }
}

/// `color NAME [alpha]`, `color "#RRGGBB" [alpha]`,
/// `color "hsb" h s b [alpha]`, `color "rgb" r g b [alpha]`.
/// Alpha defaults to opaque and passes through only when supplied.
fn set_color(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    expect_args(args, 1, 5, "color")?;
    let first = string(args, 0)?;
    let current = ctx.top().color();
    let (mut color, alpha_index) = match first.to_lowercase().as_str() {
        "hsb" => {
            expect_args(args, 4, 5, "color hsb")?;
            (
                color::hsb_to_rgb(num(args, 1)?, num(args, 2)?, num(args, 3)?),
                4,
            )
        }
        "rgb" => {
            expect_args(args, 4, 5, "color rgb")?;
            let channel = |i: usize| -> Result<u8> {
                let v = num(args, i)?;
                if !(0.0..=1.0).contains(&v) {
                    return Err(MapyrusError::InvalidColor(format!(
                        "component {v} outside 0..1"
                    )));
                }
                Ok((v * 255.0 + 0.5) as u8)
            };
            (
                Color::rgb(channel(1)?, channel(2)?, channel(3)?),
                4,
            )
        }
        _ => {
            expect_args(args, 1, 2, "color")?;
            (color::lookup(&first, current)?, 1)
        }
    };
    if args.len() > alpha_index {
        let alpha = num(args, alpha_index)?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(MapyrusError::InvalidColor(format!(
                "alpha {alpha} outside 0..1"
            )));
        }
        color.alpha = (alpha * 255.0 + 0.5) as u8;
    }
    ctx.top_mut().set_color(color);
    Ok(())
}

/// `linestyle width [, cap, join, phase, dash...]`.
fn set_linestyle(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    if args.is_empty() {
        return Err(MapyrusError::WrongParameters(
            "linestyle expects a width".to_string(),
        ));
    }
    let width = num(args, 0)?;
    if width < 0.0 || !width.is_finite() {
        return Err(MapyrusError::InvalidLineWidth);
    }
    let mut style = Linestyle {
        width,
        ..Linestyle::default()
    };
    if args.len() > 1 {
        style.cap = match string(args, 1)?.to_lowercase().as_str() {
            "butt" => LineCap::Butt,
            "round" => LineCap::Round,
            "square" => LineCap::Square,
            other => {
                return Err(MapyrusError::WrongParameters(format!(
                    "unknown line cap {other}"
                )));
            }
        };
    }
    if args.len() > 2 {
        style.join = match string(args, 2)?.to_lowercase().as_str() {
            "miter" => LineJoin::Miter,
            "round" => LineJoin::Round,
            "bevel" => LineJoin::Bevel,
            other => {
                return Err(MapyrusError::WrongParameters(format!(
                    "unknown line join {other}"
                )));
            }
        };
    }
    if args.len() > 3 {
        style.dash_phase = num(args, 3)?;
    }
    if args.len() > 4 {
        let mut dashes: SmallVec<[f64; 6]> = SmallVec::new();
        for i in 4..args.len() {
            let dash = num(args, i)?;
            if dash <= 0.0 || !dash.is_finite() {
                return Err(MapyrusError::InvalidDashPattern);
            }
            dashes.push(dash);
        }
        style.dashes = dashes;
    }
    ctx.top_mut().set_linestyle(style);
    Ok(())
}

/// `font name, size [, "rotation=..", "outlinewidth=..", "linespacing=.."]`.
fn set_font(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    expect_args(args, 2, 5, "font")?;
    let name = string(args, 0)?;
    let size = num(args, 1)?;
    if size <= 0.0 || !size.is_finite() {
        return Err(MapyrusError::InvalidFontSize);
    }
    let mut font = FontStyle {
        name,
        size,
        ..FontStyle::default()
    };
    for i in 2..args.len() {
        let extra = string(args, i)?;
        let Some((key, value)) = extra.split_once('=') else {
            return Err(MapyrusError::WrongParameters(format!(
                "font option '{extra}' is not key=value"
            )));
        };
        let parsed: f64 = value
            .trim()
            .parse()
            .map_err(|_| MapyrusError::InvalidNumber(value.to_string()))?;
        match key.trim().to_lowercase().as_str() {
            "rotation" => font.rotation = parsed.to_radians(),
            "outlinewidth" => font.outline_width = parsed,
            "linespacing" => font.line_spacing = parsed,
            other => {
                return Err(MapyrusError::WrongParameters(format!(
                    "unknown font option {other}"
                )));
            }
        }
    }
    ctx.top_mut().set_font(font);
    Ok(())
}

/// `justify "left|right|center, top|middle|bottom"` in any order.
fn set_justify(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    expect_args(args, 1, 1, "justify")?;
    let spec = string(args, 0)?;
    let mut flags = Justify::empty();
    for token in spec.split([' ', ',']).filter(|t| !t.is_empty()) {
        match token.to_lowercase().as_str() {
            "left" => flags |= Justify::LEFT,
            "right" => flags |= Justify::RIGHT,
            "center" | "centre" => flags |= Justify::CENTER,
            "top" => flags |= Justify::TOP,
            "middle" => flags |= Justify::MIDDLE,
            "bottom" => flags |= Justify::BOTTOM,
            other => {
                return Err(MapyrusError::WrongParameters(format!(
                    "unknown justification {other}"
                )));
            }
        }
    }
    if !flags.intersects(Justify::LEFT | Justify::RIGHT | Justify::CENTER) {
        flags |= Justify::LEFT;
    }
    if !flags.intersects(Justify::TOP | Justify::MIDDLE | Justify::BOTTOM) {
        flags |= Justify::BOTTOM;
    }
    ctx.top_mut().set_justify(flags);
    Ok(())
}

/// `worlds wx1, wy1, wx2, wy2 [, px1, py1, px2, py2] [, "units=m",
/// "distortion=true"]`.
fn set_worlds(args: &[Value], ctx: &mut ContextStack) -> Result<()> {
    let mut numbers = Vec::new();
    let mut units = WorldUnits::Metres;
    let mut allow_distortion = false;
    for arg in args {
        match arg {
            Value::Number(n) => numbers.push(*n),
            other => {
                let text = other.as_string()?;
                for option in text.split_whitespace() {
                    match option.split_once('=') {
                        Some((key, value)) if key.eq_ignore_ascii_case("units") => {
                            units = WorldUnits::from_name(value)?;
                        }
                        Some((key, value)) if key.eq_ignore_ascii_case("distortion") => {
                            allow_distortion = value.eq_ignore_ascii_case("true");
                        }
                        _ => {
                            // A bare units word is also accepted.
                            units = WorldUnits::from_name(option)?;
                        }
                    }
                }
            }
        }
    }
    let page_region = match numbers.len() {
        4 => None,
        8 => Some((numbers[4], numbers[5], numbers[6], numbers[7])),
        _ => {
            return Err(MapyrusError::WrongParameters(
                "worlds expects 4 or 8 coordinates".to_string(),
            ));
        }
    };
    ctx.top_mut().set_worlds(
        numbers[0],
        numbers[1],
        numbers[2],
        numbers[3],
        page_region,
        units,
        allow_distortion,
    )
}
