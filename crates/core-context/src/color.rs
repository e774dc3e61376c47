//! Colour database and conversions for the `color` command.
//!
//! Common names map to RGB; `#RRGGBB` parses hex; `hsb` converts
//! hue/saturation/brightness. The special names `contrast`, `brighter`,
//! `darker` and `current` derive a colour from the one already set.

use std::collections::HashMap;
use std::sync::LazyLock;

use core_device::Color;
use core_value::error::{MapyrusError, Result};

static NAMED: LazyLock<HashMap<&'static str, Color>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("black", Color::rgb(0, 0, 0));
    m.insert("white", Color::rgb(255, 255, 255));
    m.insert("red", Color::rgb(255, 0, 0));
    m.insert("green", Color::rgb(0, 255, 0));
    m.insert("blue", Color::rgb(0, 0, 255));
    m.insert("yellow", Color::rgb(255, 255, 0));
    m.insert("cyan", Color::rgb(0, 255, 255));
    m.insert("magenta", Color::rgb(255, 0, 255));
    m.insert("orange", Color::rgb(255, 165, 0));
    m.insert("pink", Color::rgb(255, 192, 203));
    m.insert("brown", Color::rgb(165, 42, 42));
    m.insert("purple", Color::rgb(128, 0, 128));
    m.insert("violet", Color::rgb(238, 130, 238));
    m.insert("indigo", Color::rgb(75, 0, 130));
    m.insert("gold", Color::rgb(255, 215, 0));
    m.insert("silver", Color::rgb(192, 192, 192));
    m.insert("beige", Color::rgb(245, 245, 220));
    m.insert("ivory", Color::rgb(255, 255, 240));
    m.insert("khaki", Color::rgb(240, 230, 140));
    m.insert("lavender", Color::rgb(230, 230, 250));
    m.insert("maroon", Color::rgb(128, 0, 0));
    m.insert("navy", Color::rgb(0, 0, 128));
    m.insert("olive", Color::rgb(128, 128, 0));
    m.insert("salmon", Color::rgb(250, 128, 114));
    m.insert("tan", Color::rgb(210, 180, 140));
    m.insert("teal", Color::rgb(0, 128, 128));
    m.insert("turquoise", Color::rgb(64, 224, 208));
    m.insert("coral", Color::rgb(255, 127, 80));
    m.insert("crimson", Color::rgb(220, 20, 60));
    m.insert("chocolate", Color::rgb(210, 105, 30));
    m.insert("forestgreen", Color::rgb(34, 139, 34));
    m.insert("limegreen", Color::rgb(50, 205, 50));
    m.insert("skyblue", Color::rgb(135, 206, 235));
    m.insert("steelblue", Color::rgb(70, 130, 180));
    m.insert("royalblue", Color::rgb(65, 105, 225));
    m.insert("slategray", Color::rgb(112, 128, 144));
    m.insert("slategrey", Color::rgb(112, 128, 144));
    m.insert("lightgray", Color::rgb(211, 211, 211));
    m.insert("lightgrey", Color::rgb(211, 211, 211));
    m.insert("darkgray", Color::rgb(169, 169, 169));
    m.insert("darkgrey", Color::rgb(169, 169, 169));
    m.insert("gray", Color::rgb(128, 128, 128));
    m.insert("grey", Color::rgb(128, 128, 128));
    m
});

/// Resolve a colour name (case-insensitive), hex form, or one of the
/// relative names derived from `current`.
pub fn lookup(name: &str, current: Color) -> Result<Color> {
    let lower = name.trim().to_lowercase();
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex, name);
    }
    match lower.as_str() {
        "current" => Ok(current),
        "contrast" => Ok(current.contrasting()),
        "brighter" => Ok(current.brighter()),
        "darker" => Ok(current.darker()),
        _ => match NAMED.get(lower.as_str()) {
            Some(c) => Ok(*c),
            None => Err(MapyrusError::ColorNotFound(name.to_string())),
        },
    }
}

fn parse_hex(hex: &str, original: &str) -> Result<Color> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MapyrusError::InvalidColor(original.to_string()));
    }
    let component = |range: std::ops::Range<usize>| -> u8 {
        u8::from_str_radix(&hex[range], 16).unwrap_or(0)
    };
    Ok(Color::rgb(component(0..2), component(2..4), component(4..6)))
}

/// HSB (= HSV) to RGB; hue in [0, 1) wrapping, saturation and brightness
/// clamped to [0, 1].
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Color {
    let s = saturation.clamp(0.0, 1.0);
    let v = brightness.clamp(0.0, 1.0);
    let h = (hue.rem_euclid(1.0)) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let byte = |x: f64| (x * 255.0 + 0.5) as u8;
    Color::rgb(byte(r), byte(g), byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(lookup("Red", Color::BLACK).unwrap(), Color::rgb(255, 0, 0));
        assert!(matches!(
            lookup("nosuchcolor", Color::BLACK),
            Err(MapyrusError::ColorNotFound(_))
        ));
    }

    #[test]
    fn hex_parses() {
        assert_eq!(
            lookup("#1A2b3C", Color::BLACK).unwrap(),
            Color::rgb(0x1a, 0x2b, 0x3c)
        );
        assert!(matches!(
            lookup("#12345", Color::BLACK),
            Err(MapyrusError::InvalidColor(_))
        ));
    }

    #[test]
    fn relative_names_use_current() {
        let red = Color::rgb(200, 0, 0);
        assert_eq!(lookup("current", red).unwrap(), red);
        assert_eq!(lookup("darker", red).unwrap(), red.darker());
        assert_eq!(lookup("contrast", Color::WHITE).unwrap(), Color::BLACK);
    }

    #[test]
    fn hsb_primary_sectors() {
        assert_eq!(hsb_to_rgb(0.0, 1.0, 1.0), Color::rgb(255, 0, 0));
        assert_eq!(hsb_to_rgb(1.0 / 3.0, 1.0, 1.0), Color::rgb(0, 255, 0));
        assert_eq!(hsb_to_rgb(2.0 / 3.0, 1.0, 1.0), Color::rgb(0, 0, 255));
        assert_eq!(hsb_to_rgb(0.5, 0.0, 1.0), Color::WHITE);
    }
}
