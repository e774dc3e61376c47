//! Attribute value types carried across the device contract.

use smallvec::SmallVec;

/// RGBA colour, components 0-255; alpha 255 is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, alpha: u8) -> Self {
        Self { r, g, b, alpha }
    }

    /// Perceived luminance in [0, 1].
    pub fn luminance(&self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    /// Scale towards white, factor as in `java.awt.Color.brighter`.
    pub fn brighter(&self) -> Self {
        const FACTOR: f64 = 0.7;
        let lift = |c: u8| -> u8 {
            if c == 0 {
                3
            } else {
                ((c as f64 / FACTOR).round() as u32).min(255) as u8
            }
        };
        Self {
            r: lift(self.r),
            g: lift(self.g),
            b: lift(self.b),
            alpha: self.alpha,
        }
    }

    /// Scale towards black.
    pub fn darker(&self) -> Self {
        const FACTOR: f64 = 0.7;
        Self {
            r: (self.r as f64 * FACTOR) as u8,
            g: (self.g as f64 * FACTOR) as u8,
            b: (self.b as f64 * FACTOR) as u8,
            alpha: self.alpha,
        }
    }

    /// Black or white, whichever contrasts more.
    pub fn contrasting(&self) -> Self {
        if self.luminance() > 0.5 {
            Self::rgba(0, 0, 0, self.alpha)
        } else {
            Self::rgba(255, 255, 255, self.alpha)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    Butt,
    Round,
    #[default]
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke style: width in millimetres, optional dash pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Linestyle {
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
    pub dash_phase: f64,
    pub dashes: SmallVec<[f64; 6]>,
}

impl Default for Linestyle {
    fn default() -> Self {
        Self {
            width: 0.1,
            cap: LineCap::Square,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash_phase: 0.0,
            dashes: SmallVec::new(),
        }
    }
}

/// Font selection: size and outline width in millimetres, rotation radians.
#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    pub name: String,
    pub size: f64,
    pub rotation: f64,
    pub outline_width: f64,
    pub line_spacing: f64,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: "SansSerif".to_string(),
            size: 5.0,
            rotation: 0.0,
            outline_width: 0.0,
            line_spacing: 1.0,
        }
    }
}

bitflags::bitflags! {
    /// Label justification bits; one horizontal and one vertical bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Justify: u8 {
        const LEFT = 1;
        const RIGHT = 2;
        const CENTER = 4;
        const TOP = 8;
        const MIDDLE = 16;
        const BOTTOM = 32;
    }
}

impl Default for Justify {
    fn default() -> Self {
        Justify::LEFT | Justify::BOTTOM
    }
}

/// Which side of a clip path survives drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSide {
    Inside,
    Outside,
}

/// One active clip path in page coordinates.
#[derive(Debug, Clone)]
pub struct ClipPath {
    pub path: core_path::Path,
    pub side: ClipSide,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_flips_on_luminance() {
        assert_eq!(Color::WHITE.contrasting(), Color::BLACK);
        assert_eq!(Color::BLACK.contrasting(), Color::WHITE);
    }

    #[test]
    fn brighter_never_overflows() {
        let c = Color::rgb(250, 0, 130).brighter();
        assert_eq!(c.r, 255);
        assert_eq!(c.g, 3);
    }

    #[test]
    fn default_justify_is_left_bottom() {
        let j = Justify::default();
        assert!(j.contains(Justify::LEFT));
        assert!(j.contains(Justify::BOTTOM));
        assert!(!j.contains(Justify::TOP));
    }
}
