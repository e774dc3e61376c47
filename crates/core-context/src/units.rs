//! World coordinate units and their synonyms.

use core_value::error::{MapyrusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldUnits {
    Metres,
    Feet,
    Degrees,
}

impl WorldUnits {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "m" | "metre" | "metres" | "meter" | "meters" => Ok(Self::Metres),
            "ft" | "foot" | "feet" => Ok(Self::Feet),
            "deg" | "degree" | "degrees" => Ok(Self::Degrees),
            _ => Err(MapyrusError::InvalidWorldUnits(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Metres => "metres",
            Self::Feet => "feet",
            Self::Degrees => "degrees",
        }
    }

    /// Millimetres per world unit, used for scale reporting.
    pub fn millimetres_per_unit(self) -> f64 {
        match self {
            Self::Metres => 1000.0,
            Self::Feet => 1000.0 / 0.3048,
            Self::Degrees => 110_000_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_resolve() {
        assert_eq!(WorldUnits::from_name("metres").unwrap(), WorldUnits::Metres);
        assert_eq!(WorldUnits::from_name("M").unwrap(), WorldUnits::Metres);
        assert_eq!(WorldUnits::from_name("feet").unwrap(), WorldUnits::Feet);
        assert_eq!(WorldUnits::from_name("deg").unwrap(), WorldUnits::Degrees);
        assert!(WorldUnits::from_name("furlongs").is_err());
    }
}
