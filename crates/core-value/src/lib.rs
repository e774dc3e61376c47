//! Tagged script value shared by expressions, variables and datasets.
//!
//! A [`Value`] is one of: number, string, variable reference, geometry
//! (flat coordinate buffer, see [`geometry`]) or an insertion-ordered map.
//! Numbers and strings interconvert at read time; the lossy direction is
//! number to string (canonical decimal). Maps copy nested maps on
//! insertion, so scripts observe map-by-copy semantics, never aliasing.

use std::cmp::Ordering;

use indexmap::IndexMap;

pub mod error;
pub mod geometry;
pub mod numeric;

pub use error::{MapyrusError, Result};

/// Shared canonical results for boolean-producing operations.
pub const TRUE_VALUE: Value = Value::Number(1.0);
pub const FALSE_VALUE: Value = Value::Number(0.0);

/// A value held by a variable or produced by an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    /// A reference to a variable by name, resolved against the context stack.
    VarRef(String),
    /// Flat geometry encoding; invariants in [`geometry`].
    Geometry(Vec<f64>),
    Map(ValueMap),
}

impl Value {
    pub fn from_bool(b: bool) -> Self {
        if b { TRUE_VALUE } else { FALSE_VALUE }
    }

    /// Canonicalise 0.0 / 1.0 to the shared constants, reject non-finite
    /// results with `NumericOverflow`.
    pub fn from_number(n: f64) -> Result<Self> {
        if !n.is_finite() {
            return Err(MapyrusError::NumericOverflow);
        }
        if n == 0.0 {
            Ok(FALSE_VALUE)
        } else if n == 1.0 {
            Ok(TRUE_VALUE)
        } else {
            Ok(Value::Number(n))
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::VarRef(_) => "variable",
            Self::Geometry(_) => "geometry",
            Self::Map(_) => "map",
        }
    }

    /// Numeric reading. Strings parse as decimal; anything unparsable is an
    /// error rather than a silent zero.
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| MapyrusError::NotNumericOperation),
            _ => Err(MapyrusError::NotNumericOperation),
        }
    }

    /// String reading; geometry prints as OGC WKT.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Self::Number(n) => Ok(numeric::format_number(*n)),
            Self::Str(s) => Ok(s.clone()),
            Self::VarRef(name) => Ok(name.clone()),
            Self::Geometry(buf) => geometry::wkt(buf),
            Self::Map(map) => {
                // Join entries in insertion order; scripts mostly print maps
                // while debugging.
                let mut out = String::new();
                for (i, (k, v)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(k);
                    out.push('=');
                    out.push_str(&v.as_string()?);
                }
                Ok(out)
            }
        }
    }

    pub fn as_geometry(&self) -> Result<&[f64]> {
        match self {
            Self::Geometry(buf) => Ok(buf),
            _ => Err(MapyrusError::WrongTypes),
        }
    }

    /// Truthiness for conditionals: non-zero number, or a string that
    /// parses to a non-zero number.
    pub fn is_true(&self) -> Result<bool> {
        Ok(self.as_number()? != 0.0)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

/// Ordering used by `map_keys_sorted_by_value`: numeric when both entries
/// are numbers (or parse as numbers), lexicographic otherwise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Ok(x), Ok(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    let sa = a.as_string().unwrap_or_default();
    let sb = b.as_string().unwrap_or_default();
    sa.cmp(&sb)
}

/// Insertion-ordered map from string keys to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: IndexMap<String, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, deep-copying map values so the stored entry never aliases the
    /// caller's map.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let stored = match value {
            Value::Map(m) => Value::Map(m.deep_clone()),
            other => other,
        };
        self.entries.insert(key.into(), stored);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order they were first inserted.
    pub fn keys_in_insertion_order(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Keys ordered by comparing their values.
    pub fn keys_sorted_by_value(&self) -> Vec<String> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort_by(|a, b| compare_values(&self.entries[*a], &self.entries[*b]));
        keys.into_iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    fn deep_clone(&self) -> Self {
        let mut out = Self::new();
        for (k, v) in &self.entries {
            out.put(k.clone(), v.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_string_interconversion() {
        assert_eq!(Value::Number(14.0).as_string().unwrap(), "14");
        assert_eq!(Value::Str("2.5".to_string()).as_number().unwrap(), 2.5);
        assert!(Value::Str("not a number".to_string()).as_number().is_err());
    }

    #[test]
    fn overflow_rejected() {
        assert!(matches!(
            Value::from_number(f64::INFINITY),
            Err(MapyrusError::NumericOverflow)
        ));
        assert!(matches!(
            Value::from_number(f64::NAN),
            Err(MapyrusError::NumericOverflow)
        ));
    }

    #[test]
    fn map_insertion_copies_nested_maps() {
        let mut inner = ValueMap::new();
        inner.put("a", Value::Number(1.0));
        let mut outer = ValueMap::new();
        outer.put("m", Value::Map(inner.clone()));
        // Mutating the original after insertion must not show through.
        inner.put("a", Value::Number(99.0));
        match outer.get("m") {
            Some(Value::Map(stored)) => {
                assert_eq!(stored.get("a"), Some(&Value::Number(1.0)));
            }
            other => panic!("expected stored map, got {other:?}"),
        }
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut map = ValueMap::new();
        map.put("z", Value::Number(3.0));
        map.put("a", Value::Number(1.0));
        map.put("m", Value::Number(2.0));
        assert_eq!(map.keys_in_insertion_order(), vec!["z", "a", "m"]);
        assert_eq!(map.keys_sorted_by_value(), vec!["a", "m", "z"]);
    }

    #[test]
    fn geometry_prints_as_wkt() {
        let v = Value::Geometry(geometry::point(7.0, 8.0));
        assert_eq!(v.as_string().unwrap(), "POINT (7 8)");
    }
}
