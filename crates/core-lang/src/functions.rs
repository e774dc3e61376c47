//! Built-in expression functions.
//!
//! Names resolve at parse time, so an unknown function is a parse error
//! with the statement's location rather than a runtime surprise. Arity is
//! checked at parse time too; argument types at evaluation.

use core_value::error::{MapyrusError, Result};
use core_value::{Value, ValueMap};

use crate::regex_cache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    Pow,
    Min,
    Max,
    Length,
    Substr,
    Upper,
    Lower,
    Trim,
    Match,
    Replace,
    Split,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "ceil" => Self::Ceil,
            "floor" => Self::Floor,
            "round" => Self::Round,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "min" => Self::Min,
            "max" => Self::Max,
            "length" => Self::Length,
            "substr" => Self::Substr,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "trim" => Self::Trim,
            "match" => Self::Match,
            "replace" => Self::Replace,
            "split" => Self::Split,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Min => "min",
            Self::Max => "max",
            Self::Length => "length",
            Self::Substr => "substr",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Trim => "trim",
            Self::Match => "match",
            Self::Replace => "replace",
            Self::Split => "split",
        }
    }

    /// (min, max) accepted argument counts.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Abs
            | Self::Ceil
            | Self::Floor
            | Self::Round
            | Self::Sqrt
            | Self::Length
            | Self::Upper
            | Self::Lower
            | Self::Trim => (1, 1),
            Self::Pow | Self::Min | Self::Max | Self::Match => (2, 2),
            Self::Substr => (2, 3),
            Self::Replace => (3, 3),
            Self::Split => (1, 2),
        }
    }

    pub fn eval(&self, args: &[Value]) -> Result<Value> {
        match self {
            Self::Abs => Value::from_number(args[0].as_number()?.abs()),
            Self::Ceil => Value::from_number(args[0].as_number()?.ceil()),
            Self::Floor => Value::from_number(args[0].as_number()?.floor()),
            Self::Round => Value::from_number(args[0].as_number()?.round()),
            Self::Sqrt => {
                let n = args[0].as_number()?;
                if n < 0.0 {
                    return Err(MapyrusError::NumericOverflow);
                }
                Value::from_number(n.sqrt())
            }
            Self::Pow => Value::from_number(args[0].as_number()?.powf(args[1].as_number()?)),
            Self::Min => Value::from_number(args[0].as_number()?.min(args[1].as_number()?)),
            Self::Max => Value::from_number(args[0].as_number()?.max(args[1].as_number()?)),
            Self::Length => match &args[0] {
                Value::Map(m) => Value::from_number(m.len() as f64),
                Value::Geometry(buf) => {
                    Value::from_number(core_value::geometry::coordinate_count(buf)? as f64)
                }
                other => Value::from_number(other.as_string()?.chars().count() as f64),
            },
            Self::Substr => {
                let s = args[0].as_string()?;
                let chars: Vec<char> = s.chars().collect();
                // 1-based start index, clamped into the string.
                let start = (args[1].as_number()?.round() as i64 - 1).max(0) as usize;
                let len = match args.get(2) {
                    Some(v) => v.as_number()?.round().max(0.0) as usize,
                    None => chars.len().saturating_sub(start),
                };
                let end = (start + len).min(chars.len());
                if start >= chars.len() {
                    return Ok(Value::Str(String::new()));
                }
                Ok(Value::Str(chars[start..end].iter().collect()))
            }
            Self::Upper => Ok(Value::Str(args[0].as_string()?.to_uppercase())),
            Self::Lower => Ok(Value::Str(args[0].as_string()?.to_lowercase())),
            Self::Trim => Ok(Value::Str(args[0].as_string()?.trim().to_string())),
            Self::Match => {
                let s = args[0].as_string()?;
                let re = regex_cache::compile(&args[1].as_string()?)?;
                match re.find(&s) {
                    // 1-based character index of the first match.
                    Some(m) => {
                        let index = s[..m.start()].chars().count() + 1;
                        Value::from_number(index as f64)
                    }
                    None => Ok(core_value::FALSE_VALUE),
                }
            }
            Self::Replace => {
                let s = args[0].as_string()?;
                let re = regex_cache::compile(&args[1].as_string()?)?;
                let replacement = args[2].as_string()?;
                Ok(Value::Str(
                    re.replace_all(&s, replacement.as_str()).into_owned(),
                ))
            }
            Self::Split => {
                let s = args[0].as_string()?;
                let parts: Vec<String> = match args.get(1) {
                    Some(sep) => {
                        let sep = sep.as_string()?;
                        if sep.is_empty() {
                            s.split_whitespace().map(str::to_string).collect()
                        } else {
                            s.split(sep.as_str()).map(str::to_string).collect()
                        }
                    }
                    None => s.split_whitespace().map(str::to_string).collect(),
                };
                let mut map = ValueMap::new();
                for (i, part) in parts.into_iter().enumerate() {
                    map.put((i + 1).to_string(), Value::Str(part));
                }
                Ok(Value::Map(map))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_functions() {
        assert_eq!(
            Function::Abs.eval(&[Value::Number(-4.0)]).unwrap(),
            Value::Number(4.0)
        );
        assert_eq!(
            Function::Pow
                .eval(&[Value::Number(2.0), Value::Number(10.0)])
                .unwrap(),
            Value::Number(1024.0)
        );
        assert!(Function::Sqrt.eval(&[Value::Number(-1.0)]).is_err());
    }

    #[test]
    fn substr_is_one_based() {
        let s = Value::Str("mapyrus".to_string());
        assert_eq!(
            Function::Substr
                .eval(&[s.clone(), Value::Number(2.0), Value::Number(3.0)])
                .unwrap(),
            Value::Str("apy".to_string())
        );
        assert_eq!(
            Function::Substr.eval(&[s, Value::Number(20.0)]).unwrap(),
            Value::Str(String::new())
        );
    }

    #[test]
    fn match_returns_position_or_zero() {
        let s = Value::Str("foobar".to_string());
        assert_eq!(
            Function::Match
                .eval(&[s.clone(), Value::Str("bar".to_string())])
                .unwrap(),
            Value::Number(4.0)
        );
        assert_eq!(
            Function::Match
                .eval(&[s, Value::Str("^z".to_string())])
                .unwrap(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn split_produces_ordered_map() {
        let result = Function::Split
            .eval(&[Value::Str("a,b,c".to_string()), Value::Str(",".to_string())])
            .unwrap();
        match result {
            Value::Map(m) => {
                assert_eq!(m.keys_in_insertion_order(), vec!["1", "2", "3"]);
                assert_eq!(m.get("2"), Some(&Value::Str("b".to_string())));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }
}
