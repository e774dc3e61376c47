//! Expression trees: parsing and evaluation.
//!
//! Precedence, lowest first: `and`, `or`, comparison (`=`, `!=`, `<`,
//! `<=`, `>`, `>=`, `~`), additive (`+`, `-`, `.` concatenation),
//! multiplicative (`*`, `/`), unary minus, primary. Primaries are numbers,
//! quoted strings, identifiers (optionally indexed with `[...]` or called
//! as built-in functions), and parenthesised expressions. Newlines are
//! whitespace inside balanced parentheses and terminators outside.
//!
//! Trees are immutable after parsing and shared across interpreter clones.
//! Left and right operands of binary operations evaluate independently.

use core_value::error::{MapyrusError, Result};
use core_value::{Value, compare_values};

use crate::functions::Function;
use crate::parser::Parser;
use crate::regex_cache;

/// Resolves variable names during evaluation; implemented by the context
/// stack.
pub trait VariableResolver {
    fn get_variable(&self, name: &str) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `~`: regex find against the left operand.
    Contains,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    /// Map element access `target[key]`.
    Index(Box<Expression>, Box<Expression>),
    Neg(Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    FunctionCall(Function, Vec<Expression>),
}

impl Expression {
    pub fn evaluate(&self, vars: &dyn VariableResolver) -> Result<Value> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Variable(name) => vars
                .get_variable(name)
                .ok_or_else(|| MapyrusError::VariableUndefined(name.clone())),
            Self::Index(target, key) => {
                let target = target.evaluate(vars)?;
                let key = key.evaluate(vars)?.as_string()?;
                match target {
                    // A missing element reads as the empty string, like an
                    // unassigned map slot.
                    Value::Map(map) => Ok(map
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| Value::Str(String::new()))),
                    _ => Err(MapyrusError::WrongTypes),
                }
            }
            Self::Neg(e) => Value::from_number(-e.evaluate(vars)?.as_number()?),
            Self::Binary(op, left, right) => {
                let left = left.evaluate(vars)?;
                let right = right.evaluate(vars)?;
                eval_binary(*op, left, right)
            }
            Self::FunctionCall(func, args) => {
                let values: Vec<Value> = args
                    .iter()
                    .map(|a| a.evaluate(vars))
                    .collect::<Result<_>>()?;
                func.eval(&values)
            }
        }
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOp::And => Ok(Value::from_bool(left.is_true()? && right.is_true()?)),
        BinaryOp::Or => Ok(Value::from_bool(left.is_true()? || right.is_true()?)),
        BinaryOp::Add => Value::from_number(left.as_number()? + right.as_number()?),
        BinaryOp::Sub => Value::from_number(left.as_number()? - right.as_number()?),
        BinaryOp::Div => Value::from_number(left.as_number()? / right.as_number()?),
        BinaryOp::Mul => {
            if let (Ok(a), Ok(b)) = (left.as_number(), right.as_number()) {
                return Value::from_number(a * b);
            }
            match (&left, &right) {
                (Value::Str(s), Value::Number(n)) => {
                    let count = n.floor().max(0.0) as usize;
                    Ok(Value::Str(s.repeat(count)))
                }
                _ => Err(MapyrusError::WrongTypes),
            }
        }
        BinaryOp::Concat => {
            let mut s = left.as_string()?;
            s.push_str(&right.as_string()?);
            Ok(Value::Str(s))
        }
        BinaryOp::Contains => {
            let subject = left.as_string()?;
            let re = regex_cache::compile(&right.as_string()?)?;
            Ok(Value::from_bool(re.is_match(&subject)))
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            // Numeric when both operands read as numbers, lexicographic
            // otherwise.
            let ordering = compare_values(&left, &right);
            let result = match op {
                BinaryOp::Eq => ordering.is_eq(),
                BinaryOp::Ne => ordering.is_ne(),
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::from_bool(result))
        }
    }
}

impl Parser {
    /// Parse one expression; `depth` counts enclosing parentheses so that
    /// newlines read as whitespace inside them.
    pub(crate) fn parse_expression(&mut self, depth: u32) -> Result<Expression> {
        self.parse_and_level(depth)
    }

    fn parse_and_level(&mut self, depth: u32) -> Result<Expression> {
        let mut left = self.parse_or_level(depth)?;
        while self.take_word_operator("and", depth)? {
            let right = self.parse_or_level(depth)?;
            left = Expression::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_or_level(&mut self, depth: u32) -> Result<Expression> {
        let mut left = self.parse_comparison(depth)?;
        while self.take_word_operator("or", depth)? {
            let right = self.parse_comparison(depth)?;
            left = Expression::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Peek the next word (caching it in the lookahead slot) and consume it
    /// when it matches the operator name.
    fn take_word_operator(&mut self, op: &str, depth: u32) -> Result<bool> {
        if self.lookahead.is_none() {
            self.skip_space(depth > 0)?;
            self.lookahead = self.read_word_raw()?;
        }
        if self
            .lookahead
            .as_ref()
            .is_some_and(|w| w.eq_ignore_ascii_case(op))
        {
            self.lookahead = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_comparison(&mut self, depth: u32) -> Result<Expression> {
        let mut left = self.parse_additive(depth)?;
        loop {
            if self.lookahead.is_some() {
                return Ok(left);
            }
            self.skip_space(depth > 0)?;
            let op = match self.read_char()? {
                Some('=') => {
                    if let Some(c) = self.read_char()?
                        && c != '='
                    {
                        self.unread_char(c);
                    }
                    BinaryOp::Eq
                }
                Some('!') => match self.read_char()? {
                    Some('=') => BinaryOp::Ne,
                    _ => {
                        return Err(MapyrusError::InvalidExpression(
                            "'!' is only valid in '!='".to_string(),
                        ));
                    }
                },
                Some('<') => {
                    if let Some(c) = self.read_char()? {
                        if c == '=' {
                            BinaryOp::Le
                        } else {
                            self.unread_char(c);
                            BinaryOp::Lt
                        }
                    } else {
                        BinaryOp::Lt
                    }
                }
                Some('>') => {
                    if let Some(c) = self.read_char()? {
                        if c == '=' {
                            BinaryOp::Ge
                        } else {
                            self.unread_char(c);
                            BinaryOp::Gt
                        }
                    } else {
                        BinaryOp::Gt
                    }
                }
                Some('~') => BinaryOp::Contains,
                Some(c) => {
                    self.unread_char(c);
                    return Ok(left);
                }
                None => return Ok(left),
            };
            let right = self.parse_additive(depth)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self, depth: u32) -> Result<Expression> {
        let mut left = self.parse_multiplicative(depth)?;
        loop {
            let op = if self.pending_concat {
                self.pending_concat = false;
                BinaryOp::Concat
            } else {
                if self.lookahead.is_some() {
                    return Ok(left);
                }
                self.skip_space(depth > 0)?;
                match self.read_char()? {
                    Some('+') => BinaryOp::Add,
                    Some('-') => BinaryOp::Sub,
                    Some('.') => BinaryOp::Concat,
                    Some(c) => {
                        self.unread_char(c);
                        return Ok(left);
                    }
                    None => return Ok(left),
                }
            };
            let right = self.parse_multiplicative(depth)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self, depth: u32) -> Result<Expression> {
        let mut left = self.parse_unary(depth)?;
        loop {
            if self.lookahead.is_some() {
                return Ok(left);
            }
            self.skip_space(depth > 0)?;
            let op = match self.read_char()? {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                Some(c) => {
                    self.unread_char(c);
                    return Ok(left);
                }
                None => return Ok(left),
            };
            let right = self.parse_unary(depth)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self, depth: u32) -> Result<Expression> {
        if self.lookahead.is_none() {
            self.skip_space(depth > 0)?;
            match self.read_char()? {
                Some('-') => {
                    return Ok(Expression::Neg(Box::new(self.parse_unary(depth)?)));
                }
                Some('+') => return self.parse_unary(depth),
                Some(c) => self.unread_char(c),
                None => {}
            }
        }
        self.parse_primary(depth)
    }

    fn parse_primary(&mut self, depth: u32) -> Result<Expression> {
        if let Some(word) = self.lookahead.take() {
            return self.parse_identifier_expression(word, depth);
        }
        self.skip_space(depth > 0)?;
        match self.read_char()? {
            None => Err(MapyrusError::UnexpectedEof),
            Some('(') => {
                let inner = self.parse_and_level(depth + 1)?;
                self.skip_space(true)?;
                match self.read_char()? {
                    Some(')') => Ok(inner),
                    _ => Err(MapyrusError::UnmatchedBracket),
                }
            }
            Some(quote @ ('"' | '\'')) => self.parse_string_literal(quote),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                self.unread_char(c);
                self.parse_number_literal()
            }
            Some(c) if is_identifier_start(c) => {
                self.unread_char(c);
                match self.read_word_raw()? {
                    Some(word) => self.parse_identifier_expression(word, depth),
                    None => Err(MapyrusError::InvalidExpression(format!(
                        "unexpected character '{c}'"
                    ))),
                }
            }
            Some(c) => Err(MapyrusError::InvalidExpression(format!(
                "unexpected character '{c}'"
            ))),
        }
    }

    fn parse_identifier_expression(&mut self, word: String, depth: u32) -> Result<Expression> {
        // An identifier immediately followed by '(' is a call; the name
        // must resolve to a built-in function here, at parse time.
        // Anything else is a variable reference, optionally indexed.
        if let Some(c) = self.read_char()? {
            if c == '(' {
                let Some(func) = Function::from_name(&word) else {
                    return Err(MapyrusError::InvalidExpression(format!(
                        "unknown function {word}()"
                    )));
                };
                return self.parse_function_call(func, depth);
            }
            self.unread_char(c);
        }
        let mut node = Expression::Variable(word);
        loop {
            match self.read_char()? {
                Some('[') => {
                    let index = self.parse_and_level(depth + 1)?;
                    self.skip_space(true)?;
                    match self.read_char()? {
                        Some(']') => {
                            node = Expression::Index(Box::new(node), Box::new(index));
                        }
                        _ => return Err(MapyrusError::UnmatchedBracket),
                    }
                }
                Some(c) => {
                    self.unread_char(c);
                    return Ok(node);
                }
                None => return Ok(node),
            }
        }
    }

    fn parse_function_call(&mut self, func: Function, depth: u32) -> Result<Expression> {
        let mut args = Vec::new();
        self.skip_space(true)?;
        if let Some(c) = self.read_char()? {
            if c == ')' {
                return self.finish_function_call(func, args);
            }
            self.unread_char(c);
        } else {
            return Err(MapyrusError::UnexpectedEof);
        }
        loop {
            args.push(self.parse_and_level(depth + 1)?);
            self.skip_space(true)?;
            match self.read_char()? {
                Some(',') => continue,
                Some(')') => return self.finish_function_call(func, args),
                _ => return Err(MapyrusError::UnmatchedBracket),
            }
        }
    }

    fn finish_function_call(&mut self, func: Function, args: Vec<Expression>) -> Result<Expression> {
        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            return Err(MapyrusError::InvalidExpression(format!(
                "function {}() takes {} to {} arguments, got {}",
                func.name(),
                min,
                max,
                args.len()
            )));
        }
        Ok(Expression::FunctionCall(func, args))
    }

    fn parse_string_literal(&mut self, quote: char) -> Result<Expression> {
        let mut s = String::new();
        loop {
            match self.read_char()? {
                None => return Err(MapyrusError::UnexpectedEof),
                Some(c) if c == quote => break,
                Some('\\') => match self.read_char()? {
                    None => return Err(MapyrusError::UnexpectedEof),
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(other) => s.push(other),
                },
                Some(c) => s.push(c),
            }
        }
        Ok(Expression::Literal(Value::Str(s)))
    }

    fn parse_number_literal(&mut self) -> Result<Expression> {
        let mut text = String::new();
        while let Some(c) = self.read_char()? {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
            } else if (c == 'e' || c == 'E') && !text.is_empty() {
                text.push(c);
                if let Some(sign) = self.read_char()? {
                    if sign == '+' || sign == '-' || sign.is_ascii_digit() {
                        text.push(sign);
                    } else {
                        self.unread_char(sign);
                    }
                }
            } else {
                self.unread_char(c);
                break;
            }
        }
        text.parse::<f64>()
            .map(|n| Expression::Literal(Value::Number(n)))
            .map_err(|_| MapyrusError::InvalidNumber(text))
    }
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == ':' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::preprocessor::Preprocessor;
    use std::collections::HashMap;

    struct MapVars(HashMap<String, Value>);

    impl VariableResolver for MapVars {
        fn get_variable(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    fn eval(src: &str) -> Result<Value> {
        eval_with(src, MapVars(HashMap::new()))
    }

    fn eval_with(src: &str, vars: MapVars) -> Result<Value> {
        let mut parser = Parser::new(Preprocessor::from_string("expr", src));
        let expr = parser.parse_expression(0)?;
        expr.evaluate(&vars)
    }

    #[test]
    fn precedence_mul_before_add() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), Value::Number(20.0));
    }

    #[test]
    fn concat_coerces_to_string() {
        assert_eq!(
            eval("\"x=\" . (2 + 3 * 4)").unwrap(),
            Value::Str("x=14".to_string())
        );
    }

    #[test]
    fn string_repeat() {
        assert_eq!(eval("\"ab\" * 3").unwrap(), Value::Str("ababab".to_string()));
        assert!(matches!(
            eval("\"ab\" * \"cd\""),
            Err(MapyrusError::WrongTypes)
        ));
    }

    #[test]
    fn regex_contains() {
        assert_eq!(eval("\"foobar\" ~ \"^f\"").unwrap(), Value::Number(1.0));
        assert_eq!(eval("\"foobar\" ~ \"^z\"").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn comparisons_numeric_and_lexicographic() {
        assert_eq!(eval("2 < 10").unwrap(), Value::Number(1.0));
        // Both operands read as numbers, so the comparison is numeric even
        // for string literals.
        assert_eq!(eval("\"2\" < \"10\"").unwrap(), Value::Number(1.0));
        assert_eq!(eval("\"abc\" < \"abd\"").unwrap(), Value::Number(1.0));
        assert_eq!(eval("3 = 3").unwrap(), Value::Number(1.0));
        assert_eq!(eval("3 != 3").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn and_or_yield_bits() {
        assert_eq!(eval("1 and 0").unwrap(), Value::Number(0.0));
        assert_eq!(eval("1 or 0").unwrap(), Value::Number(1.0));
        assert_eq!(eval("2 > 1 and 3 > 2").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn unary_minus_and_division() {
        assert_eq!(eval("-4 / 2").unwrap(), Value::Number(-2.0));
        assert!(matches!(
            eval("1 / 0"),
            Err(MapyrusError::NumericOverflow)
        ));
    }

    #[test]
    fn variables_resolve_through_stack() {
        let mut vars = HashMap::new();
        vars.insert("a".to_string(), Value::Number(14.0));
        assert_eq!(
            eval_with("\"x=\" . a", MapVars(vars)).unwrap(),
            Value::Str("x=14".to_string())
        );
        assert!(matches!(
            eval("nosuch + 1"),
            Err(MapyrusError::VariableUndefined(_))
        ));
    }

    #[test]
    fn dotted_names_are_single_identifiers() {
        let mut vars = HashMap::new();
        vars.insert("page.width".to_string(), Value::Number(210.0));
        assert_eq!(
            eval_with("page.width / 2", MapVars(vars)).unwrap(),
            Value::Number(105.0)
        );
    }

    #[test]
    fn map_index_reads_elements() {
        let mut map = core_value::ValueMap::new();
        map.put("k", Value::Number(7.0));
        let mut vars = HashMap::new();
        vars.insert("m".to_string(), Value::Map(map));
        assert_eq!(
            eval_with("m[\"k\"] + 1", MapVars(vars)).unwrap(),
            Value::Number(8.0)
        );
    }

    #[test]
    fn function_calls_parse_and_evaluate() {
        assert_eq!(eval("min(3, 2) + max(1, 5)").unwrap(), Value::Number(7.0));
        assert_eq!(
            eval("upper(substr(\"mapyrus\", 1, 3))").unwrap(),
            Value::Str("MAP".to_string())
        );
        assert!(eval("min(1)").is_err());
        // An unknown function name is rejected at parse time, before any
        // variable lookup could run.
        assert!(matches!(
            eval("nosuchfn(1)"),
            Err(MapyrusError::InvalidExpression(_))
        ));
    }

    #[test]
    fn newlines_inside_parens_are_whitespace() {
        assert_eq!(eval("(1 +\n 2) * 3").unwrap(), Value::Number(9.0));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(eval("\"a\\nb\"").unwrap(), Value::Str("a\nb".to_string()));
        assert_eq!(eval("\"a\\\\b\"").unwrap(), Value::Str("a\\b".to_string()));
    }

    #[test]
    fn overflow_detected() {
        assert!(matches!(
            eval("1e308 * 10"),
            Err(MapyrusError::NumericOverflow)
        ));
    }
}
