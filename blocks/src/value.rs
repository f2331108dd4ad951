use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;

use crate::block::{ComparisonOperator, Literal};

/// A scalar produced by evaluating an expression slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Literal")]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Text(String),
    /// Result of a call to a function that returned nothing.
    Unit,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
            Value::Text(_) => "Text",
            Value::Unit => "Unit",
        }
    }

    /// Only `true` and non-zero numbers hold.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(_) | Value::Unit => false,
        }
    }

    /// Numeric view of the value. Text that does not parse yields `None`;
    /// callers substitute NaN and report the slot.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            Value::Unit => None,
        }
    }

    /// Apply a comparison operator. Equality never coerces across kinds;
    /// ordering between mismatched kinds falls back to numeric coercion.
    pub fn compare(&self, operator: ComparisonOperator, other: &Value) -> bool {
        match operator {
            ComparisonOperator::Equal => self == other,
            ComparisonOperator::NotEqual => self != other,
            ComparisonOperator::Less => self.ordering(other) == Some(Ordering::Less),
            ComparisonOperator::LessOrEqual => matches!(
                self.ordering(other),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ComparisonOperator::Greater => self.ordering(other) == Some(Ordering::Greater),
            ComparisonOperator::GreaterOrEqual => matches!(
                self.ordering(other),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.to_number()?;
                let b = other.to_number()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(n),
            Literal::Boolean(b) => Value::Boolean(b),
            Literal::Text(s) => Value::Text(s),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        Value::from(literal.clone())
    }
}

/// Render a number the way the printed output shows it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
            Value::Unit => f.write_str("null"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b, // NaN != NaN per IEEE 754
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_as_decimal_text() {
        assert_eq!(Value::Number(10.0).to_string(), "10");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }

    #[test]
    fn equality_is_strict_across_kinds() {
        let five = Value::Number(5.0);
        let text = Value::Text("5".to_string());
        assert!(!five.compare(ComparisonOperator::Equal, &text));
        assert!(five.compare(ComparisonOperator::NotEqual, &text));
        let nan = Value::Number(f64::NAN);
        assert!(!nan.compare(ComparisonOperator::Equal, &nan));
    }

    #[test]
    fn ordering_by_kind() {
        let three = Value::Number(3.0);
        let five = Value::Number(5.0);
        assert!(five.compare(ComparisonOperator::Greater, &three));
        assert!(three.compare(ComparisonOperator::LessOrEqual, &three));

        let apple = Value::Text("apple".to_string());
        let pear = Value::Text("pear".to_string());
        assert!(apple.compare(ComparisonOperator::Less, &pear));

        // Mixed kinds coerce numerically.
        let text_ten = Value::Text("10".to_string());
        assert!(text_ten.compare(ComparisonOperator::Greater, &three));
        let word = Value::Text("ten".to_string());
        assert!(!word.compare(ComparisonOperator::Greater, &three));
        assert!(!word.compare(ComparisonOperator::LessOrEqual, &three));
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Text(" 4.5 ".to_string()).to_number(), Some(4.5));
        assert_eq!(Value::Text(String::new()).to_number(), Some(0.0));
        assert_eq!(Value::Text("abc".to_string()).to_number(), None);
        assert_eq!(Value::Boolean(true).to_number(), Some(1.0));
        assert_eq!(Value::Unit.to_number(), None);
    }

    #[test]
    fn deserializes_from_literals() {
        let value: Value = serde_json::from_str("7").unwrap();
        assert_eq!(value, Value::Number(7.0));
        let value: Value = serde_json::from_str("\"seven\"").unwrap();
        assert_eq!(value, Value::Text("seven".to_string()));
    }
}
