use std::fmt;

use serde::Serialize;

/// A literal value as written in source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValue {
    Char(char),
    Int(i64),
    Float(f64),
    String(String),
    Unit,
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Char(c) => write!(f, "'{c}'"),
            ConstValue::Int(i) => write!(f, "{i}"),
            ConstValue::Float(x) => write!(f, "{x:?}"),
            ConstValue::String(s) => write!(f, "{s:?}"),
            ConstValue::Unit => write!(f, "()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ConstValue::Char('x').to_string(), "'x'");
        assert_eq!(ConstValue::Int(-3).to_string(), "-3");
        assert_eq!(ConstValue::Float(3.0).to_string(), "3.0");
        assert_eq!(ConstValue::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(ConstValue::Unit.to_string(), "()");
    }

    #[test]
    fn equality_compares_values() {
        assert_eq!(ConstValue::Int(1), ConstValue::Int(1));
        assert_ne!(ConstValue::Int(1), ConstValue::Int(2));
        assert_ne!(ConstValue::Int(1), ConstValue::Float(1.0));
        assert_eq!(ConstValue::String("a".into()), ConstValue::String("a".into()));
    }
}
