use std::fmt;

/// A runtime value. Booleans double as the integers 1 and 0 wherever an
/// arithmetic context needs a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Integer(n) => *n,
            Value::Boolean(b) => i64::from(*b),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Boolean(b) => *b,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}
