use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

/// Deepest list or map nesting a value may have. Reading, building and
/// printing values all recurse, so this bounds their stack use.
pub const MAX_NESTING: usize = 64;

pub type NativeFn = fn(&[Value]) -> EvalResult;

/// A built-in function.
#[derive(Clone, Copy)]
pub struct Func {
    pub name: &'static str,
    pub func: NativeFn,
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Native func<{}>", self.name)
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Symbol(String),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
    Func(Func),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(items))
    }

    pub fn native(name: &'static str, func: NativeFn) -> Value {
        Value::Func(Func { name, func })
    }

    pub fn is_truish(&self) -> bool {
        !matches!(*self, Value::Nil | Value::Bool(false))
    }

    /// Number of list/map levels; atoms are 0.
    pub fn depth(&self) -> usize {
        match self {
            Value::List(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Map(fields) => 1 + fields.values().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "fn",
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Nil),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(Arc::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            )),
        }
    }
}

/// Fault raised while reading or evaluating client input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Reader error: {0}")]
    Read(String),

    #[error("Eval error: {0}")]
    Eval(String),
}

pub fn error(msg: &str) -> EvalError {
    EvalError::Eval(msg.to_string())
}

pub type EvalResult = Result<Value, EvalError>;
