use std::sync::Arc;

use crate::eval::env::Env;
use crate::eval::types::{error, EvalError, EvalResult, Value, MAX_NESTING};

fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    args.iter()
        .map(|v| match v {
            Value::Number(x) => Ok(*x),
            other => Err(error(&format!(
                "'{}' can only be applied to numbers, got {}.",
                name,
                other.type_name()
            ))),
        })
        .collect()
}

fn plus(args: &[Value]) -> EvalResult {
    Ok(Value::Number(numbers("+", args)?.iter().sum()))
}

fn times(args: &[Value]) -> EvalResult {
    Ok(Value::Number(numbers("*", args)?.iter().product()))
}

fn minus(args: &[Value]) -> EvalResult {
    match numbers("-", args)?.as_slice() {
        [] => Err(error("'-' requires at least 1 argument.")),
        [x] => Ok(Value::Number(-x)),
        [first, rest @ ..] => Ok(Value::Number(rest.iter().fold(*first, |acc, x| acc - x))),
    }
}

fn divide(args: &[Value]) -> EvalResult {
    match numbers("/", args)?.as_slice() {
        [] => Err(error("'/' requires at least 1 argument.")),
        [first, rest @ ..] => {
            if rest.iter().any(|x| *x == 0.0) {
                return Err(error("division by zero."));
            }
            Ok(Value::Number(rest.iter().fold(*first, |acc, x| acc / x)))
        }
    }
}

fn eq(args: &[Value]) -> EvalResult {
    if args.is_empty() {
        return Err(error("'=' requires at least 1 argument."));
    }
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
}

fn not(args: &[Value]) -> EvalResult {
    match args {
        [v] => Ok(Value::Bool(!v.is_truish())),
        _ => Err(error("'not' requires exactly 1 argument.")),
    }
}

// Rejects containers that would nest deeper than the printer and drop can
// safely recurse.
fn check_nesting(name: &str, args: &[Value]) -> Result<(), EvalError> {
    if args.iter().any(|arg| arg.depth() >= MAX_NESTING) {
        return Err(error(&format!("'{}' would nest too deep.", name)));
    }
    Ok(())
}

fn list(args: &[Value]) -> EvalResult {
    check_nesting("list", args)?;
    Ok(Value::list(args.to_vec()))
}

fn count(args: &[Value]) -> EvalResult {
    match args {
        [Value::List(items)] => Ok(Value::Number(items.len() as f64)),
        [Value::Map(fields)] => Ok(Value::Number(fields.len() as f64)),
        [Value::Str(s)] => Ok(Value::Number(s.chars().count() as f64)),
        [Value::Nil] => Ok(Value::Number(0.0)),
        [other] => Err(error(&format!("'count' not supported on {}.", other.type_name()))),
        _ => Err(error("'count' requires exactly 1 argument.")),
    }
}

fn get(args: &[Value]) -> EvalResult {
    let (target, key, default) = match args {
        [target, key] => (target, key, Value::Nil),
        [target, key, default] => (target, key, default.clone()),
        _ => return Err(error("'get' requires 2 or 3 arguments.")),
    };
    let found = match (target, key) {
        (Value::Map(fields), Value::Str(k) | Value::Symbol(k)) => fields.get(k).cloned(),
        (Value::List(items), Value::Number(i)) if *i >= 0.0 => items.get(*i as usize).cloned(),
        (Value::Nil, _) => None,
        (other, _) => {
            return Err(error(&format!("'get' not supported on {}.", other.type_name())))
        }
    };
    Ok(found.unwrap_or(default))
}

fn keys(args: &[Value]) -> EvalResult {
    match args {
        [Value::Map(fields)] => Ok(Value::list(
            fields.keys().map(|k| Value::Str(k.clone())).collect(),
        )),
        [other] => Err(error(&format!("'keys' not supported on {}.", other.type_name()))),
        _ => Err(error("'keys' requires exactly 1 argument.")),
    }
}

fn str_concat(args: &[Value]) -> EvalResult {
    Ok(Value::Str(args.iter().map(Value::to_display).collect()))
}

fn hash_map(args: &[Value]) -> EvalResult {
    if args.len() % 2 != 0 {
        return Err(error("'hash-map' requires an even number of arguments."));
    }
    check_nesting("hash-map", args)?;
    let mut fields = std::collections::BTreeMap::new();
    for pair in args.chunks(2) {
        let key = match &pair[0] {
            Value::Str(k) | Value::Symbol(k) => k.clone(),
            other => other.pr_str(),
        };
        fields.insert(key, pair[1].clone());
    }
    Ok(Value::Map(Arc::new(fields)))
}

pub fn load(env: &mut Env) {
    env.reg_fn("+", plus);
    env.reg_fn("-", minus);
    env.reg_fn("*", times);
    env.reg_fn("/", divide);
    env.reg_fn("=", eq);
    env.reg_fn("not", not);
    env.reg_fn("list", list);
    env.reg_fn("count", count);
    env.reg_fn("get", get);
    env.reg_fn("keys", keys);
    env.reg_fn("hash-map", hash_map);
    env.reg_fn("str", str_concat);
}
