use crate::eval::env::Env;
use crate::eval::types::{error, EvalResult, Value, MAX_NESTING};

pub fn eval(exp: &Value, env: &mut Env) -> EvalResult {
    eval_at(exp, env, 0)
}

fn eval_at(exp: &Value, env: &mut Env, depth: usize) -> EvalResult {
    if depth > MAX_NESTING {
        return Err(error("nesting too deep."));
    }

    match exp {
        Value::Symbol(s) => lookup(s, env),
        Value::List(items) => {
            let Some((head, args)) = items.split_first() else {
                return Ok(exp.clone());
            };

            if let Value::Symbol(form) = head {
                match form.as_str() {
                    "quote" => return eval_quote(args),
                    "if" => return eval_if(args, env, depth),
                    "def" => return eval_def(args, env, depth),
                    _ => {}
                }
            }

            let func = eval_at(head, env, depth + 1)?;
            let args = args
                .iter()
                .map(|arg| eval_at(arg, env, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            match func {
                Value::Func(func) => (func.func)(&args),
                _ => Err(error("Only functions can be called.")),
            }
        }
        _ => Ok(exp.clone()),
    }
}

fn lookup(name: &str, env: &Env) -> EvalResult {
    if let Some(value) = env.get(name) {
        return Ok(value);
    }

    // `server.name` walks into maps (and lists by index).
    let mut segments = name.split('.');
    let root = segments.next().unwrap_or_default();
    if root.is_empty() || root.len() == name.len() {
        return Err(error(&format!("symbol '{}' not in scope.", name)));
    }
    let mut value = env
        .get(root)
        .ok_or_else(|| error(&format!("symbol '{}' not in scope.", root)))?;

    for segment in segments {
        value = match &value {
            Value::Map(fields) => fields.get(segment).cloned().unwrap_or_default(),
            Value::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned())
                .unwrap_or_default(),
            other => {
                return Err(error(&format!(
                    "cannot read '{}' of {}.",
                    segment,
                    other.type_name()
                )))
            }
        };
    }
    Ok(value)
}

fn eval_quote(args: &[Value]) -> EvalResult {
    match args {
        [quoted] => Ok(quoted.clone()),
        _ => Err(error("'quote' requires exactly 1 argument.")),
    }
}

fn eval_if(args: &[Value], env: &mut Env, depth: usize) -> EvalResult {
    let (cond, then, otherwise) = match args {
        [cond, then] => (cond, then, None),
        [cond, then, otherwise] => (cond, then, Some(otherwise)),
        _ => return Err(error("'if' requires 2 or 3 arguments.")),
    };
    if eval_at(cond, env, depth + 1)?.is_truish() {
        eval_at(then, env, depth + 1)
    } else {
        match otherwise {
            Some(exp) => eval_at(exp, env, depth + 1),
            None => Ok(Value::Nil),
        }
    }
}

fn eval_def(args: &[Value], env: &mut Env, depth: usize) -> EvalResult {
    match args {
        [Value::Symbol(name), exp] => {
            let value = eval_at(exp, env, depth + 1)?;
            env.define(name, value.clone());
            Ok(value)
        }
        [_, _] => Err(error("'def' requires a symbol as its first argument.")),
        _ => Err(error("'def' requires exactly 2 arguments.")),
    }
}
