//! Expression evaluation for REPL sessions.
//!
//! # Data Flow
//! ```text
//! client line
//!     → reader.rs (tokenize, buffer open forms across lines)
//!     → eval.rs (special forms, function application)
//!     → printer.rs (printed form sent back to the client)
//! ```
//!
//! # Design Decisions
//! - `Evaluator` is the seam: hosts may plug in their own language through
//!   an `EvaluatorFactory`; `InterpreterFactory` is the built-in default
//! - Faults are values (`EvalError`) reported to the one client; nothing
//!   here can take down the listener or other sessions
//! - Context names bound to live values are re-read on every lookup

pub mod core;
pub mod env;
#[allow(clippy::module_inception)]
pub mod eval;
pub mod printer;
pub mod reader;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use crate::config::EvaluatorOptions;
use crate::observability::metrics;
use crate::session::context::{ContextValue, SessionContext};

pub use env::{Binding, Env, LiveFn, SharedGlobals};
pub use reader::Reader;
pub use types::{EvalError, EvalResult, Value};

/// Outcome of one evaluated form, as text for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Value(String),
    Error(String),
}

/// One session's interactive evaluator.
pub trait Evaluator: Send {
    /// Feed one input line and return a reply per completed form.
    fn eval_line(&mut self, line: &str) -> Vec<Reply>;

    /// Whether a multi-line form is still open.
    fn is_pending(&self) -> bool;

    /// Discard buffered partial input.
    fn reset_input(&mut self);

    /// Forget definitions made in this session, keeping the context.
    fn reset_context(&mut self);
}

/// Builds an evaluator for each new session.
pub trait EvaluatorFactory: Send + Sync {
    fn create(&self, context: &SessionContext, options: &EvaluatorOptions) -> Box<dyn Evaluator>;
}

/// The built-in Lisp interpreter.
pub struct Interpreter {
    reader: Reader,
    env: Env,
    ignore_undefined: bool,
    show_timing: bool,
}

impl Interpreter {
    pub fn new(
        context: &SessionContext,
        options: &EvaluatorOptions,
        shared: Option<SharedGlobals>,
    ) -> Self {
        let mut env = Env::new(shared);
        core::load(&mut env);

        for (name, value) in context.iter() {
            let binding = match value {
                ContextValue::Static(json) => Binding::Value(Value::from(json.clone())),
                ContextValue::Live(live) => Binding::Live(Arc::clone(live)),
            };
            env.seed(name, binding);
        }

        Self {
            reader: Reader::with_limit(options.max_pending_bytes),
            env,
            ignore_undefined: options.ignore_undefined,
            show_timing: options.show_timing,
        }
    }

    /// Evaluate a single already-read form.
    pub fn eval_form(&mut self, form: &Value) -> EvalResult {
        eval::eval(form, &mut self.env)
    }
}

impl Evaluator for Interpreter {
    fn eval_line(&mut self, line: &str) -> Vec<Reply> {
        let forms = match self.reader.read_line(line) {
            Ok(forms) => forms,
            Err(err) => return vec![Reply::Error(err.to_string())],
        };

        let mut replies = Vec::with_capacity(forms.len());
        for form in forms {
            let start = Instant::now();
            let result = self.eval_form(&form);
            let elapsed = start.elapsed();
            metrics::record_evaluation(result.is_ok(), elapsed);

            match result {
                Ok(Value::Nil) if self.ignore_undefined => {}
                Ok(value) if self.show_timing => replies.push(Reply::Value(format!(
                    "Evaluated in {:?}\n{}",
                    elapsed,
                    value.pr_str()
                ))),
                Ok(value) => replies.push(Reply::Value(value.pr_str())),
                Err(err) => replies.push(Reply::Error(err.to_string())),
            }
        }
        replies
    }

    fn is_pending(&self) -> bool {
        self.reader.is_pending()
    }

    fn reset_input(&mut self) {
        self.reader.clear();
    }

    fn reset_context(&mut self) {
        self.reader.clear();
        self.env.reset();
    }
}

/// Creates [`Interpreter`]s; owns the namespace shared under `use_global`.
#[derive(Default)]
pub struct InterpreterFactory {
    shared: SharedGlobals,
}

impl InterpreterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvaluatorFactory for InterpreterFactory {
    fn create(&self, context: &SessionContext, options: &EvaluatorOptions) -> Box<dyn Evaluator> {
        if !options.extra.is_empty() {
            tracing::debug!(
                options = ?options.extra.keys().collect::<Vec<_>>(),
                "Ignoring evaluator options unknown to the interpreter"
            );
        }
        let shared = options.use_global.then(|| Arc::clone(&self.shared));
        Box::new(Interpreter::new(context, options, shared))
    }
}
