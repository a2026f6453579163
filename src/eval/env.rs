use std::sync::{Arc, PoisonError, RwLock};

use fnv::FnvHashMap;

use crate::eval::types::{NativeFn, Value};

/// Value computed on every lookup.
pub type LiveFn = Arc<dyn Fn() -> serde_json::Value + Send + Sync>;

/// Namespace shared by every session that opted into `use_global`.
pub type SharedGlobals = Arc<RwLock<FnvHashMap<String, Value>>>;

#[derive(Clone)]
pub enum Binding {
    Value(Value),
    Live(LiveFn),
}

impl Binding {
    fn resolve(&self) -> Value {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::Live(live) => Value::from(live()),
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Value(value) => write!(f, "Value({:?})", value),
            Binding::Live(_) => write!(f, "Live"),
        }
    }
}

/// Lookup order: shared globals (when enabled), session bindings, built-ins.
///
/// With shared globals every `def` lands there, so a definition shadows a
/// seeded context name of the same name in every session.
pub struct Env {
    builtins: FnvHashMap<String, Value>,
    seed: FnvHashMap<String, Binding>,
    session: FnvHashMap<String, Binding>,
    shared: Option<SharedGlobals>,
}

impl Env {
    pub fn new(shared: Option<SharedGlobals>) -> Self {
        Self {
            builtins: FnvHashMap::default(),
            seed: FnvHashMap::default(),
            session: FnvHashMap::default(),
            shared,
        }
    }

    /// Bind a context name. Seeded names survive [`Env::reset`].
    pub fn seed(&mut self, name: &str, binding: Binding) {
        self.seed.insert(name.to_string(), binding.clone());
        self.session.insert(name.to_string(), binding);
    }

    pub fn reg_fn(&mut self, name: &'static str, func: NativeFn) {
        self.builtins
            .insert(name.to_string(), Value::native(name, func));
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(shared) = &self.shared {
            let globals = shared.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = globals.get(name) {
                return Some(value.clone());
            }
        }
        if let Some(binding) = self.session.get(name) {
            return Some(binding.resolve());
        }
        self.builtins.get(name).cloned()
    }

    /// Top-level definition, visible to the whole session (or every session
    /// when globals are shared).
    pub fn define(&mut self, name: &str, value: Value) {
        match &self.shared {
            Some(shared) => {
                shared
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), value);
            }
            None => {
                self.session
                    .insert(name.to_string(), Binding::Value(value));
            }
        }
    }

    /// Forget session definitions, keeping the seeded context.
    pub fn reset(&mut self) {
        self.session = self.seed.clone();
    }
}
