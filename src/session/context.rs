//! Per-session context: the names visible to evaluated expressions.
//!
//! Built as an ordered merge of layers; a later layer replaces same-named
//! entries of earlier ones. The result is immutable for the session.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::eval::LiveFn;

/// A context entry.
#[derive(Clone)]
pub enum ContextValue {
    /// Fixed at session creation.
    Static(serde_json::Value),
    /// Recomputed whenever the name is looked up.
    Live(LiveFn),
}

impl ContextValue {
    pub fn live<F>(f: F) -> Self
    where
        F: Fn() -> serde_json::Value + Send + Sync + 'static,
    {
        ContextValue::Live(Arc::new(f))
    }

    /// Current value of the entry.
    pub fn resolve(&self) -> serde_json::Value {
        match self {
            ContextValue::Static(value) => value.clone(),
            ContextValue::Live(live) => live(),
        }
    }
}

impl std::fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Static(value) => write!(f, "Static({})", value),
            ContextValue::Live(_) => write!(f, "Live"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    entries: BTreeMap<String, ContextValue>,
}

impl SessionContext {
    /// Merge layers in order.
    pub fn merge<I, L>(layers: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = (String, ContextValue)>,
    {
        let mut entries = BTreeMap::new();
        for layer in layers {
            entries.extend(layer);
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static layer built from configured context values.
pub fn static_layer(
    values: &BTreeMap<String, serde_json::Value>,
) -> Vec<(String, ContextValue)> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), ContextValue::Static(value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_layers_override_earlier() {
        let seed = vec![
            ("socket".to_string(), ContextValue::Static(json!("s"))),
            ("server".to_string(), ContextValue::Static(json!("original"))),
        ];
        let mut extra = BTreeMap::new();
        extra.insert("server".to_string(), json!("replaced"));
        extra.insert("greeting".to_string(), json!("hola mundo"));

        let context = SessionContext::merge([seed, static_layer(&extra)]);

        assert_eq!(context.names(), vec!["greeting", "server", "socket"]);
        assert_eq!(context.get("server").unwrap().resolve(), json!("replaced"));
        assert_eq!(context.get("socket").unwrap().resolve(), json!("s"));
    }

    #[test]
    fn live_entries_resolve_each_time() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let calls = Arc::new(AtomicU64::new(0));
        let value = {
            let calls = Arc::clone(&calls);
            ContextValue::live(move || json!(calls.fetch_add(1, Ordering::SeqCst)))
        };

        assert_eq!(value.resolve(), json!(0));
        assert_eq!(value.resolve(), json!(1));
    }

    #[test]
    fn empty_merge() {
        let context = SessionContext::merge(Vec::<Vec<(String, ContextValue)>>::new());
        assert!(context.is_empty());
        assert_eq!(context.len(), 0);
    }
}
