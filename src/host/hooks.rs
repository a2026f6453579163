//! Two-phase stop hooks supplied by the host.
//!
//! The host runs `BeforeStop` hooks once it decides to stop and before it
//! tears down its own listeners, and `AfterStop` hooks once it has stopped.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by a hook.
pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type Hook = Box<dyn FnOnce() -> HookFuture + Send>;

/// Host stop phase a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPhase {
    #[default]
    BeforeStop,
    AfterStop,
}

/// Extension points of the host's stop sequence.
#[derive(Default)]
pub struct LifecycleHooks {
    before_stop: Vec<Hook>,
    after_stop: Vec<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for `phase`. Hooks run once, in registration order.
    pub fn on<F, Fut>(&mut self, phase: StopPhase, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: Hook = Box::new(move || -> HookFuture { Box::pin(hook()) });
        self.hooks_mut(phase).push(hook);
    }

    /// Number of hooks still pending for `phase`.
    pub fn len(&self, phase: StopPhase) -> usize {
        match phase {
            StopPhase::BeforeStop => self.before_stop.len(),
            StopPhase::AfterStop => self.after_stop.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_stop.is_empty() && self.after_stop.is_empty()
    }

    /// Run and consume every hook of `phase`.
    pub async fn run(&mut self, phase: StopPhase) {
        let hooks = std::mem::take(self.hooks_mut(phase));
        if !hooks.is_empty() {
            tracing::debug!(phase = ?phase, count = hooks.len(), "Running stop hooks");
        }
        for hook in hooks {
            hook().await;
        }
    }

    fn hooks_mut(&mut self, phase: StopPhase) -> &mut Vec<Hook> {
        match phase {
            StopPhase::BeforeStop => &mut self.before_stop,
            StopPhase::AfterStop => &mut self.after_stop,
        }
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before_stop", &self.before_stop.len())
            .field("after_stop", &self.after_stop.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn hooks_run_once_in_order_per_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::new();

        for (phase, label) in [
            (StopPhase::AfterStop, "after"),
            (StopPhase::BeforeStop, "before-1"),
            (StopPhase::BeforeStop, "before-2"),
        ] {
            let log = Arc::clone(&log);
            hooks.on(phase, move || async move {
                log.lock().unwrap().push(label);
            });
        }
        assert_eq!(hooks.len(StopPhase::BeforeStop), 2);

        hooks.run(StopPhase::BeforeStop).await;
        assert_eq!(*log.lock().unwrap(), vec!["before-1", "before-2"]);
        assert_eq!(hooks.len(StopPhase::BeforeStop), 0);

        hooks.run(StopPhase::BeforeStop).await;
        hooks.run(StopPhase::AfterStop).await;
        assert_eq!(*log.lock().unwrap(), vec!["before-1", "before-2", "after"]);
        assert!(hooks.is_empty());
    }

    #[test]
    fn phase_names_are_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            phase: StopPhase,
        }
        let parsed: Wrapper = toml::from_str("phase = \"after_stop\"").unwrap();
        assert_eq!(parsed.phase, StopPhase::AfterStop);
    }
}
