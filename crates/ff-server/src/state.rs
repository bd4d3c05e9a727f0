use crate::autotest::{ProcessRunner, TestRunner};
use crate::dispatch::HandlerRegistry;
use ff_core::jenkins_config::ListenerConfig;
use std::sync::Arc;

/// Shared listener state passed to all route handlers.
#[derive(Clone)]
pub struct ListenerState {
    pub config: Arc<ListenerConfig>,
    pub registry: Arc<HandlerRegistry>,
    pub runner: Arc<dyn TestRunner>,
}

impl ListenerState {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(HandlerRegistry::new()),
            runner: Arc::new(ProcessRunner::new()),
        }
    }

    /// Builder: replace the auto-test runner.
    pub fn with_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.runner = runner;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::EventKind;

    #[test]
    fn new_state_stores_config() {
        let state = ListenerState::new(ListenerConfig::new(9100));
        assert_eq!(state.config.port, 9100);
    }

    #[test]
    fn each_state_gets_its_own_registry() {
        let a = ListenerState::new(ListenerConfig::default());
        let b = ListenerState::new(ListenerConfig::default());
        a.registry.on(EventKind::Success, |_| async { Ok(()) });
        assert!(a.registry.is_registered(EventKind::Success));
        assert!(!b.registry.is_registered(EventKind::Success));
    }

    #[test]
    fn clones_share_registry() {
        let a = ListenerState::new(ListenerConfig::default());
        let b = a.clone();
        a.registry.on(EventKind::Failure, |_| async { Ok(()) });
        assert!(b.registry.is_registered(EventKind::Failure));
    }
}
