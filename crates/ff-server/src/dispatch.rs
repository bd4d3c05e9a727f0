use crate::autotest::{run_auto_test, TestRunner};
use ff_core::build_event::{BuildResult, BuildStatus};
use ff_core::jenkins_config::ListenerConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

/// Callback invoked with the normalized build. An `Err` is logged and
/// otherwise ignored.
pub type BuildHandler = Arc<dyn Fn(BuildResult) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Any completed build, invoked before the status-specific handler.
    Complete,
    Success,
    Failure,
    Unstable,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Complete => "complete",
            EventKind::Success => "success",
            EventKind::Failure => "failure",
            EventKind::Unstable => "unstable",
        }
    }

    /// The status-specific slot for a build outcome. ABORTED, NOT_BUILT and
    /// unknown statuses have none.
    pub fn for_status(status: Option<BuildStatus>) -> Option<EventKind> {
        match status? {
            BuildStatus::Success => Some(EventKind::Success),
            BuildStatus::Failure => Some(EventKind::Failure),
            BuildStatus::Unstable => Some(EventKind::Unstable),
            BuildStatus::Aborted | BuildStatus::NotBuilt | BuildStatus::Unknown => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// One optional handler per `EventKind`. Registering again replaces the
/// previous handler.
///
/// Requests read a snapshot of the slot when they reach it, so a handler
/// registered while an event is in flight may or may not see that event.
#[derive(Default)]
pub struct HandlerRegistry {
    slots: RwLock<HashMap<EventKind, BuildHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async closure for `kind`.
    pub fn on<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(BuildResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed: BuildHandler = Arc::new(move |result| handler(result).boxed());
        self.set(kind, boxed);
    }

    pub fn set(&self, kind: EventKind, handler: BuildHandler) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, handler);
    }

    pub fn get(&self, kind: EventKind) -> Option<BuildHandler> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.get(kind).is_some()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What happened while dispatching one completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that ran, in invocation order.
    pub invoked: Vec<EventKind>,
    /// Handlers that returned an error or panicked.
    pub failed: Vec<EventKind>,
    /// `Some(passed)` when the auto-test command ran.
    pub auto_test: Option<bool>,
}

/// Run the handler chain for a completed build: the completion handler,
/// then the status handler, then (SUCCESS only) the auto-test command.
///
/// Each step is awaited before the next. Handler failures never escape.
pub async fn dispatch(
    result: &BuildResult,
    registry: &HandlerRegistry,
    config: &ListenerConfig,
    runner: &dyn TestRunner,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    invoke(registry, EventKind::Complete, result, &mut report).await;

    let label = result.label();
    match result.build.status {
        Some(BuildStatus::Success) => tracing::info!("Build {label} succeeded"),
        Some(BuildStatus::Failure) => tracing::error!("Build {label} failed"),
        Some(BuildStatus::Unstable) => tracing::warn!("Build {label} unstable"),
        _ => tracing::info!("Build {label}: {}", result.status_str()),
    }

    if let Some(kind) = EventKind::for_status(result.build.status) {
        invoke(registry, kind, result, &mut report).await;
    }

    if result.build.status == Some(BuildStatus::Success) {
        if let Some(command) = config.auto_test_command() {
            report.auto_test = Some(run_auto_test(runner, command, result).await);
        }
    }

    report
}

async fn invoke(
    registry: &HandlerRegistry,
    kind: EventKind,
    result: &BuildResult,
    report: &mut DispatchReport,
) {
    let Some(handler) = registry.get(kind) else {
        return;
    };
    report.invoked.push(kind);

    let event = result.clone();
    let outcome = AssertUnwindSafe(async move { handler(event).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!("{kind} handler failed for {}: {e:#}", result.label());
            report.failed.push(kind);
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("{kind} handler panicked for {}: {msg}", result.label());
            report.failed.push(kind);
        }
    }
}
