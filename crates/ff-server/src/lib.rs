pub mod auth;
pub mod autotest;
pub mod dispatch;
pub mod error;
pub mod routes;
pub mod state;

pub use autotest::{ProcessRunner, TestInvocation, TestReport, TestRunner};
pub use dispatch::{BuildHandler, DispatchReport, EventKind, HandlerRegistry};
pub use error::{AutoTestError, ServerError};
pub use state::ListenerState;

use axum::routing::{get, post};
use axum::{middleware, Router};
use ff_core::build_event::BuildResult;
use ff_core::jenkins_config::ListenerConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Build the axum Router with the webhook routes and security gate.
/// Used by `WebhookServer::start()` and available for integration testing.
pub fn build_router(state: ListenerState) -> Router {
    let gate = middleware::from_fn_with_state(state.config.clone(), auth::security_gate);

    Router::new()
        .route("/health", get(routes::health::health).fallback(routes::not_found))
        .route(
            "/webhook/jenkins",
            post(routes::webhook::jenkins_webhook).fallback(routes::not_found),
        )
        .fallback(routes::not_found)
        .layer(gate)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerLifecycleState {
    Stopped,
    Starting,
    Listening,
    Stopping,
}

#[derive(Default)]
struct Running {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

/// Jenkins webhook listener: owns the socket and the handler registry.
///
/// `start` and `stop` serialize on an internal lock, so a `stop` issued from
/// a signal handler while `start` is still binding waits for the bind to
/// settle and then shuts the listener down.
pub struct WebhookServer {
    state: ListenerState,
    running: Mutex<Running>,
    status: watch::Sender<ServerLifecycleState>,
}

impl WebhookServer {
    pub fn new(config: ListenerConfig) -> Self {
        Self::from_state(ListenerState::new(config))
    }

    pub fn from_state(state: ListenerState) -> Self {
        let (status, _) = watch::channel(ServerLifecycleState::Stopped);
        Self {
            state,
            running: Mutex::new(Running::default()),
            status,
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.state.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.state.registry
    }

    pub fn state(&self) -> ServerLifecycleState {
        *self.status.borrow()
    }

    /// Address the listener is bound to while `Listening`.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.local_addr
    }

    /// Register a handler. Replaces any handler already registered for `kind`.
    pub fn on<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(BuildResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.state.registry.on(kind, handler);
    }

    /// Bind `0.0.0.0:<port>` and start serving. Resolves once the socket is
    /// accepting connections.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;
        if self.state() != ServerLifecycleState::Stopped {
            return Err(ServerError::AlreadyRunning);
        }
        self.status.send_replace(ServerLifecycleState::Starting);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.port));
        let bound = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(pair) => pair,
            Err(source) => {
                self.status.send_replace(ServerLifecycleState::Stopped);
                return Err(ServerError::Bind { addr, source });
            }
        };

        let app = build_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await;
            if let Err(e) = result {
                tracing::error!("Jenkins webhook server error: {e}");
            }
        });

        running.shutdown_tx = Some(shutdown_tx);
        running.handle = Some(handle);
        running.local_addr = Some(local_addr);
        self.status.send_replace(ServerLifecycleState::Listening);

        self.log_startup(local_addr);
        Ok(local_addr)
    }

    /// Gracefully close the listener, letting in-flight requests finish.
    /// Returns immediately when already stopped.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if self.state() == ServerLifecycleState::Stopped {
            return;
        }
        self.status.send_replace(ServerLifecycleState::Stopping);

        if let Some(tx) = running.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = running.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Jenkins webhook server task failed: {e}");
            }
        }
        running.local_addr = None;

        self.status.send_replace(ServerLifecycleState::Stopped);
        tracing::info!("Jenkins webhook server stopped");
    }

    fn log_startup(&self, local_addr: SocketAddr) {
        let config = &self.state.config;
        let port = local_addr.port();
        tracing::info!("Jenkins webhook server listening on port {port}");
        tracing::info!("Webhook URL: http://localhost:{port}/webhook/jenkins");
        if !config.allowed_ips.is_empty() {
            tracing::info!("IP whitelist: {}", config.allowed_ips.join(", "));
        }
        if config.secret().is_some() {
            tracing::info!("Token authentication: enabled");
        }
        if let Some(cmd) = config.auto_test_command() {
            tracing::info!("Auto-test command: {cmd}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let target = SocketAddr::from(([127, 0, 0, 1], addr.port()));
        let mut stream = tokio::net::TcpStream::connect(target).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn start_binds_and_stop_returns_to_stopped() {
        let server = WebhookServer::new(ListenerConfig::new(0));
        assert_eq!(server.state(), ServerLifecycleState::Stopped);

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.state(), ServerLifecycleState::Listening);
        assert_eq!(server.local_addr().await, Some(addr));

        server.stop().await;
        assert_eq!(server.state(), ServerLifecycleState::Stopped);
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let server = WebhookServer::new(ListenerConfig::new(0));
        server.stop().await;
        server.start().await.unwrap();
        server.stop().await;
        server.stop().await;
        assert_eq!(server.state(), ServerLifecycleState::Stopped);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let server = WebhookServer::new(ListenerConfig::new(0));
        server.start().await.unwrap();
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning));
        server.stop().await;
    }

    #[tokio::test]
    async fn occupied_port_fails_with_bind_error() {
        let blocker = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        let server = WebhookServer::new(ListenerConfig::new(port));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert_eq!(server.state(), ServerLifecycleState::Stopped);
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let server = WebhookServer::new(ListenerConfig::new(0));
        server.start().await.unwrap();
        server.stop().await;
        server.start().await.unwrap();
        assert_eq!(server.state(), ServerLifecycleState::Listening);
        server.stop().await;
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let server = WebhookServer::new(ListenerConfig::new(0));
        let addr = server.start().await.unwrap();

        let response = raw_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"status\":\"ok\""));

        server.stop().await;
    }

    #[tokio::test]
    async fn allowlist_checks_socket_peer() {
        let mut config = ListenerConfig::new(0);
        config.allowed_ips = vec!["10.99.".into()];
        let server = WebhookServer::new(config);
        let addr = server.start().await.unwrap();

        let response = raw_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 403"), "{response}");

        server.stop().await;
    }

    #[tokio::test]
    async fn loopback_allowlist_admits_local_peer() {
        let mut config = ListenerConfig::new(0);
        config.allowed_ips = vec!["127.0.0.1".into()];
        let server = WebhookServer::new(config);
        let addr = server.start().await.unwrap();

        let response = raw_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");

        server.stop().await;
    }

    #[tokio::test]
    async fn handler_chain_survives_client_disconnect() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let server = WebhookServer::new(ListenerConfig::new(0));
        server.on(EventKind::Complete, |_| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        });
        let success_ran = Arc::new(AtomicBool::new(false));
        let flag = success_ran.clone();
        server.on(EventKind::Success, move |_| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        let addr = server.start().await.unwrap();

        let body = serde_json::json!({
            "name": "build-1",
            "build": { "number": 42, "phase": "COMPLETED", "status": "SUCCESS", "full_url": "http://ci/j/1" }
        })
        .to_string();
        let request = format!(
            "POST /webhook/jenkins HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let target = SocketAddr::from(([127, 0, 0, 1], addr.port()));
        let mut stream = tokio::net::TcpStream::connect(target).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(stream);

        for _ in 0..30 {
            if success_ran.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(success_ran.load(Ordering::SeqCst));

        server.stop().await;
    }

    #[test]
    fn on_registers_in_shared_registry() {
        let server = WebhookServer::new(ListenerConfig::default());
        server.on(EventKind::Success, |_| async { Ok(()) });
        assert!(server.registry().is_registered(EventKind::Success));
        assert!(!server.registry().is_registered(EventKind::Failure));
    }
}
