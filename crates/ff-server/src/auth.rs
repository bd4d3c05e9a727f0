use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ff_core::jenkins_config::ListenerConfig;

pub const TOKEN_HEADER: &str = "x-jenkins-token";

/// Axum middleware that admits a request only if it passes the listener's
/// IP allowlist and shared-secret checks.
///
/// Evaluated in order, each check short-circuiting:
/// 1. `allowedIPs` non-empty and the client address contains none of the
///    fragments → 403
/// 2. `secret` set and the presented token is neither `secret` nor
///    `Bearer secret` → 401
///
/// With neither configured every request passes.
pub async fn security_gate(
    State(config): State<Arc<ListenerConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let client_ip = client_address(&req);

    if !config.allowed_ips.is_empty() && !ip_allowed(&config.allowed_ips, &client_ip) {
        tracing::warn!("Rejected request from unauthorized IP: {client_ip}");
        return reject(StatusCode::FORBIDDEN, "Forbidden - IP not whitelisted");
    }

    if let Some(secret) = config.secret() {
        if !token_matches(presented_token(req.headers()), secret) {
            tracing::warn!("Rejected request with invalid token");
            return reject(StatusCode::UNAUTHORIZED, "Unauthorized - Invalid token");
        }
    }

    tracing::debug!("{} {} from {client_ip}", req.method(), req.uri().path());
    next.run(req).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// First `x-forwarded-for` hop if a proxy supplied one, else the socket peer.
/// The header is taken as sent; nothing verifies it came from a proxy.
fn client_address(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn ip_allowed(allowed: &[String], client_ip: &str) -> bool {
    allowed.iter().any(|fragment| client_ip.contains(fragment.as_str()))
}

/// `x-jenkins-token`, falling back to `authorization` when absent or empty.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };
    header(TOKEN_HEADER).or_else(|| header("authorization"))
}

fn token_matches(presented: Option<&str>, secret: &str) -> bool {
    match presented {
        Some(token) => {
            token == secret || token.strip_prefix("Bearer ").is_some_and(|t| t == secret)
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
