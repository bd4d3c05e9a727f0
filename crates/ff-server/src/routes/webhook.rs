use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use ff_core::build_event::{normalize, WebhookPayload};

use crate::dispatch::dispatch;
use crate::error::AppError;
use crate::state::ListenerState;

/// POST /webhook/jenkins: receive a Jenkins build notification.
///
/// Only COMPLETED events are dispatched; STARTED and FINALIZED are
/// acknowledged with `processed: false`. Handler and auto-test failures are
/// logged and never change the 200 acknowledgment. The handler chain runs to
/// completion even if the caller disconnects first.
pub async fn jenkins_webhook(
    State(state): State<ListenerState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let parsed = WebhookPayload::from_slice(&body)
        .and_then(|payload| normalize(&payload).map(|result| (payload, result)));
    let (payload, result) = parsed.map_err(|e| {
        tracing::error!("Failed to process webhook: {e}");
        AppError::from(e)
    })?;

    tracing::info!("Received Jenkins event: {}", result.label());
    tracing::info!(
        "Phase: {}, Status: {}",
        result.build.phase,
        result.status_str()
    );

    let processed = payload.is_completed();
    if processed {
        // Detached so a caller hanging up mid-chain does not cancel the
        // remaining handlers or the auto-test run.
        let event = result.clone();
        let task = tokio::spawn(async move {
            dispatch(
                &event,
                &state.registry,
                &state.config,
                state.runner.as_ref(),
            )
            .await
        });
        match task.await {
            Ok(report) => tracing::debug!(
                "dispatched {}: handlers={:?} failed={:?} auto_test={:?}",
                result.label(),
                report.invoked,
                report.failed,
                report.auto_test
            ),
            Err(e) => tracing::error!("Dispatch task for {} failed: {e}", result.label()),
        }
    } else {
        tracing::debug!("Ignoring {} event for {}", result.build.phase, result.label());
    }

    Ok(Json(serde_json::json!({
        "received": true,
        "processed": processed,
    })))
}
