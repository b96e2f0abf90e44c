//! API server: router assembly, listener and background sweeper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;

use adaudit_config::Config;
use adaudit_orchestrator::AuditOrchestrator;
use adaudit_utils::error::AuditError;

use crate::routes;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: AuditOrchestrator,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: AuditOrchestrator, config: &Config) -> Self {
        Self {
            orchestrator,
            default_page_size: config.default_page_size(),
            max_page_size: config.max_page_size(),
        }
    }
}

/// The adaudit HTTP server.
#[derive(Debug)]
pub struct ApiServer {
    config: Config,
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(config: Config, orchestrator: AuditOrchestrator) -> Self {
        let state = Arc::new(AppState::new(orchestrator, &config));
        Self { config, state }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> Router {
        routes::routes().with_state(Arc::clone(&self.state))
    }

    /// Bind, start the staleness sweeper when a threshold is configured,
    /// and serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is invalid, the port cannot be
    /// bound, or the server fails.
    pub async fn serve(self) -> Result<(), AuditError> {
        let addr: SocketAddr = self.config.bind().parse().map_err(|err| {
            AuditError::invalid_argument(format!("invalid bind address '{}': {err}", self.config.bind()))
        })?;

        let sweeper = self.config.stale_after().map(|threshold| {
            spawn_stale_sweeper(
                self.state.orchestrator.clone(),
                self.config.sweep_interval(),
                threshold,
            )
        });

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| AuditError::internal(format!("failed to bind to {addr}: {err}")))?;
        tracing::info!(
            bind = %addr,
            materials = self.state.orchestrator.materials()?.len(),
            "Starting adaudit API server"
        );

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| AuditError::internal(format!("server error: {err}")));

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        let unresolved = self.state.orchestrator.pending_resolutions();
        if unresolved > 0 {
            tracing::warn!(unresolved, "Shutting down with resolutions still scheduled");
        }
        result
    }
}

/// Run [`AuditOrchestrator::sweep_stale`] every `interval`.
pub fn spawn_stale_sweeper(
    orchestrator: AuditOrchestrator,
    interval: Duration,
    threshold: Duration,
) -> JoinHandle<()> {
    tracing::info!(
        interval_secs = interval.as_secs(),
        threshold_secs = threshold.as_secs(),
        "Staleness sweeper enabled"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match orchestrator.sweep_stale() {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(count = expired.len(), "Expired stale audit tasks");
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "Staleness sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_orchestrator::FixedVerdictProvider;
    use adaudit_orchestrator::test_support::manual_orchestrator;
    use adaudit_utils::types::Verdict;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::envelope::Envelope;
    use crate::routes::HealthResponse;

    #[tokio::test]
    async fn test_health_endpoint() -> Result<()> {
        let config = Config::minimal_for_testing();
        let (orchestrator, _scheduler) =
            manual_orchestrator(&config, Arc::new(FixedVerdictProvider::new(Verdict::Passed)));
        let router = ApiServer::new(config, orchestrator).router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .context("build request")?;
        let response = router.oneshot(request).await.map_err(|err| match err {})?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let envelope: Envelope<HealthResponse> =
            serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.data.map(|h| h.status).as_deref(), Some("ok"));
        Ok(())
    }

    #[tokio::test]
    async fn test_sweeper_expires_pending_tasks() {
        let config = Config::builder()
            .delay_window(Duration::from_secs(600), Duration::from_secs(600))
            .stale_after(Duration::from_secs(1))
            .build()
            .unwrap();
        let (orchestrator, scheduler) =
            manual_orchestrator(&config, Arc::new(FixedVerdictProvider::new(Verdict::Passed)));
        let task_id = orchestrator
            .submit_audit("acct-1", "42", adaudit_utils::types::OperationKind::Single)
            .unwrap()
            .task_id;
        scheduler.advance(Duration::from_secs(2));

        let handle = spawn_stale_sweeper(
            orchestrator.clone(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );
        for _ in 0..100 {
            if orchestrator.task(task_id).unwrap().status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(
            orchestrator.task(task_id).unwrap().status,
            adaudit_utils::types::TaskStatus::Failed
        );
    }
}
