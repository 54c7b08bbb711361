use crate::prelude::*;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;

/// HTTP endpoint exposing the registry in the Prometheus text format.
///
/// Scrapes only read the registry; they never trigger a poll, so a scrape
/// returns whatever the last successful cycle published.
pub struct Server {
    config: config::Exporter,
    metrics: MetricsRegistry,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Server {
    pub fn new(config: config::Exporter, metrics: MetricsRegistry, shutdown_rx: broadcast::Receiver<()>) -> Self {
        Self {
            config,
            metrics,
            shutdown_rx,
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.listen_address(), self.config.listen_port());
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding metrics listener on {}", addr))?;

        self.serve(listener).await
    }

    /// Serves on an already bound listener until shutdown is signalled.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("serving metrics on http://{}/metrics", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_rx;
        // stop accepting on shutdown, let in-flight scrapes finish
        axum::serve(listener, router(self.metrics))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("metrics server shutting down");
            })
            .await?;

        Ok(())
    }
}

/// `GET /metrics`; anything else is a 404.
pub fn router(metrics: MetricsRegistry) -> Router {
    Router::new().route("/metrics", get(metrics_handler)).with_state(metrics)
}

async fn metrics_handler(State(metrics): State<MetricsRegistry>) -> Response {
    match metrics.gather_text() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, metrics.format_type())], body).into_response(),
        Err(err) => {
            error!("encoding metrics: {:?}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
