//! API server lifecycle: bind, spawn the axum server in a background task,
//! return a handle with a shutdown channel.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve `app` until [`ApiServer::shutdown`] is called.
pub async fn start_server(app: Router, addr: SocketAddr) -> std::io::Result<ApiServer> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::api::{api_router, AppState};
    use crate::pipeline::testing::happy_collaborators;
    use crate::pipeline::{AnalysisPipeline, PipelineSettings};

    fn test_app() -> Router {
        let state = AppState::new(AnalysisPipeline::new(
            happy_collaborators(),
            PipelineSettings::default(),
        ));
        api_router(state, "http://localhost:5173")
    }

    async fn start() -> ApiServer {
        start_server(test_app(), SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .expect("server should start")
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start().await;
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let mut server = start().await;
        let url = format!("http://{}/nonexistent", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        server.shutdown();
    }

    #[tokio::test]
    async fn analyze_streams_over_http() {
        let mut server = start().await;
        let body = reqwest::Client::new()
            .post(format!("http://{}/api/analyze", server.addr))
            .json(&serde_json::json!({"description": "12mm boss"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("event: analysis_complete"));
        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start().await;
        server.shutdown();
        server.shutdown();
        server.stopped().await;
    }
}
