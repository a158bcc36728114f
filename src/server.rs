use axum::{http::StatusCode, response::Html, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::api;
use crate::api::state::AppState;
use crate::catalog::Catalog;
use crate::error::ArtQueryError;

pub struct WebServer {
    host: String,
    port: u16,
}

impl WebServer {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    pub async fn start(&self, catalog: Catalog) -> Result<(), ArtQueryError> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ArtQueryError::Error(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ArtQueryError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        println!("artquery server starting on http://{}", addr);
        println!("   Serving {} arts", catalog.len());

        serve(listener, AppState::new(catalog), shutdown_signal()).await?;

        println!("   Server stopped");
        Ok(())
    }
}

/// Serves the API on an already bound listener until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ArtQueryError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    log::info!("Server ready to handle requests");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("Shutdown signal received, stopping server");
        })
        .await
        .map_err(|e| ArtQueryError::Error(format!("Server error: {}", e)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Search endpoint
        .route(
            "/api/v1/arts",
            get(api::arts::find_many_get).post(api::arts::find_many_post),
        )
        .with_state(state)
}

async fn health_check() -> Result<(StatusCode, Html<String>), StatusCode> {
    Ok((
        StatusCode::OK,
        Html("<h1>artquery</h1><p>Server is running</p>".to_string()),
    ))
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            log::info!("Received SIGTERM");
        },
    }
}
