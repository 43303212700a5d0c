//! HTTP server for Crimson sessions.
//!
//! Exposes a small axum application whose handlers read and write the
//! caller's session through a shared [`SessionManager`]. The server owns the
//! background eviction task for its lifetime and stops it once the listener
//! has drained.
//!
//! # Example
//!
//! ```ignore
//! use crimson_server::{Server, ServerConfig};
//! use crimson_session::{ProviderRegistry, SessionConfig, SessionManager};
//!
//! let registry = ProviderRegistry::with_builtin();
//! let manager = SessionManager::from_registry(SessionConfig::default(), &registry)?;
//! let config = ServerConfig::new().with_port(8080);
//!
//! Server::new(manager, config).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{CrimsonConfig, ServerConfig, ServerSection};
pub use error::{Result, ServerError};
pub use state::AppState;

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use crimson_session::SessionManager;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The Crimson HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server with the given session manager and configuration.
    pub fn new(manager: SessionManager, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(manager, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::session_routes());

        if self.state.config.request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router.with_state(self.state.clone())
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Bind the configured address and serve until `signal` resolves.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        self.serve(listener, signal).await
    }

    /// Serve on an already-bound listener until `signal` resolves.
    ///
    /// In-flight requests get `shutdown_timeout` to finish once the signal
    /// fires. The eviction task runs for exactly as long as this call.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local address: {}", e)))?;
        let router = self.router();
        let sweeper = self.state.manager.start_eviction();
        self.state.set_sweeper_running(true);
        let grace = self.state.config.shutdown_timeout;

        info!(%addr, "Starting server");

        let draining = Arc::new(Notify::new());
        let trigger = Arc::clone(&draining);
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Shutdown signal received, draining connections");
                trigger.notify_one();
            })
            .into_future();

        let deadline = async move {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        };

        let outcome = tokio::select! {
            result = server => {
                result.map_err(|e| ServerError::Internal(format!("Server error: {}", e)))
            }
            _ = deadline => {
                warn!(timeout_secs = grace.as_secs(), "Shutdown timeout elapsed, dropping open connections");
                Ok(())
            }
        };

        sweeper.shutdown().await;
        self.state.set_sweeper_running(false);
        info!("Server stopped");
        outcome
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
