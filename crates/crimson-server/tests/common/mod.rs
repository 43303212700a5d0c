//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{HeaderMap, header};
use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crimson_server::{AppState, Server, ServerConfig};
use crimson_session::{EntropySource, Error, MemoryStore, SessionConfig, SessionManager};

/// Default cookie name used by the tests.
pub const COOKIE: &str = "SESSION_ID";

/// Entropy source that always fails.
pub struct BrokenEntropy;

impl EntropySource for BrokenEntropy {
    fn fill(&self, _dest: &mut [u8]) -> crimson_session::Result<()> {
        Err(Error::RandomSource("entropy pool unavailable".to_string()))
    }
}

/// Manager over a fresh in-memory store.
pub fn test_manager(config: SessionConfig) -> SessionManager {
    SessionManager::new(config, Arc::new(MemoryStore::new())).expect("valid session config")
}

/// Application state with request logging off.
pub fn test_state(manager: SessionManager) -> AppState {
    AppState::new(manager, ServerConfig::new().with_request_logging(false))
}

/// `name=value` pair from the first `Set-Cookie` header, for echoing back.
pub fn cookie_pair(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(|pair| pair.trim().to_string())
}

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client for this server.
    pub client: Client,
    /// Shared application state.
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<crimson_server::Result<()>>>,
}

impl TestServer {
    /// Start a server with the default session configuration.
    pub async fn start() -> Result<Self> {
        Self::start_with(SessionConfig::default()).await
    }

    /// Start a server with the given session configuration.
    pub async fn start_with(config: SessionConfig) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = test_state(test_manager(config));
        let server = Server::from_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// GET request builder, optionally carrying a session cookie.
    pub fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        with_cookie(self.client.get(self.url(path)), cookie)
    }

    /// PUT request builder, optionally carrying a session cookie.
    pub fn put(&self, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        with_cookie(self.client.put(self.url(path)), cookie)
    }

    /// POST request builder, optionally carrying a session cookie.
    pub fn post(&self, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        with_cookie(self.client.post(self.url(path)), cookie)
    }

    /// DELETE request builder, optionally carrying a session cookie.
    pub fn delete(&self, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        with_cookie(self.client.delete(self.url(path)), cookie)
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            timeout(Duration::from_secs(5), handle).await???;
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn with_cookie(builder: reqwest::RequestBuilder, cookie: Option<&str>) -> reqwest::RequestBuilder {
    match cookie {
        Some(pair) => builder.header(reqwest::header::COOKIE, pair),
        None => builder,
    }
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
