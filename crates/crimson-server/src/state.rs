//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crimson_session::SessionManager;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager shared by every request.
    pub manager: Arc<SessionManager>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Set while the background sweeper is running.
    sweeper_running: Arc<AtomicBool>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(manager: SessionManager, config: ServerConfig) -> Self {
        Self {
            manager: Arc::new(manager),
            config: Arc::new(config),
            sweeper_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether idle sessions are currently being evicted in the background.
    pub fn sweeper_running(&self) -> bool {
        self.sweeper_running.load(Ordering::Acquire)
    }

    pub(crate) fn set_sweeper_running(&self, running: bool) {
        self.sweeper_running.store(running, Ordering::Release);
    }
}
