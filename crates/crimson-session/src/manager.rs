//! Cookie-driven session manager.

use std::sync::Arc;

use http::HeaderMap;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::{SessionConfig, UnknownSidPolicy};
use crate::cookies;
use crate::error::{Error, Result};
use crate::eviction::EvictionHandle;
use crate::registry::ProviderRegistry;
use crate::session::Session;
use crate::sid::{EntropySource, OsEntropy, SessionId};
use crate::store::SharedStore;

/// Attempts at drawing an identifier that is not already live.
const MAX_SID_ATTEMPTS: usize = 4;

/// Correlates requests with sessions through a cookie.
///
/// The manager owns no session state. It decodes the request cookie, asks
/// its backend for the matching session, and writes the response cookie.
/// Start and destroy run under one manager-wide lock so concurrent requests
/// cannot interleave cookie issuance.
pub struct SessionManager {
    config: SessionConfig,
    store: SharedStore,
    entropy: Arc<dyn EntropySource>,
    lock: Mutex<()>,
}

impl SessionManager {
    /// Create a manager over an explicit backend.
    pub fn new(config: SessionConfig, store: SharedStore) -> Result<Self> {
        config.validate()?;
        info!(
            provider = %config.provider,
            cookie = %config.cookie_name,
            lifetime_secs = config.lifetime_secs,
            unknown_sid = ?config.unknown_sid,
            "Session manager ready"
        );
        Ok(Self {
            config,
            store,
            entropy: Arc::new(OsEntropy),
            lock: Mutex::new(()),
        })
    }

    /// Create a manager whose backend is resolved from `registry` by the
    /// configured provider name.
    pub fn from_registry(config: SessionConfig, registry: &ProviderRegistry) -> Result<Self> {
        let store = registry.resolve(&config.provider)?;
        Self::new(config, store)
    }

    /// Replace the entropy source used for new identifiers.
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Manager configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Backend holding the sessions.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Session for the request carrying `request` headers.
    ///
    /// Without a usable cookie a new identifier is issued and a
    /// `Set-Cookie` header is appended to `response`. A cookie naming an
    /// unknown session is handled per [`UnknownSidPolicy`].
    pub fn start_session(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<Session> {
        let _guard = self.lock.lock();

        if let Some(sid) = cookies::read_session_id(request, &self.config.cookie_name) {
            match self.config.unknown_sid {
                UnknownSidPolicy::Adopt => return Ok(Session::open(&self.store, sid)),
                UnknownSidPolicy::Reissue => {
                    if let Some(session) = Session::open_existing(&self.store, sid.clone()) {
                        return Ok(session);
                    }
                    debug!(session_id = %sid, "Rejecting cookie for unknown session");
                }
            }
        }

        let sid = self.fresh_sid()?;
        let value = cookies::header_value(&cookies::session_cookie(
            &self.config.cookie_name,
            &sid,
            self.max_age(),
        ))?;
        let session = Session::create(&self.store, sid);
        cookies::append_set_cookie(response, value);
        debug!(session_id = %session.id(), "Issued new session");
        Ok(session)
    }

    /// Destroy the request's session and expire its cookie.
    ///
    /// Does nothing without a session cookie. Returns whether a live session
    /// was removed.
    pub fn destroy_session(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<bool> {
        let _guard = self.lock.lock();

        let Some(sid) = cookies::read_session_id(request, &self.config.cookie_name) else {
            return Ok(false);
        };
        let value = cookies::header_value(&cookies::removal_cookie(&self.config.cookie_name))?;
        let removed = self.store.destroy(&sid);
        cookies::append_set_cookie(response, value);
        debug!(session_id = %sid, removed, "Session cookie expired");
        Ok(removed)
    }

    /// Run one eviction pass with the configured lifetime.
    pub fn sweep_now(&self) -> usize {
        self.store.sweep(self.config.lifetime())
    }

    /// Start periodic eviction on the current tokio runtime.
    ///
    /// Every configured lifetime, sessions idle for longer than that
    /// lifetime are evicted. The sweeper runs until the handle is shut down
    /// or dropped.
    pub fn start_eviction(&self) -> EvictionHandle {
        EvictionHandle::spawn(Arc::clone(&self.store), self.config.lifetime())
    }

    fn max_age(&self) -> i64 {
        i64::try_from(self.config.lifetime_secs).unwrap_or(i64::MAX)
    }

    fn fresh_sid(&self) -> Result<SessionId> {
        for _ in 0..MAX_SID_ATTEMPTS {
            let sid = SessionId::generate(self.entropy.as_ref()).inspect_err(|e| {
                error!(error = %e, "Failed to generate session id");
            })?;
            if !self.store.contains(&sid) {
                return Ok(sid);
            }
            error!("Generated session id collides with a live session");
        }
        Err(Error::RandomSource(format!(
            "no unused session id after {MAX_SID_ATTEMPTS} attempts"
        )))
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("live", &self.store.len())
            .finish()
    }
}
