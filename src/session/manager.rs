//! Session orchestration.
//!
//! `SessionManager` owns the session record and is the only component that
//! mutates it. It drives the login/refresh/expiry/logout cycle, arms the
//! refresh timer, reacts to 401s observed by the transport guard, and
//! remembers where the user should return after re-authenticating.

use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::{DeviceIdentity, HostSignals, SignalSource};
use crate::models::{LoginCredentials, User, ADMIN_ROLE};
use crate::session::scheduler::RefreshScheduler;
use crate::session::state::{SessionState, SessionStatus, TokenSet};
use crate::storage::{keys, FileStorage, Storage};
use crate::transport::wire::{redact, AuthOutcome};
use crate::transport::{NavigationEvent, TransportGuard};

pub struct SessionManager {
    inner: Arc<ManagerInner>,
    nav_rx: Mutex<Option<mpsc::UnboundedReceiver<NavigationEvent>>>,
}

pub(crate) struct ManagerInner {
    config: AuthConfig,
    guard: TransportGuard,
    state: RwLock<SessionState>,
    storage: Arc<dyn Storage>,
    identity: Arc<DeviceIdentity>,
    scheduler: RefreshScheduler,
}

impl SessionManager {
    /// Build a manager over explicit storage and signal-source
    /// implementations. Tokens persisted by a previous process are
    /// rehydrated so a profile probe can succeed without a fresh login.
    pub fn new(
        config: AuthConfig,
        storage: Arc<dyn Storage>,
        signals: Arc<dyn SignalSource>,
    ) -> Result<Self> {
        let identity = Arc::new(DeviceIdentity::new(signals, storage.clone()));
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        let guard = TransportGuard::new(identity.clone(), nav_tx)?;

        let mut state = SessionState::new();
        state.access_token = storage.get(keys::ACCESS_TOKEN);
        state.refresh_token = storage.get(keys::REFRESH_TOKEN);
        state.csrf_token = storage.get(keys::CSRF_TOKEN);

        if let (Some(access), Some(csrf)) = (&state.access_token, &state.csrf_token) {
            guard.set_session_headers(access, csrf);
        }

        let inner = Arc::new(ManagerInner {
            config,
            guard,
            state: RwLock::new(state),
            storage,
            identity,
            scheduler: RefreshScheduler::new(),
        });

        // The 401 hook is the transport's way into the session: it clears
        // local state only, never calls the remote logout endpoint, so an
        // expired session cannot trigger recursive 401s.
        let weak = Arc::downgrade(&inner);
        inner.guard.set_unauthorized_hook(Arc::new(move || {
            weak.upgrade()
                .map(|inner| inner.invalidate_local(SessionStatus::Unauthenticated))
                .unwrap_or(false)
        }));

        Ok(Self {
            inner,
            nav_rx: Mutex::new(Some(nav_rx)),
        })
    }

    /// Manager with file-backed storage and host signals, configured from
    /// the environment.
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            AuthConfig::from_env(),
            Arc::new(FileStorage::open_default()?),
            Arc::new(HostSignals),
        )
    }

    /// Authenticate against the remote login endpoint.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` on rejection with the
    /// server message available via `last_error`. Concurrent calls are not
    /// serialized; the last resumption wins.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<bool> {
        self.inner.state.write().unwrap().error = None;

        debug!(username = %credentials.username, "sending login request");
        let outcome: Result<AuthOutcome, AuthError> = self
            .inner
            .guard
            .post_json(&self.inner.config.login_url(), credentials)
            .await;

        match outcome {
            Ok(res) if res.success => {
                let Some(tokens) = res.token_set() else {
                    warn!("login reported success but response is missing tokens");
                    self.inner
                        .state
                        .write()
                        .unwrap()
                        .apply_login_failure("Malformed login response".to_string());
                    return Ok(false);
                };

                self.inner.install_tokens(&tokens);

                // Most servers return the profile inline; probe for it if
                // this one did not.
                let user = match res.profile {
                    Some(user) => user,
                    None => match self.inner.fetch_profile().await {
                        Ok(user) => user,
                        Err(err) => {
                            warn!(error = %err, "profile fetch after login failed");
                            self.inner.invalidate_local(SessionStatus::Anonymous);
                            self.inner
                                .state
                                .write()
                                .unwrap()
                                .apply_login_failure("Login failed. Please try again.".to_string());
                            return Ok(false);
                        }
                    },
                };

                info!(
                    username = %user.username,
                    access = %redact(&tokens.access),
                    "login succeeded"
                );

                let ttl = tokens.expires_in;
                self.inner.state.write().unwrap().apply_login(user, tokens);
                self.arm_refresh(ttl);
                Ok(true)
            }
            Ok(res) => {
                let message = res.message.unwrap_or_else(|| "Login failed".to_string());
                debug!(message = %message, "login rejected");
                self.inner.state.write().unwrap().apply_login_failure(message);
                Ok(false)
            }
            Err(err) => {
                warn!(error = %err, "login request failed");
                self.inner
                    .state
                    .write()
                    .unwrap()
                    .apply_login_failure("Login failed. Please try again.".to_string());
                Ok(false)
            }
        }
    }

    /// Whether the session is valid. The first call in a check cycle
    /// probes the profile endpoint with ambient credentials; subsequent
    /// calls return the cached answer until logout, a 401, or a refresh
    /// failure resets the cycle.
    pub async fn is_authenticated(&self) -> bool {
        {
            let state = self.inner.state.read().unwrap();
            if state.checked {
                return state.is_authenticated_now();
            }
        }
        self.probe().await
    }

    async fn probe(&self) -> bool {
        {
            let mut state = self.inner.state.write().unwrap();
            if state.access_token.is_none() {
                // Nothing to probe with; cache the negative answer
                state.checked = true;
                return false;
            }
            state.status = SessionStatus::Checking;
        }

        match self.inner.fetch_profile().await {
            Ok(user) => {
                debug!(username = %user.username, "profile probe succeeded");
                let ttl = {
                    let mut state = self.inner.state.write().unwrap();
                    state.apply_profile(user);
                    state.expires_in
                };
                self.arm_refresh(ttl);
                true
            }
            Err(AuthError::Unauthorized) => {
                // The transport hook already invalidated and signalled
                false
            }
            Err(err) => {
                warn!(error = %err, "profile probe failed");
                let mut state = self.inner.state.write().unwrap();
                state.status = SessionStatus::Unauthenticated;
                state.checked = true;
                false
            }
        }
    }

    /// End the session. The remote endpoint is notified best-effort; local
    /// invalidation happens regardless of the outcome.
    pub async fn logout(&self) {
        let has_session = self.inner.state.read().unwrap().access_token.is_some();
        if has_session {
            let result: Result<serde_json::Value, AuthError> = self
                .inner
                .guard
                .post_json(&self.inner.config.logout_url(), &serde_json::json!({}))
                .await;
            if let Err(err) = result {
                warn!(error = %err, "logout request failed, clearing local session anyway");
            }
        }
        self.inner.invalidate_local(SessionStatus::Anonymous);
        info!("logged out");
    }

    /// Arm (or re-arm) the refresh timer for the current credential TTL.
    fn arm_refresh(&self, ttl_secs: u64) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(ttl_secs, move || {
            let weak = weak.clone();
            async move {
                let inner = weak.upgrade()?;
                match inner.refresh_session().await {
                    Ok(next_ttl) => Some(next_ttl),
                    Err(err) => {
                        warn!(error = %err, "token refresh failed, invalidating session");
                        inner.invalidate_local(SessionStatus::Unauthenticated);
                        None
                    }
                }
            }
        });
    }

    // ===== Redirect path memory =====

    /// Record the navigation target that required authentication.
    pub fn save_redirect_path(&self, path: &str) {
        debug!(path, "saving redirect path");
        self.inner.state.write().unwrap().redirect_path = Some(path.to_string());
    }

    /// Return the saved redirect path and clear it.
    pub fn consume_redirect_path(&self) -> Option<String> {
        self.inner.state.write().unwrap().redirect_path.take()
    }

    /// Route to resume after a successful login: the saved redirect path,
    /// or the configured landing route.
    pub fn post_login_destination(&self) -> String {
        self.consume_redirect_path()
            .unwrap_or_else(|| self.inner.config.landing_route.clone())
    }

    // ===== Read-only derived views =====

    pub fn current_user(&self) -> Option<User> {
        self.inner.state.read().unwrap().user.clone()
    }

    pub fn user_roles(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .unwrap()
            .user
            .as_ref()
            .map(|u| u.roles.clone())
            .unwrap_or_default()
    }

    pub fn has_permission(&self, role: &str) -> bool {
        self.inner
            .state
            .read()
            .unwrap()
            .user
            .as_ref()
            .is_some_and(|u| u.has_role(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_permission(ADMIN_ROLE)
    }

    /// Message from the most recent rejected login, if any.
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.read().unwrap().error.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.read().unwrap().status.clone()
    }

    pub fn device_id(&self) -> String {
        self.inner.identity.id()
    }

    /// The transport used for all requests. External collaborators route
    /// their ordinary API calls through this so a 401 anywhere invalidates
    /// the session.
    pub fn transport(&self) -> &TransportGuard {
        &self.inner.guard
    }

    /// Take the navigation-signal receiver. The router collaborator calls
    /// this once and transitions to the login view on each event.
    pub fn navigation_events(&self) -> Option<mpsc::UnboundedReceiver<NavigationEvent>> {
        self.nav_rx.lock().unwrap().take()
    }

    #[cfg(test)]
    pub(crate) fn refresh_armed(&self) -> bool {
        self.inner.scheduler.is_armed()
    }
}

impl ManagerInner {
    async fn fetch_profile(&self) -> Result<User, AuthError> {
        self.guard.get_json(&self.config.profile_url()).await
    }

    /// Call the remote refresh endpoint with the refresh token and rotate
    /// the credential set. Returns the new TTL for the scheduler.
    async fn refresh_session(&self) -> Result<u64, AuthError> {
        let refresh_token = self
            .state
            .read()
            .unwrap()
            .refresh_token
            .clone()
            .ok_or(AuthError::Unauthorized)?;

        let outcome: AuthOutcome = self
            .guard
            .post_json_with_bearer(
                &self.config.refresh_url(),
                &serde_json::json!({}),
                &refresh_token,
            )
            .await?;

        if !outcome.success {
            return Err(AuthError::InvalidResponse(
                "refresh rejected by server".to_string(),
            ));
        }
        let tokens = outcome.token_set().ok_or_else(|| {
            AuthError::InvalidResponse("refresh response missing tokens".to_string())
        })?;

        debug!(access = %redact(&tokens.access), "session tokens rotated");
        self.state.write().unwrap().apply_refresh(tokens.clone());
        self.install_tokens(&tokens);
        Ok(tokens.expires_in)
    }

    /// Bind the credential set to outgoing requests and persist it. The
    /// three entries are independent writes; persistence failures are
    /// logged, never fatal.
    fn install_tokens(&self, tokens: &TokenSet) {
        self.guard.set_session_headers(&tokens.access, &tokens.csrf);
        for (key, value) in [
            (keys::ACCESS_TOKEN, &tokens.access),
            (keys::REFRESH_TOKEN, &tokens.refresh),
            (keys::CSRF_TOKEN, &tokens.csrf),
        ] {
            if let Err(err) = self.storage.set(key, value) {
                warn!(key, error = %err, "failed to persist session entry");
            }
        }
    }

    /// The local half of logout: clear state, headers, and persisted
    /// tokens, then cancel the refresh timer. Returns whether a live
    /// session was actually cleared. The timer stop comes last because
    /// this can run inside the refresh task itself.
    fn invalidate_local(&self, status: SessionStatus) -> bool {
        let was_live = {
            let mut state = self.state.write().unwrap();
            let live = state.has_live_session();
            state.invalidate(status);
            live
        };

        self.guard.clear_session_headers();
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::CSRF_TOKEN] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "failed to clear session entry");
            }
        }
        self.scheduler.stop();
        was_live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    struct StubSignals;

    impl SignalSource for StubSignals {
        fn stable_signals(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["os:test".into(), "cpus:2".into()])
        }
    }

    fn test_manager() -> SessionManager {
        SessionManager::new(
            AuthConfig::default(),
            Arc::new(MemoryStorage::new()),
            Arc::new(StubSignals),
        )
        .unwrap()
    }

    #[test]
    fn test_redirect_path_is_consumed_once() {
        let manager = test_manager();
        manager.save_redirect_path("/profile");

        assert_eq!(manager.consume_redirect_path().as_deref(), Some("/profile"));
        assert!(manager.consume_redirect_path().is_none());
    }

    #[test]
    fn test_post_login_destination_defaults_to_landing_route() {
        let manager = test_manager();
        assert_eq!(manager.post_login_destination(), "/dashboard");

        manager.save_redirect_path("/profile");
        assert_eq!(manager.post_login_destination(), "/profile");
        // Consumed: the default applies again
        assert_eq!(manager.post_login_destination(), "/dashboard");
    }

    #[test]
    fn test_views_are_empty_before_login() {
        let manager = test_manager();
        assert!(manager.current_user().is_none());
        assert!(manager.user_roles().is_empty());
        assert!(!manager.is_admin());
        assert!(!manager.has_permission("viewer"));
        assert!(manager.last_error().is_none());
        assert_eq!(manager.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn test_device_id_is_stable_across_calls() {
        let manager = test_manager();
        let first = manager.device_id();
        assert_eq!(first.len(), 8);
        assert_eq!(manager.device_id(), first);
    }

    #[tokio::test]
    async fn test_arm_refresh_replaces_prior_timer() {
        let manager = test_manager();
        manager.arm_refresh(100);
        manager.arm_refresh(100);
        assert!(manager.refresh_armed());

        manager.inner.scheduler.stop();
        assert!(!manager.refresh_armed());
    }

    #[test]
    fn test_navigation_receiver_is_taken_once() {
        let manager = test_manager();
        assert!(manager.navigation_events().is_some());
        assert!(manager.navigation_events().is_none());
    }

    #[test]
    fn test_persisted_tokens_are_rehydrated() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(keys::ACCESS_TOKEN, "acc-1").unwrap();
        storage.set(keys::REFRESH_TOKEN, "ref-1").unwrap();
        storage.set(keys::CSRF_TOKEN, "csrf-1").unwrap();

        let manager =
            SessionManager::new(AuthConfig::default(), storage, Arc::new(StubSignals)).unwrap();

        let state = manager.inner.state.read().unwrap();
        assert_eq!(state.access_token.as_deref(), Some("acc-1"));
        assert_eq!(state.refresh_token.as_deref(), Some("ref-1"));
        // Rehydrated tokens alone do not make the session authenticated;
        // that verdict belongs to the profile probe
        assert!(!state.is_authenticated_now());
        assert!(!state.checked);
    }
}
