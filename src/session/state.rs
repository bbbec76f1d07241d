//! In-memory session record.
//!
//! `SessionState` is the authoritative record of the current session. All
//! mutation goes through the methods here, which update user, tokens, and
//! status together so callers never observe a partial state (tokens present
//! with no user, or the reverse).

use crate::models::User;

/// Where the session is in its login/refresh/expiry/logout cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// No session; nothing has been attempted yet.
    Anonymous,
    /// A profile probe is in flight.
    Checking,
    /// User and tokens are present and believed valid.
    Authenticated,
    /// A session existed but was invalidated (401, refresh failure, or a
    /// failed probe).
    Unauthenticated,
    /// A login attempt was rejected and the reason is user-visible.
    /// Rejection is not sticky: the session rests at `Anonymous` with
    /// the reason kept in `error`.
    Failed(String),
}

/// The rotating credential set issued by login and refresh.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access: String,
    pub refresh: String,
    pub csrf: String,
    pub expires_in: u64,
}

#[derive(Debug)]
pub struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) user: Option<User>,
    pub(crate) access_token: Option<String>,
    pub(crate) refresh_token: Option<String>,
    pub(crate) csrf_token: Option<String>,
    pub(crate) expires_in: u64,
    pub(crate) redirect_path: Option<String>,
    pub(crate) error: Option<String>,
    /// Memoization flag for the `is_authenticated` check cycle. While set,
    /// guarded checks return the cached status without a profile probe.
    /// Reset by logout, a 401, or a refresh failure.
    pub(crate) checked: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            user: None,
            access_token: None,
            refresh_token: None,
            csrf_token: None,
            expires_in: 0,
            redirect_path: None,
            error: None,
            checked: false,
        }
    }

    /// Successful login: user, tokens, and status move together.
    pub fn apply_login(&mut self, user: User, tokens: TokenSet) {
        self.user = Some(user);
        self.set_tokens(tokens);
        self.status = SessionStatus::Authenticated;
        self.error = None;
        self.checked = true;
    }

    /// Rejected login. The server-supplied reason is recorded for the
    /// caller, then the session settles back to `Anonymous` so the next
    /// attempt starts clean.
    pub fn apply_login_failure(&mut self, message: String) {
        self.error = Some(message);
        self.status = SessionStatus::Anonymous;
    }

    /// Successful profile probe over ambient credentials.
    pub fn apply_profile(&mut self, user: User) {
        self.user = Some(user);
        self.status = SessionStatus::Authenticated;
        self.checked = true;
    }

    /// Rotate tokens after a successful refresh.
    pub fn apply_refresh(&mut self, tokens: TokenSet) {
        self.set_tokens(tokens);
    }

    fn set_tokens(&mut self, tokens: TokenSet) {
        self.expires_in = tokens.expires_in;
        self.access_token = Some(tokens.access);
        self.refresh_token = Some(tokens.refresh);
        self.csrf_token = Some(tokens.csrf);
    }

    /// Clear user, tokens, and the check cycle atomically, demoting status.
    /// The saved redirect path survives so the user can resume after
    /// re-authenticating.
    pub fn invalidate(&mut self, status: SessionStatus) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.csrf_token = None;
        self.expires_in = 0;
        self.checked = false;
        self.status = status;
    }

    pub fn is_authenticated_now(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Whether there is anything to invalidate. Used to signal the router
    /// at most once per invalidation.
    pub fn has_live_session(&self) -> bool {
        self.is_authenticated_now() || self.access_token.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 1,
            username: "alice".into(),
            full_name: "Alice Example".into(),
            email: "alice@example.com".into(),
            roles: vec!["admin".into()],
        }
    }

    fn test_tokens() -> TokenSet {
        TokenSet {
            access: "access-1".into(),
            refresh: "refresh-1".into(),
            csrf: "csrf-1".into(),
            expires_in: 900,
        }
    }

    #[test]
    fn test_login_populates_everything_together() {
        let mut state = SessionState::new();
        state.apply_login(test_user(), test_tokens());

        assert!(state.is_authenticated_now());
        assert!(state.user.is_some());
        assert!(state.access_token.is_some());
        assert!(state.refresh_token.is_some());
        assert!(state.csrf_token.is_some());
        assert!(state.checked);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_invalidate_clears_everything_together() {
        let mut state = SessionState::new();
        state.apply_login(test_user(), test_tokens());
        state.redirect_path = Some("/profile".into());

        state.invalidate(SessionStatus::Unauthenticated);

        assert_eq!(state.status, SessionStatus::Unauthenticated);
        assert!(state.user.is_none());
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
        assert!(state.csrf_token.is_none());
        assert_eq!(state.expires_in, 0);
        assert!(!state.checked);
        // The redirect path survives invalidation
        assert_eq!(state.redirect_path.as_deref(), Some("/profile"));
    }

    #[test]
    fn test_login_failure_records_reason() {
        let mut state = SessionState::new();
        state.apply_login_failure("invalid credentials".into());

        assert_eq!(state.error.as_deref(), Some("invalid credentials"));
        assert_eq!(state.status, SessionStatus::Anonymous);
        assert!(!state.is_authenticated_now());
        assert!(!state.has_live_session());

        // Rejection is not sticky: a later login proceeds normally.
        state.apply_login(test_user(), test_tokens());
        assert_eq!(state.status, SessionStatus::Authenticated);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_refresh_rotates_tokens_without_touching_user() {
        let mut state = SessionState::new();
        state.apply_login(test_user(), test_tokens());

        state.apply_refresh(TokenSet {
            access: "access-2".into(),
            refresh: "refresh-2".into(),
            csrf: "csrf-2".into(),
            expires_in: 600,
        });

        assert_eq!(state.access_token.as_deref(), Some("access-2"));
        assert_eq!(state.expires_in, 600);
        assert!(state.is_authenticated_now());
        assert_eq!(state.user.as_ref().unwrap().username, "alice");
    }
}
