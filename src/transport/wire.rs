//! Wire payloads consumed from the remote auth endpoints.

use serde::Deserialize;

use crate::models::User;
use crate::session::state::TokenSet;

/// Response shape shared by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "Profile")]
    pub profile: Option<User>,
}

impl AuthOutcome {
    /// Extract the rotated credential set, if the server sent all three
    /// tokens.
    pub fn token_set(&self) -> Option<TokenSet> {
        Some(TokenSet {
            access: self.access_token.clone()?,
            refresh: self.refresh_token.clone()?,
            csrf: self.csrf_token.clone()?,
            expires_in: self.expires_in,
        })
    }
}

/// Abbreviate a token for logging. Never log token values in full.
/// Counts characters, not bytes, so multi-byte tokens cannot panic.
pub(crate) fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_parses() {
        let json = r#"{
            "success": true,
            "access_token": "acc",
            "refresh_token": "ref",
            "csrf_token": "csrf",
            "expires_in": 900,
            "status_code": 200,
            "Profile": {"id": 1, "username": "alice", "full_name": "Alice", "email": "a@x", "roles": ["admin"]}
        }"#;
        let outcome: AuthOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.success);
        let tokens = outcome.token_set().unwrap();
        assert_eq!(tokens.access, "acc");
        assert_eq!(tokens.expires_in, 900);
        assert_eq!(outcome.profile.unwrap().username, "alice");
    }

    #[test]
    fn test_rejection_parses_without_tokens() {
        let json = r#"{"success": false, "message": "invalid credentials", "status_code": 401}"#;
        let outcome: AuthOutcome = serde_json::from_str(json).unwrap();
        assert!(!outcome.success);
        assert!(outcome.token_set().is_none());
        assert_eq!(outcome.message.as_deref(), Some("invalid credentials"));
    }

    #[test]
    fn test_redact_never_exposes_short_tokens() {
        assert_eq!(redact("short"), "***");
        let long = redact("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(long, "abcd...wxyz");
        assert!(!long.contains("ghijkl"));
    }

    #[test]
    fn test_redact_handles_multibyte_tokens() {
        // 13 bytes but 12 chars: still too short to abbreviate.
        assert_eq!(redact("abcé-xxxxxxxx"), "***");
        // Multi-byte characters straddling both cut points.
        assert_eq!(redact("héllo-world-tokén"), "héll...okén");
    }
}
