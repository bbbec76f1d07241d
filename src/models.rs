//! Domain types shared across the session lifecycle.

use serde::{Deserialize, Serialize};

/// Role name that grants administrative access
pub const ADMIN_ROLE: &str = "admin";

/// Profile returned by the remote profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Credentials submitted to the remote login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_roles() {
        let user = User {
            id: 1,
            username: "alice".into(),
            full_name: "Alice Example".into(),
            email: "alice@example.com".into(),
            roles: vec!["viewer".into(), "admin".into()],
        };
        assert!(user.has_role("viewer"));
        assert!(user.is_admin());
        assert!(!user.has_role("editor"));
    }

    #[test]
    fn test_user_parses_with_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": 7, "username": "bob"}"#)
            .expect("minimal profile should parse");
        assert_eq!(user.username, "bob");
        assert!(user.roles.is_empty());
        assert!(!user.is_admin());
    }
}
