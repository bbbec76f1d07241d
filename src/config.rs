//! Client configuration.
//!
//! `AuthConfig` carries the remote API location, the auth scope segment used
//! in endpoint paths, and the route the router should land on after a login
//! with no saved redirect path.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the durable storage directory path
const APP_NAME: &str = "authkeep";

/// Environment variable that overrides the API base URL
const API_URL_ENV: &str = "AUTHKEEP_API_URL";

/// Default API base URL (local development server)
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub api_base_url: String,
    /// Scope segment in auth endpoint paths (`/auth/{scope}/login` etc).
    pub auth_scope: String,
    /// Route the router falls back to when no redirect path was saved.
    pub landing_route: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_scope: "user".to_string(),
            landing_route: "/dashboard".to_string(),
        }
    }
}

impl AuthConfig {
    /// Build a config from defaults, letting the environment override the
    /// API base URL.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        config
    }

    pub fn login_url(&self) -> String {
        format!("{}/auth/{}/login", self.api_base_url, self.auth_scope)
    }

    pub fn refresh_url(&self) -> String {
        format!("{}/auth/{}/refreshtoken", self.api_base_url, self.auth_scope)
    }

    pub fn profile_url(&self) -> String {
        format!("{}/auth/{}/profile", self.api_base_url, self.auth_scope)
    }

    pub fn logout_url(&self) -> String {
        format!("{}/auth/{}/logout", self.api_base_url, self.auth_scope)
    }

    /// Default directory for file-backed durable storage.
    pub fn storage_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let config = AuthConfig {
            api_base_url: "https://api.example.com/v1".into(),
            auth_scope: "user".into(),
            ..Default::default()
        };
        assert_eq!(config.login_url(), "https://api.example.com/v1/auth/user/login");
        assert_eq!(
            config.refresh_url(),
            "https://api.example.com/v1/auth/user/refreshtoken"
        );
        assert_eq!(
            config.profile_url(),
            "https://api.example.com/v1/auth/user/profile"
        );
        assert_eq!(config.logout_url(), "https://api.example.com/v1/auth/user/logout");
    }

    #[test]
    fn test_default_landing_route() {
        assert_eq!(AuthConfig::default().landing_route, "/dashboard");
    }
}
