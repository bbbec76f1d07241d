use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => AuthError::Unauthorized,
            403 => AuthError::AccessDenied(truncated),
            404 => AuthError::NotFound(truncated),
            500..=599 => AuthError::ServerError(truncated),
            _ => AuthError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            AuthError::from_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            AuthError::Unauthorized
        ));
        assert!(matches!(
            AuthError::from_status(reqwest::StatusCode::FORBIDDEN, "no"),
            AuthError::AccessDenied(_)
        ));
        assert!(matches!(
            AuthError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            AuthError::ServerError(_)
        ));
        assert!(matches!(
            AuthError::from_status(reqwest::StatusCode::IM_A_TEAPOT, ""),
            AuthError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = AuthError::truncate_body(&long);
        assert!(truncated.contains("truncated, 600 total bytes"));
        assert_eq!(AuthError::truncate_body("short"), "short");
    }
}
