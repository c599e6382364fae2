use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    /// The message the server sent back, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// The server refused our credentials, with or without saying why.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::Status { status: 401, .. }
        )
    }

    /// Collapses the error to what the user gets to read.
    pub fn message_or(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API url configured; set TASKBOARD_API_URL or api_url in {0}")]
    MissingApiUrl(String),

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_server_body() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Name already taken".to_string()),
        };
        assert_eq!(err.message_or("Failed to create project"), "Name already taken");
    }

    #[test]
    fn test_message_falls_back_when_body_missing_or_empty() {
        let missing = ApiError::Status {
            status: 500,
            message: None,
        };
        let empty = ApiError::Status {
            status: 500,
            message: Some(String::new()),
        };
        assert_eq!(missing.message_or("Failed to delete task"), "Failed to delete task");
        assert_eq!(empty.message_or("Failed to delete task"), "Failed to delete task");
        assert_eq!(ApiError::Unauthorized.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_401_with_message_still_counts_as_unauthorized() {
        let with_reason = ApiError::Status {
            status: 401,
            message: Some("Token expired".to_string()),
        };
        let forbidden = ApiError::Status {
            status: 403,
            message: None,
        };
        assert!(with_reason.is_unauthorized());
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!forbidden.is_unauthorized());
        assert_eq!(with_reason.message_or("Login failed"), "Token expired");
    }
}
