use thiserror::Error;

/// Failures surfaced by the league API client and the admin operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("forbidden: {body}")]
    Forbidden { body: String },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Local(String),
}

impl ApiError {
    /// Maps a non-2xx response onto the taxonomy. 401 stays a plain status
    /// error because the auth layer has already spent its one retry.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 403 {
            ApiError::Forbidden { body }
        } else {
            ApiError::Status { status, body }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Forbidden { .. } => Some(403),
            _ => None,
        }
    }

    /// Text shown on a page's error line. `action` completes the sentence
    /// "you do not have permission to ..." for forbidden writes.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            ApiError::Network(_) => "Network error".to_string(),
            ApiError::Forbidden { .. } => {
                format!("Forbidden: you do not have permission to {action}")
            }
            ApiError::Status { body, .. } => {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "API error".to_string()
                } else {
                    trimmed.to_string()
                }
            }
            ApiError::NotLoggedIn => "Please log in first".to_string(),
            ApiError::Decode(_) => "Unexpected response from server".to_string(),
            ApiError::Local(msg) => msg.clone(),
        }
    }
}
