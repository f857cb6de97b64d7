use thiserror::Error;

/// Failures surfaced by sessions and the session pool
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication against {url} failed: {reason}")]
    Authentication { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("no authenticated sessions, login first")]
    NotLoggedIn,

    #[error("could not build http client for {url}: {reason}")]
    Client { url: String, reason: String },
}

impl ApiError {
    /// The endpoint could not be reached or answered with an error status
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }
}
