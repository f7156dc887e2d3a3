use thiserror::Error;

/// Errors returned by chat backend operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The backend answered with a non-success status.
    #[error("chat backend returned {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("request to chat backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("unexpected response from chat backend: {0}")]
    UnexpectedResponse(String),
}
