use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a collaborator: SVG fetch, switch mutation or renderer.
///
/// `Display` is the human readable message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    #[error("{0}")]
    Fetch(String),
    /// The request completed but the server answered with a non-ok status.
    #[error("{message}")]
    HttpStatus { status: u16, message: String },
    #[error("{0}")]
    Render(String),
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
