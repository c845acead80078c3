use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Webhook returned HTTP {0}")]
    Status(u16),
}
