/// Errors produced by domain logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// User input was rejected; the message is safe to display.
    #[error("{0}")]
    Validation(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),
}
