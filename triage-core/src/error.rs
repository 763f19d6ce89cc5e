use thiserror::Error;

/// Errors raised by the triage core.
///
/// Construction-time failures (`DataIntegrity`, `ModelUnavailable`, `Config`) are
/// fatal for startup. `Inference` is per-request and is converted into a
/// response by the [`Dispatcher`](crate::Dispatcher) rather than propagated.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TriageError>;
