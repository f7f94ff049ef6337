use thiserror::Error;
use webrig_core_types::RigError;

#[derive(Debug, Error, Clone)]
pub enum DriverError {
    #[error("{0}")]
    Backend(String),
    #[error("{operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("driver already closed")]
    Closed,
}

impl DriverError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

impl From<DriverError> for RigError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout {
                operation,
                timeout_ms,
            } => RigError::timeout(operation, timeout_ms),
            // Backend messages pass through opaquely for debuggability.
            other => RigError::driver(other.to_string()),
        }
    }
}
