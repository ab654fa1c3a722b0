use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Object {key} not found in container {container}")]
    ObjectNotFound { container: String, key: String },

    /// The request itself is malformed (bad key, bad container name, bad
    /// argument). Retrying the same request can never succeed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error was caused by the caller's input rather than by the
    /// backend or the network.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BridgeError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_classification() {
        assert!(BridgeError::InvalidArgument("empty key".to_string()).is_invalid_argument());
        assert!(!BridgeError::OperationFailed("503".to_string()).is_invalid_argument());
        assert!(!BridgeError::ContainerNotFound("photos".to_string()).is_invalid_argument());

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(!BridgeError::from(io).is_invalid_argument());
    }
}
