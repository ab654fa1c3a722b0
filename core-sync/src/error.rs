use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage backend unavailable while listing {container}: {message}")]
    BackendUnavailable { container: String, message: String },

    #[error("Invalid retry state: {0}")]
    InvalidState(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
