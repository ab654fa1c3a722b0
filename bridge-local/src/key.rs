//! Key and container name validation shared by the local backends.

use bridge_traits::error::{BridgeError, Result};

/// Reject keys that cannot be stored as a relative path.
///
/// A valid key is non-empty, relative, free of NUL bytes, and every
/// `/`-separated segment is non-empty and neither `.` nor `..`.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(BridgeError::InvalidArgument("object key is empty".to_string()));
    }
    if key.contains('\0') {
        return Err(BridgeError::InvalidArgument(format!(
            "object key contains a NUL byte: {:?}",
            key
        )));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(BridgeError::InvalidArgument(format!(
            "object key must be a relative path: {}",
            key
        )));
    }
    for segment in key.split('/') {
        match segment {
            "" => {
                return Err(BridgeError::InvalidArgument(format!(
                    "object key has an empty path segment: {}",
                    key
                )))
            }
            "." | ".." => {
                return Err(BridgeError::InvalidArgument(format!(
                    "object key has a relative path segment: {}",
                    key
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Container names map to a single directory, so they may not contain
/// separators and may not start with `.` (reserved for store internals).
pub fn validate_container(container: &str) -> Result<()> {
    if container.is_empty()
        || container.starts_with('.')
        || container.contains(['/', '\\', '\0'])
    {
        return Err(BridgeError::InvalidArgument(format!(
            "invalid container name: {:?}",
            container
        )));
    }
    Ok(())
}
