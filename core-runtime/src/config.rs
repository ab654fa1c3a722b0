//! # Sync Configuration Module
//!
//! Provides configuration management for a bucket synchronization run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `SyncConfig`
//! instance that holds every tunable of a sync session. It enforces fail-fast
//! validation so that an unusable configuration is rejected before any
//! listing request is issued.
//!
//! ## Required Settings
//!
//! - `source_container` - Container to read from
//! - `dest_container` - Container to write to
//!
//! ## Optional Settings (with defaults)
//!
//! - `parallelism` - Concurrent transfers (default: available processing units)
//! - `access_policy` - Policy applied to written objects (default: `PublicRead`)
//! - `progress_interval` - Progress line cadence (default: 2 seconds)
//! - `progress_bar_width` - Progress bar segments (default: 20)
//! - `max_rounds` - Upper bound on copy rounds (default: unbounded)
//! - `event_buffer_size` - Event bus capacity (default: 256)
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::SyncConfig;
//!
//! let config = SyncConfig::builder()
//!     .source_container("media-primary")
//!     .dest_container("media-replica")
//!     .parallelism(8)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.parallelism, 8);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::SyncConfig;
//!
//! // Source and destination must differ
//! let config = SyncConfig::builder()
//!     .source_container("media")
//!     .dest_container("media")
//!     .build()
//!     .expect("Should fail - same container on both sides");
//! ```

use crate::error::{Error, Result};
use bridge_traits::AccessPolicy;
use std::time::Duration;

/// Default cadence of progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of segments in the progress bar.
pub const DEFAULT_PROGRESS_BAR_WIDTH: usize = 20;

/// Default event bus capacity.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Configuration for a single sync session.
///
/// Use [`SyncConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Container objects are listed and read from
    pub source_container: String,

    /// Container objects are written to
    pub dest_container: String,

    /// Maximum number of transfers in flight at once
    pub parallelism: usize,

    /// Access policy applied to every written object
    pub access_policy: AccessPolicy,

    /// Interval between progress lines
    pub progress_interval: Duration,

    /// Number of segments in the rendered progress bar
    pub progress_bar_width: usize,

    /// Stop after this many copy rounds even if the retry set is still
    /// shrinking. `None` keeps retrying for as long as rounds make progress.
    pub max_rounds: Option<u32>,

    /// Capacity of the event bus created for the session
    pub event_buffer_size: usize,
}

impl SyncConfig {
    /// Creates a new builder for constructing a `SyncConfig`.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Container names are non-empty and distinct
    /// - Parallelism is at least 1
    /// - Progress interval is non-zero
    /// - Progress bar has at least one segment
    /// - `max_rounds`, when set, is at least 1
    pub fn validate(&self) -> Result<()> {
        if self.source_container.trim().is_empty() {
            return Err(Error::Config(
                "Source container cannot be empty".to_string(),
            ));
        }

        if self.dest_container.trim().is_empty() {
            return Err(Error::Config(
                "Destination container cannot be empty".to_string(),
            ));
        }

        if self.source_container == self.dest_container {
            return Err(Error::Config(format!(
                "Source and destination must differ (both are '{}')",
                self.source_container
            )));
        }

        if self.parallelism == 0 {
            return Err(Error::Config(
                "Parallelism must be at least 1".to_string(),
            ));
        }

        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be greater than zero".to_string(),
            ));
        }

        if self.progress_bar_width == 0 {
            return Err(Error::Config(
                "Progress bar width must be at least 1".to_string(),
            ));
        }

        if self.max_rounds == Some(0) {
            return Err(Error::Config(
                "max_rounds must be at least 1 when set".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    source_container: Option<String>,
    dest_container: Option<String>,
    parallelism: Option<usize>,
    access_policy: Option<AccessPolicy>,
    progress_interval: Option<Duration>,
    progress_bar_width: Option<usize>,
    max_rounds: Option<u32>,
    event_buffer_size: Option<usize>,
}

impl SyncConfigBuilder {
    /// Sets the source container (required).
    pub fn source_container(mut self, container: impl Into<String>) -> Self {
        self.source_container = Some(container.into());
        self
    }

    /// Sets the destination container (required).
    pub fn dest_container(mut self, container: impl Into<String>) -> Self {
        self.dest_container = Some(container.into());
        self
    }

    /// Sets the number of concurrent transfers.
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn access_policy(mut self, policy: AccessPolicy) -> Self {
        self.access_policy = Some(policy);
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    pub fn progress_bar_width(mut self, width: usize) -> Self {
        self.progress_bar_width = Some(width);
        self
    }

    /// Bounds the number of copy rounds.
    pub fn max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `SyncConfig` instance.
    ///
    /// Returns an error if a required container is missing or if
    /// [`SyncConfig::validate`] rejects the result.
    pub fn build(self) -> Result<SyncConfig> {
        let source_container = self.source_container.ok_or_else(|| {
            Error::Config(
                "Source container is required. Use .source_container() to set it.".to_string(),
            )
        })?;

        let dest_container = self.dest_container.ok_or_else(|| {
            Error::Config(
                "Destination container is required. Use .dest_container() to set it."
                    .to_string(),
            )
        })?;

        let config = SyncConfig {
            source_container,
            dest_container,
            parallelism: self
                .parallelism
                .unwrap_or_else(core_async::runtime::available_parallelism),
            access_policy: self.access_policy.unwrap_or(AccessPolicy::PublicRead),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            progress_bar_width: self
                .progress_bar_width
                .unwrap_or(DEFAULT_PROGRESS_BAR_WIDTH),
            max_rounds: self.max_rounds,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
