//! Time-related abstractions.
//!
//! Re-exports Tokio's timer primitives together with the standard library's
//! clock types, plus a couple of helpers for rendering elapsed time.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{interval, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     let mut ticker = interval(Duration::from_millis(10));
//!     ticker.tick().await; // first tick completes immediately
//!     ticker.tick().await;
//!     assert!(start.elapsed() >= Duration::from_millis(10));
//! }
//! ```

pub use tokio::time::{
    interval, interval_at, sleep, sleep_until, timeout, Interval, MissedTickBehavior, Sleep,
    Timeout,
};

pub use std::time::{Duration, Instant};

/// Format a duration as `HH:MM:SS`.
///
/// Hours are not wrapped, so durations over 99 hours render with more digits.
///
/// ```rust
/// use core_async::time::{format_hms, Duration};
///
/// assert_eq!(format_hms(Duration::from_secs(3_725)), "01:02:05");
/// ```
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
