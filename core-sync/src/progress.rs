//! # Progress Reporting
//!
//! A background ticker that turns the shared [`SyncCounters`] into a
//! human-readable progress line while a copy is in flight:
//!
//! ```text
//! [---->               ]	[ 5/20 ]	Elapsed: 00:00:04	ETA: 00:00:12
//! ```
//!
//! The reporter reads the counters without synchronising with the workers,
//! so a line may lag a success or two behind.
//!
//! [`ProgressReporter`] owns its task through a [`ScopedTask`]: dropping the
//! reporter (normal completion, `?` on a fatal error, a panic unwinding the
//! session) aborts the ticker. [`ProgressReporter::stop`] is the graceful
//! path.

use crate::counters::SyncCounters;
use crate::format::format_hms;
use core_async::sync::CancellationToken;
use core_async::task::ScopedTask;
use core_async::time::{self, Duration, Instant, MissedTickBehavior};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

// ============================================================================
// Sinks
// ============================================================================

/// Destination for user-facing status lines (inventory counts, progress bar,
/// final report).
pub trait ProgressSink: Send + Sync {
    fn emit_line(&self, line: &str);
}

/// Writes each line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the sync down with it.
        let _ = writeln!(out, "{}", line);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Fraction of `total` that `copied` represents, clamped to `[0, 1]`.
/// An empty inventory reports `0.0`.
pub fn completion_fraction(copied: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (copied as f64 / total as f64).min(1.0)
}

/// Render a `width`-segment bar.
///
/// `floor(fraction * width)` segments are filled. The last filled segment is
/// `>`, the others `-`, and the remainder is padded with spaces.
pub fn render_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).floor() as usize).min(width);

    let mut bar = String::with_capacity(width);
    if filled > 0 {
        bar.push_str(&"-".repeat(filled - 1));
        bar.push('>');
    }
    bar.push_str(&" ".repeat(width - filled));
    bar
}

/// Linear extrapolation of the time remaining: `elapsed / fraction - elapsed`.
///
/// Returns `None` when nothing has completed yet.
pub fn estimate_remaining(elapsed: Duration, fraction: f64) -> Option<Duration> {
    if fraction <= 0.0 || !fraction.is_finite() {
        return None;
    }
    let projected = Duration::try_from_secs_f64(elapsed.as_secs_f64() / fraction).ok()?;
    Some(projected.saturating_sub(elapsed))
}

/// Render one full progress line.
pub fn render_progress_line(copied: u64, total: u64, elapsed: Duration, width: usize) -> String {
    let fraction = completion_fraction(copied, total);
    let eta = estimate_remaining(elapsed, fraction)
        .map(format_hms)
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "[{}]\t[ {}/{} ]\tElapsed: {}\tETA: {}",
        render_bar(fraction, width),
        copied,
        total,
        format_hms(elapsed),
        eta
    )
}

// ============================================================================
// Reporter
// ============================================================================

/// Tick settings for a [`ProgressReporter`].
#[derive(Debug, Clone, Copy)]
pub struct ReporterSettings {
    /// Objects in the inventory being copied
    pub total_count: u64,
    /// Elapsed time is measured from here (the session start)
    pub started_at: Instant,
    pub interval: Duration,
    pub bar_width: usize,
}

/// Where the reporter publishes `SyncEvent::Progress`.
#[derive(Debug, Clone)]
pub struct ProgressEvents {
    pub bus: EventBus,
    pub session_id: String,
}

/// Running progress ticker. See the module docs for its lifetime rules.
pub struct ProgressReporter {
    cancel: CancellationToken,
    task: ScopedTask<()>,
}

impl ProgressReporter {
    /// Spawn the ticker. The first line is emitted immediately, then one per
    /// `settings.interval`.
    pub fn start(
        settings: ReporterSettings,
        counters: Arc<SyncCounters>,
        sink: Arc<dyn ProgressSink>,
        events: Option<ProgressEvents>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = ScopedTask::spawn(async move {
            let mut ticker = time::interval(settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                core_async::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tick(&settings, &counters, sink.as_ref(), events.as_ref());
                    }
                }
            }
            debug!("Progress reporter stopped");
        });

        Self { cancel, task }
    }

    /// Stop ticking and wait for the task to wind down.
    pub async fn stop(self) {
        self.cancel.cancel();
        let ProgressReporter { task, .. } = self;
        // Cancellation is the only way out of the loop; a JoinError here means
        // the task was already aborted.
        let _ = task.await;
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

fn tick(
    settings: &ReporterSettings,
    counters: &SyncCounters,
    sink: &dyn ProgressSink,
    events: Option<&ProgressEvents>,
) {
    let copied = counters.items_copied();
    let elapsed = settings.started_at.elapsed();

    sink.emit_line(&render_progress_line(
        copied,
        settings.total_count,
        elapsed,
        settings.bar_width,
    ));

    if let Some(events) = events {
        let percent = (completion_fraction(copied, settings.total_count) * 100.0).floor() as u8;
        events
            .bus
            .emit(CoreEvent::Sync(SyncEvent::Progress {
                session_id: events.session_id.clone(),
                items_copied: copied,
                total_items: settings.total_count,
                percent,
                elapsed_secs: elapsed.as_secs(),
            }))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_quarter() {
        let bar = render_bar(completion_fraction(5, 20), 20);
        assert_eq!(bar, "---->               ");
        assert_eq!(bar.len(), 20);
    }

    #[test]
    fn test_bar_edges() {
        assert_eq!(render_bar(0.0, 20), " ".repeat(20));
        assert_eq!(render_bar(1.0, 20), format!("{}>", "-".repeat(19)));
        assert_eq!(render_bar(0.04, 20), " ".repeat(20));
        assert_eq!(render_bar(0.05, 20), format!(">{}", " ".repeat(19)));
        assert_eq!(render_bar(0.5, 4), "->  ");
    }

    #[test]
    fn test_fraction() {
        assert_eq!(completion_fraction(0, 0), 0.0);
        assert_eq!(completion_fraction(5, 20), 0.25);
        assert_eq!(completion_fraction(30, 20), 1.0);
    }

    #[test]
    fn test_eta_suppressed_when_nothing_copied() {
        assert_eq!(estimate_remaining(Duration::from_secs(10), 0.0), None);

        let line = render_progress_line(0, 20, Duration::from_secs(10), 20);
        assert!(line.ends_with("ETA: unknown"));
    }

    #[test]
    fn test_eta_linear_extrapolation() {
        let eta = estimate_remaining(Duration::from_secs(4), 0.25).unwrap();
        assert_eq!(eta, Duration::from_secs(12));
        assert_eq!(
            estimate_remaining(Duration::from_secs(9), 1.0),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_progress_line_format() {
        let line = render_progress_line(5, 20, Duration::from_secs(4), 20);
        assert_eq!(
            line,
            "[---->               ]\t[ 5/20 ]\tElapsed: 00:00:04\tETA: 00:00:12"
        );
    }

    #[core_async::test(worker_threads = 2)]
    async fn test_reporter_ticks_and_stops() {
        let counters = Arc::new(SyncCounters::new());
        counters.record_success(10);
        let sink = Arc::new(CollectingSink::new());

        let reporter = ProgressReporter::start(
            ReporterSettings {
                total_count: 4,
                started_at: Instant::now(),
                interval: Duration::from_millis(10),
                bar_width: 20,
            },
            counters.clone(),
            sink.clone(),
            None,
        );

        time::sleep(Duration::from_millis(45)).await;
        assert!(reporter.is_running());
        reporter.stop().await;

        let lines = sink.lines();
        assert!(lines.len() >= 2, "expected several ticks, got {:?}", lines);
        assert!(lines[0].starts_with("[---->"));
        assert!(lines[0].contains("[ 1/4 ]"));

        let after_stop = sink.lines().len();
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sink.lines().len(), after_stop);
    }

    #[core_async::test(worker_threads = 2)]
    async fn test_reporter_stops_on_drop() {
        let sink = Arc::new(CollectingSink::new());
        let reporter = ProgressReporter::start(
            ReporterSettings {
                total_count: 1,
                started_at: Instant::now(),
                interval: Duration::from_millis(5),
                bar_width: 20,
            },
            Arc::new(SyncCounters::new()),
            sink.clone(),
            None,
        );

        time::sleep(Duration::from_millis(20)).await;
        drop(reporter);
        time::sleep(Duration::from_millis(10)).await;

        let after_drop = sink.lines().len();
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sink.lines().len(), after_drop);
    }

    #[core_async::test(worker_threads = 2)]
    async fn test_reporter_publishes_progress_events() {
        let bus = EventBus::new(16);
        let mut subscriber = bus.subscribe();
        let counters = Arc::new(SyncCounters::new());
        counters.record_success(1);
        counters.record_success(1);

        let reporter = ProgressReporter::start(
            ReporterSettings {
                total_count: 8,
                started_at: Instant::now(),
                interval: Duration::from_secs(60),
                bar_width: 20,
            },
            counters,
            Arc::new(CollectingSink::new()),
            Some(ProgressEvents {
                bus: bus.clone(),
                session_id: "s-1".to_string(),
            }),
        );

        let event = subscriber.recv().await.unwrap();
        reporter.stop().await;

        match event {
            CoreEvent::Sync(SyncEvent::Progress {
                items_copied,
                total_items,
                percent,
                ..
            }) => {
                assert_eq!(items_copied, 2);
                assert_eq!(total_items, 8);
                assert_eq!(percent, 25);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
