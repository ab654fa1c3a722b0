//! # Sync Session
//!
//! One end-to-end copy of a source container into a destination container:
//! list the source, start the progress reporter, run copy rounds until the
//! retry coordinator reaches a terminal state, then stop the reporter and
//! return a [`SyncReport`].
//!
//! A session is single use; [`SyncSession::run`] consumes it.
//!
//! ## Usage
//!
//! ```ignore
//! let config = SyncConfig::builder()
//!     .source_container("photos")
//!     .dest_container("photos-backup")
//!     .build()?;
//!
//! let report = SyncSession::new(config, backend)?.run().await?;
//! println!("{}", report);
//! ```

use crate::counters::SyncCounters;
use crate::inventory::InventoryBuilder;
use crate::model::SyncSessionId;
use crate::progress::{
    render_progress_line, ProgressEvents, ProgressReporter, ProgressSink, ReporterSettings,
    StdoutSink,
};
use crate::report::{write_key_block, SyncReport};
use crate::retry::{RetryCoordinator, RetryState};
use crate::worker_pool::TransferWorkerPool;
use crate::Result;
use bridge_traits::StorageBackend;
use core_async::time::Instant;
use core_runtime::config::SyncConfig;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct SyncSession {
    id: SyncSessionId,
    config: SyncConfig,
    backend: Arc<dyn StorageBackend>,
    sink: Arc<dyn ProgressSink>,
    event_bus: EventBus,
    counters: Arc<SyncCounters>,
}

impl SyncSession {
    /// Create a session that prints to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`](crate::SyncError::Config) if `config`
    /// fails validation.
    pub fn new(config: SyncConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        let event_bus = EventBus::new(config.event_buffer_size);
        Ok(Self {
            id: SyncSessionId::new(),
            config,
            backend,
            sink: Arc::new(StdoutSink),
            event_bus,
            counters: Arc::new(SyncCounters::new()),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Publish events on `bus` instead of the session's private bus.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    /// Run the session to completion.
    ///
    /// Retryable and permanent copy failures end up in the report. Only a
    /// failed source listing (or an internal bookkeeping error) is returned
    /// as `Err`; a `SyncEvent::Failed` is published in that case.
    #[instrument(
        skip(self),
        fields(
            session_id = %self.id,
            source = %self.config.source_container,
            destination = %self.config.dest_container,
        )
    )]
    pub async fn run(self) -> Result<SyncReport> {
        info!("Starting sync session");
        self.emit(SyncEvent::Started {
            session_id: self.id.as_str(),
            source: self.config.source_container.clone(),
            destination: self.config.dest_container.clone(),
        });

        match self.execute().await {
            Ok(report) => {
                info!(summary = %report.summary(), "Sync session finished");
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Sync session failed");
                self.emit(SyncEvent::Failed {
                    session_id: self.id.as_str(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<SyncReport> {
        let started_at = Instant::now();
        let session_id = self.id.as_str();

        let inventory = InventoryBuilder::new(self.backend.clone(), self.sink.clone())
            .build_inventory(&self.config.source_container)
            .await?;

        self.emit(SyncEvent::InventoryBuilt {
            session_id: session_id.clone(),
            total_count: inventory.total_count(),
            total_bytes: inventory.total_bytes(),
            duration_ms: started_at.elapsed().as_millis() as u64,
        });

        let settings = ReporterSettings {
            total_count: inventory.total_count(),
            started_at,
            interval: self.config.progress_interval,
            bar_width: self.config.progress_bar_width,
        };
        // Dropped on every early return below, which aborts the ticker.
        let reporter = ProgressReporter::start(
            settings,
            self.counters.clone(),
            self.sink.clone(),
            Some(ProgressEvents {
                bus: self.event_bus.clone(),
                session_id: session_id.clone(),
            }),
        );

        let pool = TransferWorkerPool::new(
            self.backend.clone(),
            self.config.source_container.clone(),
            self.config.dest_container.clone(),
            self.config.parallelism,
            self.config.access_policy,
            self.counters.clone(),
        )
        .with_events(self.event_bus.clone(), session_id.clone());

        let mut coordinator = RetryCoordinator::new(&inventory, self.config.max_rounds);

        while !coordinator.state().is_terminal() {
            let batch = coordinator.next_round()?;
            info!(
                round = coordinator.rounds() + 1,
                records = batch.total_count(),
                bytes = batch.total_bytes(),
                "Starting copy round"
            );

            let outcomes = pool.run_round(batch.into_records()).await;
            let summary = coordinator.record_round(outcomes)?;

            self.emit(SyncEvent::RoundCompleted {
                session_id: session_id.clone(),
                round: summary.round,
                succeeded: summary.succeeded,
                retryable: summary.retryable,
                permanent: summary.permanent,
            });

            if !summary.new_permanent.is_empty() {
                let mut block = String::new();
                // Writing into a String cannot fail.
                let _ = write_key_block(&mut block, "BAD KEYS", &summary.new_permanent);
                self.sink.emit_line(&block);
            }
        }

        reporter.stop().await;

        let snapshot = self.counters.snapshot();
        let elapsed = started_at.elapsed();
        self.sink.emit_line(&render_progress_line(
            snapshot.items_copied,
            inventory.total_count(),
            elapsed,
            self.config.progress_bar_width,
        ));

        let report = SyncReport {
            session_id: session_id.clone(),
            source: self.config.source_container.clone(),
            destination: self.config.dest_container.clone(),
            total_count: inventory.total_count(),
            total_bytes: inventory.total_bytes(),
            items_copied: snapshot.items_copied,
            bytes_sent: snapshot.bytes_sent,
            elapsed,
            rounds: coordinator.rounds(),
            final_state: coordinator.state(),
            permanent_failures: coordinator.permanent_failures().to_vec(),
            exhausted: coordinator.exhausted(),
        };

        self.emit(SyncEvent::Completed {
            session_id,
            items_copied: report.items_copied,
            bytes_sent: report.bytes_sent,
            rounds: report.rounds,
            permanent_failures: report.permanent_failures.len() as u64,
            exhausted: report.exhausted.len() as u64,
            duration_secs: elapsed.as_secs(),
            converged: report.final_state == RetryState::Converged,
        });

        Ok(report)
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }
}
