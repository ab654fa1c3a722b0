//! # Inventory Builder
//!
//! Drains a container's paginated listing into one [`Inventory`].
//!
//! Listing is all-or-nothing: a failure on any page aborts with
//! [`SyncError::BackendUnavailable`]. Copying against a partial listing would
//! silently skip objects, so pages are never retried here.

use crate::format::{format_hms, human_readable_bytes};
use crate::model::Inventory;
use crate::progress::ProgressSink;
use crate::{Result, SyncError};
use bridge_traits::StorageBackend;
use core_async::time::Instant;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct InventoryBuilder {
    backend: Arc<dyn StorageBackend>,
    sink: Arc<dyn ProgressSink>,
}

impl InventoryBuilder {
    pub fn new(backend: Arc<dyn StorageBackend>, sink: Arc<dyn ProgressSink>) -> Self {
        Self { backend, sink }
    }

    /// List every object in `container`.
    ///
    /// Emits a running count after each page and a summary line once the
    /// listing is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] if any page cannot be
    /// retrieved, or if the backend hands back the same continuation token
    /// twice in a row.
    #[instrument(skip(self))]
    pub async fn build_inventory(&self, container: &str) -> Result<Inventory> {
        let started = Instant::now();
        self.sink.emit_line("Building Object List...");

        let mut records = Vec::new();
        let mut token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            page_count += 1;
            debug!(page = page_count, token = ?token, "Fetching listing page");

            let page = self
                .backend
                .list_page(container, token.clone())
                .await
                .map_err(|e| SyncError::BackendUnavailable {
                    container: container.to_string(),
                    message: format!("listing page {} failed: {}", page_count, e),
                })?;

            records.extend(page.records);
            self.sink
                .emit_line(&format!("{}\t\tobjects found", records.len()));

            match page.next_token {
                None => break,
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(SyncError::BackendUnavailable {
                        container: container.to_string(),
                        message: format!(
                            "listing did not advance past continuation token {:?}",
                            next
                        ),
                    });
                }
                Some(next) => token = Some(next),
            }
        }

        let inventory = Inventory::new(records);
        let elapsed = started.elapsed();

        self.sink.emit_line(&format!(
            "{}\t\tobjects found with a total size of {}",
            inventory.total_count(),
            human_readable_bytes(inventory.total_bytes())
        ));
        self.sink
            .emit_line(&format!("Built full object list in {}", format_hms(elapsed)));

        info!(
            objects = inventory.total_count(),
            bytes = inventory.total_bytes(),
            pages = page_count,
            "Inventory built"
        );

        Ok(inventory)
    }
}
