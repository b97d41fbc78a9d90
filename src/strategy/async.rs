//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It reads transfers in batches and runs each batch
//! with sender-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (sender partitioning + tokio tasks)
//!         └── TransferEngine (compare-and-swap balance updates)
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another, so a sender's transfers keep file order
//!   across batch boundaries
//! - Within a batch, different senders run in parallel; when they share a
//!   recipient the relative order of those credits is not fixed
//! - Final balances match the sync strategy whenever no transfer's outcome
//!   depends on another sender's transfers in the same batch

use crate::core::BatchProcessor;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{close_session, open_session, ProcessingStrategy, SessionConfig};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Configuration for batch processing
///
/// Controls how transfers are batched and the number of worker threads for
/// parallel processing within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of transfers per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    session: SessionConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `session` - Account source, engine settings and ledger output
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    pub fn new(session: SessionConfig, config: BatchConfig) -> Self {
        Self { session, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process transfers batch by batch on a tokio multi-threaded runtime
    ///
    /// 1. Provisions the opening accounts
    /// 2. Reads transfers in batches using AsyncReader
    /// 3. Runs each batch through the BatchProcessor and waits for it
    /// 4. Writes final balances (and the ledger, if configured)
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let engine = open_session(&self.session)?;
        let processor = BatchProcessor::new(engine.clone());

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut succeeded = 0usize;
            let mut failed = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    match processed.result {
                        Ok(_) => succeeded += 1,
                        Err(_) => failed += 1,
                    }
                }
            }
            info!(succeeded, failed, "transfers processed");

            Ok::<(), String>(())
        })?;

        close_session(&engine, &self.session, output)
    }
}
