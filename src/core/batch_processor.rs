//! Batch processing with sender-based partitioning for the async strategy
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! transfer requests concurrently while keeping each sender's requests in
//! file order.
//!
//! # Design
//!
//! A batch is partitioned by sender. Each partition runs in its own tokio task
//! and processes its requests sequentially. Partitions share recipients, so
//! two tasks may touch the same account at once; the engine's compare-and-swap
//! retries settle those races.
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be safely shared across async tasks.
//! The engine it wraps holds only `Arc`-shared, thread-safe storage.

use std::collections::HashMap;

use crate::core::engine::TransferEngine;
use crate::core::traits::{AccountStore, Ledger};
use crate::types::{TransferError, TransferReceipt, TransferRequest};
use tracing::{debug, error};

/// Result of processing a single transfer request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request that was processed
    pub request: TransferRequest,

    /// The outcome of processing it
    pub result: Result<TransferReceipt, TransferError>,
}

/// Batch processor with sender-based partitioning
pub struct BatchProcessor<S, L> {
    engine: TransferEngine<S, L>,
}

impl<S, L> Clone for BatchProcessor<S, L> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S, L> BatchProcessor<S, L>
where
    S: AccountStore + 'static,
    L: Ledger + 'static,
{
    /// Create a new BatchProcessor around a shared engine
    pub fn new(engine: TransferEngine<S, L>) -> Self {
        Self { engine }
    }

    /// Partition a batch of requests by sender
    ///
    /// # Guarantees
    ///
    /// - Each request appears in exactly one partition
    /// - Requests for each sender keep their original order
    pub fn partition_by_sender(
        &self,
        batch: Vec<TransferRequest>,
    ) -> HashMap<String, Vec<TransferRequest>> {
        let mut sender_batches: HashMap<String, Vec<TransferRequest>> = HashMap::new();

        for request in batch {
            sender_batches
                .entry(request.sender.clone())
                .or_default()
                .push(request);
        }

        sender_batches
    }

    /// Process one sender's requests sequentially
    ///
    /// Failures are captured in the results and do not stop processing.
    pub async fn process_sender_requests(
        &self,
        requests: Vec<TransferRequest>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self.engine.submit(&request);
            if let Err(e) = &result {
                debug!(sender = %request.sender, recipient = %request.recipient, error = %e, "transfer row failed");
            }
            results.push(ProcessingResult { request, result });
        }

        results
    }

    /// Process a batch with sender-based partitioning
    ///
    /// Partitions run concurrently; the call returns once all of them are
    /// done. Results are grouped by sender, not in input order.
    pub async fn process_batch(&self, batch: Vec<TransferRequest>) -> Vec<ProcessingResult> {
        let sender_batches = self.partition_by_sender(batch);

        let mut tasks = Vec::with_capacity(sender_batches.len());
        for (_sender, requests) in sender_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_sender_requests(requests).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(sender_results) => results.extend(sender_results),
                Err(e) => error!("Transfer task panicked: {:?}", e),
            }
        }

        results
    }
}
