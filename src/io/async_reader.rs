//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over transfer requests from a CSV file.
//! Supports batch reading for the async processing strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransferRequests
//!                  ↓
//!           csv_format module
//!           (TransferCsvRecord, convert_transfer_record)
//! ```

use crate::io::csv_format::{convert_transfer_record, TransferCsvRecord};
use crate::types::TransferRequest;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over transfer requests.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of transfer requests
    ///
    /// Reads up to `batch_size` valid records. Invalid records are logged and
    /// skipped.
    ///
    /// # Returns
    ///
    /// A vector of converted requests in file order. Returns an empty vector
    /// when the end of the file is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransferRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<TransferCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_transfer_record(csv_record) {
                    Ok(request) => batch.push(request),
                    Err(e) => warn!("Skipping transfer row: {}", e),
                },
                Some(Err(e)) => warn!("CSV parse error: {}", e),
                None => break,
            }
        }

        batch
    }
}
