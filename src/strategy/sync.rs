//! Synchronous processing strategy
//!
//! Single-threaded implementation of the ProcessingStrategy trait. Transfers
//! run strictly in file order, which makes the outcome of every row
//! deterministic.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - Account seeding and output to the shared session helpers
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Transfers to `TransferEngine::submit`

use crate::io::sync_reader::SyncReader;
use crate::strategy::{close_session, open_session, ProcessingStrategy, SessionConfig};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_transfer_engine::strategy::{ProcessingStrategy, SessionConfig, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(SessionConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("transfers.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    session: SessionConfig,
}

impl SyncProcessingStrategy {
    pub fn new(session: SessionConfig) -> Self {
        Self { session }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Process transfers one at a time in file order
    ///
    /// Fatal errors (missing files, bad account rows, I/O errors) are returned
    /// immediately. Malformed transfer rows and failed transfers are logged
    /// and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let engine = open_session(&self.session)?;
        let reader = SyncReader::new(input_path)?;

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for result in reader {
            match result {
                Ok(request) => match engine.submit(&request) {
                    Ok(_) => succeeded += 1,
                    Err(e) => {
                        failed += 1;
                        debug!(sender = %request.sender, recipient = %request.recipient, error = %e, "transfer row failed");
                    }
                },
                Err(e) => warn!("Skipping transfer row: {}", e),
            }
        }
        info!(succeeded, failed, "transfers processed");

        close_session(&engine, &self.session, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_strategy_processes_transfer() {
        let file = create_temp_csv("sender,recipient,amount\n1234567890,2345678901,200\n");
        let strategy = SyncProcessingStrategy::new(SessionConfig::default());
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.starts_with("account,name,phone,balance\n"));
        assert!(output_str.contains("ACC000001,John Doe,1234567890,800.00"));
        assert!(output_str.contains("ACC000002,Jane Smith,2345678901,1700.00"));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncProcessingStrategy::new(SessionConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_continues_on_malformed_record() {
        let csv_content = "sender,recipient,amount\n\
                           1234567890,2345678901,100\n\
                           1234567890,2345678901,invalid\n\
                           1234567890,2345678901,50\n";
        let file = create_temp_csv(csv_content);
        let strategy = SyncProcessingStrategy::new(SessionConfig::default());
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("ACC000001,John Doe,1234567890,850.00"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
