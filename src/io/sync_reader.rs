//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over transfer requests from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV records
//! sequentially, delegating conversion to the csv_format module. Records are
//! processed one at a time without loading the entire file into memory.
//!
//! ```no_run
//! use rust_transfer_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("transfers.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Transfer: {:?}", request),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{convert_transfer_record, TransferCsvRecord};
use crate::types::TransferRequest;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Provides an iterator interface over transfer requests.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (for the optional `via` column)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransferRequest, String>;

    /// Get the next transfer request from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(TransferRequest))` - Successfully parsed record
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<TransferCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        // +1 for the header row
        let line = self.line_num + 1;
        Some(match row {
            Ok(csv_record) => {
                convert_transfer_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}
