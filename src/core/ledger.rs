//! Append-only transfer ledger
//!
//! This module provides the `InMemoryLedger` component that records every
//! transfer attempt, successful or not. It is the audit trail: records are
//! never updated or removed once appended.
//!
//! # Ordering
//!
//! Identifiers are assigned in append order starting at 1. Timestamps come
//! from the UTC clock at write time and are clamped so they never run
//! backwards, which keeps "newest first" by timestamp consistent with the
//! identifier order.
//!
//! # Per-account Index
//!
//! Each account keeps the identifiers of the records it appears in, so a
//! history query never scans the whole ledger.

use crate::core::traits::Ledger;
use crate::types::{AccountId, StoreError, TransferAttempt, TransferId, TransferRecord};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::RwLock;

/// In-memory append-only ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Records in append order; record `n` lives at index `n - 1`
    records: RwLock<Vec<TransferRecord>>,

    /// Record identifiers per counterparty, in append order
    by_account: DashMap<AccountId, Vec<TransferId>>,
}

impl InMemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::unavailable("ledger lock poisoned")
}

impl Ledger for InMemoryLedger {
    fn append(&self, attempt: TransferAttempt) -> Result<TransferRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;

        let id = TransferId(records.len() as u64 + 1);
        let now = Utc::now();
        let timestamp = match records.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let record = TransferRecord::from_attempt(id, timestamp, attempt);

        // Index while still holding the write lock so readers never see an id
        // without its record
        self.by_account.entry(record.sender).or_default().push(id);
        if let Some(recipient) = record.recipient.account_id() {
            if recipient != record.sender {
                self.by_account.entry(recipient).or_default().push(id);
            }
        }

        records.push(record.clone());
        Ok(record)
    }

    fn get(&self, id: TransferId) -> Result<TransferRecord, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        id.0.checked_sub(1)
            .and_then(|index| records.get(index as usize))
            .cloned()
            .ok_or(StoreError::RecordNotFound { id: id.0 })
    }

    fn query_for_account(&self, account: AccountId) -> Result<Vec<TransferRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;

        let ids = match self.by_account.get(&account) {
            Some(entry) => entry.value().clone(),
            None => return Ok(Vec::new()),
        };

        let mut matching: Vec<TransferRecord> = ids
            .iter()
            .filter_map(|id| records.get(id.0 as usize - 1))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(matching)
    }

    fn all_records(&self) -> Result<Vec<TransferRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.clone())
    }
}
