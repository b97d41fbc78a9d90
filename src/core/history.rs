//! Per-account transfer history
//!
//! A read-only projection over the ledger. Each record the account appears in
//! becomes one [`HistoryEntry`] seen from that account's side: `Sent` when it
//! is the sender, `Received` otherwise.
//!
//! The ledger query is taken as a snapshot when [`HistoryQuery::history_for`]
//! is called; the returned [`History`] iterator projects records lazily and
//! never observes transfers appended afterwards.

use crate::core::traits::Ledger;
use crate::types::{AccountId, Direction, HistoryEntry, Recipient, TransferError, TransferRecord};
use std::sync::Arc;
use std::vec;

/// History reader bound to a ledger
pub struct HistoryQuery<L> {
    ledger: Arc<L>,
}

impl<L> Clone for HistoryQuery<L> {
    fn clone(&self) -> Self {
        HistoryQuery {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: Ledger> HistoryQuery<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        HistoryQuery { ledger }
    }

    /// Transfer history for one account, newest first
    ///
    /// Includes failed attempts. An account that never sent or received
    /// anything (or does not exist) yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::StorageFault` if the ledger cannot be read.
    pub fn history_for(&self, account: AccountId) -> Result<History, TransferError> {
        let records = self.ledger.query_for_account(account)?;
        Ok(History {
            account,
            records: records.into_iter(),
        })
    }
}

/// Iterator over an account's history entries
///
/// Cloning restarts from the current position without another ledger query.
#[derive(Debug, Clone)]
pub struct History {
    account: AccountId,
    records: vec::IntoIter<TransferRecord>,
}

impl History {
    fn project(&self, record: TransferRecord) -> HistoryEntry {
        let (direction, counterparty) = if record.sender == self.account {
            (Direction::Sent, record.recipient)
        } else {
            (Direction::Received, Recipient::Account(record.sender))
        };

        HistoryEntry {
            transfer_id: record.id,
            direction,
            counterparty,
            amount: record.amount,
            timestamp: record.timestamp,
            status: record.status,
            failure_reason: record.failure_reason,
        }
    }
}

impl Iterator for History {
    type Item = HistoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(self.project(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for History {}
