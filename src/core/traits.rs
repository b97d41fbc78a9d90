//! Core traits for account storage and the transfer ledger
//!
//! The engine only talks to storage through these traits, so the in-memory
//! implementations can be swapped for a database-backed one, or wrapped to
//! inject faults in tests.

use crate::types::{
    Account, AccountId, KeyKind, NewAccount, StoreError, TransferAttempt, TransferId,
    TransferRecord,
};
use rust_decimal::Decimal;

/// Durable storage of account records
///
/// Implementations must be safe to share between threads: operations on
/// different accounts must not block each other, and balance updates on the
/// same account must be serialized.
pub trait AccountStore: Send + Sync {
    /// Provision a new account
    ///
    /// Assigns the identifier and QR-composite. Fails with
    /// `StoreError::Duplicate` if any unique field collides with an existing
    /// account, `StoreError::InvalidBalance` for a negative or sub-cent
    /// opening balance, and `StoreError::MalformedField` for a badly shaped
    /// unique key or identity token. The store is left unchanged on failure.
    fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Get an account by identifier
    fn get(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Exact-match lookup by an alternate key
    fn find_by_key(&self, kind: KeyKind, value: &str) -> Result<Account, StoreError>;

    /// Compare-and-swap balance update
    ///
    /// Applies `delta` only if the stored balance still equals
    /// `expected_balance`, returning the new balance. Otherwise fails with
    /// `StoreError::Conflict` and writes nothing. A delta that would make the
    /// balance negative is rejected with `StoreError::NegativeBalance`.
    fn apply_balance_delta(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_balance: Decimal,
    ) -> Result<Decimal, StoreError>;

    /// All accounts, sorted by identifier
    fn all_accounts(&self) -> Result<Vec<Account>, StoreError>;
}

/// Append-only log of transfer attempts
pub trait Ledger: Send + Sync {
    /// Append an attempt, assigning its identifier and timestamp
    ///
    /// Returns the sealed record. Never touches existing records.
    fn append(&self, attempt: TransferAttempt) -> Result<TransferRecord, StoreError>;

    /// Get a single record
    fn get(&self, id: TransferId) -> Result<TransferRecord, StoreError>;

    /// Records where the account is sender or recipient
    ///
    /// Ordered newest first (timestamp descending, then id descending). The
    /// result is a snapshot bounded by the records present at call time.
    fn query_for_account(&self, account: AccountId) -> Result<Vec<TransferRecord>, StoreError>;

    /// Every record, oldest first
    fn all_records(&self) -> Result<Vec<TransferRecord>, StoreError>;
}
