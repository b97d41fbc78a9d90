//! Error types for the Rust Transfer Engine
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`]: what the account store and ledger report. `Conflict` is a
//!   transient compare-and-swap loss and never leaves the engine.
//! - [`TransferError`]: the typed outcome a caller receives from the engine.
//!
//! # Error Categories
//!
//! - **Client errors**: `InvalidRequest`, never retried
//! - **Business rule failures**: `RecipientNotFound`, `InsufficientFunds`,
//!   surfaced verbatim to the user
//! - **Infrastructure failures**: `StorageFault`, safe for the caller to retry
//!   because a failed attempt never partially applies

use crate::types::{AccountId, KeyKind, UniqueField};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors reported by the account store and the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No account with this identifier
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Identifier that was looked up
        account: AccountId,
    },

    /// No account matches the alternate key exactly
    #[error("No account with {kind} '{value}'")]
    KeyNotFound {
        /// Which index was searched
        kind: KeyKind,
        /// Value that was looked up
        value: String,
    },

    /// Compare-and-swap lost: the stored balance moved since it was read
    ///
    /// Transient. Nothing was written; re-read and try again.
    #[error("Balance conflict on account {account}: expected {expected}, found {actual}")]
    Conflict {
        account: AccountId,
        expected: Decimal,
        actual: Decimal,
    },

    /// Applying the delta would drive the balance below zero
    #[error("Balance of account {account} would go negative: balance {balance}, delta {delta}")]
    NegativeBalance {
        account: AccountId,
        balance: Decimal,
        delta: Decimal,
    },

    /// Decimal arithmetic overflowed
    #[error("Arithmetic overflow applying {delta} to account {account}")]
    ArithmeticOverflow { account: AccountId, delta: Decimal },

    /// A unique field collides with an existing account
    #[error("Duplicate {field} '{value}'")]
    Duplicate {
        /// Which unique index rejected the insert
        field: UniqueField,
        /// The colliding value
        value: String,
    },

    /// Opening balance is negative or finer than whole cents
    #[error("Invalid opening balance {balance}: must be non-negative whole cents")]
    InvalidBalance { balance: Decimal },

    /// A provisioned field does not have its required format
    #[error("Malformed {field} '{value}': expected {expected}")]
    MalformedField {
        field: UniqueField,
        value: String,
        expected: &'static str,
    },

    /// Ledger record lookup missed
    #[error("Transfer record {id} not found")]
    RecordNotFound { id: u64 },

    /// The underlying storage could not complete the operation
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        StoreError::AccountNotFound { account }
    }

    /// Create a KeyNotFound error
    pub fn key_not_found(kind: KeyKind, value: &str) -> Self {
        StoreError::KeyNotFound {
            kind,
            value: value.to_string(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(account: AccountId, expected: Decimal, actual: Decimal) -> Self {
        StoreError::Conflict {
            account,
            expected,
            actual,
        }
    }

    /// Create a Duplicate error
    pub fn duplicate(field: UniqueField, value: &str) -> Self {
        StoreError::Duplicate {
            field,
            value: value.to_string(),
        }
    }

    /// Create a MalformedField error
    pub fn malformed(field: UniqueField, value: &str, expected: &'static str) -> Self {
        StoreError::MalformedField {
            field,
            value: value.to_string(),
            expected,
        }
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the error is a lost compare-and-swap that is worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Whether the lookup simply found nothing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AccountNotFound { .. } | StoreError::KeyNotFound { .. }
        )
    }
}

/// Typed outcome of a failed transfer
///
/// No variant is fatal to the engine; every call returns one of these or a
/// receipt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Malformed request: caller bug, not retried
    ///
    /// Raised before any storage or ledger write.
    #[error("Invalid transfer request: {reason}")]
    InvalidRequest { reason: String },

    /// No account matches the recipient identifier
    #[error("Recipient not found: {recipient}")]
    RecipientNotFound { recipient: String },

    /// Sender balance is below the requested amount
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    /// Storage failed or stayed contended past the retry bound
    ///
    /// Nothing was applied; the caller may retry the whole operation.
    #[error("Transfer failed due to a storage fault: {message}")]
    StorageFault { message: String },
}

impl TransferError {
    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        TransferError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create a RecipientNotFound error
    pub fn recipient_not_found(recipient: &str) -> Self {
        TransferError::RecipientNotFound {
            recipient: recipient.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        TransferError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create a StorageFault error
    pub fn storage_fault(message: impl Into<String>) -> Self {
        TransferError::StorageFault {
            message: message.into(),
        }
    }

    /// Short machine-friendly tag, used as the ledger failure reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            TransferError::InvalidRequest { .. } => "invalid_request",
            TransferError::RecipientNotFound { .. } => "recipient_not_found",
            TransferError::InsufficientFunds { .. } => "insufficient_funds",
            TransferError::StorageFault { .. } => "storage_fault",
        }
    }
}

// Storage errors reaching the caller are always reported as a generic fault
impl From<StoreError> for TransferError {
    fn from(error: StoreError) -> Self {
        TransferError::storage_fault(error.to_string())
    }
}
