//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account records, identifiers and lookup keys
//! - `transfer`: Ledger records, recipient identifiers and history entries
//! - `error`: Error types for the store, ledger and engine

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{
    is_valid_identity_token, is_valid_unique_key, is_whole_cents, Account, AccountId, KeyKind,
    NewAccount, UniqueField, IDENTITY_TOKEN_LEN, MONEY_SCALE, UNIQUE_KEY_LEN,
};
pub use error::{StoreError, TransferError};
pub use transfer::{
    Direction, HistoryEntry, Recipient, RecipientIdentifier, TransferAttempt, TransferId,
    TransferReceipt, TransferRecord, TransferRequest, TransferStatus,
};
