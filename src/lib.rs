//! Rust Transfer Engine Library
//! # Overview
//!
//! This library moves money between customer accounts. A sender names the
//! recipient by phone number, alias (`<key>@OnePay.com`) or a scanned QR
//! payload; the engine resolves the recipient, debits and credits both
//! balances atomically, and records every attempt in an append-only ledger.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, TransferRecord, errors, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Accounts with unique lookup keys and compare-and-swap balances
//!   - [`core::ledger`] - Append-only record of transfer attempts
//!   - [`core::resolver`] - Recipient identifier classification and lookup
//!   - [`core::engine`] - Transfer orchestration with compensation and retries
//!   - [`core::history`] - Per-account history, newest first
//!   - [`core::provisioning`] - Account key generation and demo customers
//! - [`io`] - CSV input and output
//! - [`strategy`] - Sync and async batch drivers
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - tracing subscriber setup
//!
//! # Transfer Outcomes
//!
//! - **Succeeded**: both balances changed, `Succeeded` record appended
//! - **InvalidRequest**: malformed request, nothing changed or recorded
//! - **RecipientNotFound** / **InsufficientFunds**: nothing changed, `Failed` record appended
//! - **StorageFault**: nothing changed, safe to retry

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{
    AccountStore, EngineConfig, HistoryQuery, IdentityResolver, InMemoryAccountStore,
    InMemoryLedger, Ledger, TransferEngine,
};
pub use io::{write_balances_csv, write_ledger_csv};
pub use types::{
    Account, AccountId, Direction, HistoryEntry, KeyKind, NewAccount, Recipient,
    RecipientIdentifier, StoreError, TransferError, TransferId, TransferReceipt, TransferRecord,
    TransferStatus, UniqueField,
};
