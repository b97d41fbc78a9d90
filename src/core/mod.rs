//! Core business logic module
//!
//! This module contains the transfer processing components:
//! - `traits` - Storage seams for interchangeable implementations
//! - `account_store` - In-memory account store with compare-and-swap balances
//! - `ledger` - Append-only transfer ledger
//! - `resolver` - Recipient identifier classification and lookup
//! - `engine` - Transfer orchestration
//! - `history` - Per-account history projection
//! - `provisioning` - Account key generation and seeding
//! - `batch_processor` - Sender-partitioned concurrent batch execution

pub mod account_store;
pub mod batch_processor;
pub mod engine;
pub mod history;
pub mod ledger;
pub mod provisioning;
pub mod resolver;
pub mod traits;

pub use account_store::InMemoryAccountStore;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::{EngineConfig, TransferEngine, DEFAULT_MAX_CONFLICT_RETRIES};
pub use history::{History, HistoryQuery};
pub use ledger::InMemoryLedger;
pub use provisioning::{provision, sample_accounts, AccountSeed};
pub use resolver::{IdentityResolver, DEFAULT_ALIAS_DOMAIN};
pub use traits::{AccountStore, Ledger};
