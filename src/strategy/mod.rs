//! Processing strategy module for batch transfer runs
//!
//! This module defines the Strategy pattern for complete batch pipelines:
//! seeding accounts, reading transfer requests, running them through the
//! engine and writing final balances. Different implementations (synchronous,
//! asynchronous batch) can be selected at runtime.

use crate::cli::StrategyType;
use crate::core::{
    provision, sample_accounts, AccountSeed, AccountStore, EngineConfig, InMemoryAccountStore,
    InMemoryLedger, Ledger, TransferEngine,
};
use crate::io::csv_format::{read_account_seeds, write_balances_csv, write_ledger_csv};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Engine wired to the in-memory store and ledger
pub type InMemoryEngine = TransferEngine<InMemoryAccountStore, InMemoryLedger>;

/// Where the opening accounts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSource {
    /// Accounts CSV (`name,phone,balance[,account_number,unique_key,token]`)
    File(PathBuf),

    /// The built-in demo customers
    Sample,
}

/// Settings shared by every strategy
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub accounts: AccountSource,
    pub engine: EngineConfig,

    /// Where to write the full ledger as CSV, if anywhere
    pub ledger_out: Option<PathBuf>,

    /// RNG seed for every generated key, token and account number
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accounts: AccountSource::Sample,
            engine: EngineConfig::default(),
            ledger_out: None,
            seed: 1,
        }
    }
}

/// Processing strategy trait for complete batch pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Process transfers from input file and write final balances to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the transfers CSV
    /// * `output` - Writer for the balances CSV
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the run completed (individual transfers may have failed)
    /// * `Err(String)` if a fatal error occurred
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The transfers or accounts file cannot be opened
    /// - An account row is malformed or collides with another account
    /// - Output cannot be written
    ///
    /// Failed transfers and malformed transfer rows are logged and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `session` - Account source, engine settings and ledger output
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    session: SessionConfig,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(session)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(session, config))
        }
    }
}

/// Build an engine and provision the opening accounts
pub(crate) fn open_session(session: &SessionConfig) -> Result<InMemoryEngine, String> {
    let seeds: Vec<AccountSeed> = match &session.accounts {
        AccountSource::File(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
            read_account_seeds(file)
                .map_err(|e| format!("Invalid accounts file '{}': {}", path.display(), e))?
        }
        AccountSource::Sample => sample_accounts(),
    };

    let store = Arc::new(InMemoryAccountStore::new());
    let mut rng = StdRng::seed_from_u64(session.seed);
    for account in seeds {
        let phone = account.phone.clone();
        provision(store.as_ref(), &mut rng, account, &session.engine.alias_domain)
            .map_err(|e| format!("Failed to provision account {}: {}", phone, e))?;
    }
    info!(accounts = store.len(), "accounts provisioned");

    Ok(TransferEngine::with_config(
        store,
        Arc::new(InMemoryLedger::new()),
        session.engine.clone(),
    ))
}

/// Write final balances, and the ledger if requested
pub(crate) fn close_session(
    engine: &InMemoryEngine,
    session: &SessionConfig,
    output: &mut dyn Write,
) -> Result<(), String> {
    let accounts = engine
        .store()
        .all_accounts()
        .map_err(|e| format!("Failed to read accounts: {}", e))?;
    write_balances_csv(&accounts, output)?;

    if let Some(path) = &session.ledger_out {
        let records = engine
            .ledger()
            .all_records()
            .map_err(|e| format!("Failed to read ledger: {}", e))?;
        let file = File::create(path)
            .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))?;
        let mut writer = BufWriter::new(file);
        write_ledger_csv(&records, &mut writer)?;
        info!(records = records.len(), path = %path.display(), "ledger written");
    }

    Ok(())
}
