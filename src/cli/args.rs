use crate::core::{EngineConfig, DEFAULT_ALIAS_DOMAIN, DEFAULT_MAX_CONFLICT_RETRIES};
use crate::strategy::{AccountSource, BatchConfig, SessionConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Run a batch of peer-to-peer transfers
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(about = "Run a batch of peer-to-peer fund transfers", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing transfer requests
    #[arg(value_name = "INPUT", help = "Path to the transfers CSV file")]
    pub input_file: PathBuf,

    /// Opening accounts; the demo customers are used when omitted
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "Accounts CSV (name,phone,balance[,account_number,unique_key,token])"
    )]
    pub accounts_file: Option<PathBuf>,

    /// Seed for generated account keys
    #[arg(
        long = "seed",
        value_name = "SEED",
        env = "TRANSFER_SEED",
        default_value_t = 1,
        help = "RNG seed for generated keys and tokens"
    )]
    pub seed: u64,

    /// Write every ledger record to this file
    #[arg(long = "ledger-out", value_name = "FILE", help = "Write the ledger as CSV")]
    pub ledger_out: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for file order or 'async' for parallel batches"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Retries after a lost balance update
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        env = "TRANSFER_MAX_RETRIES",
        default_value_t = DEFAULT_MAX_CONFLICT_RETRIES,
        help = "Retries after a concurrent balance update"
    )]
    pub max_conflict_retries: u32,

    /// Domain that marks a recipient as an alias
    #[arg(
        long = "alias-domain",
        value_name = "DOMAIN",
        env = "TRANSFER_ALIAS_DOMAIN",
        default_value = DEFAULT_ALIAS_DOMAIN,
        help = "Alias domain suffix, e.g. @OnePay.com"
    )]
    pub alias_domain: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        env = "TRANSFER_LOG_LEVEL",
        default_value = "warn",
        help = "Log level or filter directive; logs go to stderr"
    )]
    pub log_level: String,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Unset values fall back to defaults; zero values are replaced with the
    /// defaults and a warning is logged.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create the session settings shared by every strategy
    pub fn to_session_config(&self) -> SessionConfig {
        let accounts = match &self.accounts_file {
            Some(path) => AccountSource::File(path.clone()),
            None => AccountSource::Sample,
        };

        SessionConfig {
            accounts,
            engine: EngineConfig {
                max_conflict_retries: self.max_conflict_retries,
                alias_domain: self.alias_domain.clone(),
            },
            ledger_out: self.ledger_out.clone(),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Sync)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "input.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], None, Some(8))]
    #[case::no_options(&["program", "input.csv"], None, None)]
    fn test_batch_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent_batches, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::all_custom(
        &["program", "--batch-size", "2000", "--max-concurrent", "8", "input.csv"],
        2000,
        8
    )]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_session_config_defaults() {
        let session = CliArgs::try_parse_from(["program", "input.csv"])
            .unwrap()
            .to_session_config();

        assert_eq!(session.accounts, AccountSource::Sample);
        assert_eq!(session.seed, 1);
        assert_eq!(session.engine, EngineConfig::default());
        assert_eq!(session.ledger_out, None);
    }

    #[test]
    fn test_session_config_from_options() {
        let session = CliArgs::try_parse_from([
            "program",
            "--accounts",
            "accounts.csv",
            "--ledger-out",
            "ledger.csv",
            "--max-retries",
            "5",
            "--alias-domain",
            "@bank.test",
            "--seed",
            "7",
            "input.csv",
        ])
        .unwrap()
        .to_session_config();

        assert_eq!(
            session.accounts,
            AccountSource::File(PathBuf::from("accounts.csv"))
        );
        assert_eq!(session.ledger_out, Some(PathBuf::from("ledger.csv")));
        assert_eq!(session.engine.max_conflict_retries, 5);
        assert_eq!(session.engine.alias_domain, "@bank.test");
        assert_eq!(session.seed, 7);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::negative_retries(&["program", "--max-retries", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
