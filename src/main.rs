//! Rust Transfer Engine CLI
//!
//! Runs a batch of peer-to-peer transfers from a CSV file.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- transfers.csv > balances.csv
//! cargo run -- --accounts accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 transfers.csv > balances.csv
//! cargo run -- --ledger-out ledger.csv --log-level info transfers.csv > balances.csv
//! ```
//!
//! The program provisions the opening accounts (from `--accounts`, or the demo
//! customers), runs every transfer through the engine using the selected
//! strategy, and writes the final balances to stdout. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, bad accounts file, etc.)

use rust_transfer_engine::cli;
use rust_transfer_engine::logging;
use rust_transfer_engine::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), args.to_session_config(), config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
