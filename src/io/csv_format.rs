//! CSV format handling for transfer requests, account seeds and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `TransferCsvRecord` / `AccountCsvRecord` structures for deserialization
//! - Conversion from CSV records to domain types
//! - Balance and ledger output serialization
//!
//! Conversion functions are pure (no I/O) for easy testing; readers and
//! writers are passed in by the caller.

use crate::core::provisioning::AccountSeed;
use crate::types::{is_whole_cents, Account, KeyKind, TransferRecord, TransferRequest};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;

/// CSV record structure for transfer requests
///
/// Matches the input CSV format with columns: sender, recipient, amount, via.
/// The `via` column is optional and forces how the recipient is looked up.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferCsvRecord {
    pub sender: String,
    pub recipient: String,
    pub amount: String,
    #[serde(default)]
    pub via: Option<String>,
}

/// CSV record structure for account seeds
///
/// Columns: name, phone, balance, then optionally account_number, unique_key
/// and token. Missing identifiers are generated at provisioning time.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub name: String,
    pub phone: String,
    pub balance: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub unique_key: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

fn parse_amount(raw: &str, what: &str) -> Result<Decimal, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("Missing {}", what));
    }
    Decimal::from_str(raw).map_err(|_| format!("Invalid {} '{}'", what, raw))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convert a TransferCsvRecord to a TransferRequest
///
/// Only format problems are rejected here. Business validation (positive
/// amount, non-empty recipient) is left to the engine so those attempts are
/// reported the same way as for any other caller.
///
/// # Returns
///
/// * `Ok(TransferRequest)` - Successfully converted record
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_transfer_record(csv_record: TransferCsvRecord) -> Result<TransferRequest, String> {
    let sender = csv_record.sender.trim().to_string();
    if sender.is_empty() {
        return Err("Missing sender".to_string());
    }

    let amount = parse_amount(&csv_record.amount, "amount")
        .map_err(|e| format!("{} for transfer from {}", e, sender))?;

    let via = match non_empty(csv_record.via) {
        None => None,
        Some(via) => match via.to_lowercase().as_str() {
            "phone" => Some(KeyKind::Phone),
            "alias" => Some(KeyKind::Alias),
            "qr" => Some(KeyKind::QrToken),
            _ => {
                return Err(format!(
                    "Invalid recipient kind '{}' for transfer from {}",
                    via, sender
                ))
            }
        },
    };

    Ok(TransferRequest {
        sender,
        recipient: csv_record.recipient,
        via,
        amount,
    })
}

/// Convert an AccountCsvRecord to an AccountSeed
///
/// Rejects rows without a name or phone, and negative or sub-cent opening
/// balances.
pub fn convert_account_record(csv_record: AccountCsvRecord) -> Result<AccountSeed, String> {
    let name = csv_record.name.trim().to_string();
    let phone = csv_record.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err("Account requires a name and a phone".to_string());
    }

    let balance = parse_amount(&csv_record.balance, "balance")
        .map_err(|e| format!("{} for account {}", e, phone))?;
    if balance < Decimal::ZERO {
        return Err(format!("Negative balance {} for account {}", balance, phone));
    }
    if !is_whole_cents(balance) {
        return Err(format!(
            "Balance {} for account {} has fractions of a cent",
            balance, phone
        ));
    }

    Ok(AccountSeed {
        name,
        phone,
        balance,
        account_number: non_empty(csv_record.account_number),
        unique_key: non_empty(csv_record.unique_key),
        identity_token: non_empty(csv_record.token),
    })
}

/// Read every account seed from a CSV source
///
/// Unlike transfer rows, a bad account row is fatal: the resulting balances
/// would be meaningless.
///
/// # Returns
///
/// * `Ok(Vec<AccountSeed>)` in file order
/// * `Err(String)` naming the first bad line
pub fn read_account_seeds<R: Read>(input: R) -> Result<Vec<AccountSeed>, String> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    reader
        .deserialize::<AccountCsvRecord>()
        .enumerate()
        .map(|(index, row)| {
            // Line 1 is the header
            let line = index + 2;
            row.map_err(|e| format!("Line {}: CSV parse error: {}", line, e))
                .and_then(|record| {
                    convert_account_record(record).map_err(|e| format!("Line {}: {}", line, e))
                })
        })
        .collect()
}

/// Write final balances to CSV format
///
/// Writes accounts with columns: account, name, phone, balance.
/// Accounts are sorted by account number for deterministic output; balances
/// are printed with two decimal places, which is exact since the store and
/// engine only admit whole-cent amounts.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "name", "phone", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));

    for account in sorted_accounts {
        let balance = format!("{:.2}", account.balance);
        writer
            .write_record([
                account.account_number.as_str(),
                account.name.as_str(),
                account.phone.as_str(),
                balance.as_str(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger records to CSV format
///
/// Columns: id, timestamp (RFC 3339), sender, recipient, amount, status,
/// failure_reason. Records are written in the order given.
pub fn write_ledger_csv(records: &[TransferRecord], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "id",
            "timestamp",
            "sender",
            "recipient",
            "amount",
            "status",
            "failure_reason",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for record in records {
        writer
            .write_record([
                record.id.to_string(),
                record.timestamp.to_rfc3339(),
                record.sender.to_string(),
                record.recipient.to_string(),
                format!("{:.2}", record.amount),
                record.status.to_string(),
                record.failure_reason.clone().unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, NewAccount, Recipient, TransferAttempt, TransferId};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn transfer_record(amount: &str, via: Option<&str>) -> TransferCsvRecord {
        TransferCsvRecord {
            sender: "1234567890".to_string(),
            recipient: "2345678901".to_string(),
            amount: amount.to_string(),
            via: via.map(|s| s.to_string()),
        }
    }

    #[rstest]
    #[case::no_via(None, None)]
    #[case::empty_via(Some(""), None)]
    #[case::phone(Some("phone"), Some(KeyKind::Phone))]
    #[case::alias(Some("ALIAS"), Some(KeyKind::Alias))]
    #[case::qr(Some("qr"), Some(KeyKind::QrToken))]
    fn test_convert_transfer_record_via(#[case] via: Option<&str>, #[case] expected: Option<KeyKind>) {
        let request = convert_transfer_record(transfer_record("200.00", via)).unwrap();

        assert_eq!(request.sender, "1234567890");
        assert_eq!(request.recipient, "2345678901");
        assert_eq!(request.amount, Decimal::new(20000, 2));
        assert_eq!(request.via, expected);
    }

    #[rstest]
    #[case::invalid_amount("lots", None, "Invalid amount")]
    #[case::missing_amount("  ", None, "Missing amount")]
    #[case::invalid_via("10", Some("email"), "Invalid recipient kind")]
    fn test_convert_transfer_record_errors(
        #[case] amount: &str,
        #[case] via: Option<&str>,
        #[case] expected_error: &str,
    ) {
        let result = convert_transfer_record(transfer_record(amount, via));
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[test]
    fn test_convert_transfer_record_keeps_business_checks_for_engine() {
        // Non-positive amounts and blank recipients are the engine's call
        let mut record = transfer_record("-5", None);
        record.recipient = String::new();

        let request = convert_transfer_record(record).unwrap();

        assert_eq!(request.amount, Decimal::new(-5, 0));
        assert!(request.recipient.is_empty());
    }

    #[test]
    fn test_convert_transfer_record_missing_sender() {
        let mut record = transfer_record("1", None);
        record.sender = " ".to_string();

        assert_eq!(
            convert_transfer_record(record),
            Err("Missing sender".to_string())
        );
    }

    #[test]
    fn test_read_account_seeds_with_optional_columns() {
        let csv = "name,phone,balance,account_number,unique_key,token\n\
                   John Doe,1234567890,1000.00,ACC000001,AB12CD3,4000000001\n\
                   Jane Smith,2345678901,1500,,,\n";

        let seeds = read_account_seeds(csv.as_bytes()).unwrap();

        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].account_number.as_deref(), Some("ACC000001"));
        assert_eq!(seeds[0].unique_key.as_deref(), Some("AB12CD3"));
        assert_eq!(seeds[0].identity_token.as_deref(), Some("4000000001"));
        assert_eq!(seeds[1].balance, Decimal::new(1500, 0));
        assert_eq!(seeds[1].account_number, None);
        assert_eq!(seeds[1].unique_key, None);
    }

    #[test]
    fn test_read_account_seeds_without_optional_columns() {
        let csv = "name,phone,balance\nJohn Doe,1234567890,1000\n";

        let seeds = read_account_seeds(csv.as_bytes()).unwrap();

        assert_eq!(
            seeds,
            vec![AccountSeed::new("John Doe", "1234567890", Decimal::new(1000, 0))]
        );
    }

    #[rstest]
    #[case::negative_balance("name,phone,balance\nA,1,-1\n", "Line 2: Negative balance")]
    #[case::sub_cent_balance(
        "name,phone,balance\nA,1,10.005\n",
        "Line 2: Balance 10.005 for account 1 has fractions of a cent"
    )]
    #[case::bad_balance("name,phone,balance\nA,1,1\nB,2,abc\n", "Line 3: Invalid balance")]
    #[case::missing_phone("name,phone,balance\nA,,1\n", "Line 2: Account requires")]
    fn test_read_account_seeds_errors(#[case] csv: &str, #[case] expected_error: &str) {
        let error = read_account_seeds(csv.as_bytes()).unwrap_err();
        assert!(error.contains(expected_error), "got: {}", error);
    }

    fn account(number: &str, name: &str, phone: &str, balance: Decimal) -> Account {
        NewAccount {
            name: name.to_string(),
            phone: phone.to_string(),
            alias: format!("{}@OnePay.com", number),
            account_number: number.to_string(),
            unique_key: number.to_string(),
            identity_token: "1000000000".to_string(),
            balance,
        }
        .into_account(AccountId(1))
    }

    #[rstest]
    #[case::two_decimal_places(
        vec![account("ACC000001", "John Doe", "1234567890", Decimal::new(800, 0))],
        "account,name,phone,balance\nACC000001,John Doe,1234567890,800.00\n"
    )]
    #[case::sorted_by_account_number(
        vec![
            account("ACC000002", "Jane Smith", "2345678901", Decimal::new(17005, 1)),
            account("ACC000001", "John Doe", "1234567890", Decimal::new(1, 2)),
        ],
        "account,name,phone,balance\nACC000001,John Doe,1234567890,0.01\nACC000002,Jane Smith,2345678901,1700.50\n"
    )]
    #[case::empty_accounts(vec![], "account,name,phone,balance\n")]
    fn test_write_balances_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_balances_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_ledger_csv() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let records = vec![
            TransferRecord::from_attempt(
                TransferId(1),
                timestamp,
                TransferAttempt::succeeded(AccountId(1), AccountId(2), Decimal::new(200, 0)),
            ),
            TransferRecord::from_attempt(
                TransferId(2),
                timestamp,
                TransferAttempt::failed(
                    AccountId(1),
                    Recipient::Unresolved("ghost@OnePay.com".to_string()),
                    Decimal::new(50, 0),
                    "recipient_not_found",
                ),
            ),
        ];

        let mut output = Vec::new();
        write_ledger_csv(&records, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,timestamp,sender,recipient,amount,status,failure_reason\n\
             1,2024-05-01T12:00:00+00:00,1,2,200.00,SUCCEEDED,\n\
             2,2024-05-01T12:00:00+00:00,1,unresolved:ghost@OnePay.com,50.00,FAILED,recipient_not_found\n"
        );
    }
}
