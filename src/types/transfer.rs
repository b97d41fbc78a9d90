//! Transfer-related types for the Rust Transfer Engine
//!
//! This module defines ledger records, recipient identifiers, transfer
//! receipts and the history projection returned to callers.

use super::account::{AccountId, KeyKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Transfer record identifier
///
/// Assigned by the ledger on append. Monotonically increasing, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferId(pub u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final outcome of a transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Succeeded,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Succeeded => "SUCCEEDED",
            TransferStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipient side of a ledger record
///
/// Attempts whose recipient never resolved keep the raw caller input so the
/// audit trail still shows what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Account(AccountId),
    Unresolved(String),
}

impl Recipient {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Recipient::Account(id) => Some(*id),
            Recipient::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Account(id) => write!(f, "{}", id),
            Recipient::Unresolved(raw) => write!(f, "unresolved:{}", raw),
        }
    }
}

/// A transfer attempt about to be written to the ledger
///
/// The ledger assigns the identifier and timestamp when it appends.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferAttempt {
    pub sender: AccountId,
    pub recipient: Recipient,
    pub amount: Decimal,
    pub status: TransferStatus,

    /// Short reason for failed attempts, `None` on success
    pub failure_reason: Option<String>,
}

impl TransferAttempt {
    pub fn succeeded(sender: AccountId, recipient: AccountId, amount: Decimal) -> Self {
        Self {
            sender,
            recipient: Recipient::Account(recipient),
            amount,
            status: TransferStatus::Succeeded,
            failure_reason: None,
        }
    }

    pub fn failed(
        sender: AccountId,
        recipient: Recipient,
        amount: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            status: TransferStatus::Failed,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub id: TransferId,
    pub sender: AccountId,
    pub recipient: Recipient,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TransferStatus,
    pub failure_reason: Option<String>,
}

impl TransferRecord {
    /// Seal an attempt with its ledger-assigned identifier and write time
    pub fn from_attempt(
        id: TransferId,
        timestamp: DateTime<Utc>,
        attempt: TransferAttempt,
    ) -> Self {
        Self {
            id,
            sender: attempt.sender,
            recipient: attempt.recipient,
            amount: attempt.amount,
            timestamp,
            status: attempt.status,
            failure_reason: attempt.failure_reason,
        }
    }

    /// Whether the account appears on either side of this record
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender == account || self.recipient.account_id() == Some(account)
    }
}

/// How a caller identifies the recipient of a transfer
///
/// Produced by [`crate::core::resolver::IdentityResolver::classify`] from raw
/// input, or built directly by callers that already know the kind (a QR scanner
/// hands over a decoded payload as `QrPayload`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientIdentifier {
    Phone(String),
    Alias(String),
    QrPayload(String),
}

impl RecipientIdentifier {
    /// Tag a value with an explicitly known key kind
    pub fn from_kind(kind: KeyKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            KeyKind::Phone => RecipientIdentifier::Phone(value),
            KeyKind::Alias => RecipientIdentifier::Alias(value),
            KeyKind::QrToken => RecipientIdentifier::QrPayload(value),
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            RecipientIdentifier::Phone(_) => KeyKind::Phone,
            RecipientIdentifier::Alias(_) => KeyKind::Alias,
            RecipientIdentifier::QrPayload(_) => KeyKind::QrToken,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RecipientIdentifier::Phone(v)
            | RecipientIdentifier::Alias(v)
            | RecipientIdentifier::QrPayload(v) => v,
        }
    }
}

impl fmt::Display for RecipientIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.key_kind(), self.value())
    }
}

/// A transfer as requested by a batch caller
///
/// The sender is given by phone number; the driver resolves it to an account
/// before calling the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Sender phone number
    pub sender: String,

    /// Recipient as entered
    pub recipient: String,

    /// Explicit key kind, or `None` to classify the recipient text
    pub via: Option<KeyKind>,

    pub amount: Decimal,
}

/// Successful transfer result handed back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// The `Succeeded` ledger record
    pub record: TransferRecord,

    /// Sender's balance after the debit
    pub sender_balance: Decimal,
}

/// Direction of a history entry relative to the queried account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("SENT"),
            Direction::Received => f.write_str("RECEIVED"),
        }
    }
}

/// One line of an account's transfer history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub transfer_id: TransferId,
    pub direction: Direction,

    /// The other side of the transfer
    pub counterparty: Recipient,

    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TransferStatus,
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::phone(RecipientIdentifier::Phone("1234567890".into()), KeyKind::Phone)]
    #[case::alias(RecipientIdentifier::Alias("ABC1234@OnePay.com".into()), KeyKind::Alias)]
    #[case::qr(RecipientIdentifier::QrPayload("1ACC0000011000000000".into()), KeyKind::QrToken)]
    fn test_identifier_key_kind(#[case] identifier: RecipientIdentifier, #[case] kind: KeyKind) {
        assert_eq!(identifier.key_kind(), kind);
        assert_eq!(
            RecipientIdentifier::from_kind(kind, identifier.value()),
            identifier
        );
    }

    #[test]
    fn test_record_involves_both_sides() {
        let record = TransferRecord::from_attempt(
            TransferId(1),
            Utc::now(),
            TransferAttempt::succeeded(AccountId(1), AccountId(2), Decimal::new(5, 0)),
        );

        assert!(record.involves(AccountId(1)));
        assert!(record.involves(AccountId(2)));
        assert!(!record.involves(AccountId(3)));
    }

    #[test]
    fn test_unresolved_recipient_involves_only_sender() {
        let record = TransferRecord::from_attempt(
            TransferId(1),
            Utc::now(),
            TransferAttempt::failed(
                AccountId(1),
                Recipient::Unresolved("nobody@OnePay.com".into()),
                Decimal::new(5, 0),
                "recipient not found",
            ),
        );

        assert!(record.involves(AccountId(1)));
        assert_eq!(record.recipient.account_id(), None);
        assert_eq!(record.status, TransferStatus::Failed);
    }
}
