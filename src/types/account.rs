//! Account-related types for the Rust Transfer Engine
//!
//! This module defines the Account structure, its identifier, the alternate
//! lookup keys, and the provisioning input used to create new accounts.

use rust_decimal::Decimal;
use std::fmt;

/// Length of an account's unique key
pub const UNIQUE_KEY_LEN: usize = 7;

/// Number of digits in an identity token
pub const IDENTITY_TOKEN_LEN: usize = 10;

/// Decimal places money is kept to
pub const MONEY_SCALE: u32 = 2;

/// Whether `key` is exactly seven characters from `A-Z0-9`
pub fn is_valid_unique_key(key: &str) -> bool {
    key.len() == UNIQUE_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Whether `token` is exactly ten ASCII digits
pub fn is_valid_identity_token(token: &str) -> bool {
    token.len() == IDENTITY_TOKEN_LEN && token.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `amount` has no fraction below a cent
///
/// Trailing zeros do not count, so `1.010` is whole cents.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Account identifier
///
/// Surrogate key assigned by the account store at provisioning time.
/// Never reused and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alternate keys an account can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Phone number, e.g. `1234567890`
    Phone,
    /// Email-shaped alias, e.g. `K3Y9Z0Q@OnePay.com`
    Alias,
    /// QR-composite: phone, account number and identity token concatenated
    QrToken,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::Phone => "phone",
            KeyKind::Alias => "alias",
            KeyKind::QrToken => "qr token",
        };
        f.write_str(name)
    }
}

/// Unique account fields, used to report which index a duplicate hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Phone,
    Alias,
    AccountNumber,
    UniqueKey,
    IdentityToken,
    QrComposite,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueField::Phone => "phone",
            UniqueField::Alias => "alias",
            UniqueField::AccountNumber => "account number",
            UniqueField::UniqueKey => "unique key",
            UniqueField::IdentityToken => "identity token",
            UniqueField::QrComposite => "qr composite",
        };
        f.write_str(name)
    }
}

/// Account holder record
///
/// Every identifying field is globally unique across accounts. The balance is
/// never negative and only changes through the transfer engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Display name of the account holder
    pub name: String,

    /// Phone number
    pub phone: String,

    /// Email-shaped alias (`<unique_key><domain>`)
    pub alias: String,

    /// Account number string, e.g. `ACC000001`
    pub account_number: String,

    /// 7-character alphanumeric key
    pub unique_key: String,

    /// 10-digit numeric identity token
    pub identity_token: String,

    /// Precomputed QR-composite
    ///
    /// Stored rather than derived on lookup: none of the three parts has a fixed
    /// width, so a decoded payload cannot be split back reliably.
    pub qr_composite: String,

    /// Current balance
    pub balance: Decimal,
}

impl Account {
    /// Build the QR payload for an account's parts
    pub fn compose_qr(phone: &str, account_number: &str, identity_token: &str) -> String {
        let mut composite =
            String::with_capacity(phone.len() + account_number.len() + identity_token.len());
        composite.push_str(phone);
        composite.push_str(account_number);
        composite.push_str(identity_token);
        composite
    }

    /// Value of the given lookup key for this account
    pub fn key(&self, kind: KeyKind) -> &str {
        match kind {
            KeyKind::Phone => &self.phone,
            KeyKind::Alias => &self.alias,
            KeyKind::QrToken => &self.qr_composite,
        }
    }
}

/// Provisioning input for a new account
///
/// The store assigns the identifier and computes the QR-composite on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub phone: String,
    pub alias: String,
    pub account_number: String,
    pub unique_key: String,
    pub identity_token: String,
    pub balance: Decimal,
}

impl NewAccount {
    /// Finish the record with the store-assigned identifier
    pub fn into_account(self, id: AccountId) -> Account {
        let qr_composite =
            Account::compose_qr(&self.phone, &self.account_number, &self.identity_token);
        Account {
            id,
            name: self.name,
            phone: self.phone,
            alias: self.alias,
            account_number: self.account_number,
            unique_key: self.unique_key,
            identity_token: self.identity_token,
            qr_composite,
            balance: self.balance,
        }
    }
}
