//! Account provisioning
//!
//! Generates the identifying fields of a new account (account number, unique
//! key, alias, identity token) and inserts it into the store. Generated
//! values are random, so a collision with an existing account is possible;
//! the colliding field is regenerated and the insert retried.
//!
//! All randomness comes from a caller-supplied RNG so seeded runs are
//! reproducible.

use crate::core::traits::AccountStore;
use crate::types::{Account, NewAccount, StoreError, UniqueField, UNIQUE_KEY_LEN};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

const UNIQUE_KEY_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_PROVISION_ATTEMPTS: u32 = 16;

/// Generate a 7-character key from `A-Z0-9`
pub fn generate_unique_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..UNIQUE_KEY_LEN)
        .map(|_| UNIQUE_KEY_CHARS[rng.gen_range(0..UNIQUE_KEY_CHARS.len())] as char)
        .collect()
}

/// Generate a 10-digit identity token
pub fn generate_identity_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(1_000_000_000u64..=9_999_999_999u64).to_string()
}

/// Account number for a provisioning sequence number, e.g. `ACC000001`
pub fn account_number(sequence: u64) -> String {
    format!("ACC{:06}", sequence)
}

/// Caller-supplied part of a new account
///
/// Fields left as `None` are generated during provisioning.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSeed {
    pub name: String,
    pub phone: String,
    pub balance: Decimal,
    pub account_number: Option<String>,
    pub unique_key: Option<String>,
    pub identity_token: Option<String>,
}

impl AccountSeed {
    /// Seed with every identifying field left to the generator
    pub fn new(name: impl Into<String>, phone: impl Into<String>, balance: Decimal) -> Self {
        AccountSeed {
            name: name.into(),
            phone: phone.into(),
            balance,
            account_number: None,
            unique_key: None,
            identity_token: None,
        }
    }
}

/// The ten demo customers
///
/// Balances start at 1000 and grow by 500 per customer.
pub fn sample_accounts() -> Vec<AccountSeed> {
    const CUSTOMERS: [(&str, &str); 10] = [
        ("John Doe", "1234567890"),
        ("Jane Smith", "2345678901"),
        ("Mike Johnson", "3456789012"),
        ("Sarah Wilson", "4567890123"),
        ("David Brown", "5678901234"),
        ("Emily Davis", "6789012345"),
        ("Chris Miller", "7890123456"),
        ("Lisa Garcia", "8901234567"),
        ("Robert Martinez", "9012345678"),
        ("Amanda Taylor", "0123456789"),
    ];

    CUSTOMERS
        .iter()
        .zip(0i64..)
        .map(|((name, phone), i)| AccountSeed {
            account_number: Some(account_number(i as u64 + 1)),
            ..AccountSeed::new(*name, *phone, Decimal::new(1000 + i * 500, 0))
        })
        .collect()
}

/// Create an account, generating whatever the seed leaves open
///
/// # Arguments
///
/// * `store` - Store to insert into
/// * `rng` - Source of randomness for generated keys
/// * `seed` - Name, phone, balance and any fixed identifiers
/// * `alias_domain` - Suffix appended to the unique key to form the alias
///
/// # Errors
///
/// Returns `StoreError::Duplicate` when a caller-supplied field collides, or
/// when generated fields keep colliding past the attempt bound. A negative or
/// sub-cent balance, or a malformed caller-supplied key or token, is rejected
/// by the store as `InvalidBalance` or `MalformedField`.
pub fn provision<S: AccountStore + ?Sized, R: Rng + ?Sized>(
    store: &S,
    rng: &mut R,
    seed: AccountSeed,
    alias_domain: &str,
) -> Result<Account, StoreError> {
    let mut sequence = store.all_accounts()?.len() as u64 + 1;
    let mut generated_number = None;
    let mut generated_key = None;
    let mut generated_token = None;
    let mut attempts = 0;

    loop {
        attempts += 1;

        let number = match &seed.account_number {
            Some(number) => number.clone(),
            None => generated_number
                .get_or_insert_with(|| account_number(sequence))
                .clone(),
        };
        let key = match &seed.unique_key {
            Some(key) => key.clone(),
            None => generated_key
                .get_or_insert_with(|| generate_unique_key(rng))
                .clone(),
        };
        let token = match &seed.identity_token {
            Some(token) => token.clone(),
            None => generated_token
                .get_or_insert_with(|| generate_identity_token(rng))
                .clone(),
        };

        let account = NewAccount {
            name: seed.name.clone(),
            phone: seed.phone.clone(),
            alias: format!("{}{}", key, alias_domain),
            account_number: number,
            unique_key: key,
            identity_token: token,
            balance: seed.balance,
        };

        let field = match store.insert(account) {
            Ok(account) => return Ok(account),
            Err(StoreError::Duplicate { field, value }) if attempts < MAX_PROVISION_ATTEMPTS => {
                debug!(%field, %value, attempts, "provisioning collision");
                field
            }
            Err(e) => return Err(e),
        };

        // Regenerate the colliding value if it was ours, otherwise give up
        let regenerated = match field {
            UniqueField::AccountNumber if seed.account_number.is_none() => {
                sequence += 1;
                generated_number = None;
                true
            }
            UniqueField::UniqueKey | UniqueField::Alias if seed.unique_key.is_none() => {
                generated_key = None;
                true
            }
            UniqueField::IdentityToken | UniqueField::QrComposite
                if seed.identity_token.is_none() =>
            {
                generated_token = None;
                true
            }
            _ => false,
        };

        if !regenerated {
            return Err(StoreError::Duplicate {
                field,
                value: seed_value(&seed, field),
            });
        }
    }
}

fn seed_value(seed: &AccountSeed, field: UniqueField) -> String {
    let value = match field {
        UniqueField::Phone => Some(&seed.phone),
        UniqueField::AccountNumber => seed.account_number.as_ref(),
        UniqueField::UniqueKey | UniqueField::Alias => seed.unique_key.as_ref(),
        UniqueField::IdentityToken => seed.identity_token.as_ref(),
        UniqueField::QrComposite => None,
    };
    value.cloned().unwrap_or_default()
}
