//! Thread-safe account storage
//!
//! This module provides the `InMemoryAccountStore` struct, which holds account
//! records and their unique lookup indexes in concurrent maps.
//!
//! # Design
//!
//! Accounts live in a `DashMap` keyed by `AccountId`. Each unique field (phone,
//! alias, account number, unique key, identity token and QR-composite) has its
//! own `DashMap` index pointing back at the account id.
//!
//! # Thread Safety
//!
//! - Balance updates lock only the shard holding the account, so transfers on
//!   disjoint accounts proceed in parallel
//! - `apply_balance_delta` compares and writes while holding the entry lock,
//!   so exactly one of two racing writers wins and the other sees `Conflict`
//! - Inserts are serialized by a mutex so the uniqueness check and the index
//!   writes happen as one step
//!
//! # Provisioning Rules
//!
//! An insert is rejected, leaving the store unchanged, when the opening
//! balance is negative or finer than whole cents, the unique key is not seven
//! characters from `A-Z0-9`, or the identity token is not ten digits.

use crate::core::traits::AccountStore;
use crate::types::{
    is_valid_identity_token, is_valid_unique_key, is_whole_cents, Account, AccountId, KeyKind,
    NewAccount, StoreError, UniqueField,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Concurrent in-memory account store
#[derive(Debug)]
pub struct InMemoryAccountStore {
    /// Account records by identifier
    accounts: DashMap<AccountId, Account>,

    by_phone: DashMap<String, AccountId>,
    by_alias: DashMap<String, AccountId>,
    by_account_number: DashMap<String, AccountId>,
    by_unique_key: DashMap<String, AccountId>,
    by_identity_token: DashMap<String, AccountId>,
    by_qr_composite: DashMap<String, AccountId>,

    /// Next identifier to hand out
    next_id: AtomicU64,

    /// Serializes inserts across all unique indexes
    insert_lock: Mutex<()>,
}

impl InMemoryAccountStore {
    /// Create a new empty store
    ///
    /// Identifiers are assigned from 1 upwards.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            by_phone: DashMap::new(),
            by_alias: DashMap::new(),
            by_account_number: DashMap::new(),
            by_unique_key: DashMap::new(),
            by_identity_token: DashMap::new(),
            by_qr_composite: DashMap::new(),
            next_id: AtomicU64::new(1),
            insert_lock: Mutex::new(()),
        }
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account has been provisioned yet
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn index(&self, field: UniqueField) -> &DashMap<String, AccountId> {
        match field {
            UniqueField::Phone => &self.by_phone,
            UniqueField::Alias => &self.by_alias,
            UniqueField::AccountNumber => &self.by_account_number,
            UniqueField::UniqueKey => &self.by_unique_key,
            UniqueField::IdentityToken => &self.by_identity_token,
            UniqueField::QrComposite => &self.by_qr_composite,
        }
    }

    fn unique_values(account: &Account) -> [(UniqueField, &str); 6] {
        [
            (UniqueField::Phone, account.phone.as_str()),
            (UniqueField::Alias, account.alias.as_str()),
            (UniqueField::AccountNumber, account.account_number.as_str()),
            (UniqueField::UniqueKey, account.unique_key.as_str()),
            // Equal composites always share a token, report the composite
            (UniqueField::QrComposite, account.qr_composite.as_str()),
            (UniqueField::IdentityToken, account.identity_token.as_str()),
        ]
    }

    fn validate(account: &NewAccount) -> Result<(), StoreError> {
        if account.balance < Decimal::ZERO || !is_whole_cents(account.balance) {
            return Err(StoreError::InvalidBalance {
                balance: account.balance,
            });
        }
        if !is_valid_unique_key(&account.unique_key) {
            return Err(StoreError::malformed(
                UniqueField::UniqueKey,
                &account.unique_key,
                "7 characters from A-Z0-9",
            ));
        }
        if !is_valid_identity_token(&account.identity_token) {
            return Err(StoreError::malformed(
                UniqueField::IdentityToken,
                &account.identity_token,
                "10 digits",
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        Self::validate(&account)?;

        let _guard = self
            .insert_lock
            .lock()
            .map_err(|_| StoreError::unavailable("account index lock poisoned"))?;

        // Placeholder id until every index has accepted the values
        let mut account = account.into_account(AccountId(0));

        for (field, value) in Self::unique_values(&account) {
            if self.index(field).contains_key(value) {
                return Err(StoreError::duplicate(field, value));
            }
        }

        account.id = AccountId(self.next_id.fetch_add(1, Ordering::SeqCst));

        for (field, value) in Self::unique_values(&account) {
            self.index(field).insert(value.to_string(), account.id);
        }
        self.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    fn find_by_key(&self, kind: KeyKind, value: &str) -> Result<Account, StoreError> {
        let field = match kind {
            KeyKind::Phone => UniqueField::Phone,
            KeyKind::Alias => UniqueField::Alias,
            KeyKind::QrToken => UniqueField::QrComposite,
        };

        let id = self
            .index(field)
            .get(value)
            .map(|entry| *entry.value())
            .ok_or_else(|| StoreError::key_not_found(kind, value))?;

        self.get(id)
    }

    fn apply_balance_delta(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_balance: Decimal,
    ) -> Result<Decimal, StoreError> {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::account_not_found(id))?;
        let account = entry.value_mut();

        if account.balance != expected_balance {
            return Err(StoreError::conflict(id, expected_balance, account.balance));
        }

        let new_balance = account
            .balance
            .checked_add(delta)
            .ok_or(StoreError::ArithmeticOverflow { account: id, delta })?;

        if new_balance < Decimal::ZERO {
            return Err(StoreError::NegativeBalance {
                account: id,
                balance: account.balance,
                delta,
            });
        }

        account.balance = new_balance;
        Ok(new_balance)
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn new_account(n: u32, balance: Decimal) -> NewAccount {
        NewAccount {
            name: format!("Customer {}", n),
            phone: format!("55500000{:02}", n),
            alias: format!("KEY{:04}@OnePay.com", n),
            account_number: format!("ACC{:06}", n),
            unique_key: format!("KEY{:04}", n),
            identity_token: format!("10000000{:02}", n),
            balance,
        }
    }

    #[test]
    fn test_new_creates_empty_store() {
        let store = InMemoryAccountStore::new();
        assert!(store.is_empty());
        assert_eq!(store.all_accounts().unwrap().len(), 0);
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = InMemoryAccountStore::new();

        let first = store.insert(new_account(1, Decimal::ONE)).unwrap();
        let second = store.insert(new_account(2, Decimal::ONE)).unwrap();

        assert_eq!(first.id, AccountId(1));
        assert_eq!(second.id, AccountId(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_insert_stores_qr_composite() {
        let store = InMemoryAccountStore::new();

        let account = store.insert(new_account(1, Decimal::ONE)).unwrap();

        assert_eq!(account.qr_composite, "5550000001ACC0000011000000001");
        assert_eq!(store.get(account.id).unwrap(), account);
    }

    #[rstest]
    #[case::phone(UniqueField::Phone)]
    #[case::alias(UniqueField::Alias)]
    #[case::account_number(UniqueField::AccountNumber)]
    #[case::unique_key(UniqueField::UniqueKey)]
    #[case::identity_token(UniqueField::IdentityToken)]
    fn test_insert_rejects_duplicate_field(#[case] field: UniqueField) {
        let store = InMemoryAccountStore::new();
        let original = store.insert(new_account(1, Decimal::ONE)).unwrap();

        let mut clash = new_account(2, Decimal::ONE);
        match field {
            UniqueField::Phone => clash.phone = original.phone.clone(),
            UniqueField::Alias => clash.alias = original.alias.clone(),
            UniqueField::AccountNumber => clash.account_number = original.account_number.clone(),
            UniqueField::UniqueKey => clash.unique_key = original.unique_key.clone(),
            UniqueField::IdentityToken => clash.identity_token = original.identity_token.clone(),
            UniqueField::QrComposite => unreachable!(),
        }

        let result = store.insert(clash);

        assert!(matches!(
            result,
            Err(StoreError::Duplicate { field: f, .. }) if f == field
        ));
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[case::negative_balance(
        NewAccount { balance: Decimal::new(-500, 0), ..new_account(1, Decimal::ONE) },
        StoreError::InvalidBalance { balance: Decimal::new(-500, 0) }
    )]
    #[case::sub_cent_balance(
        NewAccount { balance: Decimal::new(1005, 3), ..new_account(1, Decimal::ONE) },
        StoreError::InvalidBalance { balance: Decimal::new(1005, 3) }
    )]
    #[case::short_unique_key(
        NewAccount { unique_key: "KEY01".to_string(), ..new_account(1, Decimal::ONE) },
        StoreError::malformed(UniqueField::UniqueKey, "KEY01", "7 characters from A-Z0-9")
    )]
    #[case::lowercase_unique_key(
        NewAccount { unique_key: "key0001".to_string(), ..new_account(1, Decimal::ONE) },
        StoreError::malformed(UniqueField::UniqueKey, "key0001", "7 characters from A-Z0-9")
    )]
    #[case::short_token(
        NewAccount { identity_token: "12345".to_string(), ..new_account(1, Decimal::ONE) },
        StoreError::malformed(UniqueField::IdentityToken, "12345", "10 digits")
    )]
    #[case::non_numeric_token(
        NewAccount { identity_token: "10000000AB".to_string(), ..new_account(1, Decimal::ONE) },
        StoreError::malformed(UniqueField::IdentityToken, "10000000AB", "10 digits")
    )]
    fn test_insert_rejects_invalid_account(#[case] account: NewAccount, #[case] expected: StoreError) {
        let store = InMemoryAccountStore::new();

        assert_eq!(store.insert(account), Err(expected));
        assert!(store.is_empty());
        assert!(store.find_by_key(KeyKind::Phone, "5550000001").is_err());
        assert!(store.insert(new_account(1, Decimal::ONE)).is_ok());
    }

    #[test]
    fn test_insert_accepts_zero_and_whole_cent_balances() {
        let store = InMemoryAccountStore::new();

        assert!(store.insert(new_account(1, Decimal::ZERO)).is_ok());
        assert!(store.insert(new_account(2, Decimal::new(1010, 3))).is_ok());
    }

    #[test]
    fn test_insert_rejects_duplicate_qr_composite_from_different_parts() {
        let store = InMemoryAccountStore::new();
        let mut first = new_account(1, Decimal::ONE);
        first.phone = "555".to_string();
        first.account_number = "ACC1".to_string();
        first.identity_token = "0000000001".to_string();
        store.insert(first).unwrap();

        // "555A" + "CC1" + the same token composes to the same payload
        let mut second = new_account(2, Decimal::ONE);
        second.phone = "555A".to_string();
        second.account_number = "CC1".to_string();
        second.identity_token = "0000000001".to_string();

        let result = store.insert(second);

        assert!(matches!(
            result,
            Err(StoreError::Duplicate {
                field: UniqueField::QrComposite,
                ..
            })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failed_insert_leaves_indexes_untouched() {
        let store = InMemoryAccountStore::new();
        store.insert(new_account(1, Decimal::ONE)).unwrap();

        let mut clash = new_account(2, Decimal::ONE);
        clash.identity_token = "1000000001".to_string();
        assert!(store.insert(clash).is_err());

        // The non-colliding phone of the rejected account must still be free
        assert!(store.find_by_key(KeyKind::Phone, "5550000002").is_err());
        assert!(store.insert(new_account(2, Decimal::ONE)).is_ok());
    }

    #[rstest]
    #[case::phone(KeyKind::Phone, "5550000001")]
    #[case::alias(KeyKind::Alias, "KEY0001@OnePay.com")]
    #[case::qr(KeyKind::QrToken, "5550000001ACC0000011000000001")]
    fn test_find_by_key_exact_match(#[case] kind: KeyKind, #[case] value: &str) {
        let store = InMemoryAccountStore::new();
        let account = store.insert(new_account(1, Decimal::ONE)).unwrap();

        assert_eq!(store.find_by_key(kind, value).unwrap().id, account.id);
    }

    #[rstest]
    #[case::phone_prefix(KeyKind::Phone, "555000000")]
    #[case::alias_case(KeyKind::Alias, "key0001@onepay.com")]
    #[case::qr_partial(KeyKind::QrToken, "5550000001ACC000001")]
    #[case::phone_as_qr(KeyKind::QrToken, "5550000001")]
    fn test_find_by_key_rejects_partial_match(#[case] kind: KeyKind, #[case] value: &str) {
        let store = InMemoryAccountStore::new();
        store.insert(new_account(1, Decimal::ONE)).unwrap();

        let result = store.find_by_key(kind, value);
        assert!(matches!(result, Err(StoreError::KeyNotFound { .. })));
    }

    #[test]
    fn test_apply_balance_delta_applies_when_expected_matches() {
        let store = InMemoryAccountStore::new();
        let account = store.insert(new_account(1, Decimal::new(1000, 0))).unwrap();

        let new_balance = store
            .apply_balance_delta(account.id, Decimal::new(-200, 0), Decimal::new(1000, 0))
            .unwrap();

        assert_eq!(new_balance, Decimal::new(800, 0));
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::new(800, 0));
    }

    #[test]
    fn test_apply_balance_delta_conflict_on_stale_balance() {
        let store = InMemoryAccountStore::new();
        let account = store.insert(new_account(1, Decimal::new(1000, 0))).unwrap();

        let result =
            store.apply_balance_delta(account.id, Decimal::new(-200, 0), Decimal::new(900, 0));

        assert_eq!(
            result,
            Err(StoreError::conflict(
                account.id,
                Decimal::new(900, 0),
                Decimal::new(1000, 0)
            ))
        );
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::new(1000, 0));
    }

    #[test]
    fn test_apply_balance_delta_rejects_negative_result() {
        let store = InMemoryAccountStore::new();
        let account = store.insert(new_account(1, Decimal::new(100, 0))).unwrap();

        let result =
            store.apply_balance_delta(account.id, Decimal::new(-500, 0), Decimal::new(100, 0));

        assert!(matches!(result, Err(StoreError::NegativeBalance { .. })));
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_apply_balance_delta_unknown_account() {
        let store = InMemoryAccountStore::new();

        let result = store.apply_balance_delta(AccountId(42), Decimal::ONE, Decimal::ZERO);

        assert_eq!(result, Err(StoreError::account_not_found(AccountId(42))));
    }

    #[test]
    fn test_compare_and_swap_admits_exactly_one_racing_writer() {
        const WRITERS: usize = 8;
        let store = Arc::new(InMemoryAccountStore::new());
        let account = store.insert(new_account(1, Decimal::new(1000, 0))).unwrap();
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.apply_balance_delta(
                        account.id,
                        Decimal::new(-10, 0),
                        Decimal::new(1000, 0),
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_conflict()))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(conflicts, WRITERS - 1);
        assert_eq!(store.get(account.id).unwrap().balance, Decimal::new(990, 0));
    }

    #[test]
    fn test_all_accounts_sorted_by_id() {
        let store = InMemoryAccountStore::new();
        for n in 1..=5 {
            store.insert(new_account(n, Decimal::ONE)).unwrap();
        }

        let ids: Vec<u64> = store
            .all_accounts()
            .unwrap()
            .iter()
            .map(|a| a.id.0)
            .collect();

        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }
}
