//! Transfer processing engine
//!
//! This module provides the TransferEngine that orchestrates a transfer by
//! coordinating the IdentityResolver, the AccountStore and the Ledger.
//!
//! Every call walks the same path:
//!
//! 1. Validate the request (positive whole-cent amount, recipient present,
//!    sender exists)
//! 2. Resolve the recipient to an account
//! 3. Authorize (no self-transfer, sufficient balance)
//! 4. Debit the sender and credit the recipient with compare-and-swap updates,
//!    reversing the debit if the credit cannot be applied
//! 5. Append the outcome to the ledger
//!
//! # Thread Safety
//!
//! The engine holds no mutable state of its own. It is `Clone` and can be
//! shared freely across threads and tasks; all coordination happens through
//! the store's compare-and-swap contract. A lost compare-and-swap is retried
//! from a fresh read up to `EngineConfig::max_conflict_retries` times.
//!
//! # Failure Atomicity
//!
//! A transfer either applies both legs and is recorded as `Succeeded`, or
//! leaves both balances as they were. Failures after validation are recorded
//! as `Failed` so the ledger is a complete audit trail.

use crate::core::history::{History, HistoryQuery};
use crate::core::resolver::{IdentityResolver, DEFAULT_ALIAS_DOMAIN};
use crate::core::traits::{AccountStore, Ledger};
use crate::types::{
    is_whole_cents, Account, AccountId, KeyKind, Recipient, RecipientIdentifier, StoreError,
    TransferAttempt, TransferError, TransferReceipt, TransferRequest,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default number of retries after a lost compare-and-swap
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

// Upper bound on re-reads while reversing an applied leg
const MAX_COMPENSATION_ATTEMPTS: u32 = 64;

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Retries after a lost compare-and-swap before giving up with a storage fault
    pub max_conflict_retries: u32,

    /// Domain suffix that marks a recipient string as an alias
    pub alias_domain: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            alias_domain: DEFAULT_ALIAS_DOMAIN.to_string(),
        }
    }
}

/// Why a single debit/credit attempt did not go through
#[derive(Debug)]
enum ApplyFailure {
    /// Sender balance is below the amount at the time of the read
    Insufficient { available: Decimal },

    /// Store rejected an operation; conflicts are retryable
    Store(StoreError),
}

impl From<StoreError> for ApplyFailure {
    fn from(error: StoreError) -> Self {
        ApplyFailure::Store(error)
    }
}

/// Transfer processing engine
///
/// Generic over the storage seams so tests can wrap the in-memory store with
/// fault injection.
pub struct TransferEngine<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    resolver: IdentityResolver,
    max_conflict_retries: u32,
}

impl<S, L> Clone for TransferEngine<S, L> {
    fn clone(&self) -> Self {
        TransferEngine {
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            resolver: self.resolver.clone(),
            max_conflict_retries: self.max_conflict_retries,
        }
    }
}

impl<S: AccountStore, L: Ledger> TransferEngine<S, L> {
    /// Create an engine with the default configuration
    pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
        Self::with_config(store, ledger, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    ///
    /// # Arguments
    ///
    /// * `store` - Shared account store
    /// * `ledger` - Shared ledger
    /// * `config` - Retry bound and alias domain
    pub fn with_config(store: Arc<S>, ledger: Arc<L>, config: EngineConfig) -> Self {
        TransferEngine {
            store,
            ledger,
            resolver: IdentityResolver::new(config.alias_domain),
            max_conflict_retries: config.max_conflict_retries,
        }
    }

    /// Shared account store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Shared ledger
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Resolver used to classify recipient strings
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Look up an account by identifier
    pub fn account(&self, id: AccountId) -> Result<Account, TransferError> {
        Ok(self.store.get(id)?)
    }

    /// Look up an account by phone, alias or QR token
    ///
    /// A miss is reported as `RecipientNotFound`, since callers use this to
    /// check a recipient before transferring.
    pub fn find_by_key(&self, kind: KeyKind, value: &str) -> Result<Account, TransferError> {
        self.store.find_by_key(kind, value).map_err(|e| {
            if e.is_not_found() {
                TransferError::recipient_not_found(value)
            } else {
                e.into()
            }
        })
    }

    /// Transfer history of an account, newest first
    pub fn history_for(&self, account: AccountId) -> Result<History, TransferError> {
        HistoryQuery::new(Arc::clone(&self.ledger)).history_for(account)
    }

    /// Transfer funds to a recipient given as free text
    ///
    /// The recipient is classified as an alias or a phone number by the
    /// resolver. Use [`TransferEngine::transfer_to`] for QR payloads.
    ///
    /// # Arguments
    ///
    /// * `sender` - Account sending the funds
    /// * `recipient` - Phone number or alias of the recipient
    /// * `amount` - Positive amount to move
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` with the `Succeeded` record and the sender's new balance
    /// * `Err(TransferError)` describing why nothing was transferred
    pub fn transfer(
        &self,
        sender: AccountId,
        recipient: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, TransferError> {
        let identifier = self.resolver.classify(recipient);
        self.transfer_to(sender, identifier, amount)
    }

    /// Transfer funds to an already classified recipient
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` - non-positive amount, empty recipient, unknown
    ///   sender or self-transfer; nothing is recorded
    /// * `RecipientNotFound` - no account matches; a `Failed` record is appended
    /// * `InsufficientFunds` - sender balance below the amount; a `Failed`
    ///   record is appended
    /// * `StorageFault` - storage failed or stayed contended; balances are
    ///   unchanged and the caller may retry
    pub fn transfer_to(
        &self,
        sender: AccountId,
        identifier: RecipientIdentifier,
        amount: Decimal,
    ) -> Result<TransferReceipt, TransferError> {
        if let Err(e) = self.validate(sender, &identifier, amount) {
            warn!(%sender, %amount, error = %e, "transfer rejected");
            return Err(e);
        }

        let recipient = match self.resolver.resolve(self.store.as_ref(), &identifier) {
            Ok(account) => account,
            Err(e) => {
                let unresolved = Recipient::Unresolved(identifier.value().trim().to_string());
                let error = if e.is_not_found() {
                    TransferError::recipient_not_found(identifier.value().trim())
                } else {
                    e.into()
                };
                return Err(self.fail(sender, unresolved, amount, error));
            }
        };

        if recipient.id == sender {
            let error = TransferError::invalid_request("sender and recipient are the same account");
            warn!(%sender, %amount, %error, "transfer rejected");
            return Err(error);
        }

        let sender_balance = self.apply_with_retries(sender, recipient.id, amount)?;
        self.record_success(sender, recipient.id, amount, sender_balance)
    }

    /// Execute a transfer request from a batch file
    ///
    /// The sender is looked up by phone number; an unknown sender is an
    /// invalid request. The recipient uses the request's explicit key kind if
    /// it has one and is classified otherwise.
    pub fn submit(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        let sender = match self
            .store
            .find_by_key(KeyKind::Phone, request.sender.trim())
        {
            Ok(account) => account.id,
            Err(e) if e.is_not_found() => {
                let error = TransferError::invalid_request(format!(
                    "no sender with phone '{}'",
                    request.sender
                ));
                warn!(sender = %request.sender, %error, "transfer rejected");
                return Err(error);
            }
            Err(e) => return Err(e.into()),
        };

        let identifier = match request.via {
            Some(kind) => RecipientIdentifier::from_kind(kind, request.recipient.trim()),
            None => self.resolver.classify(&request.recipient),
        };

        self.transfer_to(sender, identifier, request.amount)
    }

    /// Reject malformed requests before touching storage or the ledger
    fn validate(
        &self,
        sender: AccountId,
        identifier: &RecipientIdentifier,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::invalid_request(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        if !is_whole_cents(amount) {
            return Err(TransferError::invalid_request(format!(
                "amount {} has fractions of a cent",
                amount
            )));
        }

        if identifier.value().trim().is_empty() {
            return Err(TransferError::invalid_request("recipient must not be empty"));
        }

        match self.store.get(sender) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(TransferError::invalid_request(format!(
                "sender account {} does not exist",
                sender
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Run debit and credit, retrying lost compare-and-swaps from a fresh read
    fn apply_with_retries(
        &self,
        sender: AccountId,
        recipient: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, TransferError> {
        let mut retries = 0;

        loop {
            match self.apply_once(sender, recipient, amount) {
                Ok(sender_balance) => return Ok(sender_balance),
                Err(ApplyFailure::Insufficient { available }) => {
                    let error = TransferError::insufficient_funds(sender, available, amount);
                    return Err(self.fail(sender, Recipient::Account(recipient), amount, error));
                }
                Err(ApplyFailure::Store(e)) if e.is_conflict() => {
                    if retries >= self.max_conflict_retries {
                        let error = TransferError::storage_fault(format!(
                            "balance conflict persisted after {} retries",
                            retries
                        ));
                        return Err(self.fail(
                            sender,
                            Recipient::Account(recipient),
                            amount,
                            error,
                        ));
                    }
                    retries += 1;
                    debug!(%sender, %recipient, retries, "balance conflict, retrying transfer");
                }
                Err(ApplyFailure::Store(e)) => {
                    return Err(self.fail(sender, Recipient::Account(recipient), amount, e.into()));
                }
            }
        }
    }

    /// One debit/credit pass
    ///
    /// On failure both balances are as they were before the call.
    fn apply_once(
        &self,
        sender: AccountId,
        recipient: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, ApplyFailure> {
        let available = self.store.get(sender)?.balance;
        if available < amount {
            return Err(ApplyFailure::Insufficient { available });
        }

        let debited = self.store.apply_balance_delta(sender, -amount, available)?;

        match self.credit(recipient, amount) {
            Ok(()) => Ok(debited),
            Err(e) => {
                self.compensate(sender, amount)?;
                Err(e.into())
            }
        }
    }

    /// Credit the recipient, re-reading after each lost compare-and-swap
    ///
    /// The sender's debit stays in place while this retries. Only after
    /// `max_conflict_retries` lost races, or a non-conflict error, does the
    /// caller reverse the debit.
    fn credit(&self, recipient: AccountId, amount: Decimal) -> Result<(), StoreError> {
        let mut retries = 0;

        loop {
            let result = self
                .store
                .get(recipient)
                .and_then(|account| self.store.apply_balance_delta(recipient, amount, account.balance));

            match result {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() && retries < self.max_conflict_retries => {
                    retries += 1;
                    debug!(%recipient, retries, "credit conflict, retrying credit");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reverse an applied leg by adding `delta` back
    ///
    /// Re-reads on conflict since other transfers may have moved the balance
    /// in the meantime.
    fn compensate(&self, account: AccountId, delta: Decimal) -> Result<(), StoreError> {
        let mut last_error = None;

        for _ in 0..MAX_COMPENSATION_ATTEMPTS {
            let result = self
                .store
                .get(account)
                .and_then(|current| self.store.apply_balance_delta(account, delta, current.balance));

            match result {
                Ok(_) => {
                    debug!(%account, %delta, "compensated balance");
                    return Ok(());
                }
                Err(e) if e.is_conflict() => last_error = Some(e),
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        let message = match last_error {
            Some(e) => format!("could not apply {} to account {}: {}", delta, account, e),
            None => format!("could not apply {} to account {}", delta, account),
        };
        error!(%account, %delta, "compensation failed, balance needs manual repair");
        Err(StoreError::unavailable(message))
    }

    /// Append the `Succeeded` record, undoing both legs if the ledger refuses it
    fn record_success(
        &self,
        sender: AccountId,
        recipient: AccountId,
        amount: Decimal,
        sender_balance: Decimal,
    ) -> Result<TransferReceipt, TransferError> {
        match self
            .ledger
            .append(TransferAttempt::succeeded(sender, recipient, amount))
        {
            Ok(record) => {
                info!(
                    transfer_id = %record.id,
                    %sender,
                    %recipient,
                    %amount,
                    "transfer succeeded"
                );
                Ok(TransferReceipt {
                    record,
                    sender_balance,
                })
            }
            Err(e) => {
                error!(%sender, %recipient, %amount, error = %e, "ledger append failed, reversing transfer");
                // Both reversals are attempted even if the first one fails
                let credit_reversed = self.compensate(recipient, -amount);
                let debit_reversed = self.compensate(sender, amount);
                let error = match credit_reversed.and(debit_reversed) {
                    Ok(()) => e.into(),
                    Err(compensation) => TransferError::storage_fault(format!(
                        "{}; reversal failed: {}",
                        e, compensation
                    )),
                };
                Err(self.fail(sender, Recipient::Account(recipient), amount, error))
            }
        }
    }

    /// Record a failed attempt and hand back the error to report
    ///
    /// If the `Failed` record itself cannot be written, the caller gets a
    /// storage fault instead of the original error.
    fn fail(
        &self,
        sender: AccountId,
        recipient: Recipient,
        amount: Decimal,
        error: TransferError,
    ) -> TransferError {
        match error {
            TransferError::StorageFault { .. } => {
                error!(%sender, %recipient, %amount, %error, "transfer failed")
            }
            _ => warn!(%sender, %recipient, %amount, %error, "transfer rejected"),
        }

        let attempt = TransferAttempt::failed(sender, recipient, amount, error.reason_code());
        match self.ledger.append(attempt) {
            Ok(_) => error,
            Err(e) => {
                error!(%sender, error = %e, "could not record failed transfer");
                TransferError::storage_fault(format!("{}; recording failure: {}", error, e))
            }
        }
    }
}
