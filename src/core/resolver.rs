//! Recipient identity resolution
//!
//! Maps what a sender typed (or scanned) to exactly one account. Raw strings
//! are first classified into a [`RecipientIdentifier`], then looked up by exact
//! match against the corresponding store index.
//!
//! # Classification
//!
//! A string containing the alias domain (e.g. `@OnePay.com`) is an alias;
//! anything else is a phone number. QR payloads are never guessed from free
//! text: callers holding a decoded QR string build
//! `RecipientIdentifier::QrPayload` themselves.

use crate::core::traits::AccountStore;
use crate::types::{Account, RecipientIdentifier, StoreError};

/// Default alias domain appended to an account's unique key
pub const DEFAULT_ALIAS_DOMAIN: &str = "@OnePay.com";

/// Resolves recipient identifiers against an account store
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    alias_domain: String,
}

impl IdentityResolver {
    /// Create a resolver for the given alias domain
    pub fn new(alias_domain: impl Into<String>) -> Self {
        IdentityResolver {
            alias_domain: alias_domain.into(),
        }
    }

    /// Alias domain this resolver classifies by
    pub fn alias_domain(&self) -> &str {
        &self.alias_domain
    }

    /// Classify raw recipient input
    ///
    /// Surrounding whitespace is trimmed. The caller is responsible for
    /// rejecting empty input before resolving.
    ///
    /// # Arguments
    ///
    /// * `raw` - Recipient text as entered by the sender
    ///
    /// # Returns
    ///
    /// `Alias` if the text contains the alias domain, otherwise `Phone`
    pub fn classify(&self, raw: &str) -> RecipientIdentifier {
        let value = raw.trim().to_string();
        if !self.alias_domain.is_empty() && value.contains(&self.alias_domain) {
            RecipientIdentifier::Alias(value)
        } else {
            RecipientIdentifier::Phone(value)
        }
    }

    /// Find the account an identifier refers to
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` for an exact match
    /// * `Err(StoreError::KeyNotFound)` if nothing matches
    /// * `Err(StoreError)` for any other storage failure
    pub fn resolve<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        identifier: &RecipientIdentifier,
    ) -> Result<Account, StoreError> {
        store.find_by_key(identifier.key_kind(), identifier.value())
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_DOMAIN)
    }
}
