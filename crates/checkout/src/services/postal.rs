//! Postal-code lookup trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{DeliveryAddress, normalize_digits};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Address parts a postal code resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub region: String,
}

impl PostalAddress {
    /// Overwrites the looked-up parts of `draft`, keeping number and
    /// complement. Blank parts leave the draft untouched.
    pub fn apply_to(&self, draft: &mut DeliveryAddress) {
        let parts = [
            (&mut draft.street, &self.street),
            (&mut draft.neighborhood, &self.neighborhood),
            (&mut draft.city, &self.city),
            (&mut draft.region, &self.region),
        ];
        for (target, value) in parts {
            if !value.trim().is_empty() {
                *target = value.trim().to_string();
            }
        }
    }
}

/// Resolves a postal code to an address, for prefill only.
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// `postal_code` is 8 digits. `Ok(None)` means the code is unknown.
    async fn lookup(&self, postal_code: &str) -> Result<Option<PostalAddress>, CheckoutError>;
}

#[async_trait]
impl<T: PostalLookup + ?Sized> PostalLookup for Arc<T> {
    async fn lookup(&self, postal_code: &str) -> Result<Option<PostalAddress>, CheckoutError> {
        (**self).lookup(postal_code).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPostalState {
    addresses: HashMap<String, PostalAddress>,
    lookups: usize,
    fail_on_lookup: bool,
}

/// In-memory postal lookup for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPostalLookup {
    state: Arc<RwLock<InMemoryPostalState>>,
}

impl InMemoryPostalLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an address under a postal code (any formatting).
    pub fn insert(&self, postal_code: &str, address: PostalAddress) {
        self.state
            .write()
            .unwrap()
            .addresses
            .insert(normalize_digits(postal_code), address);
    }

    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }

    pub fn lookup_count(&self) -> usize {
        self.state.read().unwrap().lookups
    }
}

#[async_trait]
impl PostalLookup for InMemoryPostalLookup {
    async fn lookup(&self, postal_code: &str) -> Result<Option<PostalAddress>, CheckoutError> {
        let mut state = self.state.write().unwrap();
        state.lookups += 1;
        if state.fail_on_lookup {
            return Err(CheckoutError::PostalLookup("Lookup service unavailable".to_string()));
        }
        Ok(state.addresses.get(postal_code).cloned())
    }
}
