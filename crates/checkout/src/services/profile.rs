//! Customer profile store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{CustomerId, DeliveryAddress};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Saved customer details used to prefill the address step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub address: Option<DeliveryAddress>,
    /// Digits only.
    pub tax_id: Option<String>,
}

/// Reads and writes customer profiles, keyed by customer id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads the saved profile, if any.
    async fn load(&self, customer_id: &CustomerId) -> Result<Option<Profile>, CheckoutError>;

    /// Saves a confirmed address (and tax id, when given). Idempotent.
    async fn upsert_address(
        &self,
        customer_id: &CustomerId,
        address: &DeliveryAddress,
        tax_id: Option<&str>,
    ) -> Result<(), CheckoutError>;
}

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn load(&self, customer_id: &CustomerId) -> Result<Option<Profile>, CheckoutError> {
        (**self).load(customer_id).await
    }

    async fn upsert_address(
        &self,
        customer_id: &CustomerId,
        address: &DeliveryAddress,
        tax_id: Option<&str>,
    ) -> Result<(), CheckoutError> {
        (**self).upsert_address(customer_id, address, tax_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryProfileState {
    profiles: HashMap<CustomerId, Profile>,
    upserts: usize,
    fail_on_load: bool,
    fail_on_upsert: bool,
}

/// In-memory profile store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    state: Arc<RwLock<InMemoryProfileState>>,
}

impl InMemoryProfileStore {
    /// Creates a new in-memory profile store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile.
    pub fn insert(&self, customer_id: CustomerId, profile: Profile) {
        self.state
            .write()
            .unwrap()
            .profiles
            .insert(customer_id, profile);
    }

    pub fn set_fail_on_load(&self, fail: bool) {
        self.state.write().unwrap().fail_on_load = fail;
    }

    pub fn set_fail_on_upsert(&self, fail: bool) {
        self.state.write().unwrap().fail_on_upsert = fail;
    }

    /// Returns the stored profile for a customer.
    pub fn profile(&self, customer_id: &CustomerId) -> Option<Profile> {
        self.state.read().unwrap().profiles.get(customer_id).cloned()
    }

    /// Number of successful upserts.
    pub fn upsert_count(&self) -> usize {
        self.state.read().unwrap().upserts
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, customer_id: &CustomerId) -> Result<Option<Profile>, CheckoutError> {
        let state = self.state.read().unwrap();
        if state.fail_on_load {
            return Err(CheckoutError::ProfileStore("Profile store unavailable".to_string()));
        }
        Ok(state.profiles.get(customer_id).cloned())
    }

    async fn upsert_address(
        &self,
        customer_id: &CustomerId,
        address: &DeliveryAddress,
        tax_id: Option<&str>,
    ) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_upsert {
            return Err(CheckoutError::ProfileStore("Profile store unavailable".to_string()));
        }

        let profile = state.profiles.entry(customer_id.clone()).or_default();
        profile.address = Some(address.clone());
        if let Some(tax_id) = tax_id {
            profile.tax_id = Some(tax_id.to_string());
        }
        state.upserts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_name_and_replaces_address() {
        let store = InMemoryProfileStore::new();
        let customer = CustomerId::new("cust-1");
        store.insert(
            customer.clone(),
            Profile {
                name: Some("Ana".to_string()),
                ..Profile::default()
            },
        );

        let address = DeliveryAddress {
            city: "Campinas".to_string(),
            ..DeliveryAddress::default()
        };
        store
            .upsert_address(&customer, &address, Some("52998224725"))
            .await
            .unwrap();
        store.upsert_address(&customer, &address, None).await.unwrap();

        let profile = store.load(&customer).await.unwrap().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(profile.address, Some(address));
        assert_eq!(profile.tax_id.as_deref(), Some("52998224725"));
        assert_eq!(store.upsert_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_customer_has_no_profile() {
        let store = InMemoryProfileStore::new();
        assert_eq!(store.load(&CustomerId::new("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_toggles() {
        let store = InMemoryProfileStore::new();
        let customer = CustomerId::new("cust-1");
        store.set_fail_on_load(true);
        store.set_fail_on_upsert(true);

        assert!(store.load(&customer).await.is_err());
        assert!(
            store
                .upsert_address(&customer, &DeliveryAddress::default(), None)
                .await
                .is_err()
        );
        assert_eq!(store.upsert_count(), 0);
    }
}
