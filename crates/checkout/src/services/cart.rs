//! Cart store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{CartLine, CustomerId};

use crate::error::CheckoutError;

/// The customer's persistent cart. Checkout only ever clears it, and only
/// after a payment code is available.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn clear(&self, customer_id: &CustomerId) -> Result<(), CheckoutError>;
}

#[async_trait]
impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    async fn clear(&self, customer_id: &CustomerId) -> Result<(), CheckoutError> {
        (**self).clear(customer_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<CustomerId, Vec<CartLine>>,
    clears: usize,
    fail_on_clear: bool,
}

/// In-memory cart store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a customer's cart.
    pub fn put(&self, customer_id: CustomerId, lines: Vec<CartLine>) {
        self.state.write().unwrap().carts.insert(customer_id, lines);
    }

    /// Returns a customer's cart (empty when unknown).
    pub fn lines(&self, customer_id: &CustomerId) -> Vec<CartLine> {
        self.state
            .read()
            .unwrap()
            .carts
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    pub fn clear_count(&self) -> usize {
        self.state.read().unwrap().clears
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn clear(&self, customer_id: &CustomerId) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_clear {
            return Err(CheckoutError::CartStore("Cart store unavailable".to_string()));
        }
        state.carts.remove(customer_id);
        state.clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;

    #[tokio::test]
    async fn test_clear_empties_only_that_cart() {
        let store = InMemoryCartStore::new();
        let line = CartLine::new("shirt", "store-a", Money::from_cents(5000), 1).unwrap();
        store.put(CustomerId::new("a"), vec![line.clone()]);
        store.put(CustomerId::new("b"), vec![line]);

        store.clear(&CustomerId::new("a")).await.unwrap();

        assert!(store.lines(&CustomerId::new("a")).is_empty());
        assert_eq!(store.lines(&CustomerId::new("b")).len(), 1);
        assert_eq!(store.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_clear_keeps_cart() {
        let store = InMemoryCartStore::new();
        let line = CartLine::new("shirt", "store-a", Money::from_cents(5000), 1).unwrap();
        store.put(CustomerId::new("a"), vec![line]);
        store.set_fail_on_clear(true);

        assert!(store.clear(&CustomerId::new("a")).await.is_err());
        assert_eq!(store.lines(&CustomerId::new("a")).len(), 1);
    }
}
