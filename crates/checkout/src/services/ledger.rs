//! Order ledger trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{OrderDraft, OrderId};

use crate::error::CheckoutError;

/// Acknowledgement returned by the ledger for a recorded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    /// The order ID assigned by the ledger.
    pub order_id: OrderId,
}

/// Records orders in the external order ledger.
///
/// May fail transiently. Callers must not submit the same attempt twice.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Records an order and returns the identifier the ledger assigned.
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, CheckoutError>;
}

#[async_trait]
impl<T: OrderLedger + ?Sized> OrderLedger for Arc<T> {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, CheckoutError> {
        (**self).submit_order(draft).await
    }
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    orders: HashMap<OrderId, OrderDraft>,
    next_id: u32,
    submit_calls: usize,
    fail_on_submit: bool,
    latency: Option<Duration>,
}

/// In-memory order ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryOrderLedger {
    /// Creates a new in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to fail every submission.
    pub fn set_fail_on_submit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_submit = fail;
    }

    /// Delays every submission, to simulate a slow network.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().unwrap().latency = latency;
    }

    /// Number of times `submit_order` was called, failed calls included.
    pub fn submit_calls(&self) -> usize {
        self.state.read().unwrap().submit_calls
    }

    /// Returns the number of recorded orders.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the draft recorded under `order_id`.
    pub fn order(&self, order_id: &OrderId) -> Option<OrderDraft> {
        self.state.read().unwrap().orders.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderLedger for InMemoryOrderLedger {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, CheckoutError> {
        let latency = {
            let mut state = self.state.write().unwrap();
            state.submit_calls += 1;
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().unwrap();
        if state.fail_on_submit {
            return Err(CheckoutError::Ledger("Ledger unavailable".to_string()));
        }

        state.next_id += 1;
        let order_id = OrderId::new(format!("rec{:05}", state.next_id));
        state.orders.insert(order_id.clone(), draft.clone());

        Ok(OrderReceipt { order_id })
    }
}
