//! Per-attempt checkout session.

use common::SessionId;
use domain::{
    CartLine, CustomerId, DeliveryAddress, FieldError, Order, OrderId, Totals, ValidationError,
};
use payment_code::PaymentCode;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::CheckoutError;
use crate::state::CheckoutState;

/// The signed-in customer, as supplied by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Customer {
    pub fn new(id: impl Into<CustomerId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug)]
pub(crate) struct SessionData {
    pub(crate) state: CheckoutState,
    pub(crate) lines: Vec<CartLine>,
    pub(crate) totals: Totals,
    pub(crate) customer: Option<Customer>,
    pub(crate) address: DeliveryAddress,
    /// Digits only.
    pub(crate) tax_id: Option<String>,
    pub(crate) validation: Option<ValidationError>,
    pub(crate) serviceability: Option<String>,
    /// Set while an order submission is outstanding.
    pub(crate) in_flight: bool,
    pub(crate) cancel_requested: bool,
    pub(crate) attempts: u32,
    pub(crate) order: Option<Order>,
    pub(crate) payment_code: Option<PaymentCode>,
}

impl SessionData {
    pub(crate) fn transition(&mut self, next: CheckoutState) {
        info!(from = %self.state, to = %next, "checkout state changed");
        self.state = next;
    }

    pub(crate) fn expect_state(
        &self,
        allowed: fn(&CheckoutState) -> bool,
        expected: &'static str,
    ) -> Result<(), CheckoutError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(CheckoutError::InvalidState {
                expected,
                actual: self.state.clone(),
            })
        }
    }
}

/// One checkout attempt for one customer.
///
/// Holds the cart snapshot taken when checkout began; later cart edits
/// require a new session.
#[derive(Debug)]
pub struct CheckoutSession {
    id: SessionId,
    data: Mutex<SessionData>,
}

impl CheckoutSession {
    pub(crate) fn new(lines: Vec<CartLine>, totals: Totals) -> Self {
        Self {
            id: SessionId::new(),
            data: Mutex::new(SessionData {
                state: CheckoutState::Reviewing,
                lines,
                totals,
                customer: None,
                address: DeliveryAddress::default(),
                tax_id: None,
                validation: None,
                serviceability: None,
                in_flight: false,
                cancel_requested: false,
                attempts: 0,
                order: None,
                payment_code: None,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().await
    }

    /// Current state.
    pub async fn state(&self) -> CheckoutState {
        self.data.lock().await.state.clone()
    }

    /// Read-only view of the session.
    pub async fn view(&self) -> SessionView {
        let data = self.data.lock().await;
        SessionView {
            id: self.id,
            state: data.state.clone(),
            failure: match &data.state {
                CheckoutState::Failed(reason) => Some(FailureView {
                    code: reason.code(),
                    message: reason.message(),
                }),
                _ => None,
            },
            customer_id: data.customer.as_ref().map(|c| c.id.clone()),
            lines: data.lines.clone(),
            totals: data.totals,
            address: data.address.clone(),
            tax_id: data.tax_id.clone(),
            field_errors: data
                .validation
                .as_ref()
                .map(|v| v.errors.clone())
                .unwrap_or_default(),
            serviceability_error: data.serviceability.clone(),
            submitting: data.in_flight,
            attempts: data.attempts,
            order_id: data.order.as_ref().map(|o| o.order_id.clone()),
            payment_code: data.payment_code.clone(),
        }
    }
}

/// Failure reason as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureView {
    pub code: &'static str,
    pub message: String,
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    #[serde(serialize_with = "state_name")]
    pub state: CheckoutState,
    pub failure: Option<FailureView>,
    pub customer_id: Option<CustomerId>,
    pub lines: Vec<CartLine>,
    pub totals: Totals,
    pub address: DeliveryAddress,
    pub tax_id: Option<String>,
    pub field_errors: Vec<FieldError>,
    pub serviceability_error: Option<String>,
    pub submitting: bool,
    pub attempts: u32,
    pub order_id: Option<OrderId>,
    pub payment_code: Option<PaymentCode>,
}

fn state_name<S: Serializer>(state: &CheckoutState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(state.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FailureReason;
    use domain::Money;

    fn session() -> CheckoutSession {
        let lines = vec![CartLine::new("shirt", "store-a", Money::from_cents(5000), 1).unwrap()];
        let totals = domain::compute_totals(&lines, Money::from_cents(2000), Money::zero());
        CheckoutSession::new(lines, totals)
    }

    #[tokio::test]
    async fn test_new_session_is_reviewing() {
        let session = session();
        let view = session.view().await;

        assert_eq!(view.state, CheckoutState::Reviewing);
        assert_eq!(view.totals.grand_total, Money::from_cents(7000));
        assert!(view.failure.is_none());
        assert!(!view.submitting);
    }

    #[tokio::test]
    async fn test_expect_state_reports_actual() {
        let session = session();
        let data = session.lock().await;

        let err = data
            .expect_state(CheckoutState::can_confirm, "ConfirmingAddress")
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidState {
                expected: "ConfirmingAddress",
                actual: CheckoutState::Reviewing
            }
        ));
    }

    #[tokio::test]
    async fn test_view_serializes_state_and_failure() {
        let session = session();
        session
            .lock()
            .await
            .transition(CheckoutState::Failed(FailureReason::Timeout));

        let json = serde_json::to_value(session.view().await).unwrap();
        assert_eq!(json["state"], "Failed");
        assert_eq!(json["failure"]["code"], "timeout");
        assert_eq!(json["totals"]["grand_total"]["cents"], 7000);
    }
}
