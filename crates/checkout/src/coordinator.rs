//! Checkout coordinator driving the session state machine.

use std::time::Instant;

use domain::{
    AddressField, CartLine, CustomerId, DeliveryAddress, Order, OrderDraft, OrderStatus,
    PaymentMethod, Totals, ValidationError, is_valid_postal_code, normalize_digits,
    validate_optional_tax_id,
};
use payment_code::PaymentCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::services::{CartStore, OrderLedger, OrderReceipt, PostalLookup, ProfileStore};
use crate::session::{CheckoutSession, Customer, SessionData};
use crate::state::{CheckoutState, DiscardReason, FailureReason};

/// Address and optional tax id submitted on the address step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressConfirmation {
    pub address: DeliveryAddress,
    #[serde(default)]
    pub tax_id: Option<String>,
}

/// Result of [`CheckoutCoordinator::proceed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceedOutcome {
    /// The session moved to the address step.
    AddressRequired,
    /// No customer was signed in; the session was discarded.
    SignInRequired,
}

/// Result of [`CheckoutCoordinator::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The order was recorded and its payment code issued.
    Ready(PaymentCode),
    /// Another confirmation is being processed; nothing was done.
    AlreadyInFlight,
}

/// Result of [`CheckoutCoordinator::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// An order submission is outstanding; the session is discarded when
    /// it fails, or kept if the ledger records the order.
    Deferred,
}

/// Orchestrates checkout sessions.
///
/// Drives each session through validation, a single ledger submission and
/// payment-code issuance. Never retries on its own; every retry is an
/// explicit call.
pub struct CheckoutCoordinator<L, P, C, Z>
where
    L: OrderLedger,
    P: ProfileStore,
    C: CartStore,
    Z: PostalLookup,
{
    config: CheckoutConfig,
    ledger: L,
    profiles: P,
    carts: C,
    postal: Z,
}

impl<L, P, C, Z> CheckoutCoordinator<L, P, C, Z>
where
    L: OrderLedger,
    P: ProfileStore,
    C: CartStore,
    Z: PostalLookup,
{
    /// Creates a new checkout coordinator.
    pub fn new(config: CheckoutConfig, ledger: L, profiles: P, carts: C, postal: Z) -> Self {
        Self {
            config,
            ledger,
            profiles,
            carts,
            postal,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Totals for a cart under the configured fees.
    pub fn totals(&self, lines: &[CartLine]) -> Totals {
        self.config.fees.totals(lines)
    }

    /// Starts a session in `Reviewing` from a cart snapshot.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub fn begin(&self, lines: Vec<CartLine>) -> CheckoutSession {
        metrics::counter!("checkout_sessions_started_total").increment(1);
        let totals = self.totals(&lines);
        let session = CheckoutSession::new(lines, totals);
        info!(
            session_id = %session.id(),
            grand_total = %totals.grand_total,
            stores = totals.store_count,
            "checkout started"
        );
        session
    }

    /// `Reviewing → ConfirmingAddress`.
    ///
    /// Without a signed-in customer the session is discarded and the caller
    /// should redirect to sign-in. The saved profile, when available,
    /// prefills the address draft.
    #[tracing::instrument(skip(self, session, customer), fields(session_id = %session.id()))]
    pub async fn proceed(
        &self,
        session: &CheckoutSession,
        customer: Option<Customer>,
    ) -> Result<ProceedOutcome> {
        let mut customer = {
            let mut data = session.lock().await;
            data.expect_state(CheckoutState::can_proceed, "Reviewing")?;

            let Some(customer) = customer else {
                data.transition(CheckoutState::Discarded(DiscardReason::SignInRequired));
                return Ok(ProceedOutcome::SignInRequired);
            };
            if data.lines.is_empty() {
                return Err(CheckoutError::EmptyCart);
            }
            customer
        };

        // The session stays unlocked while the profile store answers.
        let profile = match self.profiles.load(&customer.id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "profile unavailable, address draft left empty");
                None
            }
        };

        let mut data = session.lock().await;
        data.expect_state(CheckoutState::can_proceed, "Reviewing")?;
        if let Some(profile) = profile {
            if customer.name.is_none() {
                customer.name = profile.name;
            }
            if let Some(address) = profile.address {
                data.address = address;
            }
            data.tax_id = profile.tax_id;
        }

        debug!(customer_id = %customer.id, "customer signed in");
        data.customer = Some(customer);
        data.transition(CheckoutState::ConfirmingAddress);
        Ok(ProceedOutcome::AddressRequired)
    }

    /// Replaces the address draft without validating it.
    #[tracing::instrument(skip(self, session, address), fields(session_id = %session.id()))]
    pub async fn update_address(
        &self,
        session: &CheckoutSession,
        address: DeliveryAddress,
    ) -> Result<()> {
        let mut data = Self::editable(session).await?;
        data.address = address;
        Ok(())
    }

    /// Prefills street, neighborhood, city and region from a postal code.
    ///
    /// Returns `false` when the code is unknown. Never decides
    /// serviceability.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn lookup_postal_code(
        &self,
        session: &CheckoutSession,
        postal_code: &str,
    ) -> Result<bool> {
        let digits = normalize_digits(postal_code);
        {
            let mut data = Self::editable(session).await?;
            if !is_valid_postal_code(&digits) {
                let err = ValidationError::single(
                    AddressField::PostalCode,
                    "Postal code must have 8 digits",
                );
                data.validation = Some(err.clone());
                return Err(err.into());
            }
        }

        let found = self.postal.lookup(&digits).await?;

        // Cancelled or submitted while the lookup ran: leave the draft alone.
        let mut data = Self::editable(session).await?;
        data.address.postal_code = digits;
        match found {
            Some(parts) => {
                parts.apply_to(&mut data.address);
                Ok(true)
            }
            None => {
                debug!("postal code not found");
                Ok(false)
            }
        }
    }

    /// `ConfirmingAddress → SubmittingOrder → IssuingPayment → Ready`.
    ///
    /// Validation and serviceability failures keep the session in
    /// `ConfirmingAddress` and never reach the ledger. While a submission
    /// is outstanding, further calls return
    /// [`ConfirmOutcome::AlreadyInFlight`] without side effects.
    #[tracing::instrument(skip(self, session, confirmation), fields(session_id = %session.id()))]
    pub async fn confirm(
        &self,
        session: &CheckoutSession,
        confirmation: AddressConfirmation,
    ) -> Result<ConfirmOutcome> {
        let (customer_id, draft) = {
            let mut data = session.lock().await;
            if data.in_flight {
                metrics::counter!("checkout_duplicate_submits_total").increment(1);
                debug!("submission already in flight, ignoring confirm");
                return Ok(ConfirmOutcome::AlreadyInFlight);
            }
            data.expect_state(CheckoutState::can_confirm, "ConfirmingAddress")?;
            metrics::counter!("checkout_confirmations_total").increment(1);

            let draft = self.validated_draft(&mut data, confirmation)?;

            data.in_flight = true;
            data.attempts += 1;
            data.transition(CheckoutState::SubmittingOrder);
            (draft.customer_id.clone(), draft)
        };

        if let Err(e) = self
            .profiles
            .upsert_address(&customer_id, &draft.address, draft.tax_id.as_deref())
            .await
        {
            warn!(error = %e, "profile write-through failed, continuing");
        }

        {
            let mut data = session.lock().await;
            if data.cancel_requested {
                data.in_flight = false;
                data.transition(CheckoutState::Discarded(DiscardReason::Cancelled));
                return Err(CheckoutError::Cancelled);
            }
        }

        let submitted = self.submit(&draft).await;

        let mut data = session.lock().await;
        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(err) => {
                data.in_flight = false;
                if data.cancel_requested {
                    info!(error = %err, "submission failed after cancellation, discarding");
                    data.transition(CheckoutState::Discarded(DiscardReason::Cancelled));
                    return Err(CheckoutError::Cancelled);
                }

                let reason = match &err {
                    CheckoutError::Timeout(_) => FailureReason::Timeout,
                    other => FailureReason::LedgerError(other.to_string()),
                };
                warn!(error = %err, "order submission failed, cart kept");
                metrics::counter!("checkout_failed_total", "reason" => reason.code()).increment(1);
                data.transition(CheckoutState::Failed(reason));
                if matches!(err, CheckoutError::Timeout(_) | CheckoutError::Ledger(_)) {
                    return Err(err);
                }
                return Err(CheckoutError::Ledger(err.to_string()));
            }
        };

        if data.cancel_requested {
            info!(
                order_id = %receipt.order_id,
                "cancellation arrived after the order was recorded, keeping the order"
            );
            data.cancel_requested = false;
        }

        info!(order_id = %receipt.order_id, "order recorded");
        data.order = Some(Order::from_draft(receipt.order_id, draft));
        data.transition(CheckoutState::IssuingPayment);

        let issued = self.issue(&mut data);
        data.in_flight = false;
        let code = issued?;
        drop(data);

        self.clear_cart(&customer_id).await;
        Ok(ConfirmOutcome::Ready(code))
    }

    /// `Failed(ledger-error | timeout) → ConfirmingAddress`. The address
    /// draft and cart snapshot are kept.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn retry(&self, session: &CheckoutSession) -> Result<()> {
        let mut data = session.lock().await;
        data.expect_state(CheckoutState::can_retry, "Failed(ledger-error | timeout)")?;
        data.transition(CheckoutState::ConfirmingAddress);
        Ok(())
    }

    /// Derives the payment code again from the stored order. Makes no
    /// ledger or profile writes.
    ///
    /// Moves `Failed(configuration-error)` to `Ready`; on a `Ready`
    /// session it returns the same code again.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn reissue_payment(&self, session: &CheckoutSession) -> Result<PaymentCode> {
        let mut data = session.lock().await;
        data.expect_state(
            CheckoutState::can_reissue,
            "Ready or Failed(configuration-error)",
        )?;

        let was_ready = data.state == CheckoutState::Ready;
        let code = self.issue(&mut data)?;
        let customer_id = data.customer.as_ref().map(|c| c.id.clone());
        drop(data);

        if !was_ready {
            if let Some(customer_id) = customer_id {
                self.clear_cart(&customer_id).await;
            }
        }
        Ok(code)
    }

    /// Cancels the session.
    ///
    /// While a submission is outstanding the request is recorded and
    /// [`CancelOutcome::Deferred`] is returned.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn cancel(&self, session: &CheckoutSession) -> Result<CancelOutcome> {
        let mut data = session.lock().await;
        if data.in_flight {
            data.cancel_requested = true;
            info!("cancellation requested during submission");
            return Ok(CancelOutcome::Deferred);
        }

        data.expect_state(CheckoutState::can_cancel, "a cancellable state")?;
        data.transition(CheckoutState::Discarded(DiscardReason::Cancelled));
        Ok(CancelOutcome::Cancelled)
    }

    async fn editable(
        session: &CheckoutSession,
    ) -> Result<tokio::sync::MutexGuard<'_, SessionData>> {
        let data = session.lock().await;
        if data.in_flight {
            return Err(CheckoutError::InvalidState {
                expected: "ConfirmingAddress",
                actual: CheckoutState::SubmittingOrder,
            });
        }
        data.expect_state(CheckoutState::can_confirm, "ConfirmingAddress")?;
        Ok(data)
    }

    /// Validates the confirmation against the session and builds the
    /// order draft. Records field errors on the session.
    fn validated_draft(
        &self,
        data: &mut SessionData,
        confirmation: AddressConfirmation,
    ) -> Result<OrderDraft> {
        let address = confirmation.address.normalized();
        data.address = address.clone();
        data.tax_id = confirmation
            .tax_id
            .as_deref()
            .map(normalize_digits)
            .filter(|t| !t.is_empty());

        let (tax_id, tax_check) = match validate_optional_tax_id(confirmation.tax_id.as_deref()) {
            Ok(tax_id) => (tax_id, Ok(())),
            Err(e) => (None, Err(e)),
        };
        if let Err(err) = ValidationError::merge(address.validate(), tax_check) {
            info!(error = %err, "address rejected");
            data.validation = Some(err.clone());
            data.serviceability = None;
            return Err(err.into());
        }
        data.validation = None;

        if !address.is_serviceable(&self.config.regions) {
            let message = self
                .config
                .regions
                .rejection_message(&address.city, &address.region);
            info!(city = %address.city, region = %address.region, "address outside delivery area");
            data.serviceability = Some(message.clone());
            return Err(CheckoutError::Serviceability {
                city: address.city,
                region: address.region,
                message,
            });
        }
        data.serviceability = None;

        let customer = data.customer.clone().ok_or(CheckoutError::InvalidState {
            expected: "a signed-in customer",
            actual: data.state.clone(),
        })?;

        Ok(OrderDraft {
            customer_id: customer.id,
            customer_email: customer.email,
            customer_name: customer.name,
            tax_id,
            lines: data.lines.clone(),
            totals: data.totals,
            address,
            payment_method: PaymentMethod::Pix,
            status: OrderStatus::AwaitingPayment,
        })
    }

    async fn submit(&self, draft: &OrderDraft) -> Result<OrderReceipt> {
        let started = Instant::now();
        let result = match self.config.ledger_timeout {
            Some(limit) => tokio::time::timeout(limit, self.ledger.submit_order(draft))
                .await
                .unwrap_or(Err(CheckoutError::Timeout(limit))),
            None => self.ledger.submit_order(draft).await,
        };
        metrics::histogram!("checkout_ledger_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// `IssuingPayment → Ready`, or `Failed(configuration-error)` with the
    /// order kept on the session.
    fn issue(&self, data: &mut SessionData) -> Result<PaymentCode> {
        let (order_id, amount) = match &data.order {
            Some(order) => (order.order_id.clone(), order.totals.grand_total),
            None => {
                return Err(CheckoutError::InvalidState {
                    expected: "a recorded order",
                    actual: data.state.clone(),
                });
            }
        };

        match payment_code::issue(
            &self.config.merchant,
            self.config.initiation,
            &order_id,
            amount,
        ) {
            Ok(code) => {
                data.payment_code = Some(code.clone());
                if data.state != CheckoutState::Ready {
                    metrics::counter!("checkout_ready_total").increment(1);
                    data.transition(CheckoutState::Ready);
                }
                Ok(code)
            }
            Err(source) => {
                error!(
                    order_id = %order_id,
                    error = %source,
                    "order recorded but payment code could not be issued"
                );
                metrics::counter!("checkout_failed_total", "reason" => "configuration-error")
                    .increment(1);
                data.transition(CheckoutState::Failed(FailureReason::ConfigurationError(
                    source.to_string(),
                )));
                Err(CheckoutError::Configuration {
                    order_id: Some(order_id),
                    source,
                })
            }
        }
    }

    async fn clear_cart(&self, customer_id: &CustomerId) {
        if let Err(e) = self.carts.clear(customer_id).await {
            warn!(error = %e, "cart could not be cleared after checkout");
        }
    }
}
