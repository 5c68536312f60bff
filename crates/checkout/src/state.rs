//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// Why a checkout attempt ended in [`CheckoutState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The ledger rejected or could not be reached. No order exists.
    LedgerError(String),
    /// The ledger did not answer in time. No order id was returned.
    Timeout,
    /// The order exists but its payment code could not be derived.
    ConfigurationError(String),
}

impl FailureReason {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::LedgerError(_) => "ledger-error",
            FailureReason::Timeout => "timeout",
            FailureReason::ConfigurationError(_) => "configuration-error",
        }
    }

    /// Human-readable explanation.
    pub fn message(&self) -> String {
        match self {
            FailureReason::LedgerError(msg) => format!("Order could not be recorded: {msg}"),
            FailureReason::Timeout => {
                "Order submission timed out before an order id was returned".to_string()
            }
            FailureReason::ConfigurationError(msg) => {
                format!("Order was recorded but its payment code could not be issued: {msg}")
            }
        }
    }

    /// True when no order was created, so a fresh attempt is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureReason::LedgerError(_) | FailureReason::Timeout)
    }
}

/// Why a session was dropped without reaching a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardReason {
    /// The customer cancelled.
    Cancelled,
    /// The customer was not signed in and was redirected.
    SignInRequired,
}

/// The state of a checkout session.
///
/// State transitions:
/// ```text
/// Reviewing ──► ConfirmingAddress ──► SubmittingOrder ──► IssuingPayment ──► Ready
///                     ▲                    │                   │              ▲
///                     │ retry              ▼                   ▼              │ reissue
///                     └──── Failed(ledger-error | timeout)   Failed(configuration-error)
///
/// Reviewing | ConfirmingAddress | Failed(ledger-error | timeout) ──► Discarded
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "reason")]
pub enum CheckoutState {
    /// Cart and totals are shown; nothing has been validated.
    #[default]
    Reviewing,

    /// The customer is editing and confirming the delivery address.
    ConfirmingAddress,

    /// The order draft is with the ledger.
    SubmittingOrder,

    /// The ledger returned an order id; the payment code is being derived.
    IssuingPayment,

    /// The payment code is available (terminal state).
    Ready,

    /// The attempt failed (terminal until retried or reissued).
    Failed(FailureReason),

    /// The session was dropped (terminal state).
    Discarded(DiscardReason),
}

impl CheckoutState {
    /// Returns true if the customer can move on to the address step.
    pub fn can_proceed(&self) -> bool {
        matches!(self, CheckoutState::Reviewing)
    }

    /// Returns true if the address draft can be edited and confirmed.
    pub fn can_confirm(&self) -> bool {
        matches!(self, CheckoutState::ConfirmingAddress)
    }

    /// Returns true if a failed attempt can go back to address confirmation.
    pub fn can_retry(&self) -> bool {
        matches!(self, CheckoutState::Failed(reason) if reason.is_retryable())
    }

    /// Returns true if the payment code can be derived again from the
    /// stored order.
    pub fn can_reissue(&self) -> bool {
        matches!(
            self,
            CheckoutState::Ready | CheckoutState::Failed(FailureReason::ConfigurationError(_))
        )
    }

    /// Returns true if the session can be cancelled right away. Sessions
    /// with an order in the ledger cannot.
    pub fn can_cancel(&self) -> bool {
        match self {
            CheckoutState::Reviewing | CheckoutState::ConfirmingAddress => true,
            CheckoutState::Failed(reason) => reason.is_retryable(),
            _ => false,
        }
    }

    /// Returns true while an external call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::SubmittingOrder | CheckoutState::IssuingPayment
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Ready | CheckoutState::Failed(_) | CheckoutState::Discarded(_)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Reviewing => "Reviewing",
            CheckoutState::ConfirmingAddress => "ConfirmingAddress",
            CheckoutState::SubmittingOrder => "SubmittingOrder",
            CheckoutState::IssuingPayment => "IssuingPayment",
            CheckoutState::Ready => "Ready",
            CheckoutState::Failed(_) => "Failed",
            CheckoutState::Discarded(_) => "Discarded",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutState::Failed(reason) => write!(f, "Failed({})", reason.code()),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
