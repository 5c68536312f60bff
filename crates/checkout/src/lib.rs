//! Checkout orchestration for the storefront.
//!
//! A checkout session moves a cart snapshot through address confirmation,
//! a single order-ledger submission and payment-code issuance:
//! 1. Review the cart and totals
//! 2. Confirm a valid, serviceable delivery address
//! 3. Record the order in the ledger (exactly once per attempt)
//! 4. Derive the payment code from the recorded order
//!
//! Failures before step 3 stay on the address step. Failures in step 3
//! leave no order and can be retried; failures in step 4 keep the order
//! and can be reissued.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod services;
pub mod session;
pub mod state;

pub use config::{CheckoutConfig, ConfigError, HttpLedgerConfig, PostalLookupConfig};
pub use coordinator::{
    AddressConfirmation, CancelOutcome, CheckoutCoordinator, ConfirmOutcome, ProceedOutcome,
};
pub use error::CheckoutError;
pub use services::{
    CartStore, HttpOrderLedger, HttpPostalLookup, InMemoryCartStore, InMemoryOrderLedger,
    InMemoryPostalLookup, InMemoryProfileStore, OrderLedger, OrderReceipt, PostalAddress,
    PostalLookup, Profile, ProfileStore,
};
pub use session::{CheckoutSession, Customer, FailureView, SessionView};
pub use state::{CheckoutState, DiscardReason, FailureReason};
