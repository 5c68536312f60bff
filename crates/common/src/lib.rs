//! Shared types for the checkout workspace.

pub mod types;

pub use types::SessionId;
