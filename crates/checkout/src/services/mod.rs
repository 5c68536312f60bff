//! External collaborator traits, in-memory doubles and HTTP adapters.

pub mod cart;
pub mod http_ledger;
pub mod http_postal;
pub mod ledger;
pub mod postal;
pub mod profile;

pub use cart::{CartStore, InMemoryCartStore};
pub use http_ledger::HttpOrderLedger;
pub use http_postal::HttpPostalLookup;
pub use ledger::{InMemoryOrderLedger, OrderLedger, OrderReceipt};
pub use postal::{InMemoryPostalLookup, PostalAddress, PostalLookup};
pub use profile::{InMemoryProfileStore, Profile, ProfileStore};
