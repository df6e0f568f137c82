//! Ads platform and rule store collaborators: the client interface, the
//! per-credential session value, and in-memory implementations.

pub mod client;
pub mod fixture;
pub mod memory;
pub mod rule_store;
pub mod session;

pub use client::{AdResource, AdsClient};
pub use fixture::load_fixture;
pub use memory::InMemoryAdsClient;
pub use rule_store::{RuleStore, StaticRuleStore};
pub use session::ClientSession;
