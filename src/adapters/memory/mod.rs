//! In-memory adapters.
//!
//! Full implementations of the persistence ports backed by mutex-held
//! collections. Used by the test suites and by local runs without a
//! database; they honor the same contracts as the postgres adapters,
//! including compare-and-swap on the subscription version.

mod history_logger;
mod lease_store;
mod premium_store;
mod subscription_repository;

pub use history_logger::InMemoryHistoryLogger;
pub use lease_store::InMemoryLeaseStore;
pub use premium_store::InMemoryPremiumStore;
pub use subscription_repository::InMemorySubscriptionRepository;
