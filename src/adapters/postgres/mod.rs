//! PostgreSQL adapters - database implementations of the ports.
//!
//! - `PostgresSubscriptionRepository` - subscription aggregate with
//!   compare-and-swap updates and the scheduler's candidate queries
//! - `PostgresPremiumStore` - premium projection on the user record
//! - `PostgresHistoryLogger` - append-only subscription history
//! - `PostgresLeaseStore` - TTL job leases

mod history_logger;
mod lease_store;
mod premium_store;
mod subscription_repository;

pub use history_logger::PostgresHistoryLogger;
pub use lease_store::PostgresLeaseStore;
pub use premium_store::PostgresPremiumStore;
pub use subscription_repository::PostgresSubscriptionRepository;
