//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these
//! ports.
//!
//! - `SubscriptionRepository` - versioned persistence for the aggregate
//! - `PremiumStateStore` - user premium projection and trial window
//! - `PaymentGateway` - credential issuance and on-demand charges
//! - `HistoryLogger` - append-only audit trail (fire-and-forget)
//! - `Clock` - injectable time source so jobs run on virtual time
//! - `LeaseStore` - persisted job lease guarding scheduler runs

mod clock;
mod history_logger;
mod lease_store;
mod payment_gateway;
mod premium_state_store;
mod subscription_repository;

pub use clock::Clock;
pub use history_logger::HistoryLogger;
pub use lease_store::{Lease, LeaseStore};
pub use payment_gateway::{
    BillingCredential, ChargeRequest, GatewayError, GatewayErrorCode, GatewayReceipt,
    PaymentGateway,
};
pub use premium_state_store::{PremiumStateStore, TrialCandidate};
pub use subscription_repository::SubscriptionRepository;
