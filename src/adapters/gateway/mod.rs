//! Payment gateway adapters.
//!
//! `HttpPaymentGateway` talks to the real provider over REST;
//! `MockPaymentGateway` is a scriptable stand-in for tests.

mod http_gateway;
mod mock;

pub use http_gateway::{GatewayConfig, HttpPaymentGateway};
pub use mock::MockPaymentGateway;
