//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `clock` - system and manual time sources
//! - `gateway` - payment gateway HTTP client and mock
//! - `http` - REST API exposure (axum)
//! - `memory` - in-memory stores for tests and local runs
//! - `postgres` - persistent stores (sqlx)

pub mod clock;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;
