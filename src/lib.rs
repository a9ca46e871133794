//! Homeport Billing - recurring-subscription billing engine.
//!
//! Drives the premium subscription of the Homeport real-estate CRM:
//! subscription state machine, calendar-safe billing dates, scheduled
//! renewals and retries, free trials, and cancellation grace periods.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod scheduler;
