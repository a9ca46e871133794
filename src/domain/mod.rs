//! Domain layer - the billing core and its shared primitives.

pub mod billing;
pub mod foundation;
