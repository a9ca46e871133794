//! Injectable time source.
//!
//! Every scheduler job and command handler reads the current instant
//! through this port instead of calling the system clock directly, so
//! tests can advance virtual time instead of waiting on wall-clock
//! cadences.

use crate::domain::foundation::Timestamp;

/// Port for reading the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}
