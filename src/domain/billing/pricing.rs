//! Pricing policy strategy.
//!
//! The charge amount for an attempt is computed by a pluggable policy
//! rather than inline in the payment path, so the first-subscription
//! discount rule stays isolated and tests can substitute simpler
//! policies.

use super::Subscription;

/// Computes the amount to charge for the next payment attempt.
pub trait PricingPolicy: Send + Sync {
    fn charge_amount(&self, subscription: &Subscription) -> i64;
}

/// Charges the plan price as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPricing;

impl PricingPolicy for StandardPricing {
    fn charge_amount(&self, subscription: &Subscription) -> i64 {
        subscription.price
    }
}

/// First cycle is free, but the gateway rejects zero-amount charges, so
/// the first attempt charges the configured minimum instead.
#[derive(Debug, Clone, Copy)]
pub struct FirstChargeDiscount {
    pub minimum_charge: i64,
}

impl Default for FirstChargeDiscount {
    fn default() -> Self {
        Self { minimum_charge: 100 }
    }
}

impl PricingPolicy for FirstChargeDiscount {
    fn charge_amount(&self, subscription: &Subscription) -> i64 {
        // Zero-price plans (trial) stay zero; they are never charged.
        if subscription.price == 0 {
            return 0;
        }
        if subscription.has_successful_payment() {
            subscription.price
        } else {
            self.minimum_charge
        }
    }
}
