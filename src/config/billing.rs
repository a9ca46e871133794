//! Billing scheduler and pricing configuration

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{BillingCycle, FirstChargeDiscount, PricingPolicy, StandardPricing};

use super::error::ValidationError;
use super::server::Environment;

/// Pricing policy selection
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    #[default]
    Standard,
    FirstChargeDiscount,
}

/// Billing scheduler and pricing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Cadence of the renewal job in seconds
    #[serde(default = "default_job_interval")]
    pub renewal_interval_secs: u64,

    /// Cadence of the failed-payment retry job in seconds
    #[serde(default = "default_job_interval")]
    pub retry_interval_secs: u64,

    /// Cadence of the grace-period sweep in seconds
    #[serde(default = "default_job_interval")]
    pub grace_sweep_interval_secs: u64,

    /// Cadence of the free-trial sweep in seconds
    #[serde(default = "default_job_interval")]
    pub trial_sweep_interval_secs: u64,

    /// TTL of the persisted job lease in seconds
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// Pricing policy for charge attempts
    #[serde(default)]
    pub pricing: PricingMode,

    /// Billing cycle override for local runs (e.g. `test_minute`)
    pub cycle_override: Option<String>,
}

impl BillingConfig {
    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs(self.renewal_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn grace_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.grace_sweep_interval_secs)
    }

    pub fn trial_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.trial_sweep_interval_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    /// Instantiate the configured pricing policy.
    pub fn pricing_policy(&self) -> Arc<dyn PricingPolicy> {
        match self.pricing {
            PricingMode::Standard => Arc::new(StandardPricing),
            PricingMode::FirstChargeDiscount => Arc::new(FirstChargeDiscount::default()),
        }
    }

    /// Validate billing configuration
    ///
    /// Production refuses the test-only billing cycle.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        for interval in [
            self.renewal_interval_secs,
            self.retry_interval_secs,
            self.grace_sweep_interval_secs,
            self.trial_sweep_interval_secs,
        ] {
            if interval == 0 {
                return Err(ValidationError::InvalidJobInterval);
            }
        }
        if self.lease_ttl_secs == 0 {
            return Err(ValidationError::InvalidLeaseTtl);
        }

        if let Some(cycle) = &self.cycle_override {
            let parsed = BillingCycle::parse(cycle)
                .ok_or_else(|| ValidationError::UnknownBillingCycle(cycle.clone()))?;
            if *environment == Environment::Production && parsed.is_test_only() {
                return Err(ValidationError::TestCycleInProduction);
            }
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            renewal_interval_secs: default_job_interval(),
            retry_interval_secs: default_job_interval(),
            grace_sweep_interval_secs: default_job_interval(),
            trial_sweep_interval_secs: default_job_interval(),
            lease_ttl_secs: default_lease_ttl(),
            pricing: PricingMode::default(),
            cycle_override: None,
        }
    }
}

fn default_job_interval() -> u64 {
    3600
}

fn default_lease_ttl() -> u64 {
    600
}
