//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Provider secret key (live_sk_... or test_sk_...)
    pub secret_key: String,

    /// Base URL for the provider API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl GatewayConfig {
    /// Check if using the provider's test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("test_sk_")
    }

    /// Check if using the provider's live mode
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("live_sk_")
    }

    /// Validate gateway configuration
    ///
    /// Production refuses to start on a test key.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__SECRET_KEY"));
        }
        if !self.is_test_mode() && !self.is_live_mode() {
            return Err(ValidationError::InvalidGatewayKey);
        }
        if *environment == Environment::Production && !self.is_live_mode() {
            return Err(ValidationError::TestGatewayKeyInProduction);
        }
        if *environment == Environment::Production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.paygate.example.com".to_string()
}
