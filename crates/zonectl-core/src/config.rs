//! Configuration types for zonectl
//!
//! Provider configuration is static: credentials are read once and handed to
//! the provider, which treats them as opaque.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Default OVH API endpoint alias
pub const DEFAULT_OVH_ENDPOINT: &str = "ovh-eu";

/// Environment variable names read by [`ProviderConfig::ovh_from_env`]
pub const ENV_OVH_ENDPOINT: &str = "ZONECTL_OVH_ENDPOINT";
pub const ENV_OVH_APPLICATION_KEY: &str = "ZONECTL_OVH_APPLICATION_KEY";
pub const ENV_OVH_APPLICATION_SECRET: &str = "ZONECTL_OVH_APPLICATION_SECRET";
pub const ENV_OVH_CONSUMER_KEY: &str = "ZONECTL_OVH_CONSUMER_KEY";

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// OVH provider
    Ovh {
        /// Endpoint alias (`ovh-eu`, `ovh-ca`, ...) or API base URL
        #[serde(default = "default_ovh_endpoint")]
        endpoint: String,
        /// Application key
        application_key: String,
        /// Application secret
        application_secret: String,
        /// Consumer key
        consumer_key: String,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Build an OVH configuration from `ZONECTL_OVH_*` environment variables
    ///
    /// The endpoint defaults to `ovh-eu`; the three credentials are required.
    pub fn ovh_from_env() -> Result<Self, crate::Error> {
        let required = |name: &str| {
            env::var(name).map_err(|_| crate::Error::config(format!("{} is required", name)))
        };

        let config = ProviderConfig::Ovh {
            endpoint: env::var(ENV_OVH_ENDPOINT).unwrap_or_else(|_| default_ovh_endpoint()),
            application_key: required(ENV_OVH_APPLICATION_KEY)?,
            application_secret: required(ENV_OVH_APPLICATION_SECRET)?,
            consumer_key: required(ENV_OVH_CONSUMER_KEY)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Ovh {
                endpoint,
                application_key,
                application_secret,
                consumer_key,
            } => {
                for (field, value) in [
                    ("endpoint", endpoint),
                    ("application key", application_key),
                    ("application secret", application_secret),
                    ("consumer key", consumer_key),
                ] {
                    if value.trim().is_empty() {
                        return Err(crate::Error::config(format!(
                            "OVH {} cannot be empty",
                            field
                        )));
                    }
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Ovh { .. } => "ovh",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Credentials never show up in Debug output
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Ovh {
                endpoint,
                application_key,
                ..
            } => f
                .debug_struct("Ovh")
                .field("endpoint", endpoint)
                .field("application_key", application_key)
                .field("application_secret", &"<REDACTED>")
                .field("consumer_key", &"<REDACTED>")
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

fn default_ovh_endpoint() -> String {
    DEFAULT_OVH_ENDPOINT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ovh(secret: &str) -> ProviderConfig {
        ProviderConfig::Ovh {
            endpoint: "ovh-eu".to_string(),
            application_key: "app-key".to_string(),
            application_secret: secret.to_string(),
            consumer_key: "consumer-key-123".to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_credentials() {
        assert!(ovh("s3cr3t").validate().is_ok());
        let err = ovh("  ").validate().unwrap_err();
        assert!(err.to_string().contains("application secret"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", ovh("very-secret-value"));
        assert!(!debug.contains("very-secret-value"));
        assert!(!debug.contains("consumer-key-123"));
        assert!(debug.contains("app-key"));
    }

    #[test]
    fn test_deserialize_defaults_endpoint() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "type": "ovh",
            "application_key": "ak",
            "application_secret": "as",
            "consumer_key": "ck",
        }))
        .unwrap();

        assert_eq!(config.type_name(), "ovh");
        match config {
            ProviderConfig::Ovh { endpoint, .. } => assert_eq!(endpoint, "ovh-eu"),
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_custom_type_name() {
        let config = ProviderConfig::Custom {
            factory: "acme".to_string(),
            config: serde_json::json!({"token": "x"}),
        };
        assert_eq!(config.type_name(), "acme");
        assert!(config.validate().is_ok());
    }
}
