//! Auth service settings
//!
//! Loaded from `AURA_`-prefixed environment variables, nested keys separated
//! by `__` (for example `AURA_LOGIN_THROTTLE__MAX_ATTEMPTS=10`). Anything not
//! set falls back to the serde defaults below.

use serde::Deserialize;

use crate::rate_limiter::RateLimiterConfig;

/// Auth service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Socket address to listen on
    pub bind_address: String,
    /// Failed-login throttling
    pub login_throttle: RateLimiterConfig,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            login_throttle: RateLimiterConfig::default(),
        }
    }
}

impl AuthSettings {
    /// Load settings from the environment
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("AURA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
