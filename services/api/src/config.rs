//! API service settings
//!
//! Loaded from `AURA_`-prefixed environment variables, nested keys separated
//! by `__` (for example `AURA_PLANNER__BASE_URL`). Anything not set falls back
//! to the serde defaults below. List values are comma separated, as in
//! `AURA_SEED__COMPLETION_PROBABILITIES=0.7,0.8,0.9,0.75,0.6,0.5`.

use auth::rate_limiter::RateLimiterConfig;

use crate::seed::DAILY_SLOT_COUNT;
use serde::Deserialize;

/// External task planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Base URL of the planner; without one every plan falls back to the default day
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 20,
        }
    }
}

/// Push delivery endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushSettings {
    /// HTTP endpoint accepting `{token, title, body, data}`; unset means log-only delivery
    pub endpoint: Option<String>,
    /// Sent as a bearer credential to the endpoint
    pub server_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            server_key: None,
            timeout_seconds: 10,
        }
    }
}

/// Demo data generation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedPolicy {
    /// Completion probability per daily slot, in slot order
    pub completion_probabilities: Vec<f64>,
    /// Completion probability of the weekend-only slot
    pub weekend_completion_probability: f64,
    pub min_energy: i16,
    pub max_energy: i16,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            completion_probabilities: vec![0.7, 0.8, 0.9, 0.75, 0.6, 0.5],
            weekend_completion_probability: 0.8,
            min_energy: 2,
            max_energy: 5,
        }
    }
}

/// Upsert-if-absent behavior when the caller does not say
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub replace_by_default: bool,
}

/// API service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Socket address to listen on
    pub bind_address: String,
    pub planner: PlannerSettings,
    pub push: PushSettings,
    pub seed: SeedPolicy,
    pub sync: SyncPolicy,
    /// Failed-login throttling for the mounted auth routes
    pub login_throttle: RateLimiterConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            planner: PlannerSettings::default(),
            push: PushSettings::default(),
            seed: SeedPolicy::default(),
            sync: SyncPolicy::default(),
            login_throttle: RateLimiterConfig::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from the environment
    pub fn load() -> anyhow::Result<Self> {
        let settings: AppSettings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("AURA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("seed.completion_probabilities"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.seed.completion_probabilities.len() != DAILY_SLOT_COUNT {
            anyhow::bail!(
                "Expected {} seed completion probabilities, got {}",
                DAILY_SLOT_COUNT,
                self.seed.completion_probabilities.len()
            );
        }
        let probabilities = self
            .seed
            .completion_probabilities
            .iter()
            .chain(std::iter::once(&self.seed.weekend_completion_probability));
        for p in probabilities {
            if !(0.0..=1.0).contains(p) {
                anyhow::bail!("Seed completion probability {} is outside 0..=1", p);
            }
        }
        if self.seed.min_energy < 1
            || self.seed.max_energy > 5
            || self.seed.min_energy > self.seed.max_energy
        {
            anyhow::bail!(
                "Seed energy range {}..={} must lie within 1..=5",
                self.seed.min_energy,
                self.seed.max_energy
            );
        }
        Ok(())
    }
}
