use serde::{Deserialize, Serialize};

/// Per-client request quotas.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// TOML: `limits.enabled`. Default: `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Requests allowed per client IP per day.
    /// TOML: `limits.per_day`. Default: `200`.
    #[serde(default = "default_per_day")]
    pub per_day: u32,

    /// Requests allowed per client IP per hour.
    /// TOML: `limits.per_hour`. Default: `50`.
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            per_day: default_per_day(),
            per_hour: default_per_hour(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_per_day() -> u32 {
    200
}

fn default_per_hour() -> u32 {
    50
}
