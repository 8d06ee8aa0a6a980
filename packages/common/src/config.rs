use serde::Deserialize;

/// Retry policy for failed notification deliveries.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Attempts after which the sweeper stops retrying on its own. Default: 5.
    /// Operators can still retry manually.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    /// Delay before the first automatic retry, in seconds. Default: 60.
    #[serde(default = "default_base_secs")]
    pub base_secs: u64,
    /// Upper bound for the backoff delay, in seconds. Default: 3600.
    #[serde(default = "default_max_secs")]
    pub max_secs: u64,
    /// How often the sweeper scans for due deliveries, in seconds. Default: 30.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Age after which a `pending`/`sending` row is considered abandoned. Default: 300.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_max_attempts() -> u8 {
    5
}
fn default_base_secs() -> u64 {
    60
}
fn default_max_secs() -> u64 {
    3600
}
fn default_sweep_interval_secs() -> u64 {
    30
}
fn default_stale_after_secs() -> u64 {
    300
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_secs: default_base_secs(),
            max_secs: default_max_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}
