use serde::{Deserialize, Serialize};

/// Signing configuration.
///
/// The access and refresh secrets must differ: a refresh assertion presented
/// as an access assertion (or the reverse) has to fail signature checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: "change-me-access".to_string(),
            refresh_secret: "change-me-refresh".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
        }
    }
}

impl TokenConfig {
    /// Load from environment, falling back to defaults for missing values.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET").unwrap_or(defaults.access_secret),
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or(defaults.refresh_secret),
            access_ttl_minutes: std::env::var("ACCESS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.access_ttl_minutes),
            refresh_ttl_days: std::env::var("REFRESH_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_ttl_days),
        }
    }
}
