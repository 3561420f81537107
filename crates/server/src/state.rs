use sha2::{Digest, Sha256};
use std::sync::Arc;
use followtrack_core::{Config, PollScheduler, SanitizedConfig, SchedulerStatus};

/// Shared application state
pub struct AppState {
    config: Config,
    scheduler: Arc<PollScheduler>,
    config_hash: String,
}

impl AppState {
    pub fn new(config: Config, scheduler: Arc<PollScheduler>) -> Self {
        let config_hash = config_fingerprint(&config);
        Self {
            config,
            scheduler,
            config_hash,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub async fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }
}

/// Short SHA-256 fingerprint of the effective configuration.
pub fn config_fingerprint(config: &Config) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let config = Config::default();
        let a = config_fingerprint(&config);
        let b = config_fingerprint(&config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_config() {
        let mut config = Config::default();
        let before = config_fingerprint(&config);
        config.scheduler.poll_interval_ms = 5000;
        assert_ne!(before, config_fingerprint(&config));
    }
}
