use super::{types::Config, ConfigError};
use crate::scheduler::MAX_INSTANCES_LIMIT;

/// Validate configuration
/// Currently validates:
/// - Store URL uses a redis scheme and keys are non-empty
/// - Profile base URL is http(s) and the timeout is non-zero
/// - Scheduler intervals are non-zero and the per-job instance bound is
///   within `1..=MAX_INSTANCES_LIMIT`
/// - Server port is not 0 when the listener is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let fail = |msg: &str| -> Result<(), ConfigError> {
        Err(ConfigError::ValidationError(msg.to_string()))
    };

    // Store validation
    let url = config.store.url.trim();
    if url.is_empty() {
        return fail("store.url cannot be empty");
    }
    if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
        return fail("store.url must start with redis:// or rediss://");
    }
    if config.store.targets_key.is_empty() {
        return fail("store.targets_key cannot be empty");
    }
    if config.store.count_field.is_empty() {
        return fail("store.count_field cannot be empty");
    }

    // Fetcher validation
    let base = &config.fetcher.profile_base_url;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return fail("fetcher.profile_base_url must be an http(s) URL");
    }
    if config.fetcher.timeout_secs == 0 {
        return fail("fetcher.timeout_secs cannot be 0");
    }

    // Scheduler validation
    if config.scheduler.poll_interval_ms == 0 {
        return fail("scheduler.poll_interval_ms cannot be 0");
    }
    if config.scheduler.refresh_interval_ms == 0 {
        return fail("scheduler.refresh_interval_ms cannot be 0");
    }
    if config.scheduler.max_instances_per_job == 0 {
        return fail("scheduler.max_instances_per_job cannot be 0");
    }
    if config.scheduler.max_instances_per_job > MAX_INSTANCES_LIMIT {
        return Err(ConfigError::ValidationError(format!(
            "scheduler.max_instances_per_job cannot exceed {}",
            MAX_INSTANCES_LIMIT
        )));
    }

    // Server validation
    if config.server.enabled && config.server.port == 0 {
        return fail("server.port cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, needle: &str) {
        let err = validate_config(config).unwrap_err();
        match err {
            ConfigError::ValidationError(msg) => assert!(msg.contains(needle), "{}", msg),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_store_url() {
        let mut config = Config::default();
        config.store.url = "".to_string();
        assert_invalid(&config, "store.url");

        config.store.url = "http://127.0.0.1:6379".to_string();
        assert_invalid(&config, "store.url");

        config.store.url = "rediss://cache:6380/0".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_store_keys() {
        let mut config = Config::default();
        config.store.targets_key = String::new();
        assert_invalid(&config, "targets_key");

        let mut config = Config::default();
        config.store.count_field = String::new();
        assert_invalid(&config, "count_field");
    }

    #[test]
    fn test_validate_fetcher() {
        let mut config = Config::default();
        config.fetcher.profile_base_url = "ftp://example.com/".to_string();
        assert_invalid(&config, "profile_base_url");

        let mut config = Config::default();
        config.fetcher.timeout_secs = 0;
        assert_invalid(&config, "timeout_secs");
    }

    #[test]
    fn test_validate_scheduler() {
        let mut config = Config::default();
        config.scheduler.poll_interval_ms = 0;
        assert_invalid(&config, "poll_interval_ms");

        let mut config = Config::default();
        config.scheduler.refresh_interval_ms = 0;
        assert_invalid(&config, "refresh_interval_ms");

        let mut config = Config::default();
        config.scheduler.max_instances_per_job = 0;
        assert_invalid(&config, "max_instances_per_job");
    }

    #[test]
    fn test_validate_max_instances_upper_bound() {
        let mut config = Config::default();
        config.scheduler.max_instances_per_job = MAX_INSTANCES_LIMIT;
        assert!(validate_config(&config).is_ok());

        config.scheduler.max_instances_per_job = usize::MAX;
        assert_invalid(&config, "cannot exceed");
    }

    #[test]
    fn test_validate_port_zero_only_when_enabled() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_ok());

        config.server.enabled = true;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_validate_empty_pools_are_fine() {
        let mut config = Config::default();
        config.fetcher.user_agents.clear();
        config.fetcher.proxies.clear();
        assert!(validate_config(&config).is_ok());
    }
}
