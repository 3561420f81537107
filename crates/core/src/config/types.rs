use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::scheduler::SchedulerConfig;
use crate::writer::DEFAULT_COUNT_FIELD;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Key-value store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Connection URL (e.g., "redis://127.0.0.1:6379/0")
    #[serde(default = "default_store_url")]
    pub url: String,
    /// List key holding the target identifiers
    #[serde(default = "default_targets_key")]
    pub targets_key: String,
    /// Hash field the follower count is written to
    #[serde(default = "default_count_field")]
    pub count_field: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            targets_key: default_targets_key(),
            count_field: default_count_field(),
        }
    }
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_targets_key() -> String {
    "usernames".to_string()
}

fn default_count_field() -> String {
    DEFAULT_COUNT_FIELD.to_string()
}

/// Profile fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Base URL profile identifiers are appended to
    #[serde(default = "default_profile_base_url")]
    pub profile_base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// User-Agent pool rotated per request
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Proxy pool rotated per request (empty = direct egress)
    #[serde(default)]
    pub proxies: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            profile_base_url: default_profile_base_url(),
            timeout_secs: default_timeout(),
            user_agents: default_user_agents(),
            proxies: Vec::new(),
        }
    }
}

fn default_profile_base_url() -> String {
    "https://instagram.com/".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko)Chrome/64.0.3282.140 Safari/537.36 Edge/17.17134"
            .to_string(),
        "Mozilla/5.0 (Windows NT 6.1; Win64; rv:59.0) Gecko/20100101 Firefox/59.0".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; rv:60.0) Gecko/20100101 Firefox/60.0".to_string(),
    ]
}

/// Observability listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Serve health, status and metrics over HTTP
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    9464
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub store: SanitizedStoreConfig,
    pub fetcher: SanitizedFetcherConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

/// Sanitized store config (credentials stripped from the URL)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoreConfig {
    pub url: String,
    pub targets_key: String,
    pub count_field: String,
}

/// Sanitized fetcher config (proxy endpoints hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetcherConfig {
    pub profile_base_url: String,
    pub timeout_secs: u32,
    pub user_agent_count: usize,
    pub proxy_count: usize,
}

/// Replace the userinfo part of a URL with `***`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            store: SanitizedStoreConfig {
                url: redact_url(&config.store.url),
                targets_key: config.store.targets_key.clone(),
                count_field: config.store.count_field.clone(),
            },
            fetcher: SanitizedFetcherConfig {
                profile_base_url: config.fetcher.profile_base_url.clone(),
                timeout_secs: config.fetcher.timeout_secs,
                user_agent_count: config.fetcher.user_agents.len(),
                proxy_count: config.fetcher.proxies.len(),
            },
            scheduler: config.scheduler.clone(),
            server: config.server.clone(),
        }
    }
}
