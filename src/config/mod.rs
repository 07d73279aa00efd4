use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::mask_secret;

/// Default rotating proxy endpoint (Bright Data super proxy)
pub const DEFAULT_PROXY_ENDPOINT: &str = "brd.superproxy.io:22225";

/// Config file picked up from the working directory when no path is given
const LOCAL_CONFIG_FILE: &str = "transcription-api.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Residential proxy credentials
    pub proxy: ProxySettings,

    /// Bearer token protection
    pub auth: AuthConfig,

    /// Upstream request behaviour
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Development mode: verbose logging, reload left to an external watcher
    pub development: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub username: Option<String>,
    pub password: Option<String>,

    /// `host:port` of the rotating proxy gateway
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When set, every transcript endpoint requires `Authorization: Bearer <token>`
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Extra attempts after the first one (2 means up to 3 attempts)
    pub max_retries: u32,

    /// Per-request timeout for calls to YouTube, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            development: false,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            request_timeout_secs: 30,
        }
    }
}

impl ProxySettings {
    /// Username and password, only when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the YAML file (if any), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::config_path(path) {
            Some(config_path) => Self::from_file(&config_path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get configuration file path
    fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        local_config.exists().then_some(local_config)
    }

    /// Apply environment-style overrides. Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(username) = get("BRIGHTDATA_USERNAME") {
            self.proxy.username = Some(username);
        }
        if let Some(password) = get("BRIGHTDATA_PASSWORD") {
            self.proxy.password = Some(password);
        }
        if let Some(endpoint) = get("BRIGHTDATA_ENDPOINT") {
            self.proxy.endpoint = endpoint;
        }
        if let Some(token) = get("API_TOKEN") {
            self.auth.api_token = Some(token);
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(environment) = get("ENVIRONMENT") {
            self.server.development = environment.eq_ignore_ascii_case("development");
        }
        if let Some(retries) = get("MAX_RETRIES") {
            match retries.parse() {
                Ok(retries) => self.upstream.max_retries = retries,
                Err(_) => tracing::warn!("Ignoring invalid MAX_RETRIES value: {}", retries),
            }
        }
        if let Some(timeout) = get("REQUEST_TIMEOUT") {
            match timeout.parse() {
                Ok(timeout) => self.upstream.request_timeout_secs = timeout,
                Err(_) => tracing::warn!("Ignoring invalid REQUEST_TIMEOUT value: {}", timeout),
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.proxy.endpoint.trim().is_empty() {
            anyhow::bail!("Proxy endpoint must not be empty");
        }

        if self.upstream.request_timeout_secs == 0 {
            anyhow::bail!("Upstream request timeout must be at least one second");
        }

        if self.proxy.username.is_some() != self.proxy.password.is_some() {
            tracing::warn!("Proxy needs both username and password; using direct connections");
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}", self.bind_addr());
        println!("  Development Mode: {}", self.server.development);
        match self.proxy.credentials() {
            Some((username, _)) => {
                println!("  Proxy: {} (user {}, password ***)", self.proxy.endpoint, username)
            }
            None => println!("  Proxy: disabled (direct connection)"),
        }
        match &self.auth.api_token {
            Some(token) => println!("  API Token: {}", mask_secret(token)),
            None => println!("  API Token: not set (authentication disabled)"),
        }
        println!("  Max Retries: {}", self.upstream.max_retries);
        println!("  Request Timeout: {}s", self.upstream.request_timeout_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| env.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.proxy.endpoint, DEFAULT_PROXY_ENDPOINT);
        assert_eq!(config.upstream.max_retries, 2);
        assert!(config.proxy.credentials().is_none());
        assert!(config.auth.api_token.is_none());
        assert!(!config.server.development);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("BRIGHTDATA_USERNAME", "brd-customer-hl_1-zone-residential"),
            ("BRIGHTDATA_PASSWORD", "hunter2"),
            ("BRIGHTDATA_ENDPOINT", "proxy.local:9000"),
            ("API_TOKEN", "secret-token"),
            ("PORT", "9090"),
            ("ENVIRONMENT", "development"),
            ("MAX_RETRIES", "4"),
        ]));

        assert_eq!(
            config.proxy.credentials(),
            Some(("brd-customer-hl_1-zone-residential", "hunter2"))
        );
        assert_eq!(config.proxy.endpoint, "proxy.local:9000");
        assert_eq!(config.auth.api_token.as_deref(), Some("secret-token"));
        assert_eq!(config.server.port, 9090);
        assert!(config.server.development);
        assert_eq!(config.upstream.max_retries, 4);
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("API_TOKEN", ""), ("BRIGHTDATA_USERNAME", "  ")]));

        assert!(config.auth.api_token.is_none());
        assert!(config.proxy.username.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("PORT", "eighty"), ("MAX_RETRIES", "-1")]));

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.upstream.max_retries, 2);
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("BRIGHTDATA_USERNAME", "user")]));
        assert!(config.proxy.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("server:\n  port: 9000\nauth:\n  api_token: abc\n")
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.api_token.as_deref(), Some("abc"));
        assert_eq!(config.proxy.endpoint, DEFAULT_PROXY_ENDPOINT);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.upstream.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
