//! Resolved runtime configuration.
//!
//! Values are resolved once at startup (see `relaysync-server`'s CLI) and never
//! reloaded.

use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::error::ConfigError;

pub const DEFAULT_UPSTREAM_URL: &str = "https://ip-ranges.atlassian.com/";
pub const DEFAULT_ACCESS_FILE: &str = "/etc/postfix/clients.cidr";
pub const DEFAULT_POSTFIX_CONFIG_DIR: &str = "/etc/postfix";
/// Items of the default document that may relay mail
pub const DEFAULT_PRODUCT_FILTER: &str = "email";
pub const DEFAULT_DIRECTION_FILTER: &str = "egress";
/// Filter entry that accepts every item
pub const FILTER_ANY: &str = "*";

/// Synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SyncConfig {
    /// Upstream IP-range document
    #[validate(url(message = "must be an absolute http(s) URL"))]
    pub upstream_url: String,
    /// Seconds between sync cycles
    #[validate(range(min = 10_u64, message = "must be at least 10 seconds"))]
    pub sync_interval_secs: u64,
    /// Upstream request timeout
    #[validate(range(min = 1_u64, max = 300_u64))]
    pub fetch_timeout_secs: u64,
    /// Timeout for each Postfix control command
    #[validate(range(min = 1_u64, max = 300_u64))]
    pub reload_timeout_secs: u64,
    /// Grace period for an in-flight cycle at shutdown
    #[validate(range(max = 300_u64))]
    pub shutdown_grace_secs: u64,
    /// Networks always allowed, written ahead of the upstream ranges
    #[serde(default)]
    pub trusted_networks: Vec<IpNet>,
    /// Access file consumed by Postfix
    pub access_file: PathBuf,
    /// Keep a timestamped copy of the previous access file before replacing it
    #[serde(default)]
    pub backup_access_file: bool,
    /// Postfix control binary
    #[validate(length(min = 1_u64))]
    pub postfix_bin: String,
    /// Queue listing binary, used for agent checks only
    #[serde(default = "default_postqueue_bin")]
    #[validate(length(min = 1_u64))]
    pub postqueue_bin: String,
    /// Directory holding `main.cf` and `master.cf`
    #[serde(default = "default_postfix_config_dir")]
    pub postfix_config_dir: PathBuf,
    /// Keep only items whose `product` list contains one of these (`*` = all)
    #[serde(default = "default_product_filter")]
    pub product_filter: Vec<String>,
    /// Keep only items whose `direction` list contains one of these (`*` = all)
    #[serde(default = "default_direction_filter")]
    pub direction_filter: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            sync_interval_secs: 3600,
            fetch_timeout_secs: 30,
            reload_timeout_secs: 10,
            shutdown_grace_secs: 10,
            trusted_networks: loopback_v4().into_iter().collect(),
            access_file: PathBuf::from(DEFAULT_ACCESS_FILE),
            backup_access_file: false,
            postfix_bin: "postfix".to_string(),
            postqueue_bin: default_postqueue_bin(),
            postfix_config_dir: default_postfix_config_dir(),
            product_filter: default_product_filter(),
            direction_filter: default_direction_filter(),
        }
    }
}

fn default_postqueue_bin() -> String {
    "postqueue".to_string()
}

fn default_postfix_config_dir() -> PathBuf {
    PathBuf::from(DEFAULT_POSTFIX_CONFIG_DIR)
}

fn default_product_filter() -> Vec<String> {
    vec![DEFAULT_PRODUCT_FILTER.to_string()]
}

fn default_direction_filter() -> Vec<String> {
    vec![DEFAULT_DIRECTION_FILTER.to_string()]
}

fn loopback_v4() -> Option<IpNet> {
    Ipv4Net::new(Ipv4Addr::new(127, 0, 0, 0), 8).ok().map(IpNet::V4)
}

impl SyncConfig {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation(&e))?;
        let scheme_ok = self.upstream_url.starts_with("https://")
            || self.upstream_url.starts_with("http://");
        if !scheme_ok {
            return Err(ConfigError::ValidationError {
                field: "upstream_url".to_string(),
                message: "must be an absolute http(s) URL".to_string(),
            });
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Metrics emitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct MetricsConfig {
    /// Seconds between pushes
    #[validate(range(min = 5_u64, message = "must be at least 5 seconds"))]
    pub interval_secs: u64,
    /// Sample name prefix
    #[validate(length(min = 1_u64))]
    pub prefix: String,
    /// Datadog API key; pushes are disabled without one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Datadog site, e.g. `datadoghq.com` or `datadoghq.eu`
    pub site: String,
    /// Host tag attached to every sample
    pub host: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            prefix: "relaysync".to_string(),
            api_key: None,
            site: "datadoghq.com".to_string(),
            host: "unknown".to_string(),
        }
    }
}

impl MetricsConfig {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation(&e))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Series endpoint for the configured site.
    pub fn series_url(&self) -> String {
        format!("https://api.{}/api/v1/series", self.site.trim_matches('/'))
    }
}

/// Slack notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyConfig {
    #[serde(default, skip_serializing)]
    pub slack_webhook_url: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sync_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.trusted_networks, vec!["127.0.0.0/8".parse::<IpNet>().unwrap()]);
        assert_eq!(config.product_filter, vec!["email"]);
        assert_eq!(config.direction_filter, vec!["egress"]);
    }

    #[test]
    fn test_deserialized_config_keeps_filter_defaults() {
        let config: SyncConfig = serde_json::from_value(serde_json::json!({
            "upstream_url": DEFAULT_UPSTREAM_URL,
            "sync_interval_secs": 3600,
            "fetch_timeout_secs": 30,
            "reload_timeout_secs": 10,
            "shutdown_grace_secs": 10,
            "access_file": DEFAULT_ACCESS_FILE,
            "postfix_bin": "postfix"
        }))
        .unwrap();
        assert_eq!(config.product_filter, SyncConfig::default().product_filter);
        assert_eq!(config.direction_filter, SyncConfig::default().direction_filter);
        assert_eq!(config.postqueue_bin, "postqueue");
    }

    #[test]
    fn test_rejects_short_interval() {
        let config = SyncConfig { sync_interval_secs: 1, ..SyncConfig::default() };
        let err = config.check().unwrap_err();
        assert_eq!(
            err,
            ConfigError::ValidationError {
                field: "sync_interval_secs".to_string(),
                message: "must be at least 10 seconds".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = SyncConfig {
            upstream_url: "ftp://example.com/ranges".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.check().is_err());

        let config = SyncConfig { upstream_url: "not a url".to_string(), ..SyncConfig::default() };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_series_url() {
        let config = MetricsConfig { site: "datadoghq.eu".to_string(), ..MetricsConfig::default() };
        assert_eq!(config.series_url(), "https://api.datadoghq.eu/api/v1/series");
        assert!(config.check().is_ok());
    }
}
