//! Startup configuration, resolved once from the CLI/environment.

use relaysync_types::{ConfigError, IpRangeSet, MetricsConfig, NotifyConfig, SyncConfig};
use std::net::{IpAddr, SocketAddr};

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub metrics: MetricsConfig,
    pub notify: NotifyConfig,
    pub bind: IpAddr,
    pub port: u16,
}

impl AppConfig {
    /// Build and validate. Any error here is fatal at startup.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let trusted_networks = cli
            .trusted_networks
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                IpRangeSet::parse_prefix(s).map_err(|e| ConfigError::ParseError {
                    message: format!("TRUSTED_NETWORKS entry {s:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sync = SyncConfig {
            upstream_url: cli.upstream_url.trim().to_string(),
            sync_interval_secs: cli.check_interval,
            fetch_timeout_secs: cli.fetch_timeout,
            reload_timeout_secs: cli.reload_timeout,
            shutdown_grace_secs: cli.shutdown_grace,
            trusted_networks,
            access_file: cli.access_file.clone(),
            backup_access_file: cli.access_file_backup,
            postfix_bin: cli.postfix_bin.clone(),
            postqueue_bin: cli.postqueue_bin.clone(),
            postfix_config_dir: cli.postfix_config_dir.clone(),
            product_filter: non_empty(&cli.product_filter),
            direction_filter: non_empty(&cli.direction_filter),
        };
        sync.check()?;

        let metrics = MetricsConfig {
            interval_secs: cli.metrics_interval,
            prefix: cli.metrics_prefix.clone(),
            api_key: cli.dd_api_key.clone().filter(|k| !k.trim().is_empty()),
            site: cli.dd_site.clone(),
            host: local_hostname(),
        };
        metrics.check()?;

        let notify = NotifyConfig {
            slack_webhook_url: cli.slack_webhook_url.clone().filter(|u| !u.trim().is_empty()),
        };

        Ok(Self { sync, metrics, notify, bind: cli.bind, port: cli.port })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string).collect()
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
