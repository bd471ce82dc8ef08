use clap::Parser;
use relaysync_types::models::{
    DEFAULT_ACCESS_FILE, DEFAULT_DIRECTION_FILTER, DEFAULT_POSTFIX_CONFIG_DIR,
    DEFAULT_PRODUCT_FILTER, DEFAULT_UPSTREAM_URL,
};
use std::net::IpAddr;
use std::path::PathBuf;

/// Every option can also be set through the environment variable shown in `--help`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "relaysync-server",
    about = "Keeps a Postfix client access file in sync with published IP ranges",
    version = env!("CARGO_PKG_VERSION"),
    author
)]
pub struct Cli {
    /// Upstream IP-range document
    #[arg(long, env = "IP_RANGES_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Seconds between sync cycles
    #[arg(long, env = "IP_CHECK_INTERVAL", default_value_t = 3600)]
    pub check_interval: u64,

    /// Seconds between metrics pushes
    #[arg(long, env = "METRICS_INTERVAL", default_value_t = 60)]
    pub metrics_interval: u64,

    #[arg(short, long, env = "HEALTH_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "HEALTH_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// CIDRs always allowed to relay, comma separated
    #[arg(long, env = "TRUSTED_NETWORKS", value_delimiter = ',', default_value = "127.0.0.0/8")]
    pub trusted_networks: Vec<String>,

    #[arg(long, env = "ACCESS_FILE", default_value = DEFAULT_ACCESS_FILE)]
    pub access_file: PathBuf,

    /// Keep a timestamped copy of the access file before each replace
    #[arg(long, env = "ACCESS_FILE_BACKUP")]
    pub access_file_backup: bool,

    #[arg(long, env = "POSTFIX_BIN", default_value = "postfix")]
    pub postfix_bin: String,

    #[arg(long, env = "POSTQUEUE_BIN", default_value = "postqueue")]
    pub postqueue_bin: String,

    /// Directory holding main.cf and master.cf, reported by /postfix
    #[arg(long, env = "POSTFIX_CONFIG_DIR", default_value = DEFAULT_POSTFIX_CONFIG_DIR)]
    pub postfix_config_dir: PathBuf,

    /// Upstream request timeout, seconds
    #[arg(long, env = "FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// Per control command timeout, seconds
    #[arg(long, env = "RELOAD_TIMEOUT", default_value_t = 10)]
    pub reload_timeout: u64,

    /// Seconds an in-flight cycle may run after a shutdown signal
    #[arg(long, env = "SHUTDOWN_GRACE", default_value_t = 10)]
    pub shutdown_grace: u64,

    /// Keep only items whose `product` list contains one of these (`*` keeps all)
    #[arg(
        long,
        env = "IP_PRODUCT_FILTER",
        value_delimiter = ',',
        default_value = DEFAULT_PRODUCT_FILTER
    )]
    pub product_filter: Vec<String>,

    /// Keep only items whose `direction` list contains one of these (`*` keeps all)
    #[arg(
        long,
        env = "IP_DIRECTION_FILTER",
        value_delimiter = ',',
        default_value = DEFAULT_DIRECTION_FILTER
    )]
    pub direction_filter: Vec<String>,

    #[arg(long, env = "DD_API_KEY", hide_env_values = true)]
    pub dd_api_key: Option<String>,

    #[arg(long, env = "DD_SITE", default_value = "datadoghq.com")]
    pub dd_site: String,

    #[arg(long, env = "METRICS_PREFIX", default_value = "relaysync")]
    pub metrics_prefix: String,

    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}
