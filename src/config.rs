use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hyper::Uri;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/_internal/state";

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Live view of a consistent-hashing load balancer",
    long_about = None
)]
pub struct Args {
    /// State export of the balancer, e.g. http://<host>:<port>/_internal/state
    #[arg(long, env = "CHLB_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Refresh interval in milliseconds
    #[arg(long, env = "CHLB_REFRESH_INTERVAL_MS", default_value_t = 5000)]
    pub refresh_interval_ms: u64,

    /// Per-request timeout in milliseconds (defaults to the refresh interval)
    #[arg(long, env = "CHLB_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Log filter, e.g. `info` or `chlb_monitor=debug`
    #[arg(long, env = "CHLB_LOG", default_value = "info")]
    pub log_level: String,

    /// Where logs go while the terminal view owns the screen
    #[arg(long, default_value = "chlb-monitor.log")]
    pub log_file: PathBuf,

    /// Log snapshots instead of drawing the terminal view
    #[arg(long)]
    pub headless: bool,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub endpoint: Uri,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl TryFrom<&Args> for MonitorConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        if args.refresh_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("refresh interval"));
        }
        let timeout_ms = args.request_timeout_ms.unwrap_or(args.refresh_interval_ms);
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("request timeout"));
        }

        Ok(Self {
            endpoint: parse_endpoint(&args.endpoint)?,
            refresh_interval: Duration::from_millis(args.refresh_interval_ms),
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Accepts `http://host:port/path`; a missing path becomes `/`.
pub fn parse_endpoint(raw: &str) -> Result<Uri, ConfigError> {
    let err = |reason: &str| ConfigError::Endpoint {
        endpoint: raw.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = raw.trim().parse().map_err(|e: http::uri::InvalidUri| err(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => {
            return Err(err(&format!("unsupported scheme '{other}', only http is supported")))
        }
        None => return Err(err("missing scheme")),
    }
    let authority = uri.authority().ok_or_else(|| err("missing host"))?;
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/");

    Uri::builder()
        .scheme("http")
        .authority(authority.as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| err(&e.to_string()))
}
