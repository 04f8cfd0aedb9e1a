//! Service configuration
//!
//! Command-line flags and `SKYPORT_*` environment variables are parsed by
//! `clap`; anything left unset falls through to the TOML file and then to
//! the compiled defaults below.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use skyport_common::config::{resolve_setting, TomlConfig};

/// Module name used for config file discovery and logging
pub const MODULE_NAME: &str = "skyport-importer";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_PDS_HOST: &str = "https://bsky.social";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EVENT_BUFFER: usize = 32;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Command-line arguments for skyport-importer
#[derive(Parser, Debug, Default)]
#[command(name = "skyport-importer")]
#[command(about = "Import an archive export of tweets into Bluesky")]
#[command(version)]
pub struct Args {
    /// HTTP listen address
    #[arg(long, env = "SKYPORT_BIND")]
    pub bind: Option<String>,

    /// Personal data server base URL
    #[arg(long, env = "SKYPORT_PDS_HOST")]
    pub pds_host: Option<String>,

    /// Timeout for each remote HTTP call, in seconds
    #[arg(long, env = "SKYPORT_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Capacity of each import's progress channel
    #[arg(long, env = "SKYPORT_EVENT_BUFFER")]
    pub event_buffer: Option<usize>,

    /// Maximum upload size, in bytes
    #[arg(long, env = "SKYPORT_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Parent directory for session workspaces (default: system temp dir)
    #[arg(long, env = "SKYPORT_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    /// Explicit TOML config file
    #[arg(short, long, env = "SKYPORT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub pds_host: String,
    pub http_timeout: Duration,
    pub event_buffer: usize,
    pub max_upload_bytes: usize,
    pub temp_root: Option<PathBuf>,
    /// Default tracing filter directive
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::resolve(Args::default(), TomlConfig::default())
    }
}

impl ServiceConfig {
    /// Merge CLI/ENV arguments over a TOML config over compiled defaults
    pub fn resolve(args: Args, toml: TomlConfig) -> Self {
        Self {
            bind_addr: resolve_setting(args.bind, toml.bind_addr, DEFAULT_BIND_ADDR.to_string()),
            pds_host: resolve_setting(args.pds_host, toml.pds_host, DEFAULT_PDS_HOST.to_string()),
            http_timeout: Duration::from_secs(resolve_setting(
                args.http_timeout_secs,
                toml.http_timeout_secs,
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            // A zero-capacity channel panics on creation
            event_buffer: resolve_setting(args.event_buffer, toml.event_buffer, DEFAULT_EVENT_BUFFER)
                .max(1),
            max_upload_bytes: resolve_setting(
                args.max_upload_bytes,
                toml.max_upload_bytes,
                DEFAULT_MAX_UPLOAD_BYTES,
            ),
            temp_root: args.temp_root.or(toml.temp_root),
            log_level: toml.logging.level,
        }
    }
}
