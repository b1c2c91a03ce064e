use std::path::PathBuf;

use clap::{Args, FromArgMatches, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the cccache binary.
#[derive(Debug, Parser)]
#[command(
    name = "cccache",
    version,
    about = "Cache-aside HTTP façade for CouchDB documents"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CCCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service (default).
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

impl ServeArgs {
    /// Overrides sourced from environment variables only.
    ///
    /// Used when no subcommand is given so `PORT` and friends still apply.
    pub fn from_env() -> Result<Self, clap::Error> {
        let command = Self::augment_args(clap::Command::new("cccache"));
        let matches = command.try_get_matches_from(["cccache"])?;
        Self::from_arg_matches(&matches)
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", env = "PORT", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "server-max-request-bytes", value_name = "BYTES")]
    pub server_max_request_bytes: Option<u64>,

    /// Toggle the `_dev` block in document responses.
    #[arg(
        long = "server-expose-dev-metadata",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub server_expose_dev_metadata: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the document backend URI (credentials may be embedded).
    #[arg(
        long = "backend-uri",
        env = "DB_INSTANCE_URI",
        value_name = "URI",
        hide_env_values = true
    )]
    pub backend_uri: Option<String>,

    /// Override the backend request timeout.
    #[arg(long = "backend-timeout-ms", value_name = "MILLIS")]
    pub backend_timeout_ms: Option<u64>,

    /// Override the cache store (memcached|memory|disabled).
    #[arg(long = "cache-backend", value_name = "KIND")]
    pub cache_backend: Option<String>,

    /// Override the memcached servers (comma separated `host:port`).
    #[arg(long = "cache-servers", value_name = "ADDRS", value_delimiter = ',')]
    pub cache_servers: Option<Vec<String>>,

    /// Override the cache key prefix.
    #[arg(long = "cache-prefix", value_name = "PREFIX")]
    pub cache_prefix: Option<String>,

    /// Override the default cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the cache network timeout.
    #[arg(long = "cache-timeout-ms", value_name = "MILLIS")]
    pub cache_timeout_ms: Option<u64>,

    /// Override the in-process cache capacity.
    #[arg(long = "cache-memory-capacity", value_name = "COUNT")]
    pub cache_memory_capacity: Option<u64>,

    /// Override the idle connections kept per memcached server.
    #[arg(long = "cache-max-idle-connections", value_name = "COUNT")]
    pub cache_max_idle_connections: Option<u64>,

    /// Username accepted by the HTTP Basic guard.
    #[arg(long = "auth-username", env = "API_USERNAME", value_name = "NAME")]
    pub auth_username: Option<String>,

    /// Password accepted by the HTTP Basic guard.
    #[arg(
        long = "auth-password",
        env = "API_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub auth_password: Option<String>,
}
