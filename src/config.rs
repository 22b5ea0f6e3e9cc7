//! Configuration handling for the PostgreSQL MCP Server.
//!
//! Process-level flags (transport, HTTP binding, console log level) come from
//! the command line via clap. Everything describing the database, telemetry
//! and file logging is resolved once at startup by [`Config::resolve`] from an
//! environment snapshot or, when `CONFIG_PATH` is set, from a JSON file.

use clap::{Parser, ValueEnum};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

// Database defaults
pub const DEFAULT_PG_HOST: &str = "localhost";
pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_USER: &str = "postgres";
pub const DEFAULT_CONNECTION_LIMIT: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

// Telemetry defaults
pub const DEFAULT_SERVICE_NAME: &str = "pg-mcp-server";
pub const DEFAULT_OTEL_HOST: &str = "localhost";
pub const DEFAULT_OTEL_PORT: u16 = 4318;
pub const DEFAULT_OTEL_PROTOCOL: &str = "http";

/// File name appended to each log directory candidate.
pub const LOG_FILE_NAME: &str = "pg-mcp-server.log";

/// Environment variable naming a JSON file that replaces all other settings.
pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

/// Errors raised while loading the configuration override file.
///
/// These are startup-only conditions; the process exits on any of them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Command line options.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pg-mcp-server",
    about = "MCP server exposing a PostgreSQL database to AI assistants",
    version,
    author
)]
pub struct Cli {
    /// JSON file replacing all PG*/LOG_*/OTEL_* environment settings
    #[arg(long = "config", value_name = "PATH", env = CONFIG_PATH_VAR)]
    pub config_path: Option<PathBuf>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Log level for the file sink and console (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Connection target for the database gateway.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Sensitive - never logged.
    pub password: Option<String>,
    /// Default database. PostgreSQL falls back to the user name when unset.
    pub database: Option<String>,
    /// Upper bound on pooled connections.
    pub connection_limit: u32,
    /// TLS without certificate verification (PGSSLMODE=require).
    pub ssl: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_PG_HOST.to_string(),
            port: DEFAULT_PG_PORT,
            user: DEFAULT_PG_USER.to_string(),
            password: None,
            database: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            ssl: false,
        }
    }
}

impl DatabaseSettings {
    /// `host:port` as shown to the assistant.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("connection_limit", &self.connection_limit)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// OTLP export settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// Collector base URL, e.g. `http://localhost:4318`.
    pub endpoint: String,
    pub service_name: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: format!(
                "{}://{}:{}",
                DEFAULT_OTEL_PROTOCOL, DEFAULT_OTEL_HOST, DEFAULT_OTEL_PORT
            ),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

/// File logging settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub enabled: bool,
    /// Explicit log file. When unset, the candidate directories are searched.
    pub path: Option<PathBuf>,
}

/// Immutable configuration snapshot shared for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
    pub logging: LoggingSettings,
    /// Non-fatal problems found while resolving (reported once logging is up).
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Config {
    /// Resolve the configuration: the override file when given, otherwise
    /// the environment snapshot.
    pub fn resolve(
        config_path: Option<&Path>,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_vars(vars),
        };
        if let Some(password) = config.database.password.take() {
            config.database.password = Some(decode_password(&password));
        }
        Ok(config)
    }

    /// Read the override file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Assemble configuration from individually named variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let mut warnings = Vec::new();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let database = DatabaseSettings {
            host: get("PGHOST").unwrap_or_else(|| DEFAULT_PG_HOST.to_string()),
            port: parse_number(vars, "PGPORT", DEFAULT_PG_PORT, &mut warnings),
            user: get("PGUSER").unwrap_or_else(|| DEFAULT_PG_USER.to_string()),
            // Passwords may legitimately carry surrounding whitespace.
            password: vars.get("PGPASSWORD").filter(|v| !v.is_empty()).cloned(),
            database: get("PGDATABASE"),
            connection_limit: parse_connection_limit(vars, &mut warnings),
            ssl: get("PGSSLMODE").is_some_and(|v| v.eq_ignore_ascii_case("require")),
        };

        let endpoint = get("OTEL_ENDPOINT").unwrap_or_else(|| {
            let protocol = get("OTEL_PROTOCOL").unwrap_or_else(|| DEFAULT_OTEL_PROTOCOL.into());
            let host = get("OTEL_HOST").unwrap_or_else(|| DEFAULT_OTEL_HOST.into());
            let port = parse_number(vars, "OTEL_PORT", DEFAULT_OTEL_PORT, &mut warnings);
            format!("{}://{}:{}", protocol, host, port)
        });

        let telemetry = TelemetrySettings {
            enabled: parse_flag(get("OTEL_ENABLED")),
            endpoint,
            service_name: get("OTEL_SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.into()),
        };

        let logging = LoggingSettings {
            enabled: parse_flag(get("LOG_ENABLED")),
            path: get("LOG_PATH").map(PathBuf::from),
        };

        Self {
            database,
            telemetry,
            logging,
            warnings,
        }
    }

    /// Masked view for startup logging. The password is reduced to a flag.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            host: self.database.host.clone(),
            port: self.database.port,
            user: self.database.user.clone(),
            database: self.database.database.clone(),
            password_set: self.database.password.is_some(),
            connection_limit: self.database.connection_limit,
            ssl: self.database.ssl,
            telemetry_enabled: self.telemetry.enabled,
            telemetry_endpoint: self.telemetry.endpoint.clone(),
            service_name: self.telemetry.service_name.clone(),
            logging_enabled: self.logging.enabled,
        }
    }
}

/// Configuration summary safe to write to logs.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: Option<String>,
    pub password_set: bool,
    pub connection_limit: u32,
    pub ssl: bool,
    pub telemetry_enabled: bool,
    pub telemetry_endpoint: String,
    pub service_name: String,
    pub logging_enabled: bool,
}

fn parse_flag(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn parse_number<T: std::str::FromStr + Copy + fmt::Display>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warnings.push(format!("{key}={raw:?} is not valid, using {default}"));
            default
        }),
    }
}

fn parse_connection_limit(vars: &HashMap<String, String>, warnings: &mut Vec<String>) -> u32 {
    let limit = parse_number(
        vars,
        "PG_CONNECTION_LIMIT",
        DEFAULT_CONNECTION_LIMIT,
        warnings,
    );
    if limit == 0 {
        warnings.push(format!(
            "PG_CONNECTION_LIMIT must be greater than 0, using {DEFAULT_CONNECTION_LIMIT}"
        ));
        return DEFAULT_CONNECTION_LIMIT;
    }
    limit
}

/// Percent-decode a password containing `%`.
///
/// Malformed escapes or a result that is not valid UTF-8 leave the raw value
/// in place; this never fails startup.
pub fn decode_password(raw: &str) -> String {
    if !raw.contains('%') || !has_only_valid_escapes(raw) {
        return raw.to_string();
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn has_only_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
