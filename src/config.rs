//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for hideside, supporting:
//! - Environment variables for all configurable values
//! - Defaults matching the values the tool has always used
//! - Builder-style overrides applied from the command line
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HIDESIDE_PORT` | Remote debugging port | `34726` |
//! | `HIDESIDE_POLL_INTERVAL_MS` | Delay between introspection attempts (ms) | `500` |
//! | `HIDESIDE_HTTP_TIMEOUT` | Introspection request timeout in seconds, `0` disables | `5` |
//! | `HIDESIDE_SOCKET_TIMEOUT` | Websocket session timeout in seconds, `0` disables | `10` |
//! | `HIDESIDE_SCRIPT` | Script evaluated in each window | `<resources>/js/init.min.js` |
//! | `HIDESIDE_RESOURCE_DIR` | Directory holding scripts and boot patch files | `resources` |
//! | `HIDESIDE_LOG_FILE` | Log file path | `hideside.log` |
//! | `HIDESIDE_LOG` | Log filter directive | `debug` |
//!
//! # Example
//!
//! ```bash
//! # Talk to Discord on another port and keep the log elsewhere
//! export HIDESIDE_PORT=9222
//! export HIDESIDE_LOG_FILE="/var/tmp/hideside.log"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default remote debugging port
pub const DEFAULT_PORT: u16 = 34726;

/// Default delay between introspection attempts (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default introspection request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT: u64 = 5;

/// Default websocket session timeout (seconds)
pub const DEFAULT_SOCKET_TIMEOUT: u64 = 10;

/// Object group attached to every evaluation
pub const DEFAULT_OBJECT_GROUP: &str = "discordHideSidebar";

/// Window titles that are never evaluated (compared lowercase)
pub const DEFAULT_TITLE_DENYLIST: &[&str] = &["discord updater"];

/// Default resource directory name
pub const DEFAULT_RESOURCE_DIR: &str = "resources";

/// Script location relative to the resource directory
pub const DEFAULT_SCRIPT_RELATIVE: &str = "js/init.min.js";

/// Default log file
pub const DEFAULT_LOG_FILE: &str = "hideside.log";

/// Default log filter. Lower this to `warn` before sharing logs.
pub const DEFAULT_LOG_LEVEL: &str = "debug";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the debug port
pub const ENV_PORT: &str = "HIDESIDE_PORT";

/// Environment variable for the poll interval
pub const ENV_POLL_INTERVAL: &str = "HIDESIDE_POLL_INTERVAL_MS";

/// Environment variable for the introspection request timeout
pub const ENV_HTTP_TIMEOUT: &str = "HIDESIDE_HTTP_TIMEOUT";

/// Environment variable for the websocket session timeout
pub const ENV_SOCKET_TIMEOUT: &str = "HIDESIDE_SOCKET_TIMEOUT";

/// Environment variable for the injected script path
pub const ENV_SCRIPT: &str = "HIDESIDE_SCRIPT";

/// Environment variable for the resource directory
pub const ENV_RESOURCE_DIR: &str = "HIDESIDE_RESOURCE_DIR";

/// Environment variable for the log file
pub const ENV_LOG_FILE: &str = "HIDESIDE_LOG_FILE";

/// Environment variable for the log filter
pub const ENV_LOG_LEVEL: &str = "HIDESIDE_LOG";

/// Centralized configuration for hideside
#[derive(Debug, Clone)]
pub struct Config {
    /// DevTools protocol settings
    pub devtools: DevtoolsSettings,
    /// File locations
    pub paths: PathSettings,
    /// Log output
    pub logging: LogSettings,
}

/// Settings for talking to the debugging endpoint
#[derive(Debug, Clone)]
pub struct DevtoolsSettings {
    /// Remote debugging port
    pub port: u16,
    /// Delay between introspection attempts (milliseconds)
    pub poll_interval_ms: u64,
    /// Introspection request timeout (seconds, 0 = unbounded)
    pub http_timeout: u64,
    /// Websocket connect/receive timeout (seconds, 0 = unbounded)
    pub socket_timeout: u64,
    /// Object group name sent with `Runtime.evaluate`
    pub object_group: String,
    /// Lowercase window titles to skip
    pub title_denylist: Vec<String>,
}

/// File locations
#[derive(Debug, Clone)]
pub struct PathSettings {
    /// Root of bundled resources
    pub resource_dir: PathBuf,
    /// Script evaluated in every window
    pub script_path: PathBuf,
}

/// Log output settings
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// File the log is appended to
    pub file: PathBuf,
    /// `EnvFilter` directive
    pub level: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            devtools: DevtoolsSettings::from_env(),
            paths: PathSettings::from_env(),
            logging: LogSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            devtools: DevtoolsSettings::defaults(),
            paths: PathSettings::defaults(),
            logging: LogSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DevtoolsSettings {
    /// Create devtools settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::defaults();
        Self {
            port: parse_env(ENV_PORT).unwrap_or(defaults.port),
            poll_interval_ms: parse_env(ENV_POLL_INTERVAL).unwrap_or(defaults.poll_interval_ms),
            http_timeout: parse_env(ENV_HTTP_TIMEOUT).unwrap_or(defaults.http_timeout),
            socket_timeout: parse_env(ENV_SOCKET_TIMEOUT).unwrap_or(defaults.socket_timeout),
            ..defaults
        }
    }

    /// Create devtools settings with defaults
    pub fn defaults() -> Self {
        Self {
            port: DEFAULT_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            object_group: DEFAULT_OBJECT_GROUP.to_string(),
            title_denylist: DEFAULT_TITLE_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        seconds_or_unbounded(self.http_timeout)
    }

    pub fn socket_timeout(&self) -> Option<Duration> {
        seconds_or_unbounded(self.socket_timeout)
    }
}

impl PathSettings {
    /// Create path settings from environment variables
    pub fn from_env() -> Self {
        let resource_dir = env::var(ENV_RESOURCE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_resource_dir());
        let script_path = env::var(ENV_SCRIPT)
            .map(PathBuf::from)
            .unwrap_or_else(|_| resource_dir.join(DEFAULT_SCRIPT_RELATIVE));
        Self {
            resource_dir,
            script_path,
        }
    }

    /// Create path settings with defaults
    pub fn defaults() -> Self {
        let resource_dir = PathBuf::from(DEFAULT_RESOURCE_DIR);
        Self {
            script_path: resource_dir.join(DEFAULT_SCRIPT_RELATIVE),
            resource_dir,
        }
    }
}

impl LogSettings {
    /// Create log settings from environment variables
    pub fn from_env() -> Self {
        Self {
            file: env::var(ENV_LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
            level: env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Create log settings with defaults
    pub fn defaults() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn seconds_or_unbounded(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// `resources` next to the running executable when present, else relative to
/// the working directory
fn default_resource_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_RESOURCE_DIR))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESOURCE_DIR))
}

/// Resolve the effective port. `0` (or nothing) selects the default, matching
/// how the tool has always treated an unset port.
pub fn resolve_port(requested: Option<u16>, fallback: u16) -> u16 {
    match requested {
        Some(port) if port != 0 => port,
        _ if fallback != 0 => fallback,
        _ => DEFAULT_PORT,
    }
}

/// Introspection URL for a debug port
pub fn introspection_url(port: u16) -> String {
    format!("http://localhost:{}/json", port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.devtools.port, DEFAULT_PORT);
        assert_eq!(config.devtools.object_group, "discordHideSidebar");
        assert_eq!(config.devtools.title_denylist, vec!["discord updater".to_string()]);
        assert_eq!(config.paths.script_path, PathBuf::from("resources/js/init.min.js"));
        assert_eq!(config.logging.file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_port_omitted_uses_default() {
        let port = resolve_port(None, DEFAULT_PORT);
        assert_eq!(port, 34726);
        assert_eq!(introspection_url(port), "http://localhost:34726/json");
    }

    #[test]
    fn test_port_zero_falls_back() {
        assert_eq!(resolve_port(Some(0), 9222), 9222);
        assert_eq!(resolve_port(Some(0), 0), DEFAULT_PORT);
        assert_eq!(resolve_port(Some(4000), 9222), 4000);
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let mut settings = DevtoolsSettings::defaults();
        assert_eq!(settings.http_timeout(), Some(Duration::from_secs(5)));
        settings.http_timeout = 0;
        settings.socket_timeout = 0;
        assert_eq!(settings.http_timeout(), None);
        assert_eq!(settings.socket_timeout(), None);
    }
}
